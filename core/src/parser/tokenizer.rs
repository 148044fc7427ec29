//! Splits raw command-line tokens into option and value tokens.

/// Kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A plain value or command name.
    String,
    /// `--name`, `--name=value` or `--name:value`.
    LongOption,
    /// One letter of `-abc`, or `-a=value`.
    ShortOption,
}

/// A classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The option name without dashes, or the raw string.
    pub value: String,
    /// Value attached with `=` or `:`.
    pub attached: Option<String>,
    /// The token as written on the command line.
    pub representation: String,
}

impl Token {
    fn string(raw: &str) -> Self {
        Self {
            kind: TokenKind::String,
            value: raw.to_string(),
            attached: None,
            representation: raw.to_string(),
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, TokenKind::LongOption | TokenKind::ShortOption)
    }
}

/// Tokens before `--`, and the raw tokens after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    pub remaining: Vec<String>,
}

/// Classifies raw tokens.
///
/// Everything after a lone `--` is passed through untouched. A lone `-` and
/// negative numbers such as `-5` or `-1.5` are plain strings.
///
/// # Examples
///
/// ```
/// use command_model_core::parser::{tokenize, TokenKind};
///
/// let tokenized = tokenize(&["-ab", "--name=foo", "-5", "--", "--raw"]);
/// let kinds: Vec<TokenKind> = tokenized.tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![TokenKind::ShortOption, TokenKind::ShortOption, TokenKind::LongOption, TokenKind::String]
/// );
/// assert_eq!(tokenized.tokens[2].attached.as_deref(), Some("foo"));
/// assert_eq!(tokenized.remaining, vec!["--raw"]);
/// ```
pub fn tokenize<S: AsRef<str>>(args: &[S]) -> Tokenized {
    let mut result = Tokenized::default();
    let mut iter = args.iter().map(AsRef::as_ref);

    while let Some(arg) = iter.next() {
        if arg == "--" {
            result.remaining.extend(iter.by_ref().map(String::from));
            break;
        }

        if let Some(rest) = arg.strip_prefix("--") {
            let (name, attached) = split_attached(rest);
            if name.is_empty() {
                result.tokens.push(Token::string(arg));
            } else {
                result.tokens.push(Token {
                    kind: TokenKind::LongOption,
                    value: name.to_string(),
                    attached,
                    representation: arg.to_string(),
                });
            }
        } else if let Some(rest) = arg.strip_prefix('-') {
            if rest.is_empty() || is_number(rest) {
                result.tokens.push(Token::string(arg));
                continue;
            }

            let (names, attached) = split_attached(rest);
            let count = names.chars().count();
            if count == 0 {
                result.tokens.push(Token::string(arg));
                continue;
            }
            for (index, name) in names.chars().enumerate() {
                result.tokens.push(Token {
                    kind: TokenKind::ShortOption,
                    value: name.to_string(),
                    attached: if index + 1 == count {
                        attached.clone()
                    } else {
                        None
                    },
                    representation: format!("-{name}"),
                });
            }
        } else {
            result.tokens.push(Token::string(arg));
        }
    }

    result
}

fn is_number(rest: &str) -> bool {
    rest.starts_with(|c: char| c.is_ascii_digit() || c == '.') && rest.parse::<f64>().is_ok()
}

fn split_attached(rest: &str) -> (&str, Option<String>) {
    match rest.find(['=', ':']) {
        Some(index) => (&rest[..index], Some(rest[index + 1..].to_string())),
        None => (rest, None),
    }
}

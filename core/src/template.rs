//! Option and argument template parsing.
//!
//! Options are declared with templates such as `-a|--alive`,
//! `--name <NAME>` or `-p|--port [PORT]`: names separated by `|`, followed
//! by an optional value placeholder. `<VALUE>` means the value is required,
//! `[VALUE]` means it may be omitted.
//!
//! Arguments are declared as `<NAME>` (required) or `[NAME]` (optional).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigurationError;

static SHORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-([A-Za-z?])$").expect("static regex must compile"));
static LONG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--([A-Za-z][A-Za-z0-9_.\-]+)$").expect("static regex must compile")
});
static VALUE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:<([^<>\[\]\s]+)>|\[([^<>\[\]\s]+)\])$").expect("static regex must compile")
});

/// A parsed option template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTemplate {
    /// Short names without the leading dash.
    pub short_names: Vec<String>,
    /// Long names without the leading dashes.
    pub long_names: Vec<String>,
    /// Name of the value placeholder, if any.
    pub value_name: Option<String>,
    /// `true` when the placeholder is `[VALUE]`.
    pub value_is_optional: bool,
}

/// A parsed argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTemplate {
    pub value_name: String,
    pub required: bool,
}

/// Parses an option template.
///
/// # Examples
///
/// ```
/// use command_model_core::parse_option_template;
///
/// let t = parse_option_template("-p|--port [PORT]").unwrap();
/// assert_eq!(t.short_names, vec!["p"]);
/// assert_eq!(t.long_names, vec!["port"]);
/// assert_eq!(t.value_name.as_deref(), Some("PORT"));
/// assert!(t.value_is_optional);
///
/// assert!(parse_option_template("-ab").is_err());
/// ```
pub fn parse_option_template(template: &str) -> Result<OptionTemplate, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidOptionTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut result = OptionTemplate {
        short_names: Vec::new(),
        long_names: Vec::new(),
        value_name: None,
        value_is_optional: false,
    };

    let parts: Vec<&str> = template
        .split(|c: char| c == '|' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(invalid("the template is empty"));
    }

    for part in parts {
        if let Some(caps) = SHORT_NAME.captures(part) {
            if result.value_name.is_some() {
                return Err(invalid("option names must precede the value"));
            }
            result.short_names.push(caps[1].to_string());
        } else if let Some(caps) = LONG_NAME.captures(part) {
            if result.value_name.is_some() {
                return Err(invalid("option names must precede the value"));
            }
            result.long_names.push(caps[1].to_string());
        } else if let Some(caps) = VALUE_PLACEHOLDER.captures(part) {
            if result.value_name.is_some() {
                return Err(invalid("multiple values are not supported"));
            }
            let (name, optional) = match (caps.get(1), caps.get(2)) {
                (Some(required), _) => (required.as_str(), false),
                (None, Some(optional)) => (optional.as_str(), true),
                (None, None) => return Err(invalid("empty value placeholder")),
            };
            result.value_name = Some(name.to_string());
            result.value_is_optional = optional;
        } else if part.starts_with("--") {
            return Err(invalid(&format!(
                "'{part}' is not a valid long option name"
            )));
        } else if part.starts_with('-') {
            return Err(invalid(&format!(
                "'{part}' is not a valid short option name; short names must be a single letter"
            )));
        } else {
            return Err(invalid(&format!("unexpected token '{part}'")));
        }
    }

    if result.short_names.is_empty() && result.long_names.is_empty() {
        return Err(invalid("no option names were specified"));
    }

    Ok(result)
}

/// Parses an argument template.
///
/// # Examples
///
/// ```
/// use command_model_core::parse_argument_template;
///
/// let legs = parse_argument_template("[LEGS]").unwrap();
/// assert_eq!(legs.value_name, "LEGS");
/// assert!(!legs.required);
///
/// assert!(parse_argument_template("<NAME>").unwrap().required);
/// assert!(parse_argument_template("NAME").is_err());
/// ```
pub fn parse_argument_template(template: &str) -> Result<ArgumentTemplate, ConfigurationError> {
    let trimmed = template.trim();
    let caps = VALUE_PLACEHOLDER.captures(trimmed).ok_or_else(|| {
        ConfigurationError::InvalidArgumentTemplate {
            template: template.to_string(),
            reason: "expected <NAME> or [NAME]".to_string(),
        }
    })?;

    match (caps.get(1), caps.get(2)) {
        (Some(name), _) => Ok(ArgumentTemplate {
            value_name: name.as_str().to_string(),
            required: true,
        }),
        (None, Some(name)) => Ok(ArgumentTemplate {
            value_name: name.as_str().to_string(),
            required: false,
        }),
        (None, None) => Err(ConfigurationError::InvalidArgumentTemplate {
            template: template.to_string(),
            reason: "empty placeholder".to_string(),
        }),
    }
}

//! Parses command-line tokens against a validated [`CommandModel`].
//!
//! Parsing runs as a small state machine. In `ResolvingPath` leading command
//! names walk down the tree; in `BindingParameters` the remaining tokens are
//! bound to the resolved command's own and inherited options and to its
//! positional arguments. A string that names a child command switches back
//! to `ResolvingPath`. The machine ends in `Done`, or short-circuits with a
//! [`ParseError`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use command_model_core::*;
//! use command_model_core::parser::{RawValue, TreeParser};
//!
//! let shape = Arc::new(
//!     SettingsShape::new("AnimalSettings")
//!         .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
//!         .with_argument(ArgumentDecl::new("legs", 0, "[LEGS]", ValueType::Integer)),
//! );
//! let mut configuration = Configuration::new();
//! configuration.add_command(CommandDeclaration::new("animal", shape));
//! let model = build(&configuration, &AppSettings::default()).unwrap();
//!
//! let result = TreeParser::new(&model, ParsingMode::Strict)
//!     .parse(&["animal", "-a", "4"])
//!     .unwrap();
//! assert_eq!(model.node(result.command).name, "animal");
//! assert_eq!(
//!     result.value_of(&model, "legs"),
//!     Some(&[RawValue::Text("4".into())][..])
//! );
//! ```

mod tokenizer;

use std::collections::HashSet;
use std::iter::Peekable;
use std::vec::IntoIter;

use serde::Serialize;
use tracing::debug;

use crate::config::ParsingMode;
use crate::error::ParseError;
use crate::types::{CommandModel, CommandOption, NodeId, Parameter, ParameterKind};
use crate::value::{PairDeconstructor, ValueType, convert, split_key_value};

pub use tokenizer::{Token, TokenKind, Tokenized, tokenize};

type TokenStream = Peekable<IntoIter<Token>>;

/// Identifies one parameter of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterRef {
    pub node: NodeId,
    /// Index into the node's `parameters`.
    pub index: usize,
}

/// A raw value bound to a parameter, before conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
    Text(String),
    /// Split by the option's pair deconstructor.
    Pair { key: String, value: String },
    /// The option was given without a value.
    Present,
}

/// Raw values bound to one parameter, in token order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub parameter: ParameterRef,
    pub values: Vec<RawValue>,
}

/// A token tolerated in relaxed mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedToken {
    pub token: String,
    pub value: Option<String>,
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    /// The resolved command.
    pub command: NodeId,
    /// Commands walked from the root to `command`.
    pub path: Vec<NodeId>,
    pub bindings: Vec<Binding>,
    /// Unknown options and surplus strings (relaxed mode only).
    pub unmatched: Vec<UnmatchedToken>,
    /// Tokens after `--`, untouched.
    pub remaining: Vec<String>,
}

impl ParseResult {
    /// Returns the binding for a specific parameter.
    pub fn binding(&self, parameter: ParameterRef) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.parameter == parameter)
    }

    /// Returns the values bound to `property`, preferring the deepest
    /// command that bound it.
    pub fn value_of<'a>(&'a self, model: &CommandModel, property: &str) -> Option<&'a [RawValue]> {
        self.bindings
            .iter()
            .filter(|b| {
                model.node(b.parameter.node).parameters[b.parameter.index].has_same_property(property)
            })
            .max_by_key(|b| self.path.iter().position(|id| *id == b.parameter.node))
            .map(|b| b.values.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    ResolvingPath,
    BindingParameters,
    Done,
}

struct Context {
    current: NodeId,
    path: Vec<NodeId>,
    position: usize,
    bindings: Vec<Binding>,
    unmatched: Vec<UnmatchedToken>,
}

impl Context {
    fn new(root: NodeId) -> Self {
        Self {
            current: root,
            path: vec![root],
            position: 0,
            bindings: Vec::new(),
            unmatched: Vec::new(),
        }
    }

    fn descend(&mut self, child: NodeId) {
        self.current = child;
        self.path.push(child);
        self.position = 0;
    }

    fn bind(&mut self, parameter: ParameterRef, values: Vec<RawValue>, append: bool) {
        match self.bindings.iter_mut().find(|b| b.parameter == parameter) {
            Some(binding) if append => binding.values.extend(values),
            Some(binding) => binding.values = values,
            None => self.bindings.push(Binding { parameter, values }),
        }
    }
}

/// Parses token sequences against a model.
///
/// The parser holds no mutable state; one instance can parse any number of
/// token sequences.
#[derive(Debug, Clone, Copy)]
pub struct TreeParser<'m> {
    model: &'m CommandModel,
    mode: ParsingMode,
}

impl<'m> TreeParser<'m> {
    pub fn new(model: &'m CommandModel, mode: ParsingMode) -> Self {
        Self { model, mode }
    }

    pub fn mode(&self) -> ParsingMode {
        self.mode
    }

    /// Parses `args`, resolving exactly one command.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if no command can be resolved, if a token
    /// cannot be bound (strict mode), if an option lacks its value, or if a
    /// required parameter is missing.
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<ParseResult, ParseError> {
        let Tokenized { tokens, remaining } = tokenize(args);
        let mut stream: TokenStream = tokens.into_iter().peekable();

        let root = self.resolve_root(&mut stream)?;
        let mut context = Context::new(root);
        let mut state = ParserState::ResolvingPath;

        loop {
            state = match state {
                ParserState::ResolvingPath => match self.match_child(&context, stream.peek()) {
                    Some(child) => {
                        stream.next();
                        context.descend(child);
                        debug!(command = %self.model.node(child).name, "Resolved command");
                        ParserState::ResolvingPath
                    }
                    None => ParserState::BindingParameters,
                },
                ParserState::BindingParameters => match stream.peek() {
                    None => ParserState::Done,
                    Some(token) if self.match_child(&context, Some(token)).is_some() => {
                        ParserState::ResolvingPath
                    }
                    Some(token) if token.is_option() => {
                        self.bind_option(&mut context, &mut stream)?;
                        ParserState::BindingParameters
                    }
                    Some(_) => {
                        self.bind_argument(&mut context, &mut stream)?;
                        ParserState::BindingParameters
                    }
                },
                ParserState::Done => break,
            };
        }

        self.finish(context, remaining)
    }

    fn resolve_root(&self, stream: &mut TokenStream) -> Result<NodeId, ParseError> {
        if let Some(token) = stream.peek() {
            if token.kind == TokenKind::String {
                if let Some(id) = self.model.find_command(None, &token.value) {
                    stream.next();
                    debug!(command = %self.model.node(id).name, "Resolved command");
                    return Ok(id);
                }
            }
        }

        if let Some(default) = self.model.default_command() {
            debug!("Falling back to the default command");
            return Ok(default);
        }

        match stream.peek() {
            Some(token) if token.kind == TokenKind::String => {
                Err(ParseError::UnknownCommand(token.value.clone()))
            }
            _ => Err(ParseError::NoCommandSpecified),
        }
    }

    fn match_child(&self, context: &Context, token: Option<&Token>) -> Option<NodeId> {
        let token = token?;
        if token.kind != TokenKind::String {
            return None;
        }
        self.model.find_command(Some(context.current), &token.value)
    }

    fn is_value_token(&self, context: &Context, token: &Token) -> bool {
        token.kind == TokenKind::String && self.match_child(context, Some(token)).is_none()
    }

    fn bind_argument(&self, context: &mut Context, stream: &mut TokenStream) -> Result<(), ParseError> {
        let Some(token) = stream.next() else {
            return Ok(());
        };
        let node = self.model.node(context.current);
        let arguments = node.arguments();

        let Some((index, argument)) = arguments.get(context.position).copied() else {
            if node.is_branch
                || (!node.children.is_empty() && self.mode == ParsingMode::Strict)
            {
                return Err(ParseError::UnknownCommand(token.value));
            }
            return match self.mode {
                ParsingMode::Strict => Err(ParseError::CouldNotMatchArgument(token.value)),
                ParsingMode::Relaxed => {
                    debug!(token = %token.representation, "Tolerating unmatched token");
                    context.unmatched.push(UnmatchedToken {
                        token: token.representation,
                        value: None,
                    });
                    Ok(())
                }
            };
        };

        let mut values = vec![RawValue::Text(token.value)];
        let is_vector = argument.kind == ParameterKind::Vector;
        if is_vector {
            while let Some(next) = stream.next_if(|t| self.is_value_token(context, t)) {
                values.push(RawValue::Text(next.value));
            }
        }

        if argument.value_type.is_pair_deconstructable() {
            values = values
                .into_iter()
                .map(|value| deconstruct(None, &argument.value_name, value))
                .collect::<Result<_, _>>()?;
        }

        let parameter = ParameterRef {
            node: context.current,
            index,
        };
        context.bind(parameter, values, is_vector);
        context.position += 1;
        Ok(())
    }

    fn find_option(&self, context: &Context, name: &str, is_long: bool) -> Option<(ParameterRef, &'m CommandOption)> {
        context.path.iter().rev().find_map(|id| {
            self.model
                .node(*id)
                .find_option(name, is_long)
                .map(|(index, option)| (ParameterRef { node: *id, index }, option))
        })
    }

    fn bind_option(&self, context: &mut Context, stream: &mut TokenStream) -> Result<(), ParseError> {
        let Some(token) = stream.next() else {
            return Ok(());
        };
        let is_long = token.kind == TokenKind::LongOption;

        let Some((parameter, option)) = self.find_option(context, &token.value, is_long) else {
            if self.mode == ParsingMode::Strict {
                return Err(ParseError::UnknownOption(token.representation));
            }
            let value = token.attached.clone().or_else(|| {
                stream
                    .next_if(|t| t.kind == TokenKind::String)
                    .map(|t| t.value)
            });
            debug!(option = %token.representation, "Tolerating unknown option");
            context.unmatched.push(UnmatchedToken {
                token: token.representation,
                value,
            });
            return Ok(());
        };

        let mut values = Vec::new();
        match option.kind {
            ParameterKind::Flag => {
                let value = token.attached.clone().unwrap_or_else(|| "true".to_string());
                if option.value_type == ValueType::Bool && convert(&ValueType::Bool, &value).is_err() {
                    return Err(ParseError::InvalidFlagValue {
                        option: token.representation,
                        value,
                    });
                }
                values.push(RawValue::Text(value));
            }
            ParameterKind::FlagWithValue => {
                let value = match token.attached.clone() {
                    Some(value) => RawValue::Text(value),
                    None => match stream.next_if(|t| self.is_value_token(context, t)) {
                        Some(next) => RawValue::Text(next.value),
                        None => RawValue::Present,
                    },
                };
                values.push(value);
            }
            ParameterKind::Single => {
                values.push(RawValue::Text(take_value(&token, stream)?));
            }
            ParameterKind::Vector => {
                values.push(RawValue::Text(take_value(&token, stream)?));
                while let Some(next) = stream.next_if(|t| self.is_value_token(context, t)) {
                    values.push(RawValue::Text(next.value));
                }
            }
        }

        if option.value_type.is_pair_deconstructable() {
            values = values
                .into_iter()
                .map(|value| {
                    deconstruct(option.pair_deconstructor.as_ref(), &token.representation, value)
                })
                .collect::<Result<_, _>>()?;
        }

        let append = option.kind == ParameterKind::Vector || option.value_type.is_vector();
        context.bind(parameter, values, append);
        Ok(())
    }

    fn finish(&self, context: Context, remaining: Vec<String>) -> Result<ParseResult, ParseError> {
        let leaf = self.model.node(context.current);
        if leaf.is_branch {
            return Err(ParseError::BranchRequiresSubcommand(leaf.name.clone()));
        }

        let bound: HashSet<String> = context
            .bindings
            .iter()
            .map(|b| {
                self.model.node(b.parameter.node).parameters[b.parameter.index]
                    .property()
                    .to_lowercase()
            })
            .collect();

        for (id, _, parameter) in self.model.parameters_in_scope(context.current) {
            if !parameter.required() || bound.contains(&parameter.property().to_lowercase()) {
                continue;
            }
            let command = self.model.node(id).name.clone();
            return Err(match parameter {
                Parameter::Argument(argument) => ParseError::MissingRequiredArgument {
                    command,
                    argument: argument.value_name.clone(),
                },
                Parameter::Option(option) => ParseError::MissingRequiredOption {
                    command,
                    option: option.display_name(),
                },
            });
        }

        debug!(
            command = %leaf.name,
            bindings = context.bindings.len(),
            unmatched = context.unmatched.len(),
            "Parsed command line"
        );

        Ok(ParseResult {
            command: context.current,
            path: context.path,
            bindings: context.bindings,
            unmatched: context.unmatched,
            remaining,
        })
    }
}

/// Takes an attached value or the next string token.
fn take_value(token: &Token, stream: &mut TokenStream) -> Result<String, ParseError> {
    if let Some(value) = &token.attached {
        return Ok(value.clone());
    }
    stream
        .next_if(|t| t.kind == TokenKind::String)
        .map(|t| t.value)
        .ok_or_else(|| ParseError::OptionHasNoValue(token.representation.clone()))
}

/// Splits a raw text value into a key/value pair, with the parameter's own
/// deconstructor when it has one.
fn deconstruct(
    deconstructor: Option<&PairDeconstructor>,
    name: &str,
    value: RawValue,
) -> Result<RawValue, ParseError> {
    let RawValue::Text(raw) = value else {
        return Ok(value);
    };
    let pair = match deconstructor {
        Some(deconstructor) => deconstructor.deconstruct(&raw),
        None => split_key_value(&raw),
    };
    match pair {
        Ok((key, value)) => Ok(RawValue::Pair { key, value }),
        Err(reason) => Err(ParseError::InvalidPair {
            option: name.to_string(),
            value: raw,
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::{CommandDeclaration, Configuration, build};
    use crate::config::AppSettings;
    use crate::settings::{ArgumentDecl, OptionDecl, SettingsShape};

    fn text(values: &[&str]) -> Vec<RawValue> {
        values.iter().map(|v| RawValue::Text(v.to_string())).collect()
    }

    fn animal_model() -> CommandModel {
        let animal = Arc::new(
            SettingsShape::new("AnimalSettings")
                .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
                .with_argument(ArgumentDecl::new("legs", 1, "[LEGS]", ValueType::Integer)),
        );
        let dog = Arc::new(
            SettingsShape::new("DogSettings")
                .with_base(Arc::clone(&animal))
                .with_option(OptionDecl::new("name", "-n|--name <NAME>", ValueType::String))
                .with_option(OptionDecl::new(
                    "tags",
                    "-t|--tag <TAG>",
                    ValueType::List(Box::new(ValueType::String)),
                ))
                .with_option(OptionDecl::new(
                    "env",
                    "-e|--env <PAIR>",
                    ValueType::Map(Box::new(ValueType::String), Box::new(ValueType::String)),
                ))
                .with_option(OptionDecl::new(
                    "level",
                    "--level [LEVEL]",
                    ValueType::FlagValue(Box::new(ValueType::Integer)),
                ))
                .with_argument(ArgumentDecl::new("age", 0, "<AGE>", ValueType::Integer)),
        );
        let cat = Arc::new(
            SettingsShape::new("CatSettings")
                .with_base(Arc::clone(&animal))
                .with_argument(ArgumentDecl::new(
                    "toys",
                    0,
                    "[TOYS]",
                    ValueType::List(Box::new(ValueType::String)),
                )),
        );

        let mut configuration = Configuration::new();
        configuration
            .add_command(
                CommandDeclaration::new("animal", Arc::clone(&animal)).with_alias("beast"),
            )
            .add_command(
                CommandDeclaration::branch_with_settings("pets", animal)
                    .with_child(CommandDeclaration::new("dog", dog).with_alias("puppy"))
                    .with_child(CommandDeclaration::new("cat", cat)),
            );
        build(&configuration, &AppSettings::default()).unwrap()
    }

    fn parse(model: &CommandModel, mode: ParsingMode, args: &[&str]) -> Result<ParseResult, ParseError> {
        TreeParser::new(model, mode).parse(args)
    }

    #[test]
    fn test_flag_and_argument() {
        let model = animal_model();
        let result = parse(&model, ParsingMode::Strict, &["animal", "-a", "4"]).unwrap();

        assert_eq!(model.node(result.command).name, "animal");
        assert_eq!(result.value_of(&model, "alive"), Some(&text(&["true"])[..]));
        assert_eq!(result.value_of(&model, "legs"), Some(&text(&["4"])[..]));
    }

    #[test]
    fn test_command_names_and_options_ignore_case() {
        let model = animal_model();
        let result = parse(&model, ParsingMode::Strict, &["BEAST", "--ALIVE"]).unwrap();
        assert_eq!(model.node(result.command).name, "animal");
        assert!(result.value_of(&model, "alive").is_some());
    }

    #[test]
    fn test_nested_path_and_inherited_options() {
        let model = animal_model();
        let result = parse(
            &model,
            ParsingMode::Strict,
            &["pets", "4", "Puppy", "12", "--alive", "--name", "Rex"],
        )
        .unwrap();

        let names: Vec<&str> = result
            .path
            .iter()
            .map(|id| model.node(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["pets", "dog"]);
        assert_eq!(result.value_of(&model, "legs"), Some(&text(&["4"])[..]));
        assert_eq!(result.value_of(&model, "age"), Some(&text(&["12"])[..]));
        assert_eq!(result.value_of(&model, "alive"), Some(&text(&["true"])[..]));
        assert_eq!(result.value_of(&model, "name"), Some(&text(&["Rex"])[..]));
    }

    #[test]
    fn test_vector_option_is_greedy_and_accumulates() {
        let model = animal_model();
        let result = parse(
            &model,
            ParsingMode::Strict,
            &["pets", "dog", "3", "-t", "a", "b", "--tag=c"],
        )
        .unwrap();
        assert_eq!(result.value_of(&model, "tags"), Some(&text(&["a", "b", "c"])[..]));
    }

    #[test]
    fn test_vector_argument_consumes_remaining_strings() {
        let model = animal_model();
        let result = parse(&model, ParsingMode::Strict, &["pets", "cat", "ball", "yarn"]).unwrap();
        assert_eq!(result.value_of(&model, "toys"), Some(&text(&["ball", "yarn"])[..]));
    }

    #[test]
    fn test_pair_option_is_deconstructed() {
        let model = animal_model();
        let result = parse(
            &model,
            ParsingMode::Strict,
            &["pets", "dog", "1", "-e", "HOME=/root", "-e", "X=1"],
        )
        .unwrap();
        assert_eq!(
            result.value_of(&model, "env"),
            Some(
                &[
                    RawValue::Pair {
                        key: "HOME".into(),
                        value: "/root".into()
                    },
                    RawValue::Pair {
                        key: "X".into(),
                        value: "1".into()
                    },
                ][..]
            )
        );

        let err = parse(&model, ParsingMode::Strict, &["pets", "dog", "1", "-e", "nope"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPair { .. }));
    }

    #[test]
    fn test_flag_with_optional_value() {
        let model = animal_model();
        let present = parse(&model, ParsingMode::Strict, &["pets", "dog", "1", "--level"]).unwrap();
        assert_eq!(present.value_of(&model, "level"), Some(&[RawValue::Present][..]));

        let valued =
            parse(&model, ParsingMode::Strict, &["pets", "dog", "--level", "3", "1"]).unwrap();
        assert_eq!(valued.value_of(&model, "level"), Some(&text(&["3"])[..]));
        assert_eq!(valued.value_of(&model, "age"), Some(&text(&["1"])[..]));
    }

    #[test]
    fn test_single_option_requires_value() {
        let model = animal_model();
        let err = parse(&model, ParsingMode::Strict, &["pets", "dog", "1", "--name"]).unwrap_err();
        assert_eq!(err, ParseError::OptionHasNoValue("--name".into()));
    }

    #[test]
    fn test_invalid_flag_value() {
        let model = animal_model();
        let err = parse(&model, ParsingMode::Strict, &["animal", "--alive=maybe"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFlagValue { .. }));
    }

    #[test]
    fn test_strict_rejects_unknown_tokens() {
        let model = animal_model();
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["animal", "--wings"]).unwrap_err(),
            ParseError::UnknownOption("--wings".into())
        );
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["animal", "4", "5"]).unwrap_err(),
            ParseError::CouldNotMatchArgument("5".into())
        );
    }

    #[test]
    fn test_relaxed_collects_unknown_tokens() {
        let model = animal_model();
        let result = parse(
            &model,
            ParsingMode::Relaxed,
            &["animal", "--wings", "2", "4", "5", "--", "--raw"],
        )
        .unwrap();

        assert_eq!(
            result.unmatched,
            vec![
                UnmatchedToken {
                    token: "--wings".into(),
                    value: Some("2".into())
                },
                UnmatchedToken {
                    token: "5".into(),
                    value: None
                },
            ]
        );
        assert_eq!(result.value_of(&model, "legs"), Some(&text(&["4"])[..]));
        assert_eq!(result.remaining, vec!["--raw".to_string()]);
    }

    #[test]
    fn test_branch_requires_subcommand() {
        let model = animal_model();
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["pets"]).unwrap_err(),
            ParseError::BranchRequiresSubcommand("pets".into())
        );
        assert_eq!(
            parse(&model, ParsingMode::Relaxed, &["pets", "4", "horse"]).unwrap_err(),
            ParseError::UnknownCommand("horse".into())
        );
    }

    #[test]
    fn test_missing_required_argument() {
        let model = animal_model();
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["pets", "dog"]).unwrap_err(),
            ParseError::MissingRequiredArgument {
                command: "dog".into(),
                argument: "AGE".into()
            }
        );
    }

    fn kennel_model() -> CommandModel {
        let kennel = Arc::new(
            SettingsShape::new("KennelSettings").with_option(
                OptionDecl::new("name", "-n|--name <NAME>", ValueType::String).required(),
            ),
        );
        let dog = Arc::new(
            SettingsShape::new("DogSettings").with_option(
                OptionDecl::new("name", "--name <NAME>", ValueType::String).allow_redeclare(),
            ),
        );

        let mut configuration = Configuration::new();
        configuration.add_command(
            CommandDeclaration::branch_with_settings("kennel", kennel)
                .with_child(CommandDeclaration::new("dog", dog)),
        );
        build(&configuration, &AppSettings::default()).unwrap()
    }

    #[test]
    fn test_missing_required_option() {
        let model = kennel_model();
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["kennel", "dog"]).unwrap_err(),
            ParseError::MissingRequiredOption {
                command: "kennel".into(),
                option: "--name".into()
            }
        );
    }

    #[test]
    fn test_redeclared_option_satisfies_required_ancestor() {
        let model = kennel_model();
        let result = parse(&model, ParsingMode::Strict, &["kennel", "dog", "--name", "Rex"]).unwrap();

        let dog = result.command;
        assert_eq!(result.bindings.len(), 1);
        assert_eq!(result.bindings[0].parameter.node, dog);
        assert_eq!(result.value_of(&model, "name"), Some(&text(&["Rex"])[..]));

        // The short name only exists on the ancestor.
        let result = parse(&model, ParsingMode::Strict, &["kennel", "dog", "-n", "Fido"]).unwrap();
        assert_ne!(result.bindings[0].parameter.node, dog);
    }

    #[test]
    fn test_map_argument_is_deconstructed() {
        let shape = SettingsShape::new("RunSettings").with_argument(ArgumentDecl::new(
            "env",
            0,
            "[ENV]",
            ValueType::Map(Box::new(ValueType::String), Box::new(ValueType::String)),
        ));
        let mut configuration = Configuration::new();
        configuration.add_command(CommandDeclaration::new("run", Arc::new(shape)));
        let model = build(&configuration, &AppSettings::default()).unwrap();

        let result = parse(&model, ParsingMode::Strict, &["run", "a=b", "c=d=e"]).unwrap();
        assert_eq!(
            result.value_of(&model, "env"),
            Some(
                &[
                    RawValue::Pair {
                        key: "a".into(),
                        value: "b".into()
                    },
                    RawValue::Pair {
                        key: "c".into(),
                        value: "d=e".into()
                    },
                ][..]
            )
        );

        let err = parse(&model, ParsingMode::Strict, &["run", "plain"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPair { option, .. } if option == "ENV"));
    }

    #[test]
    fn test_unknown_and_missing_command() {
        let model = animal_model();
        assert_eq!(
            parse(&model, ParsingMode::Strict, &["horse"]).unwrap_err(),
            ParseError::UnknownCommand("horse".into())
        );
        assert_eq!(
            parse(&model, ParsingMode::Strict, &[] as &[&str]).unwrap_err(),
            ParseError::NoCommandSpecified
        );
    }

    #[test]
    fn test_parser_is_reusable() {
        let model = animal_model();
        let parser = TreeParser::new(&model, ParsingMode::Strict);
        let first = parser.parse(&["animal", "1"]).unwrap();
        let second = parser.parse(&["animal", "2"]).unwrap();
        assert_ne!(first, second);
        assert_eq!(parser.parse(&["animal", "1"]).unwrap(), first);
    }
}

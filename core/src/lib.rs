//! Command model building, validation, parsing, and settings activation.
//!
//! This crate models a command-line application as a tree of commands:
//!
//! - [`SettingsShape`] — a settings type with its options and arguments,
//!   optionally deriving from a base shape.
//! - [`Configuration`] / [`CommandDeclaration`] — the raw command tree, built
//!   in code or adapted from a YAML/JSON [`ModelDeclaration`].
//! - [`CommandModel`] — the normalized, validated tree produced by
//!   [`build`]. Parameters inherited from ancestor commands are not
//!   repeated on descendants.
//! - [`TreeParser`] — resolves a command from raw tokens and binds raw values
//!   to its parameters, in strict or relaxed [`ParsingMode`].
//! - [`activate`] — converts bound values and drives a [`SettingsFactory`]
//!   to produce a [`CommandSettings`] instance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use command_model_core::*;
//!
//! let animal = Arc::new(
//!     SettingsShape::new("AnimalSettings")
//!         .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
//!         .with_argument(ArgumentDecl::new("legs", 1, "[LEGS]", ValueType::Integer)),
//! );
//! let mut configuration = Configuration::new().with_application_name("zoo");
//! configuration.add_command(CommandDeclaration::new("animal", animal));
//!
//! let settings = AppSettings {
//!     strict_parsing: true,
//!     ..Default::default()
//! };
//! let model = build(&configuration, &settings).unwrap();
//!
//! let result = TreeParser::new(&model, settings.parsing_mode())
//!     .parse(&["animal", "-a", "4"])
//!     .unwrap();
//! let instance = activate(&model, &result, &TypeRegistry::new()).unwrap();
//! let instance = instance.downcast_ref::<DynamicSettings>().unwrap();
//!
//! assert_eq!(instance.get("alive"), Some(&Value::Bool(true)));
//! assert_eq!(instance.get("legs"), Some(&Value::Integer(4)));
//! ```

mod activate;
mod builder;
mod config;
mod declaration;
mod error;
pub mod parser;
mod settings;
mod template;
mod types;
mod validate;
mod value;

pub use activate::{DependencyKey, TypeRegistry, TypeResolver, activate};
pub use builder::{CommandDeclaration, Configuration, build};
pub use config::{
    AppSettings, PROPAGATE_EXCEPTIONS_ENV, ParsingMode, STRICT_PARSING_ENV, VALIDATE_EXAMPLES_ENV,
};
pub use declaration::{
    ArgumentEntry, CommandEntry, DefaultValue, ModelDeclaration, OptionEntry, ParameterEntry,
    ShapeEntry,
};
pub use error::{ConfigurationError, ConversionError, Error, ParseError};
pub use parser::{ParseResult, TreeParser};
pub use settings::{
    ArgumentDecl, CommandSettings, ConstructorArg, ConstructorArgs, ConstructorParam,
    DynamicSettings, OptionDecl, ParameterDecl, SettingsFactory, SettingsShape,
};
pub use template::{ArgumentTemplate, OptionTemplate, parse_argument_template, parse_option_template};
pub use types::*;
pub use validate::validate;
pub use value::{Converter, PairDeconstructor, Value, ValueType, convert, split_key_value};

//! Error types for model construction, parsing, and settings activation.
//!
//! Errors fall into two families: [`ConfigurationError`] covers everything
//! that can go wrong while building and validating a [`CommandModel`], and
//! is always fatal to startup. [`ParseError`] covers a single parse
//! invocation and is recoverable by the caller. [`ConversionError`] is the
//! parse-time sub-kind raised when a raw value cannot be converted.
//!
//! [`CommandModel`]: crate::CommandModel

use thiserror::Error;

/// Build-time and validation-time errors.
///
/// Each variant describes a specific structural problem with the declared
/// command model. The `Display` impl provides a human-readable message.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Neither a command nor a default command was configured.
    #[error("no commands have been configured")]
    NoCommandConfigured,
    /// An alias or name is used by more than one sibling command.
    #[error("the name '{alias}' of '{command}' conflicts with another command")]
    CommandNameConflict { command: String, alias: String },
    /// Two options of the same command share a short or long name.
    #[error("options {} are duplicated in command '{command}'", .options.join(", "))]
    DuplicateOption {
        command: String,
        options: Vec<String>,
    },
    /// A branch command was declared without any child commands.
    #[error("the branch '{command}' does not define any commands")]
    BranchHasNoChildren { command: String },
    /// More than one vector argument was declared for a command.
    #[error("the command '{command}' specifies more than one vector argument")]
    TooManyVectorArguments { command: String },
    /// A vector argument was not the last argument of its command.
    #[error("the vector argument of command '{command}' is not specified last")]
    VectorArgumentNotSpecifiedLast { command: String },
    /// A required argument also declared a default value.
    #[error("the required argument '{argument}' cannot have a default value")]
    RequiredArgumentsCannotHaveDefaultValue { argument: String },
    /// An option declared both a pair deconstructor and a converter.
    #[error("the option '{option}' has both a pair deconstructor and a type converter")]
    OptionBothHasPairDeconstructorAndTypeParameter { option: String },
    /// An option declared a pair deconstructor for a non-pair value type.
    #[error("the option '{option}' has a pair deconstructor but its type does not support deconstruction")]
    OptionTypeDoesNotSupportDeconstruction { option: String },
    /// An option with an optional value does not have a flag-value type.
    #[error("the option '{option}' has an optional value but is not a flag value")]
    OptionalOptionValueMustBeFlagWithValue { option: String },
    /// An option template could not be parsed.
    #[error("invalid option template '{template}': {reason}")]
    InvalidOptionTemplate { template: String, reason: String },
    /// An argument template could not be parsed.
    #[error("invalid argument template '{template}': {reason}")]
    InvalidArgumentTemplate { template: String, reason: String },
    /// A command referenced a settings shape that was never declared.
    #[error("unknown settings shape '{0}'")]
    UnknownSettingsShape(String),
    /// A declaration named a converter that was never registered.
    #[error("unknown converter '{0}'")]
    UnknownConverter(String),
    /// A declared default value could not be converted to the parameter type.
    #[error("invalid default value for '{parameter}': {reason}")]
    InvalidDefaultValue { parameter: String, reason: String },
    /// The dependency resolver returned nothing for a required dependency.
    #[error("could not resolve dependency of type '{type_name}'")]
    MissingDependency { type_name: String },
    /// A settings factory refused to construct an instance.
    #[error("could not create settings '{settings}': {reason}")]
    SettingsActivation { settings: String, reason: String },
    /// A declared example failed to parse in strict mode.
    #[error("validation of example '{}' failed: {source}", .example.join(" "))]
    ExampleValidationFailed {
        example: Vec<String>,
        #[source]
        source: Box<ParseError>,
    },
    /// File I/O failure while loading a declaration or settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised when a raw token value cannot be converted to its parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to convert '{value}' for '{parameter}': {reason}")]
pub struct ConversionError {
    /// Property name of the offending parameter.
    pub parameter: String,
    /// The raw value that failed conversion.
    pub value: String,
    /// Why conversion failed.
    pub reason: String,
}

/// Per-invocation parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No command was given and no default command exists.
    #[error("no command was specified")]
    NoCommandSpecified,
    /// A token did not match any command at the current level.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// An option was not recognized by the command or its ancestors.
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    /// An option that requires a value was given none.
    #[error("option '{0}' is defined but no value has been provided")]
    OptionHasNoValue(String),
    /// A flag received a value it cannot accept.
    #[error("flag '{option}' does not accept the value '{value}'")]
    InvalidFlagValue { option: String, value: String },
    /// A token could not be matched to any argument.
    #[error("could not match '{0}' with an argument")]
    CouldNotMatchArgument(String),
    /// A pair-deconstructable option or argument received a malformed pair.
    #[error("could not deconstruct '{value}' for '{option}': {reason}")]
    InvalidPair {
        option: String,
        value: String,
        reason: String,
    },
    /// A required argument was not provided.
    #[error("command '{command}' is missing required argument '{argument}'")]
    MissingRequiredArgument { command: String, argument: String },
    /// A required option was not provided.
    #[error("command '{command}' is missing required option '{option}'")]
    MissingRequiredOption { command: String, option: String },
    /// The resolved command is a branch and needs a child command.
    #[error("command '{0}' requires a subcommand")]
    BranchRequiresSubcommand(String),
    /// A raw value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Top-level error for the whole pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The model or its collaborators are misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The supplied tokens could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        Self::Parse(ParseError::Conversion(err))
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

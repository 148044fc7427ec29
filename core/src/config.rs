//! Application settings that steer building and parsing.
//!
//! Settings can be built in code, loaded from YAML, or embedded in a model
//! declaration file. Boolean toggles can also be switched on through
//! environment variables.
//!
//! # Example YAML
//!
//! ```yaml
//! application_name: zoo
//! strict_parsing: true
//! validate_examples: true
//! propagate_exceptions: false
//! ```

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Environment variable that forces strict parsing when set to `true`.
pub const STRICT_PARSING_ENV: &str = "CMDMODEL_STRICT_PARSING";
/// Environment variable that forces example validation when set to `true`.
pub const VALIDATE_EXAMPLES_ENV: &str = "CMDMODEL_VALIDATE_EXAMPLES";
/// Environment variable that forces error propagation when set to `true`.
pub const PROPAGATE_EXCEPTIONS_ENV: &str = "CMDMODEL_PROPAGATE_EXCEPTIONS";

/// Parsing strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMode {
    /// Unknown options and surplus tokens are errors.
    Strict,
    /// Unknown options and surplus tokens are collected separately.
    #[default]
    Relaxed,
}

/// Build and parse toggles.
///
/// # Examples
///
/// ```
/// use command_model_core::{AppSettings, ParsingMode};
///
/// let settings = AppSettings {
///     strict_parsing: true,
///     ..Default::default()
/// };
/// assert_eq!(settings.parsing_mode(), ParsingMode::Strict);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Overrides the application name declared in the configuration.
    pub application_name: Option<String>,
    /// Parse in [`ParsingMode::Strict`].
    pub strict_parsing: bool,
    /// Parse every declared example while validating the model.
    pub validate_examples: bool,
    /// Let parse errors escape to the host instead of being reported.
    pub propagate_exceptions: bool,
}

impl AppSettings {
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](ConfigurationError::Io) if the file cannot be read, or
    /// [`Yaml`](ConfigurationError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings = serde_yaml::from_reader(reader)?;
        Ok(settings)
    }

    /// Returns `true` if the selected toggle is set, or if
    /// `environment_variable` is set to `true` (case-insensitive).
    pub fn is_true(&self, select: impl Fn(&Self) -> bool, environment_variable: &str) -> bool {
        self.is_true_with(select, environment_variable, |name| std::env::var(name).ok())
    }

    fn is_true_with(
        &self,
        select: impl Fn(&Self) -> bool,
        environment_variable: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> bool {
        if select(self) {
            return true;
        }

        lookup(environment_variable)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn parsing_mode(&self) -> ParsingMode {
        if self.is_true(|s| s.strict_parsing, STRICT_PARSING_ENV) {
            ParsingMode::Strict
        } else {
            ParsingMode::Relaxed
        }
    }

    pub fn should_validate_examples(&self) -> bool {
        self.is_true(|s| s.validate_examples, VALIDATE_EXAMPLES_ENV)
    }

    pub fn should_propagate_exceptions(&self) -> bool {
        self.is_true(|s| s.propagate_exceptions, PROPAGATE_EXCEPTIONS_ENV)
    }
}

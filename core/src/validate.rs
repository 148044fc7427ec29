//! Command model validation.
//!
//! Proves the structural invariants the parser relies on: the tree is not
//! empty, sibling names are unambiguous, options are unique per command,
//! vector arguments come last, and every declared example still parses.
//! Validation stops at the first violation and never mutates the model.
//!
//! # Examples
//!
//! ```
//! use command_model_core::*;
//!
//! let mut configuration = Configuration::new();
//! configuration.add_command(CommandDeclaration::branch("animals"));
//!
//! let err = build(&configuration, &AppSettings::default()).unwrap_err();
//! assert!(matches!(err, ConfigurationError::BranchHasNoChildren { .. }));
//! ```

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::debug;

use crate::config::{AppSettings, ParsingMode};
use crate::error::ConfigurationError;
use crate::parser::TreeParser;
use crate::types::{CommandModel, NodeId, ParameterKind};

/// Validates a built command model.
///
/// Checks run tree-wide first, then per node with the default command
/// first and every other node depth-first, then (when enabled) every
/// declared example is parsed in strict mode.
///
/// # Errors
///
/// Returns the first [`ConfigurationError`] encountered.
pub fn validate(model: &CommandModel, settings: &AppSettings) -> Result<(), ConfigurationError> {
    if model.commands().is_empty() && model.default_command().is_none() {
        return Err(ConfigurationError::NoCommandConfigured);
    }

    validate_names(model, model.commands())?;

    if let Some(default) = model.default_command() {
        validate_command(model, default)?;
    }
    for id in model.commands() {
        validate_command(model, *id)?;
    }

    if settings.should_validate_examples() {
        validate_examples(model)?;
    }

    Ok(())
}

fn validate_names(model: &CommandModel, siblings: &[NodeId]) -> Result<(), ConfigurationError> {
    for id in siblings {
        let command = model.node(*id);
        for alias in &command.aliases {
            if siblings
                .iter()
                .any(|s| model.node(*s).name.eq_ignore_ascii_case(alias))
            {
                return Err(ConfigurationError::CommandNameConflict {
                    command: command.name.clone(),
                    alias: alias.clone(),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for id in siblings {
        let command = model.node(*id);
        for name in std::iter::once(&command.name).chain(command.aliases.iter()) {
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigurationError::CommandNameConflict {
                    command: command.name.clone(),
                    alias: name.clone(),
                });
            }
        }
    }

    for id in siblings {
        validate_names(model, &model.node(*id).children)?;
    }

    Ok(())
}

fn validate_command(model: &CommandModel, id: NodeId) -> Result<(), ConfigurationError> {
    let command = model.node(id);

    let duplicates = duplicate_options(model, id);
    if !duplicates.is_empty() {
        return Err(ConfigurationError::DuplicateOption {
            command: command.name.clone(),
            options: duplicates,
        });
    }

    if command.is_branch && command.children.is_empty() {
        return Err(ConfigurationError::BranchHasNoChildren {
            command: command.name.clone(),
        });
    }

    let arguments = command.arguments();
    let vectors = arguments
        .iter()
        .filter(|(_, a)| a.kind == ParameterKind::Vector)
        .count();
    if vectors > 1 {
        return Err(ConfigurationError::TooManyVectorArguments {
            command: command.name.clone(),
        });
    }
    if vectors == 1 {
        if let Some((_, last)) = arguments.last() {
            if last.kind != ParameterKind::Vector {
                return Err(ConfigurationError::VectorArgumentNotSpecifiedLast {
                    command: command.name.clone(),
                });
            }
        }
    }

    for (_, argument) in &arguments {
        if argument.required && argument.default_value.is_some() {
            return Err(ConfigurationError::RequiredArgumentsCannotHaveDefaultValue {
                argument: argument.value_name.clone(),
            });
        }
    }

    for (_, option) in command.options() {
        if option.value_type.is_pair_deconstructable() {
            if option.pair_deconstructor.is_some() && option.converter.is_some() {
                return Err(
                    ConfigurationError::OptionBothHasPairDeconstructorAndTypeParameter {
                        option: option.display_name(),
                    },
                );
            }
        } else if option.pair_deconstructor.is_some() {
            return Err(ConfigurationError::OptionTypeDoesNotSupportDeconstruction {
                option: option.display_name(),
            });
        }

        if option.kind == ParameterKind::FlagWithValue && !option.is_flag_value() {
            return Err(ConfigurationError::OptionalOptionValueMustBeFlagWithValue {
                option: option.display_name(),
            });
        }
    }

    for child in &command.children {
        validate_command(model, *child)?;
    }

    Ok(())
}

/// Option names used more than once in a command's scope, in sorted order.
///
/// The scope covers the options of every ancestor, minus those hidden by a
/// deeper redeclaration of the same property. Names are compared
/// case-insensitively, matching how the parser looks them up.
fn duplicate_options(model: &CommandModel, id: NodeId) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut redeclared: HashSet<String> = HashSet::new();
    for (_, _, parameter) in model.parameters_in_scope(id).into_iter().rev() {
        let Some(option) = parameter.as_option() else {
            continue;
        };
        let property = option.property.to_lowercase();
        if redeclared.contains(&property) {
            continue;
        }
        if option.is_shadowed {
            redeclared.insert(property);
        }

        let shorts = option.short_names.iter().map(|n| format!("-{}", n.to_lowercase()));
        let longs = option.long_names.iter().map(|n| format!("--{}", n.to_lowercase()));
        for key in shorts.chain(longs) {
            *counts.entry(key).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect()
}

fn validate_examples(model: &CommandModel) -> Result<(), ConfigurationError> {
    let mut examples: Vec<&Vec<String>> = model.examples.iter().collect();

    let mut queue: VecDeque<NodeId> = model
        .default_command()
        .into_iter()
        .chain(model.commands().iter().copied())
        .collect();
    while let Some(id) = queue.pop_front() {
        let command = model.node(id);
        examples.extend(command.examples.iter());
        queue.extend(command.children.iter().copied());
    }

    let parser = TreeParser::new(model, ParsingMode::Strict);
    for example in examples {
        debug!(example = ?example, "Validating example");
        parser
            .parse(example)
            .map_err(|err| ConfigurationError::ExampleValidationFailed {
                example: example.clone(),
                source: Box::new(err),
            })?;
    }

    Ok(())
}

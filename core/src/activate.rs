//! Turns a [`ParseResult`] into a populated settings instance.
//!
//! Activation converts every bound raw value to its parameter type, falls
//! back to declared defaults, then drives the command's [`SettingsFactory`]
//! in two phases:
//!
//! 1. Each constructor parameter is satisfied from the value with the same
//!    name, or else from a [`TypeResolver`].
//! 2. Every value not consumed by the constructor is assigned to its
//!    property.
//!
//! Assignment is not transactional. If assigning one property fails, the
//! partially populated instance is dropped and the error is returned.
//!
//! [`SettingsFactory`]: crate::SettingsFactory

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigurationError, ConversionError, Result};
use crate::parser::{ParameterRef, ParseResult, RawValue};
use crate::settings::{CommandSettings, ConstructorArg, ConstructorArgs};
use crate::types::{CommandModel, Parameter};
use crate::value::{Value, ValueType, convert};

/// Identifies a type that a [`TypeResolver`] can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DependencyKey {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Supplies dependencies to settings constructors.
///
/// Implemented for [`TypeRegistry`] and for any closure of the shape
/// `Fn(&DependencyKey) -> Option<Arc<dyn Any + Send + Sync>>`.
pub trait TypeResolver {
    fn resolve(&self, key: &DependencyKey) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl<F> TypeResolver for F
where
    F: Fn(&DependencyKey) -> Option<Arc<dyn Any + Send + Sync>>,
{
    fn resolve(&self, key: &DependencyKey) -> Option<Arc<dyn Any + Send + Sync>> {
        self(key)
    }
}

/// A resolver backed by registered shared instances.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_model_core::{DependencyKey, TypeRegistry, TypeResolver};
///
/// let mut registry = TypeRegistry::new();
/// registry.register_instance(Arc::new(42u32));
///
/// let resolved = registry.resolve(&DependencyKey::of::<u32>()).unwrap();
/// assert_eq!(resolved.downcast_ref::<u32>(), Some(&42));
/// assert!(registry.resolve(&DependencyKey::of::<String>()).is_none());
/// ```
#[derive(Clone, Default)]
pub struct TypeRegistry {
    instances: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared instance, replacing any earlier one of the same type.
    pub fn register_instance<T: Any + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        self.instances.insert(TypeId::of::<T>(), instance);
        self
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, key: &DependencyKey) -> Option<Arc<dyn Any + Send + Sync>> {
        self.instances.get(&key.type_id).cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// Builds the settings instance for the command resolved by `result`.
///
/// # Errors
///
/// Returns [`ConversionError`] (wrapped in a parse error) when a bound value
/// cannot be converted or assigned,
/// [`MissingDependency`](ConfigurationError::MissingDependency) when the
/// resolver cannot supply a constructor dependency, and
/// [`SettingsActivation`](ConfigurationError::SettingsActivation) when the
/// factory fails.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_model_core::*;
/// use command_model_core::parser::TreeParser;
///
/// let shape = Arc::new(
///     SettingsShape::new("AnimalSettings")
///         .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
///         .with_argument(ArgumentDecl::new("legs", 0, "[LEGS]", ValueType::Integer)),
/// );
/// let mut configuration = Configuration::new();
/// configuration.add_command(CommandDeclaration::new("animal", shape));
/// let model = build(&configuration, &AppSettings::default()).unwrap();
///
/// let result = TreeParser::new(&model, ParsingMode::Strict)
///     .parse(&["animal", "4"])
///     .unwrap();
/// let settings = activate(&model, &result, &TypeRegistry::new()).unwrap();
/// let settings = settings.downcast_ref::<DynamicSettings>().unwrap();
/// assert_eq!(settings.get("legs"), Some(&Value::Integer(4)));
/// assert_eq!(settings.get("alive"), Some(&Value::Bool(false)));
/// ```
pub fn activate(
    model: &CommandModel,
    result: &ParseResult,
    resolver: &dyn TypeResolver,
) -> Result<Box<dyn CommandSettings>> {
    let node = model.node(result.command);
    let values = collect_values(model, result)?;
    let factory = node.settings.factory();

    let mut args = ConstructorArgs::default();
    let mut consumed = HashSet::new();
    for param in factory.constructor() {
        if let Some((property, value)) = values
            .iter()
            .find(|(property, _)| property.eq_ignore_ascii_case(&param.name))
        {
            args.push(&param.name, ConstructorArg::Value(value.clone()));
            consumed.insert(property.to_lowercase());
            continue;
        }

        match &param.dependency {
            Some(key) => {
                let instance = resolver.resolve(key).ok_or_else(|| {
                    ConfigurationError::MissingDependency {
                        type_name: key.type_name().to_string(),
                    }
                })?;
                args.push(&param.name, ConstructorArg::Dependency(instance));
            }
            None => args.push(&param.name, ConstructorArg::Value(None)),
        }
    }

    debug!(
        settings = node.settings.name(),
        constructor_args = args.len(),
        "Constructing settings"
    );
    let mut settings = factory
        .construct(args)
        .map_err(|reason| ConfigurationError::SettingsActivation {
            settings: node.settings.name().to_string(),
            reason,
        })?;

    for (property, value) in values {
        if consumed.contains(&property.to_lowercase()) {
            continue;
        }
        let Some(value) = value else {
            continue;
        };
        let shown = describe(&value);
        settings
            .assign(&property, value)
            .map_err(|reason| ConversionError {
                parameter: property.clone(),
                value: shown,
                reason,
            })?;
    }

    Ok(settings)
}

/// Converted value per property, walking the scope from the root down.
///
/// A binding on a deeper command replaces one on a shallower command; an
/// unbound parameter never replaces a value that is already present.
fn collect_values(
    model: &CommandModel,
    result: &ParseResult,
) -> std::result::Result<Vec<(String, Option<Value>)>, ConversionError> {
    let mut values: Vec<(String, Option<Value>)> = Vec::new();

    for (node, index, parameter) in model.parameters_in_scope(result.command) {
        let bound = result
            .binding(ParameterRef { node, index })
            .map(|binding| convert_binding(parameter, &binding.values))
            .transpose()?;

        let slot = values
            .iter_mut()
            .find(|(property, _)| parameter.has_same_property(property));
        match (slot, bound) {
            (Some(slot), Some(value)) => slot.1 = Some(value),
            (Some(slot), None) => {
                if slot.1.is_none() {
                    slot.1 = fallback(parameter);
                }
            }
            (None, bound) => values.push((
                parameter.property().to_string(),
                bound.or_else(|| fallback(parameter)),
            )),
        }
    }

    Ok(values)
}

fn fallback(parameter: &Parameter) -> Option<Value> {
    if let Some(default) = parameter.default_value() {
        return Some(default.clone());
    }
    match parameter.value_type() {
        ValueType::FlagValue(_) => Some(Value::unset_flag()),
        ValueType::Bool if parameter.as_option().is_some() => Some(Value::Bool(false)),
        _ => None,
    }
}

fn convert_binding(
    parameter: &Parameter,
    raw: &[RawValue],
) -> std::result::Result<Value, ConversionError> {
    match parameter.value_type() {
        ValueType::List(inner) => raw
            .iter()
            .map(|value| convert_element(parameter, inner, value))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::List),
        ValueType::Map(key_type, value_type) => raw
            .iter()
            .map(|value| match value {
                RawValue::Pair { key, value } => Ok((
                    convert_scalar(parameter, key_type, key, false)?,
                    convert_scalar(parameter, value_type, value, true)?,
                )),
                other => Err(conversion_error(
                    parameter,
                    other,
                    "expected a KEY=VALUE pair".to_string(),
                )),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Map),
        value_type => match raw.last() {
            Some(value) => convert_element(parameter, value_type, value),
            None => Err(conversion_error(
                parameter,
                &RawValue::Present,
                "no value was bound".to_string(),
            )),
        },
    }
}

fn convert_element(
    parameter: &Parameter,
    value_type: &ValueType,
    raw: &RawValue,
) -> std::result::Result<Value, ConversionError> {
    match (value_type, raw) {
        (ValueType::FlagValue(_), RawValue::Present) => Ok(Value::FlagValue {
            is_set: true,
            value: None,
        }),
        (ValueType::FlagValue(inner), RawValue::Text(text)) => Ok(Value::FlagValue {
            is_set: true,
            value: Some(Box::new(convert_scalar(parameter, inner, text, true)?)),
        }),
        (_, RawValue::Text(text)) => convert_scalar(parameter, value_type, text, true),
        (_, other) => Err(conversion_error(
            parameter,
            other,
            format!("expected a {value_type} value"),
        )),
    }
}

fn convert_scalar(
    parameter: &Parameter,
    value_type: &ValueType,
    text: &str,
    use_converter: bool,
) -> std::result::Result<Value, ConversionError> {
    let converted = match parameter.converter() {
        Some(converter) if use_converter => converter.convert(text),
        _ => convert(value_type, text),
    };
    converted.map_err(|reason| ConversionError {
        parameter: parameter.property().to_string(),
        value: text.to_string(),
        reason,
    })
}

fn conversion_error(parameter: &Parameter, raw: &RawValue, reason: String) -> ConversionError {
    let value = match raw {
        RawValue::Text(text) => text.clone(),
        RawValue::Pair { key, value } => format!("{key}={value}"),
        RawValue::Present => String::new(),
    };
    ConversionError {
        parameter: parameter.property().to_string(),
        value,
        reason,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

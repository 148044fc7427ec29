//! Settings shapes and the two-phase settings construction contract.
//!
//! A [`SettingsShape`] is the identity parameters bind onto. It lists its
//! own parameter declarations and optionally names a base shape whose
//! parameters it inherits. A [`SettingsFactory`] turns bound values into a
//! [`CommandSettings`] instance in two phases: construct with resolved
//! constructor arguments, then assign the remaining properties.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::activate::DependencyKey;
use crate::value::{Converter, PairDeconstructor, Value, ValueType};

/// Declaration of an option slot on a settings shape.
#[derive(Debug, Clone)]
pub struct OptionDecl {
    pub property: String,
    /// Template such as `-a|--alive` or `--name <NAME>`.
    pub template: String,
    pub value_type: ValueType,
    pub description: Option<String>,
    pub converter: Option<Converter>,
    pub pair_deconstructor: Option<PairDeconstructor>,
    pub default_value: Option<Value>,
    pub required: bool,
    /// Keep this option even when an ancestor command already declares it.
    pub allow_redeclare: bool,
}

impl OptionDecl {
    pub fn new(property: &str, template: &str, value_type: ValueType) -> Self {
        Self {
            property: property.to_string(),
            template: template.to_string(),
            value_type,
            description: None,
            converter: None,
            pair_deconstructor: None,
            default_value: None,
            required: false,
            allow_redeclare: false,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_pair_deconstructor(mut self, deconstructor: PairDeconstructor) -> Self {
        self.pair_deconstructor = Some(deconstructor);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_redeclare(mut self) -> Self {
        self.allow_redeclare = true;
        self
    }
}

/// Declaration of a positional argument slot on a settings shape.
#[derive(Debug, Clone)]
pub struct ArgumentDecl {
    pub property: String,
    /// Declared position; only the relative order matters.
    pub position: usize,
    /// Template such as `<NAME>` (required) or `[NAME]` (optional).
    pub template: String,
    pub value_type: ValueType,
    pub description: Option<String>,
    pub converter: Option<Converter>,
    pub default_value: Option<Value>,
}

impl ArgumentDecl {
    pub fn new(property: &str, position: usize, template: &str, value_type: ValueType) -> Self {
        Self {
            property: property.to_string(),
            position,
            template: template.to_string(),
            value_type,
            description: None,
            converter: None,
            default_value: None,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// One declared slot, in declaration order.
#[derive(Debug, Clone)]
pub enum ParameterDecl {
    Option(OptionDecl),
    Argument(ArgumentDecl),
}

/// A settings type: its own parameter group plus an optional base shape.
///
/// Shapes compare by name; two shapes with the same name are the same type.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_model_core::*;
///
/// let animal = Arc::new(
///     SettingsShape::new("AnimalSettings")
///         .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool)),
/// );
/// let dog = SettingsShape::new("DogSettings")
///     .with_base(animal)
///     .with_option(OptionDecl::new("good_boy", "-g|--good-boy", ValueType::Bool));
///
/// let names: Vec<&str> = dog.lineage().map(|s| s.name()).collect();
/// assert_eq!(names, vec!["DogSettings", "AnimalSettings"]);
/// ```
#[derive(Clone)]
pub struct SettingsShape {
    name: String,
    description: Option<String>,
    base: Option<Arc<SettingsShape>>,
    parameters: Vec<ParameterDecl>,
    factory: Arc<dyn SettingsFactory>,
}

impl SettingsShape {
    /// Creates a shape backed by [`DynamicSettings`].
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            base: None,
            parameters: Vec::new(),
            factory: Arc::new(DynamicSettingsFactory {
                shape: name.to_string(),
            }),
        }
    }

    /// The parameterless shape used by branch commands.
    pub fn empty() -> Self {
        Self::new("EmptySettings")
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_base(mut self, base: Arc<SettingsShape>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_option(mut self, option: OptionDecl) -> Self {
        self.parameters.push(ParameterDecl::Option(option));
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDecl) -> Self {
        self.parameters.push(ParameterDecl::Argument(argument));
        self
    }

    pub fn with_factory(mut self, factory: impl SettingsFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base(&self) -> Option<&SettingsShape> {
        self.base.as_deref()
    }

    /// Parameters declared directly on this shape.
    pub fn parameters(&self) -> &[ParameterDecl] {
        &self.parameters
    }

    pub fn factory(&self) -> &dyn SettingsFactory {
        self.factory.as_ref()
    }

    /// This shape followed by each base shape, most-derived first.
    pub fn lineage(&self) -> impl Iterator<Item = &SettingsShape> {
        std::iter::successors(Some(self), |shape| shape.base())
    }

    /// Returns `true` if both shapes are the same type.
    pub fn is_same(&self, other: &SettingsShape) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for SettingsShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsShape")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name.as_str()))
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

/// A populated settings instance.
pub trait CommandSettings: Any + fmt::Debug {
    /// Assigns a converted value to a property slot.
    fn assign(&mut self, property: &str, value: Value) -> Result<(), String>;

    fn as_any(&self) -> &dyn Any;

    /// JSON view of the instance, for hosts that print settings.
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }
}

impl dyn CommandSettings {
    /// Downcasts to a concrete settings type.
    pub fn downcast_ref<T: CommandSettings>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A constructor parameter of a settings type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorParam {
    pub name: String,
    /// Type used to resolve the parameter when no declared parameter has
    /// the same name.
    pub dependency: Option<DependencyKey>,
}

impl ConstructorParam {
    /// A parameter satisfied from a bound value with the same name.
    pub fn value(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependency: None,
        }
    }

    /// A parameter satisfied by the dependency resolver.
    pub fn dependency<T: Any>(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependency: Some(DependencyKey::of::<T>()),
        }
    }
}

/// A resolved constructor argument.
#[derive(Clone)]
pub enum ConstructorArg {
    /// Converted bound value, or its default, or nothing.
    Value(Option<Value>),
    Dependency(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Dependency(_) => f.write_str("Dependency(..)"),
        }
    }
}

/// Constructor arguments, in constructor order.
#[derive(Debug, Default)]
pub struct ConstructorArgs {
    args: Vec<(String, ConstructorArg)>,
}

impl ConstructorArgs {
    pub(crate) fn push(&mut self, name: &str, arg: ConstructorArg) {
        self.args.push((name.to_string(), arg));
    }

    fn find(&self, name: &str) -> Option<&ConstructorArg> {
        self.args
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, arg)| arg)
    }

    /// Returns the value argument called `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.find(name) {
            Some(ConstructorArg::Value(value)) => value.as_ref(),
            _ => None,
        }
    }

    /// Returns the dependency argument called `name` as `T`.
    pub fn dependency<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, String> {
        match self.find(name) {
            Some(ConstructorArg::Dependency(instance)) => Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_| format!("dependency '{name}' has an unexpected type")),
            Some(ConstructorArg::Value(_)) => Err(format!("'{name}' is not a dependency")),
            None => Err(format!("no constructor argument named '{name}'")),
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Creates settings instances for a shape.
pub trait SettingsFactory: Send + Sync {
    /// Constructor parameters, in order. Defaults to none.
    fn constructor(&self) -> Vec<ConstructorParam> {
        Vec::new()
    }

    /// Builds the instance from resolved constructor arguments.
    fn construct(&self, args: ConstructorArgs) -> Result<Box<dyn CommandSettings>, String>;
}

/// Settings stored as a property map.
///
/// Used for every shape that does not install its own factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicSettings {
    shape: String,
    values: BTreeMap<String, Value>,
}

impl DynamicSettings {
    pub fn new(shape: &str) -> Self {
        Self {
            shape: shape.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl CommandSettings for DynamicSettings {
    fn assign(&mut self, property: &str, value: Value) -> Result<(), String> {
        self.values.insert(property.to_string(), value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.values).ok()
    }
}

struct DynamicSettingsFactory {
    shape: String,
}

impl SettingsFactory for DynamicSettingsFactory {
    fn construct(&self, _args: ConstructorArgs) -> Result<Box<dyn CommandSettings>, String> {
        Ok(Box::new(DynamicSettings::new(&self.shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_settings_assign() {
        let mut settings = DynamicSettings::new("AnimalSettings");
        settings.assign("legs", Value::Integer(4)).unwrap();
        assert_eq!(settings.get("legs"), Some(&Value::Integer(4)));
        assert_eq!(
            settings.to_json(),
            Some(serde_json::json!({ "legs": 4 }))
        );
    }

    #[test]
    fn test_constructor_args_lookup_ignores_case() {
        let mut args = ConstructorArgs::default();
        args.push("Name", ConstructorArg::Value(Some(Value::String("foo".into()))));
        args.push("fake", ConstructorArg::Dependency(Arc::new(42u32)));

        assert_eq!(args.value("name"), Some(&Value::String("foo".into())));
        assert_eq!(*args.dependency::<u32>("fake").unwrap(), 42);
        assert!(args.dependency::<String>("fake").is_err());
        assert!(args.dependency::<u32>("name").is_err());
    }

    #[test]
    fn test_shapes_compare_by_name() {
        assert!(SettingsShape::new("A").is_same(&SettingsShape::new("A")));
        assert!(!SettingsShape::new("A").is_same(&SettingsShape::new("B")));
    }

    #[test]
    fn test_downcast_dynamic_settings() {
        let boxed: Box<dyn CommandSettings> = Box::new(DynamicSettings::new("X"));
        assert_eq!(boxed.downcast_ref::<DynamicSettings>().unwrap().shape(), "X");
    }
}

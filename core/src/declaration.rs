//! File-based model declarations.
//!
//! A [`ModelDeclaration`] describes settings shapes and commands in YAML or
//! JSON and adapts into a [`Configuration`] for [`build`].
//!
//! # Example YAML
//!
//! ```yaml
//! application_name: zoo
//! settings:
//!   strict_parsing: true
//! shapes:
//!   - name: AnimalSettings
//!     parameters:
//!       - property: alive
//!         template: -a|--alive
//!         type: bool
//!       - property: legs
//!         position: 0
//!         template: "[LEGS]"
//!         type: integer
//! commands:
//!   - name: animal
//!     settings: AnimalSettings
//!     examples:
//!       - [animal, -a, "4"]
//! ```

use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{CommandDeclaration, Configuration, build};
use crate::config::AppSettings;
use crate::error::ConfigurationError;
use crate::settings::{ArgumentDecl, OptionDecl, SettingsShape};
use crate::types::CommandModel;
use crate::value::{Converter, PairDeconstructor, Value, ValueType, convert};

/// A declared default, written as a plain scalar or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<DefaultValue>),
}

impl DefaultValue {
    fn raw(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.iter().map(Self::raw).collect::<Vec<_>>().join(","),
        }
    }

    /// Converts the default to `value_type`.
    pub fn to_value(&self, value_type: &ValueType) -> Result<Value, String> {
        match (value_type, self) {
            (ValueType::List(inner), Self::List(items)) => items
                .iter()
                .map(|item| item.to_value(inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (ValueType::List(inner), item) => Ok(Value::List(vec![item.to_value(inner)?])),
            (ValueType::FlagValue(inner), item) => Ok(Value::FlagValue {
                is_set: false,
                value: Some(Box::new(item.to_value(inner)?)),
            }),
            (ValueType::Map(..), _) => Err("pair parameters cannot declare a default".to_string()),
            (_, Self::List(_)) => Err(format!("a list cannot be a {value_type} default")),
            (value_type, item) => convert(value_type, &item.raw()),
        }
    }
}

/// A declared option slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionEntry {
    pub property: String,
    pub template: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allow_redeclare: bool,
    /// Splits pair values on this separator instead of `=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deconstruct_with: Option<String>,
    /// Name of a registered converter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
}

/// A declared positional argument slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentEntry {
    pub property: String,
    pub position: usize,
    pub template: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
}

/// A parameter entry; arguments are recognised by their `position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    Argument(ArgumentEntry),
    Option(OptionEntry),
}

/// A declared settings shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of a shape declared earlier in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
}

/// A declared command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Shape name; commands without one take no parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
    #[serde(default)]
    pub branch: bool,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub examples: Vec<Vec<String>>,
    #[serde(default)]
    pub children: Vec<CommandEntry>,
}

/// A complete model declaration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDeclaration {
    pub settings: AppSettings,
    pub application_name: Option<String>,
    pub shapes: Vec<ShapeEntry>,
    pub commands: Vec<CommandEntry>,
    /// Shape name of the default command.
    pub default_command: Option<String>,
    pub examples: Vec<Vec<String>>,
}

impl ModelDeclaration {
    /// Loads a declaration; `.json` files are read as JSON, anything else
    /// as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](ConfigurationError::Io), [`Yaml`](ConfigurationError::Yaml)
    /// or [`Json`](ConfigurationError::Json) on read or parse failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let declaration: Self = if is_json {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        debug!(
            path = %path.display(),
            shapes = declaration.shapes.len(),
            commands = declaration.commands.len(),
            "Loaded model declaration"
        );
        Ok(declaration)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Adapts into a [`Configuration`] with no named converters.
    pub fn to_configuration(&self) -> Result<Configuration, ConfigurationError> {
        self.to_configuration_with(&HashMap::new())
    }

    /// Adapts into a [`Configuration`], resolving `converter:` names
    /// against `converters`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSettingsShape`](ConfigurationError::UnknownSettingsShape)
    /// for references to undeclared shapes (a base must be declared before
    /// the shapes that derive from it),
    /// [`UnknownConverter`](ConfigurationError::UnknownConverter) for
    /// unregistered converter names, and
    /// [`InvalidDefaultValue`](ConfigurationError::InvalidDefaultValue) for
    /// defaults that do not convert.
    pub fn to_configuration_with(
        &self,
        converters: &HashMap<String, Converter>,
    ) -> Result<Configuration, ConfigurationError> {
        let mut shapes: HashMap<String, Arc<SettingsShape>> = HashMap::new();
        for entry in &self.shapes {
            let shape = build_shape(entry, &shapes, converters)?;
            shapes.insert(entry.name.clone(), Arc::new(shape));
        }

        let mut configuration = Configuration {
            application_name: self.application_name.clone(),
            examples: self.examples.clone(),
            ..Default::default()
        };
        if let Some(name) = &self.default_command {
            configuration.set_default_command(lookup(&shapes, name)?);
        }
        for entry in &self.commands {
            configuration.add_command(build_command(entry, &shapes)?);
        }
        Ok(configuration)
    }

    /// Adapts, builds and validates the model using the embedded settings.
    pub fn build_model(&self) -> Result<CommandModel, ConfigurationError> {
        build(&self.to_configuration()?, &self.settings)
    }
}

fn lookup(
    shapes: &HashMap<String, Arc<SettingsShape>>,
    name: &str,
) -> Result<Arc<SettingsShape>, ConfigurationError> {
    shapes
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigurationError::UnknownSettingsShape(name.to_string()))
}

fn find_converter(
    converters: &HashMap<String, Converter>,
    name: Option<&str>,
) -> Result<Option<Converter>, ConfigurationError> {
    name.map(|name| {
        converters
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownConverter(name.to_string()))
    })
    .transpose()
}

fn default_value(
    property: &str,
    default: Option<&DefaultValue>,
    value_type: &ValueType,
) -> Result<Option<Value>, ConfigurationError> {
    default
        .map(|default| {
            default
                .to_value(value_type)
                .map_err(|reason| ConfigurationError::InvalidDefaultValue {
                    parameter: property.to_string(),
                    reason,
                })
        })
        .transpose()
}

fn separator_deconstructor(separator: &str) -> PairDeconstructor {
    let separator = separator.to_string();
    PairDeconstructor::new(move |raw| match raw.split_once(separator.as_str()) {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        Some(_) => Err("the key cannot be empty".to_string()),
        None => Err(format!("expected a value in the form KEY{separator}VALUE")),
    })
}

fn build_shape(
    entry: &ShapeEntry,
    shapes: &HashMap<String, Arc<SettingsShape>>,
    converters: &HashMap<String, Converter>,
) -> Result<SettingsShape, ConfigurationError> {
    let mut shape = SettingsShape::new(&entry.name);
    if let Some(description) = &entry.description {
        shape = shape.with_description(description);
    }
    if let Some(base) = &entry.base {
        shape = shape.with_base(lookup(shapes, base)?);
    }

    for parameter in &entry.parameters {
        shape = match parameter {
            ParameterEntry::Option(option) => {
                let mut decl =
                    OptionDecl::new(&option.property, &option.template, option.value_type.clone());
                decl.description = option.description.clone();
                decl.converter = find_converter(converters, option.converter.as_deref())?;
                decl.pair_deconstructor = option.deconstruct_with.as_deref().map(separator_deconstructor);
                decl.default_value =
                    default_value(&option.property, option.default.as_ref(), &option.value_type)?;
                decl.required = option.required;
                decl.allow_redeclare = option.allow_redeclare;
                shape.with_option(decl)
            }
            ParameterEntry::Argument(argument) => {
                let mut decl = ArgumentDecl::new(
                    &argument.property,
                    argument.position,
                    &argument.template,
                    argument.value_type.clone(),
                );
                decl.description = argument.description.clone();
                decl.converter = find_converter(converters, argument.converter.as_deref())?;
                decl.default_value = default_value(
                    &argument.property,
                    argument.default.as_ref(),
                    &argument.value_type,
                )?;
                shape.with_argument(decl)
            }
        };
    }

    Ok(shape)
}

fn build_command(
    entry: &CommandEntry,
    shapes: &HashMap<String, Arc<SettingsShape>>,
) -> Result<CommandDeclaration, ConfigurationError> {
    let settings = entry
        .settings
        .as_deref()
        .map(|name| lookup(shapes, name))
        .transpose()?;

    let mut command = match (entry.branch, settings) {
        (true, Some(settings)) => CommandDeclaration::branch_with_settings(&entry.name, settings),
        (true, None) => CommandDeclaration::branch(&entry.name),
        (false, settings) => CommandDeclaration::new(
            &entry.name,
            settings.unwrap_or_else(|| Arc::new(SettingsShape::empty())),
        ),
    };
    command.aliases = entry.aliases.clone();
    command.description = entry.description.clone();
    command.examples = entry.examples.clone();
    if entry.proxy {
        command = command.proxy();
    }
    for child in &entry.children {
        command = command.with_child(build_command(child, shapes)?);
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingMode;
    use crate::parser::{RawValue, TreeParser};

    const ZOO: &str = r#"
application_name: zoo
settings:
  strict_parsing: true
  validate_examples: true
shapes:
  - name: AnimalSettings
    parameters:
      - property: alive
        template: -a|--alive
        type: bool
      - property: legs
        position: 0
        template: "[LEGS]"
        type: integer
        default: 4
  - name: DogSettings
    base: AnimalSettings
    parameters:
      - property: name
        template: -n|--name <NAME>
      - property: env
        template: -e|--env <PAIR>
        type:
          map: [string, string]
        deconstruct_with: ":"
commands:
  - name: animals
    settings: AnimalSettings
    branch: true
    children:
      - name: dog
        aliases: [puppy]
        settings: DogSettings
        examples:
          - [animals, "4", dog, --name, Rex]
"#;

    #[test]
    fn test_yaml_declaration_builds() {
        let declaration = ModelDeclaration::from_yaml_str(ZOO).unwrap();
        let model = declaration.build_model().unwrap();

        assert_eq!(model.application_name.as_deref(), Some("zoo"));
        assert_eq!(declaration.settings.parsing_mode(), ParsingMode::Strict);

        let animals = model.find_command(None, "animals").unwrap();
        let dog = model.find_command(Some(animals), "PUPPY").unwrap();
        assert_eq!(model.node(dog).parameters.len(), 2);
        assert_eq!(
            model.node(animals).parameters[1].default_value(),
            Some(&Value::Integer(4))
        );
    }

    #[test]
    fn test_custom_separator() {
        let model = ModelDeclaration::from_yaml_str(ZOO)
            .unwrap()
            .build_model()
            .unwrap();
        let result = TreeParser::new(&model, ParsingMode::Strict)
            .parse(&["animals", "dog", "-e", "HOME:/root"])
            .unwrap();
        assert_eq!(
            result.value_of(&model, "env"),
            Some(
                &[RawValue::Pair {
                    key: "HOME".into(),
                    value: "/root".into()
                }][..]
            )
        );
    }

    #[test]
    fn test_unknown_base_shape() {
        let source = r#"
shapes:
  - name: DogSettings
    base: AnimalSettings
"#;
        let err = ModelDeclaration::from_yaml_str(source)
            .unwrap()
            .to_configuration()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownSettingsShape(name) if name == "AnimalSettings"));
    }

    #[test]
    fn test_named_converter() {
        let source = r#"
default_command: Shout
shapes:
  - name: Shout
    parameters:
      - property: word
        position: 0
        template: <WORD>
        converter: upper
"#;
        let declaration = ModelDeclaration::from_yaml_str(source).unwrap();
        assert!(matches!(
            declaration.to_configuration().unwrap_err(),
            ConfigurationError::UnknownConverter(_)
        ));

        let mut converters = HashMap::new();
        converters.insert(
            "upper".to_string(),
            Converter::new(|raw| Ok(Value::String(raw.to_uppercase()))),
        );
        let configuration = declaration.to_configuration_with(&converters).unwrap();
        assert!(configuration.default_command.is_some());
    }

    #[test]
    fn test_invalid_default() {
        let source = r#"
shapes:
  - name: S
    parameters:
      - property: count
        template: --count <N>
        type: integer
        default: many
"#;
        let err = ModelDeclaration::from_yaml_str(source)
            .unwrap()
            .to_configuration()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDefaultValue { .. }));
    }

    #[test]
    fn test_json_declaration() {
        let source = r#"{
            "shapes": [{ "name": "S", "parameters": [
                { "property": "tags", "template": "-t <TAG>", "type": { "list": "string" }, "default": ["a", "b"] }
            ]}],
            "commands": [{ "name": "run", "settings": "S" }]
        }"#;
        let model = ModelDeclaration::from_json_str(source)
            .unwrap()
            .build_model()
            .unwrap();
        let run = model.find_command(None, "run").unwrap();
        assert_eq!(
            model.node(run).parameters[0].default_value(),
            Some(&Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
    }

    #[test]
    fn test_load_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("zoo.yaml");
        std::fs::write(&yaml, ZOO).unwrap();
        let declaration = ModelDeclaration::load(&yaml).unwrap();
        assert_eq!(declaration.shapes.len(), 2);

        let json = dir.path().join("zoo.JSON");
        std::fs::write(&json, serde_json::to_string(&declaration).unwrap()).unwrap();
        let reloaded = ModelDeclaration::load(&json).unwrap();
        assert_eq!(reloaded.commands[0].children[0].aliases, vec!["puppy"]);

        assert!(matches!(
            ModelDeclaration::load(dir.path().join("missing.yaml")),
            Err(ConfigurationError::Io(_))
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let source = "commands:\n  - name: run\n    colour: red\n";
        assert!(matches!(
            ModelDeclaration::from_yaml_str(source),
            Err(ConfigurationError::Yaml(_))
        ));
    }
}

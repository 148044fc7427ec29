//! Builds a [`CommandModel`] from command declarations.
//!
//! Building walks the declared command tree top-down. Each node collects the
//! parameters of its settings shape and of every base shape, skipping what
//! an ancestor command already provides, then numbers its arguments. The
//! finished model is validated before it is returned, so a model obtained
//! from [`build`] is always valid.

use std::sync::Arc;

use tracing::debug;

use crate::config::AppSettings;
use crate::error::ConfigurationError;
use crate::settings::{ArgumentDecl, OptionDecl, ParameterDecl, SettingsShape};
use crate::template::{parse_argument_template, parse_option_template};
use crate::types::{
    CommandArgument, CommandModel, CommandNode, CommandOption, DEFAULT_COMMAND_NAME, NodeId,
    Parameter, ParameterKind,
};
use crate::validate::validate;
use crate::value::{Value, ValueType};

/// A declared command and its children.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_model_core::{CommandDeclaration, SettingsShape};
///
/// let animals = CommandDeclaration::branch("animals")
///     .with_alias("zoo")
///     .with_child(CommandDeclaration::new("dog", Arc::new(SettingsShape::new("DogSettings"))));
///
/// assert!(animals.is_branch);
/// assert_eq!(animals.children.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CommandDeclaration {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub settings: Arc<SettingsShape>,
    pub is_branch: bool,
    pub is_proxy: bool,
    pub examples: Vec<Vec<String>>,
    pub children: Vec<CommandDeclaration>,
}

impl CommandDeclaration {
    /// Declares an invocable command bound to `settings`.
    pub fn new(name: &str, settings: Arc<SettingsShape>) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            description: None,
            settings,
            is_branch: false,
            is_proxy: false,
            examples: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Declares a branch that only groups children.
    pub fn branch(name: &str) -> Self {
        Self {
            is_branch: true,
            is_proxy: true,
            ..Self::new(name, Arc::new(SettingsShape::empty()))
        }
    }

    /// Declares a branch whose settings are shared by its children.
    pub fn branch_with_settings(name: &str, settings: Arc<SettingsShape>) -> Self {
        Self {
            is_branch: true,
            ..Self::new(name, settings)
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_example(mut self, tokens: &[&str]) -> Self {
        self.examples
            .push(tokens.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_child(mut self, child: CommandDeclaration) -> Self {
        self.children.push(child);
        self
    }

    /// Do not pull the description from the settings shape.
    pub fn proxy(mut self) -> Self {
        self.is_proxy = true;
        self
    }
}

/// The raw configuration consumed by [`build`].
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub application_name: Option<String>,
    pub commands: Vec<CommandDeclaration>,
    pub default_command: Option<CommandDeclaration>,
    pub examples: Vec<Vec<String>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application_name(mut self, name: &str) -> Self {
        self.application_name = Some(name.to_string());
        self
    }

    pub fn add_command(&mut self, command: CommandDeclaration) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Sets the command used when no command name is given.
    pub fn set_default_command(&mut self, settings: Arc<SettingsShape>) -> &mut Self {
        self.default_command = Some(CommandDeclaration::new(DEFAULT_COMMAND_NAME, settings));
        self
    }

    pub fn add_example(&mut self, tokens: &[&str]) -> &mut Self {
        self.examples
            .push(tokens.iter().map(|t| t.to_string()).collect());
        self
    }
}

/// Builds and validates a command model.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if a template is malformed or if the
/// built model fails validation. No partial model is returned.
pub fn build(
    configuration: &Configuration,
    settings: &AppSettings,
) -> Result<CommandModel, ConfigurationError> {
    let mut model = CommandModel {
        application_name: settings
            .application_name
            .clone()
            .or_else(|| configuration.application_name.clone()),
        examples: configuration.examples.clone(),
        ..Default::default()
    };

    if let Some(default) = &configuration.default_command {
        let id = build_node(&mut model, None, default, true)?;
        model.default_command = Some(id);
    }

    for command in &configuration.commands {
        let id = build_node(&mut model, None, command, false)?;
        model.commands.push(id);
    }

    debug!(
        commands = model.commands.len(),
        nodes = model.len(),
        "Built command model"
    );

    validate(&model, settings)?;
    Ok(model)
}

fn build_node(
    model: &mut CommandModel,
    parent: Option<NodeId>,
    declaration: &CommandDeclaration,
    is_default: bool,
) -> Result<NodeId, ConfigurationError> {
    let mut description = declaration.description.clone();
    if !declaration.is_proxy {
        if let Some(desc) = declaration.settings.description() {
            description = Some(desc.to_string());
        }
    }

    // The node must be in the arena before parameter discovery so that
    // descendants can query their ancestors.
    let id = NodeId(model.nodes.len());
    model.nodes.push(CommandNode {
        name: declaration.name.clone(),
        aliases: declaration.aliases.clone(),
        description,
        settings: Arc::clone(&declaration.settings),
        parameters: Vec::new(),
        children: Vec::new(),
        parent,
        is_branch: declaration.is_branch,
        is_proxy: declaration.is_proxy,
        is_default,
        examples: declaration.examples.clone(),
    });

    let parameters = discover_parameters(model, id)?;
    model.nodes[id.0].parameters = parameters;

    for child in &declaration.children {
        let child_id = build_node(model, Some(id), child, false)?;
        model.nodes[id.0].children.push(child_id);
    }

    normalize_positions(&mut model.nodes[id.0]);

    debug!(
        command = %declaration.name,
        parameters = model.nodes[id.0].parameters.len(),
        children = model.nodes[id.0].children.len(),
        "Built command"
    );

    Ok(id)
}

/// A parameter group of one shape in the lineage of a node's settings.
struct Group<'a> {
    level: i32,
    sort_order: i32,
    shape: &'a SettingsShape,
    inherited: bool,
}

fn discover_parameters(model: &CommandModel, id: NodeId) -> Result<Vec<Parameter>, ConfigurationError> {
    let node = model.node(id);
    let ancestors: Vec<NodeId> = model.ancestors(id).collect();
    let owned_by_ancestor = |shape: &SettingsShape| {
        ancestors
            .iter()
            .any(|a| model.node(*a).settings.is_same(shape))
    };

    let mut groups = Vec::new();
    let mut level = 0;
    let mut sort_order = 0;
    for (depth, shape) in node.settings.lineage().enumerate() {
        let inherited = depth > 0 && owned_by_ancestor(shape);
        if inherited {
            level -= 1;
        }
        groups.push(Group {
            level,
            sort_order,
            shape,
            inherited,
        });
        sort_order -= 1;
    }
    groups.sort_by_key(|g| (g.level, g.sort_order));

    let mut result = Vec::new();
    let mut argument_position = 0;
    for group in groups {
        if group.inherited {
            debug!(
                command = %node.name,
                shape = %group.shape.name(),
                "Skipping settings owned by an ancestor command"
            );
            continue;
        }

        let mut parameters = Vec::new();
        for declaration in group.shape.parameters() {
            match declaration {
                ParameterDecl::Option(decl) => {
                    let mut option = build_option(decl)?;
                    if !ancestor_declares(model, &ancestors, &option.property, true) {
                        parameters.push(Parameter::Option(option));
                    } else if decl.allow_redeclare {
                        option.required = false;
                        option.is_shadowed = true;
                        parameters.push(Parameter::Option(option));
                    } else {
                        debug!(
                            command = %node.name,
                            property = %option.property,
                            "Option inherited from ancestor"
                        );
                    }
                }
                ParameterDecl::Argument(decl) => {
                    let argument = build_argument(decl)?;
                    if !ancestor_declares(model, &ancestors, &argument.property, false) {
                        parameters.push(Parameter::Argument(argument));
                    }
                }
            }
        }

        let mut arguments: Vec<&mut CommandArgument> = parameters
            .iter_mut()
            .filter_map(|p| match p {
                Parameter::Argument(a) => Some(a),
                Parameter::Option(_) => None,
            })
            .collect();
        arguments.sort_by_key(|a| a.position);
        for argument in arguments {
            argument.position = argument_position;
            argument_position += 1;
        }

        result.extend(parameters);
    }

    Ok(result)
}

fn ancestor_declares(model: &CommandModel, ancestors: &[NodeId], property: &str, option: bool) -> bool {
    ancestors.iter().any(|id| {
        model.node(*id).parameters.iter().any(|p| {
            p.has_same_property(property) && matches!(p, Parameter::Option(_)) == option
        })
    })
}

fn build_option(decl: &OptionDecl) -> Result<CommandOption, ConfigurationError> {
    let template = parse_option_template(&decl.template)?;

    let kind = if template.value_is_optional {
        ParameterKind::FlagWithValue
    } else if decl.value_type.is_vector() {
        ParameterKind::Vector
    } else if decl.value_type == ValueType::Bool {
        ParameterKind::Flag
    } else {
        ParameterKind::Single
    };

    let default_value = match (&decl.default_value, &decl.value_type) {
        (None, ValueType::Bool) => Some(Value::Bool(false)),
        (value, _) => value.clone(),
    };

    Ok(CommandOption {
        property: decl.property.clone(),
        value_type: decl.value_type.clone(),
        description: decl.description.clone(),
        converter: decl.converter.clone(),
        default_value,
        required: decl.required,
        short_names: template.short_names,
        long_names: template.long_names,
        value_name: template.value_name,
        kind,
        pair_deconstructor: decl.pair_deconstructor.clone(),
        is_shadowed: false,
    })
}

fn build_argument(decl: &ArgumentDecl) -> Result<CommandArgument, ConfigurationError> {
    let template = parse_argument_template(&decl.template)?;
    let kind = if decl.value_type.is_vector() {
        ParameterKind::Vector
    } else {
        ParameterKind::Single
    };

    Ok(CommandArgument {
        property: decl.property.clone(),
        value_type: decl.value_type.clone(),
        description: decl.description.clone(),
        converter: decl.converter.clone(),
        default_value: decl.default_value.clone(),
        required: template.required,
        value_name: template.value_name,
        position: decl.position,
        kind,
    })
}

/// Renumbers a node's own arguments densely from zero.
fn normalize_positions(node: &mut CommandNode) {
    let mut arguments: Vec<&mut CommandArgument> = node
        .parameters
        .iter_mut()
        .filter_map(|p| match p {
            Parameter::Argument(a) => Some(a),
            Parameter::Option(_) => None,
        })
        .collect();
    arguments.sort_by_key(|a| a.position);
    for (index, argument) in arguments.into_iter().enumerate() {
        argument.position = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal_shape() -> Arc<SettingsShape> {
        Arc::new(
            SettingsShape::new("AnimalSettings")
                .with_description("An animal")
                .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
                .with_argument(ArgumentDecl::new("legs", 1, "[LEGS]", ValueType::Integer)),
        )
    }

    fn mammal_shape() -> Arc<SettingsShape> {
        Arc::new(
            SettingsShape::new("MammalSettings")
                .with_base(animal_shape())
                .with_option(OptionDecl::new("name", "-n|--name <NAME>", ValueType::String)),
        )
    }

    fn dog_shape() -> Arc<SettingsShape> {
        Arc::new(
            SettingsShape::new("DogSettings")
                .with_base(mammal_shape())
                .with_argument(ArgumentDecl::new("age", 0, "<AGE>", ValueType::Integer))
                .with_option(OptionDecl::new("good_boy", "-g|--good-boy", ValueType::Bool)),
        )
    }

    fn properties(model: &CommandModel, id: NodeId) -> Vec<&str> {
        model.node(id).parameters.iter().map(|p| p.property()).collect()
    }

    #[test]
    fn test_single_command_positions_are_dense() {
        let mut configuration = Configuration::new();
        configuration.add_command(CommandDeclaration::new("animal", animal_shape()));

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let animal = model.node(model.commands()[0]);
        assert_eq!(animal.description.as_deref(), Some("An animal"));
        assert_eq!(animal.arguments()[0].1.position, 0);
        assert_eq!(animal.arguments()[0].1.value_name, "LEGS");
    }

    #[test]
    fn test_base_shapes_are_ordered_before_derived() {
        let mut configuration = Configuration::new();
        configuration.add_command(CommandDeclaration::new("dog", dog_shape()));

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let dog = model.commands()[0];
        assert_eq!(
            properties(&model, dog),
            vec!["alive", "legs", "name", "age", "good_boy"]
        );

        let positions: Vec<(&str, usize)> = model
            .node(dog)
            .arguments()
            .iter()
            .map(|(_, a)| (a.property.as_str(), a.position))
            .collect();
        assert_eq!(positions, vec![("legs", 0), ("age", 1)]);
    }

    #[test]
    fn test_settings_owned_by_ancestors_are_inherited() {
        let mut configuration = Configuration::new();
        configuration.add_command(
            CommandDeclaration::branch_with_settings("animal", animal_shape()).with_child(
                CommandDeclaration::branch_with_settings("mammal", mammal_shape())
                    .with_child(CommandDeclaration::new("dog", dog_shape())),
            ),
        );

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let animal = model.commands()[0];
        let mammal = model.node(animal).children[0];
        let dog = model.node(mammal).children[0];

        assert_eq!(properties(&model, animal), vec!["alive", "legs"]);
        assert_eq!(properties(&model, mammal), vec!["name"]);
        assert_eq!(properties(&model, dog), vec!["age", "good_boy"]);
        assert_eq!(model.node(dog).arguments()[0].1.position, 0);
        assert_eq!(model.parameters_in_scope(dog).len(), 5);
    }

    #[test]
    fn test_redeclared_option_is_shadowed() {
        let parent = Arc::new(
            SettingsShape::new("ParentSettings").with_option(
                OptionDecl::new("verbose", "-v|--verbose", ValueType::Bool),
            ),
        );
        let child = Arc::new(
            SettingsShape::new("ChildSettings").with_option(
                OptionDecl::new("verbose", "--verbose", ValueType::Bool)
                    .required()
                    .allow_redeclare(),
            ),
        );
        let dropped = Arc::new(
            SettingsShape::new("DroppedSettings")
                .with_option(OptionDecl::new("verbose", "--verbose", ValueType::Bool)),
        );

        let mut configuration = Configuration::new();
        configuration.add_command(
            CommandDeclaration::branch_with_settings("root", parent)
                .with_child(CommandDeclaration::new("child", child))
                .with_child(CommandDeclaration::new("dropped", dropped)),
        );

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let root = model.node(model.commands()[0]);
        let child = model.node(root.children[0]);
        let dropped = model.node(root.children[1]);

        let shadowed = child.parameters[0].as_option().unwrap();
        assert!(shadowed.is_shadowed);
        assert!(!shadowed.required);
        assert!(dropped.parameters.is_empty());
    }

    #[test]
    fn test_option_kinds_are_inferred() {
        let shape = Arc::new(
            SettingsShape::new("Kinds")
                .with_option(OptionDecl::new("flag", "--flag", ValueType::Bool))
                .with_option(OptionDecl::new(
                    "level",
                    "--level [LEVEL]",
                    ValueType::FlagValue(Box::new(ValueType::Integer)),
                ))
                .with_option(OptionDecl::new("name", "--name <NAME>", ValueType::String))
                .with_option(OptionDecl::new(
                    "tags",
                    "--tag <TAG>",
                    ValueType::List(Box::new(ValueType::String)),
                )),
        );
        let mut configuration = Configuration::new();
        configuration.add_command(CommandDeclaration::new("kinds", shape));

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let kinds: Vec<ParameterKind> = model
            .node(model.commands()[0])
            .parameters
            .iter()
            .map(|p| p.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::Flag,
                ParameterKind::FlagWithValue,
                ParameterKind::Single,
                ParameterKind::Vector
            ]
        );
        let flag = model.node(model.commands()[0]).parameters[0].default_value();
        assert_eq!(flag, Some(&Value::Bool(false)));
    }

    #[test]
    fn test_proxy_keeps_configured_description() {
        let mut configuration = Configuration::new();
        configuration.add_command(
            CommandDeclaration::new("animal", animal_shape())
                .with_description("Configured")
                .proxy(),
        );

        let model = build(&configuration, &AppSettings::default()).unwrap();
        assert_eq!(
            model.node(model.commands()[0]).description.as_deref(),
            Some("Configured")
        );
    }

    #[test]
    fn test_invalid_template_aborts_build() {
        let shape = Arc::new(
            SettingsShape::new("Bad").with_option(OptionDecl::new("x", "-xy", ValueType::Bool)),
        );
        let mut configuration = Configuration::new();
        configuration.add_command(CommandDeclaration::new("bad", shape));

        assert!(matches!(
            build(&configuration, &AppSettings::default()),
            Err(ConfigurationError::InvalidOptionTemplate { .. })
        ));
    }

    #[test]
    fn test_default_command_is_built_first() {
        let mut configuration = Configuration::new();
        configuration.set_default_command(animal_shape());

        let model = build(&configuration, &AppSettings::default()).unwrap();
        let default = model.default_command().unwrap();
        assert!(model.node(default).is_default);
        assert_eq!(model.node(default).name, DEFAULT_COMMAND_NAME);
        assert!(model.commands().is_empty());
    }
}

//! Command model type definitions.
//!
//! A [`CommandModel`] owns every [`CommandNode`] in a flat arena; nodes refer
//! to their parent and children through [`NodeId`] indices. Each node carries
//! its own [`Parameter`]s, which are either [`CommandOption`]s or
//! [`CommandArgument`]s. Parameters declared by ancestor commands are
//! inherited and are not repeated on descendants.

use std::sync::Arc;

use serde::Serialize;

use crate::settings::SettingsShape;
use crate::value::{Converter, PairDeconstructor, Value, ValueType};

/// Name given to the command built from [`Configuration::set_default_command`].
///
/// [`Configuration::set_default_command`]: crate::Configuration::set_default_command
pub const DEFAULT_COMMAND_NAME: &str = "__default_command";

/// Index of a node inside a [`CommandModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a parameter consumes tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterKind {
    /// Present or absent; never consumes the next token.
    Flag,
    /// Present, optionally followed by a value.
    FlagWithValue,
    /// Exactly one value.
    Single,
    /// Any number of values.
    Vector,
}

/// A named option such as `-a|--alive` or `--name <NAME>`.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOption {
    /// The settable slot on the settings shape.
    pub property: String,
    pub value_type: ValueType,
    pub description: Option<String>,
    #[serde(skip)]
    pub converter: Option<Converter>,
    pub default_value: Option<Value>,
    pub required: bool,
    /// Short names without the leading dash.
    pub short_names: Vec<String>,
    /// Long names without the leading dashes.
    pub long_names: Vec<String>,
    pub value_name: Option<String>,
    pub kind: ParameterKind,
    #[serde(skip)]
    pub pair_deconstructor: Option<PairDeconstructor>,
    /// Redeclared from an ancestor command; always optional.
    pub is_shadowed: bool,
}

impl CommandOption {
    /// Checks if this option answers to `name`, ignoring case.
    ///
    /// `name` has no leading dashes; `is_long` selects which name set is
    /// searched.
    pub fn matches(&self, name: &str, is_long: bool) -> bool {
        let names = if is_long {
            &self.long_names
        } else {
            &self.short_names
        };
        names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Returns the display name (long form preferred, falls back to short).
    pub fn display_name(&self) -> String {
        if let Some(long) = self.long_names.first() {
            format!("--{long}")
        } else if let Some(short) = self.short_names.first() {
            format!("-{short}")
        } else {
            self.property.clone()
        }
    }

    /// Returns `true` if this option's type can be present without a value.
    pub fn is_flag_value(&self) -> bool {
        self.value_type.is_flag_value()
    }
}

/// A positional argument such as `[LEGS]`.
#[derive(Debug, Clone, Serialize)]
pub struct CommandArgument {
    pub property: String,
    pub value_type: ValueType,
    pub description: Option<String>,
    #[serde(skip)]
    pub converter: Option<Converter>,
    pub default_value: Option<Value>,
    pub required: bool,
    pub value_name: String,
    /// Zero-based, dense among the command's own arguments.
    pub position: usize,
    pub kind: ParameterKind,
}

/// An option or an argument.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "parameter", rename_all = "snake_case")]
pub enum Parameter {
    Option(CommandOption),
    Argument(CommandArgument),
}

impl Parameter {
    pub fn property(&self) -> &str {
        match self {
            Self::Option(o) => &o.property,
            Self::Argument(a) => &a.property,
        }
    }

    pub fn value_type(&self) -> &ValueType {
        match self {
            Self::Option(o) => &o.value_type,
            Self::Argument(a) => &a.value_type,
        }
    }

    pub fn converter(&self) -> Option<&Converter> {
        match self {
            Self::Option(o) => o.converter.as_ref(),
            Self::Argument(a) => a.converter.as_ref(),
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Self::Option(o) => o.default_value.as_ref(),
            Self::Argument(a) => a.default_value.as_ref(),
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Self::Option(o) => o.required,
            Self::Argument(a) => a.required,
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Option(o) => o.kind,
            Self::Argument(a) => a.kind,
        }
    }

    pub fn as_option(&self) -> Option<&CommandOption> {
        match self {
            Self::Option(o) => Some(o),
            Self::Argument(_) => None,
        }
    }

    pub fn as_argument(&self) -> Option<&CommandArgument> {
        match self {
            Self::Argument(a) => Some(a),
            Self::Option(_) => None,
        }
    }

    /// Returns `true` if both parameters bind the same property.
    pub fn has_same_property(&self, property: &str) -> bool {
        self.property().eq_ignore_ascii_case(property)
    }
}

/// One command in the model.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// The shape parameters bind onto.
    pub settings: Arc<SettingsShape>,
    pub parameters: Vec<Parameter>,
    pub children: Vec<NodeId>,
    /// Non-owning link to the parent command.
    pub parent: Option<NodeId>,
    /// Exists only to group children; never invoked itself.
    pub is_branch: bool,
    /// Description is not pulled from the settings shape.
    pub is_proxy: bool,
    pub is_default: bool,
    pub examples: Vec<Vec<String>>,
}

impl CommandNode {
    /// Checks the name and aliases, ignoring case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Own options with their parameter index.
    pub fn options(&self) -> impl Iterator<Item = (usize, &CommandOption)> {
        self.parameters
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_option().map(|o| (i, o)))
    }

    /// Own arguments with their parameter index, ordered by position.
    pub fn arguments(&self) -> Vec<(usize, &CommandArgument)> {
        let mut arguments: Vec<(usize, &CommandArgument)> = self
            .parameters
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_argument().map(|a| (i, a)))
            .collect();
        arguments.sort_by_key(|(_, a)| a.position);
        arguments
    }

    /// Finds an own option by name.
    pub fn find_option(&self, name: &str, is_long: bool) -> Option<(usize, &CommandOption)> {
        self.options().find(|(_, o)| o.matches(name, is_long))
    }
}

/// The root container of a built command tree.
///
/// Built once by [`build`](crate::build), validated, then shared read-only
/// by every parse.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_model_core::*;
///
/// let animal = Arc::new(
///     SettingsShape::new("AnimalSettings")
///         .with_option(OptionDecl::new("alive", "-a|--alive", ValueType::Bool))
///         .with_argument(ArgumentDecl::new("legs", 1, "[LEGS]", ValueType::Integer)),
/// );
///
/// let mut configuration = Configuration::new();
/// configuration.add_command(CommandDeclaration::new("animal", animal));
///
/// let model = build(&configuration, &AppSettings::default()).unwrap();
/// let id = model.find_command(None, "ANIMAL").unwrap();
/// let node = model.node(id);
/// assert_eq!(node.arguments()[0].1.position, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandModel {
    pub application_name: Option<String>,
    pub(crate) nodes: Vec<CommandNode>,
    pub(crate) commands: Vec<NodeId>,
    pub(crate) default_command: Option<NodeId>,
    pub examples: Vec<Vec<String>>,
}

impl CommandModel {
    /// Returns the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this model.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Top-level commands in declaration order.
    pub fn commands(&self) -> &[NodeId] {
        &self.commands
    }

    pub fn default_command(&self) -> Option<NodeId> {
        self.default_command
    }

    /// Number of nodes in the whole tree, the default command included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |current| {
            self.node(*current).parent
        })
    }

    /// Returns the command path from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// Finds a command by name or alias among the children of `scope`, or
    /// among the top-level commands when `scope` is `None`.
    pub fn find_command(&self, scope: Option<NodeId>, name: &str) -> Option<NodeId> {
        let candidates = match scope {
            Some(id) => &self.node(id).children,
            None => &self.commands,
        };
        candidates
            .iter()
            .copied()
            .find(|id| self.node(*id).matches_name(name))
    }

    /// Every parameter visible to `id`: ancestors' first, then its own.
    pub fn parameters_in_scope(&self, id: NodeId) -> Vec<(NodeId, usize, &Parameter)> {
        self.path(id)
            .into_iter()
            .flat_map(move |node| {
                self.node(node)
                    .parameters
                    .iter()
                    .enumerate()
                    .map(move |(index, parameter)| (node, index, parameter))
            })
            .collect()
    }

    /// Iterates every node depth-first, the default command first.
    pub fn walk(&self) -> Vec<NodeId> {
        fn visit(model: &CommandModel, id: NodeId, out: &mut Vec<NodeId>) {
            out.push(id);
            for child in &model.node(id).children {
                visit(model, *child, out);
            }
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        if let Some(default) = self.default_command {
            visit(self, default, &mut out);
        }
        for id in &self.commands {
            visit(self, *id, &mut out);
        }
        out
    }
}

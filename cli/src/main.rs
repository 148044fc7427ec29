use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use command_model_core::{
    CommandModel, ConfigurationError, Error, ModelDeclaration, NodeId, Parameter,
    ParsingMode, TreeParser, TypeRegistry, activate,
};
use command_model_core::parser::UnmatchedToken;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cmdmodel")]
#[command(about = "Validate, inspect and parse command model declarations")]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and validate a declaration file.
    Validate(FileArgs),
    /// Print the normalized command tree as JSON.
    Inspect(FileArgs),
    /// Parse tokens against a declaration and print the result as JSON.
    Parse(ParseArgs),
}

impl Command {
    fn file(&self) -> &Path {
        match self {
            Self::Validate(args) | Self::Inspect(args) => &args.file,
            Self::Parse(args) => &args.file,
        }
    }
}

#[derive(Debug, Args)]
struct FileArgs {
    /// YAML or JSON model declaration.
    file: PathBuf,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// YAML or JSON model declaration.
    file: PathBuf,
    /// Collect unknown options and surplus tokens instead of failing.
    #[arg(long)]
    relaxed: bool,
    /// Tokens to parse, given after `--`.
    #[arg(last = true)]
    tokens: Vec<String>,
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let declaration = ModelDeclaration::load(cli.command.file());
    let settings = declaration
        .as_ref()
        .map(|d| d.settings.clone())
        .unwrap_or_default();

    let result = declaration
        .map_err(Error::from)
        .and_then(|declaration| match cli.command {
            Command::Validate(_) => run_validate(&declaration),
            Command::Inspect(_) => run_inspect(&declaration),
            Command::Parse(args) => run_parse(&declaration, args),
        });

    if let Err(err) = result {
        if settings.should_propagate_exceptions() {
            return Err(err);
        }
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate(declaration: &ModelDeclaration) -> Result<(), Error> {
    let model = declaration.build_model()?;
    println!(
        "Validated {} command(s) ({} node(s) in total).",
        model.commands().len(),
        model.len()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct NodeView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    aliases: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    settings: &'a str,
    is_branch: bool,
    is_default: bool,
    parameters: &'a [Parameter],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeView<'a>>,
}

impl<'a> NodeView<'a> {
    fn new(model: &'a CommandModel, id: NodeId) -> Self {
        let node = model.node(id);
        Self {
            name: &node.name,
            aliases: &node.aliases,
            description: node.description.as_deref(),
            settings: node.settings.name(),
            is_branch: node.is_branch,
            is_default: node.is_default,
            parameters: &node.parameters,
            children: node
                .children
                .iter()
                .map(|child| NodeView::new(model, *child))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModelView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    application_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_command: Option<NodeView<'a>>,
    commands: Vec<NodeView<'a>>,
}

fn run_inspect(declaration: &ModelDeclaration) -> Result<(), Error> {
    let model = declaration.build_model()?;
    let view = ModelView {
        application_name: model.application_name.as_deref(),
        default_command: model.default_command().map(|id| NodeView::new(&model, id)),
        commands: model
            .commands()
            .iter()
            .map(|id| NodeView::new(&model, *id))
            .collect(),
    };
    print_json(&view)
}

#[derive(Debug, Serialize)]
struct ParseView<'a> {
    command: &'a str,
    path: Vec<&'a str>,
    settings: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "is_empty")]
    unmatched: &'a [UnmatchedToken],
    #[serde(skip_serializing_if = "is_empty")]
    remaining: &'a [String],
}

fn run_parse(declaration: &ModelDeclaration, args: ParseArgs) -> Result<(), Error> {
    let model = declaration.build_model()?;
    let mode = if args.relaxed {
        ParsingMode::Relaxed
    } else {
        declaration.settings.parsing_mode()
    };
    debug!(?mode, tokens = args.tokens.len(), "Parsing tokens");

    let result = TreeParser::new(&model, mode).parse(&args.tokens)?;
    let settings = activate(&model, &result, &TypeRegistry::new())?;

    let view = ParseView {
        command: &model.node(result.command).name,
        path: result
            .path
            .iter()
            .map(|id| model.node(*id).name.as_str())
            .collect(),
        settings: settings.to_json(),
        unmatched: &result.unmatched,
        remaining: &result.remaining,
    };
    print_json(&view)
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

fn print_json(value: &impl Serialize) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value).map_err(ConfigurationError::from)?;
    println!("{json}");
    Ok(())
}

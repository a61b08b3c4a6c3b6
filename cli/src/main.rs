use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cmdbind_core::{Cli as Binder, CliOptions, SchemaDocument, from_yaml_str};
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// Output format for parsed records.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "cmdbind")]
#[command(about = "Check, parse and complete command lines against record schema documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the command tree of a schema document and report problems.
    Check(CheckArgs),
    /// Parse an argument vector and print the resulting record.
    Parse(ParseArgs),
    /// Print completion candidates for a partial command line.
    Complete(CompleteArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema document (JSON, or YAML by `.yaml`/`.yml` extension).
    schema: PathBuf,
    /// Parser options file (JSON or YAML).
    #[arg(long)]
    options: Option<PathBuf>,
    /// Make global flags reachable from subcommands.
    #[arg(long)]
    globals: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Print every command with its argument synopsis.
    #[arg(long)]
    tree: bool,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Environment variable visible to the parser (KEY=VALUE, repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,
    /// Start from the process environment instead of an empty one.
    #[arg(long)]
    inherit_env: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
    /// Argument vector; the first element names the root command.
    #[arg(last = true, required = true)]
    argv: Vec<String>,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Partial command line.
    #[arg(long)]
    line: String,
    /// Cursor byte offset (default: end of line).
    #[arg(long)]
    point: Option<usize>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Parse(args) => run_parse(args),
        Command::Complete(args) => run_complete(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let (document_name, binder) = load_binder(&args.schema)?;
    let tree = binder
        .tree(&document_name)
        .ok_or_else(|| format!("Root command '{document_name}' was not built"))?;

    let commands = tree.walk();
    let arguments: usize = commands
        .iter()
        .map(|&id| tree.arguments_of(id).len())
        .sum();

    if args.tree {
        for &id in &commands {
            let command = tree.command(id);
            let synopsis: Vec<String> = tree
                .arguments_of(id)
                .into_iter()
                .map(|arg| tree.argument(arg).synopsis())
                .collect();
            if synopsis.is_empty() {
                println!("{}", command.path);
            } else {
                println!("{} {}", command.path, synopsis.join(" "));
            }
        }
    }

    println!(
        "Checked '{}': {} command(s), {} argument(s).",
        args.schema.schema.display(),
        commands.len(),
        arguments
    );
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let (document_name, mut binder) = load_binder(&args.schema)?;

    let mut env: HashMap<String, String> = if args.inherit_env {
        std::env::vars().collect()
    } else {
        HashMap::new()
    };
    for pair in &args.env {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid --env '{pair}': expected KEY=VALUE"))?;
        env.insert(key.to_string(), value.to_string());
    }

    binder
        .parse_with_env(&args.argv, &env)
        .map_err(|err| err.to_string())?;

    let root = binder.selected().unwrap_or(&document_name).to_string();
    let record = binder
        .record(&root)
        .ok_or_else(|| format!("No record for root command '{root}'"))?;
    let chain: Vec<&str> = binder
        .execution_chain()
        .iter()
        .map(|link| link.path.as_str())
        .collect();
    debug!(root = %root, chain = ?chain, "Parsed argument vector");

    let output = serde_json::json!({
        "command": chain.last().copied().unwrap_or(root.as_str()),
        "chain": chain,
        "record": record,
    });
    let raw = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&output)
            .map_err(|err| format!("Failed to serialize record: {err}"))?,
        OutputFormat::Yaml => serde_yaml::to_string(&output)
            .map_err(|err| format!("Failed to serialize record: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn run_complete(args: CompleteArgs) -> Result<(), String> {
    let (_, mut binder) = load_binder(&args.schema)?;
    let point = args.point.unwrap_or(args.line.len());
    for candidate in binder.complete(&args.line, point) {
        println!("{candidate}");
    }
    Ok(())
}

/// Loads the schema document and options and builds the binder.
fn load_binder(args: &SchemaArgs) -> Result<(String, Binder), String> {
    let document: SchemaDocument = load_document(&args.schema)?;
    let mut options: CliOptions = match &args.options {
        Some(path) => load_document(path)?,
        None => CliOptions::default(),
    };
    if args.globals {
        options.globals_enabled = true;
    }

    let name = document.name.clone();
    debug!(name = %name, version = %document.version, enums = document.enums.len(), "Loaded schema document");
    let binder = document
        .into_cli(options)
        .map_err(|err| format!("Invalid schema '{}': {err}", args.schema.display()))?;
    Ok((name, binder))
}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        from_yaml_str(&raw).map_err(|err| format!("Failed to parse '{}': {err}", path.display()))
    } else {
        serde_json::from_str(&raw)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display()))
    }
}

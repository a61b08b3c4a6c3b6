//! The [`Cli`] context: roots, registry, parsing, completion and hooks.

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ChainLink, CliOptions, CommandTree, Completer, CompletionRequest, EnumTable, EnvSource,
    Hooks, ParseError, ProcessEnv, Record, RecordSchema, Registry, Runner, SchemaError,
    TextDecoder, TreeBuilder,
};

#[derive(Debug)]
struct Root {
    tree: CommandTree,
    record: Record,
}

/// A command-line interface over one or more root records.
///
/// Register enums, completers and decoders first, then add root commands,
/// then parse. Each root owns its tree and its record.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use cmdbind_core::{Cli, CliOptions, FieldSchema, RecordSchema, Value};
///
/// let mut cli = Cli::new(CliOptions::default());
/// cli.add_command(
///     "greet",
///     &RecordSchema::new()
///         .with_field(FieldSchema::string("name").positional().required())
///         .with_field(FieldSchema::uint("times").short('n').default_value("1")),
/// )
/// .unwrap();
///
/// let env: HashMap<String, String> = HashMap::new();
/// cli.parse_with_env(&["/usr/bin/greet", "world", "-n", "3"], &env).unwrap();
///
/// let record = cli.record("greet").unwrap();
/// assert_eq!(record.field("name"), Some(&Value::Str("world".into())));
/// assert_eq!(record.field("times"), Some(&Value::Uint(3)));
/// ```
#[derive(Debug)]
pub struct Cli {
    options: CliOptions,
    registry: Registry,
    roots: IndexMap<String, Root>,
    runner: Runner,
    selected: Option<String>,
    chain: Vec<ChainLink>,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new(CliOptions::default())
    }
}

impl Cli {
    pub fn new(options: CliOptions) -> Self {
        Self {
            runner: Runner::new(options.on_error),
            options,
            registry: Registry::default(),
            roots: IndexMap::new(),
            selected: None,
            chain: Vec::new(),
        }
    }

    pub fn options(&self) -> &CliOptions {
        &self.options
    }

    pub fn register_enum(&mut self, table: EnumTable) {
        self.registry.register_enum(table);
    }

    pub fn register_completer(&mut self, name: &str, completer: impl Completer + 'static) {
        self.registry.register_completer(name, completer);
    }

    pub fn register_decoder(&mut self, type_name: &str, decoder: impl TextDecoder + 'static) {
        self.registry.register_decoder(type_name, decoder);
    }

    /// Builds a root command from `schema` with a zeroed record.
    pub fn add_command(&mut self, name: &str, schema: &RecordSchema) -> Result<(), SchemaError> {
        if self.roots.contains_key(name) {
            return Err(SchemaError::DuplicateCommand(name.to_string()));
        }
        let tree = TreeBuilder::new(&self.options, &self.registry).build(name, schema)?;
        let record = Record::from_schema(schema);
        self.roots.insert(name.to_string(), Root { tree, record });
        Ok(())
    }

    /// Attaches lifecycle hooks to a command path such as `app remote`.
    pub fn on(&mut self, path: &str, hooks: impl Hooks + 'static) {
        self.runner.register(path, hooks);
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn tree(&self, root: &str) -> Option<&CommandTree> {
        self.roots.get(root).map(|r| &r.tree)
    }

    pub fn record(&self, root: &str) -> Option<&Record> {
        self.roots.get(root).map(|r| &r.record)
    }

    pub fn record_mut(&mut self, root: &str) -> Option<&mut Record> {
        self.roots.get_mut(root).map(|r| &mut r.record)
    }

    /// Root selected by the last successful parse.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Commands visited by the last successful parse, root first.
    pub fn execution_chain(&self) -> &[ChainLink] {
        &self.chain
    }

    /// Parses against the process environment.
    pub fn parse<S: AsRef<str>>(&mut self, args: &[S]) -> Result<(), ParseError> {
        self.parse_with_env(args, &ProcessEnv)
    }

    /// Parses `args`, whose first element selects the root command.
    pub fn parse_with_env<S: AsRef<str>>(
        &mut self,
        args: &[S],
        env: &dyn EnvSource,
    ) -> Result<(), ParseError> {
        self.selected = None;
        self.chain.clear();
        let program = args.first().map(AsRef::as_ref).unwrap_or_default();
        let name = self
            .find_root(program)
            .ok_or_else(|| ParseError::CommandNotFound(program.to_string()))?;
        let Some(root) = self.roots.get_mut(&name) else {
            return Err(ParseError::CommandNotFound(program.to_string()));
        };
        let chain = crate::parse(&mut root.tree, &mut root.record, args, &self.options, env)?;
        debug!(command = %name, depth = chain.len(), "Parsed command line");
        self.selected = Some(name);
        self.chain = chain;
        Ok(())
    }

    /// Runs lifecycle hooks over the last parse's execution chain.
    pub fn run(&self) -> anyhow::Result<()> {
        let Some(root) = self.selected.as_ref().and_then(|name| self.roots.get(name)) else {
            anyhow::bail!("no command line has been parsed");
        };
        self.runner.execute(&root.record, &self.chain)
    }

    /// Completion candidates for a partial line with the cursor at `point`.
    pub fn complete(&mut self, line: &str, point: usize) -> Vec<String> {
        let program = line.split_whitespace().next().unwrap_or_default();
        let Some(name) = self.find_root(program) else {
            return Vec::new();
        };
        let globals = self.options.globals_enabled;
        match self.roots.get_mut(&name) {
            Some(root) => crate::complete(&mut root.tree, line, point, globals),
            None => Vec::new(),
        }
    }

    /// Detects a shell completion request in `env`.
    pub fn completion_request(&self, env: &dyn EnvSource) -> Option<CompletionRequest> {
        CompletionRequest::from_env(env, &self.options)
    }

    /// Entry point for binaries.
    ///
    /// In completion mode this prints one candidate per line to stdout and
    /// exits the process with status 0. Otherwise it parses the process
    /// arguments.
    pub fn parse_process(&mut self) -> Result<(), ParseError> {
        if let Some(request) = self.completion_request(&ProcessEnv) {
            for candidate in self.complete(&request.line, request.point) {
                println!("{candidate}");
            }
            std::process::exit(0);
        }
        let args: Vec<String> = std::env::args().collect();
        self.parse(&args)
    }

    /// Exact name first, then the last path segment.
    fn find_root(&self, program: &str) -> Option<String> {
        if self.roots.contains_key(program) {
            return Some(program.to_string());
        }
        self.roots
            .iter()
            .find(|(_, root)| root.tree.matches_root(program))
            .map(|(name, _)| name.clone())
    }
}

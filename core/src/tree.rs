//! Command tree derived from a record schema.
//!
//! Commands and arguments live in two arenas owned by [`CommandTree`] and
//! refer to each other through [`CommandId`] / [`ArgId`] handles. The tree is
//! built once by the [`TreeBuilder`](crate::TreeBuilder); parsing only reads
//! it, apart from the per-argument `is_set` marker which [`CommandTree::reset`]
//! clears between independent parses.

use indexmap::IndexMap;

use crate::{ArgKind, BindingPath, Completer, Named, SchemaError};

/// Handle of a command inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(usize);

impl CommandId {
    /// Every tree's root command.
    pub const ROOT: Self = Self(0);
}

/// Handle of an argument inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgId(usize);

/// A flag or positional bound to one record field.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Long form including dashes (`--name`).
    pub long: Option<String>,
    /// Short form including the dash (`-n`).
    pub short: Option<String>,
    /// Environment variable consulted when unset after parsing.
    pub env: Option<String>,
    pub kind: ArgKind,
    pub required: bool,
    pub positional: bool,
    pub global: bool,
    /// Default value words; collections hold one word per element.
    pub defaults: Vec<String>,
    /// Upper-cased display name used for positionals and error messages.
    pub placeholder: String,
    pub usage: Option<String>,
    pub binding: BindingPath,
    pub completers: Vec<Named<dyn Completer>>,
    is_set: bool,
}

impl Argument {
    pub(crate) fn new(kind: ArgKind, binding: BindingPath, placeholder: String) -> Self {
        Self {
            long: None,
            short: None,
            env: None,
            kind,
            required: false,
            positional: false,
            global: false,
            defaults: Vec::new(),
            placeholder,
            usage: None,
            binding,
            completers: Vec::new(),
            is_set: false,
        }
    }

    /// Name used in error messages: the long form, the short form, or the
    /// placeholder for positionals.
    pub fn name(&self) -> &str {
        if self.positional {
            return &self.placeholder;
        }
        self.long
            .as_deref()
            .or(self.short.as_deref())
            .unwrap_or(&self.placeholder)
    }

    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub(crate) fn mark_set(&mut self) {
        self.is_set = true;
    }

    pub fn reset(&mut self) {
        self.is_set = false;
    }

    /// Value candidates: enum names, then every attached completer.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let mut out = self
            .kind
            .enum_table()
            .map(|table| table.complete(prefix))
            .unwrap_or_default();
        for completer in &self.completers {
            out.extend(completer.inner.complete(prefix));
        }
        out
    }

    /// One-line synopsis, e.g. `[-p|--port=PORT]` or `FILES...`.
    pub fn synopsis(&self) -> String {
        let repeat = if self.kind.is_collection() { "..." } else { "" };
        let body = if self.positional {
            format!("{}{repeat}", self.placeholder)
        } else {
            let mut names = Vec::new();
            names.extend(self.short.as_deref());
            names.extend(self.long.as_deref());
            let mut body = names.join("|");
            if !self.kind.is_bool() {
                body.push('=');
                body.push_str(&self.placeholder);
                body.push_str(repeat);
            }
            body
        };
        if self.required {
            body
        } else {
            format!("[{body}]")
        }
    }
}

/// Flag lookup table of one command, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    long: IndexMap<String, ArgId>,
    short: IndexMap<String, ArgId>,
    all: Vec<ArgId>,
}

impl FlagSet {
    /// Looks up `--long` or `-s`.
    pub fn get(&self, name: &str) -> Option<ArgId> {
        self.long
            .get(name)
            .or_else(|| self.short.get(name))
            .copied()
    }

    pub fn all(&self) -> &[ArgId] {
        &self.all
    }

    /// Registers an argument under its names, returning the first colliding
    /// name on failure.
    fn insert(&mut self, id: ArgId, arg: &Argument) -> Result<(), String> {
        for name in [&arg.long, &arg.short].into_iter().flatten() {
            if self.long.contains_key(name) || self.short.contains_key(name) {
                return Err(name.clone());
            }
        }
        if let Some(long) = &arg.long {
            self.long.insert(long.clone(), id);
        }
        if let Some(short) = &arg.short {
            self.short.insert(short.clone(), id);
        }
        self.all.push(id);
        Ok(())
    }
}

/// A node of the command tree.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    /// Space-separated names from the root, e.g. `git remote add`.
    pub path: String,
    pub parent: Option<CommandId>,
    pub usage: Option<String>,
    /// Location of this command's own sub-record.
    pub binding: BindingPath,
    pub flags: FlagSet,
    pub positionals: Vec<ArgId>,
    pub subcommands: IndexMap<String, CommandId>,
}

/// One visited command in an execution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub command: CommandId,
    /// Space-separated command path.
    pub path: String,
    pub binding: BindingPath,
}

/// Arena of commands and arguments rooted at one command.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{FieldSchema, RecordSchema, Registry, TreeBuilder, CliOptions};
///
/// let schema = RecordSchema::new()
///     .with_field(FieldSchema::bool("verbose").short('v'))
///     .with_field(FieldSchema::command("serve", RecordSchema::new()));
/// let registry = Registry::default();
/// let tree = TreeBuilder::new(&CliOptions::default(), &registry)
///     .build("app", &schema)
///     .unwrap();
///
/// let root = tree.root();
/// assert!(tree.lookup_flag(root, "-v").is_some());
/// assert!(tree.lookup_subcommand(root, "serve").is_some());
/// assert!(tree.has_subcommands(root));
/// ```
#[derive(Debug, Clone)]
pub struct CommandTree {
    commands: Vec<Command>,
    arguments: Vec<Argument>,
}

impl CommandTree {
    pub(crate) fn new(name: &str, usage: Option<String>) -> Result<Self, SchemaError> {
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyCommandName);
        }
        Ok(Self {
            commands: vec![Command {
                name: name.to_string(),
                path: name.to_string(),
                parent: None,
                usage,
                binding: BindingPath::root(),
                flags: FlagSet::default(),
                positionals: Vec::new(),
                subcommands: IndexMap::new(),
            }],
            arguments: Vec::new(),
        })
    }

    pub(crate) fn add_subcommand(
        &mut self,
        parent: CommandId,
        name: &str,
        usage: Option<String>,
        binding: BindingPath,
    ) -> Result<CommandId, SchemaError> {
        let path = format!("{} {name}", self.commands[parent.0].path);
        if name.is_empty() || self.commands[parent.0].subcommands.contains_key(name) {
            return Err(SchemaError::DuplicateSubcommand(path));
        }
        let id = CommandId(self.commands.len());
        self.commands.push(Command {
            name: name.to_string(),
            path,
            parent: Some(parent),
            usage,
            binding,
            flags: FlagSet::default(),
            positionals: Vec::new(),
            subcommands: IndexMap::new(),
        });
        self.commands[parent.0].subcommands.insert(name.to_string(), id);
        Ok(id)
    }

    pub(crate) fn add_argument(
        &mut self,
        command: CommandId,
        arg: Argument,
    ) -> Result<ArgId, SchemaError> {
        let id = ArgId(self.arguments.len());
        let cmd = &mut self.commands[command.0];
        if arg.positional {
            let after_collection = cmd
                .positionals
                .last()
                .is_some_and(|last| self.arguments[last.0].kind.is_collection());
            if after_collection {
                return Err(SchemaError::PositionalAfterCollection(arg.placeholder));
            }
            cmd.positionals.push(id);
        } else {
            cmd.flags
                .insert(id, &arg)
                .map_err(|name| SchemaError::DuplicateFlag {
                    command: cmd.path.clone(),
                    name,
                })?;
        }
        self.arguments.push(arg);
        Ok(id)
    }

    pub fn root(&self) -> CommandId {
        CommandId::ROOT
    }

    pub fn name(&self) -> &str {
        &self.commands[0].name
    }

    /// Matches an argv[0] token: exact name, then the last path segment.
    pub fn matches_root(&self, token: &str) -> bool {
        let name = self.name();
        token == name || token.rsplit(['/', '\\']).next() == Some(name)
    }

    pub fn command(&self, id: CommandId) -> &Command {
        &self.commands[id.0]
    }

    pub fn argument(&self, id: ArgId) -> &Argument {
        &self.arguments[id.0]
    }

    pub(crate) fn argument_mut(&mut self, id: ArgId) -> &mut Argument {
        &mut self.arguments[id.0]
    }

    pub fn lookup_flag(&self, command: CommandId, name: &str) -> Option<ArgId> {
        self.command(command).flags.get(name)
    }

    pub fn lookup_subcommand(&self, command: CommandId, name: &str) -> Option<CommandId> {
        self.command(command).subcommands.get(name).copied()
    }

    pub fn positional_at(&self, command: CommandId, index: usize) -> Option<ArgId> {
        self.command(command).positionals.get(index).copied()
    }

    pub fn has_subcommands(&self, command: CommandId) -> bool {
        !self.command(command).subcommands.is_empty()
    }

    /// Flags of a command in declaration order.
    pub fn flags(&self, command: CommandId) -> impl Iterator<Item = (ArgId, &Argument)> {
        self.command(command)
            .flags
            .all()
            .iter()
            .map(|&id| (id, self.argument(id)))
    }

    pub fn positionals(&self, command: CommandId) -> impl Iterator<Item = (ArgId, &Argument)> {
        self.command(command)
            .positionals
            .iter()
            .map(|&id| (id, self.argument(id)))
    }

    /// Flags first, then positionals.
    pub fn arguments_of(&self, command: CommandId) -> Vec<ArgId> {
        let cmd = self.command(command);
        cmd.flags
            .all()
            .iter()
            .chain(cmd.positionals.iter())
            .copied()
            .collect()
    }

    pub fn subcommand_names(&self, command: CommandId) -> impl Iterator<Item = &str> {
        self.command(command).subcommands.keys().map(String::as_str)
    }

    /// Commands from the root down to `command`.
    pub fn ancestry(&self, command: CommandId) -> Vec<CommandId> {
        let mut chain = vec![command];
        let mut current = command;
        while let Some(parent) = self.command(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Every command in depth-first declaration order.
    pub fn walk(&self) -> Vec<CommandId> {
        let mut out = Vec::with_capacity(self.commands.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.command(id).subcommands.values().rev().copied());
        }
        out
    }

    pub fn link(&self, command: CommandId) -> ChainLink {
        let cmd = self.command(command);
        ChainLink {
            command,
            path: cmd.path.clone(),
            binding: cmd.binding.clone(),
        }
    }

    /// Clears every `is_set` marker so the tree can serve another parse.
    pub fn reset(&mut self) {
        for arg in &mut self.arguments {
            arg.reset();
        }
    }
}

//! Tokenizing parser state machine.
//!
//! The machine is an explicit [`State`] plus a pure transition function
//! `(state, token) -> (state, effect)`. [`StateMachine::transition`] decides,
//! [`StateMachine::apply`] performs the effect against the tree and record.
//! Keeping the two apart lets the completion engine replay a line without a
//! record at all (a dry run) and lets each state be tested on its own.
//!
//! `FlagName`, `CompositeFlag` and `PositionalOrSubcommand` are transient
//! phases: they resolve within a single token, so they exist as the helper
//! steps of the transition function rather than as resting states.

use indexmap::IndexMap;
use tracing::debug;

use crate::token::check_flag_name;
use crate::{
    ArgId, ChainLink, CliOptions, CoerceError, CommandId, CommandTree, EnvSource, ParseError,
    Record, Result, Token, TokenKind,
};

/// Resting state between two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Expecting a flag, a positional value or a subcommand name.
    Entry,
    /// A flag was named and its value must follow.
    Value(ArgId),
    /// Appending value tokens to a collection until a flag or separator.
    CollectionValue(ArgId),
    /// Past `--`: every token is a positional value.
    AllPositional,
}

/// Side effect chosen by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect<'a> {
    None,
    /// A flag awaiting its value became the active argument.
    Select(ArgId),
    /// Coerce and write a scalar value.
    Commit { arg: ArgId, value: &'a str },
    /// Coerce and append one collection element.
    Append { arg: ArgId, value: &'a str },
    /// Bind the next positional slot.
    BindPositional { arg: ArgId, value: &'a str },
    /// Enter a subcommand.
    Descend(CommandId),
}

/// Per-invocation parser state over a borrowed tree and record.
pub struct StateMachine<'t> {
    tree: &'t mut CommandTree,
    record: Option<&'t mut Record>,
    globals_enabled: bool,
    globals: IndexMap<String, ArgId>,
    state: State,
    current: CommandId,
    cursor: usize,
    bound: usize,
    chain: Vec<ChainLink>,
    active: Option<ArgId>,
    last: Option<TokenKind>,
    prior: Option<TokenKind>,
}

impl<'t> StateMachine<'t> {
    /// Starts a parse at the root command, writing into `record`.
    pub fn new(tree: &'t mut CommandTree, record: &'t mut Record, globals_enabled: bool) -> Self {
        Self::start(tree, Some(record), globals_enabled)
    }

    /// Starts a replay that tracks state without writing values.
    pub fn dry_run(tree: &'t mut CommandTree, globals_enabled: bool) -> Self {
        Self::start(tree, None, globals_enabled)
    }

    fn start(tree: &'t mut CommandTree, record: Option<&'t mut Record>, globals_enabled: bool) -> Self {
        let root = tree.root();
        let mut machine = Self {
            tree,
            record,
            globals_enabled,
            globals: IndexMap::new(),
            state: State::Entry,
            current: root,
            cursor: 0,
            bound: 0,
            chain: Vec::new(),
            active: None,
            last: None,
            prior: None,
        };
        machine.enter(root);
        machine
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn current(&self) -> CommandId {
        self.current
    }

    pub fn tree(&self) -> &CommandTree {
        &*self.tree
    }

    /// Argument most recently selected or written through a flag.
    pub fn active(&self) -> Option<ArgId> {
        self.active
    }

    /// Kinds of the last two consumed tokens, newest first.
    pub fn last_kinds(&self) -> (Option<TokenKind>, Option<TokenKind>) {
        (self.last, self.prior)
    }

    /// Whether a value token would be tried as a subcommand name.
    pub fn expects_subcommand(&self) -> bool {
        self.state != State::AllPositional
            && self.bound == 0
            && self.tree.has_subcommands(self.current)
    }

    /// Positional the next value token binds to.
    pub fn next_positional(&self) -> Option<ArgId> {
        self.tree.positional_at(self.current, self.cursor)
    }

    /// Global flags reachable from the current command.
    pub fn globals(&self) -> impl Iterator<Item = (&str, ArgId)> {
        self.globals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn chain(&self) -> &[ChainLink] {
        &self.chain
    }

    /// Looks up a flag on the current command, then among globals.
    pub fn resolve_flag(&self, name: &str) -> Option<ArgId> {
        self.tree
            .lookup_flag(self.current, name)
            .or_else(|| self.globals.get(name).copied())
    }

    /// Consumes every token in order, stopping at the first error.
    pub fn run<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        for arg in args {
            self.step(arg.as_ref())?;
        }
        Ok(())
    }

    /// Consumes one raw token.
    pub fn step(&mut self, raw: &str) -> Result<()> {
        let token = match self.state {
            State::AllPositional => Token::Value(raw),
            _ => Token::classify(raw),
        };
        self.prior = self.last;
        self.last = Some(token.kind());

        let (next, effect) = self.transition(&token)?;
        debug!(token = raw, from = ?self.state, to = ?next, effect = ?effect, "Parser transition");
        self.apply(effect)?;
        self.state = next;
        Ok(())
    }

    /// Decides the next state and effect for a token. Reads only.
    pub fn transition<'a>(&self, token: &Token<'a>) -> Result<(State, Effect<'a>)> {
        match (self.state, *token) {
            (State::AllPositional, token) => {
                let arg = self.positional_slot(token.raw())?;
                Ok((State::AllPositional, Effect::BindPositional { arg, value: token.raw() }))
            }
            (State::Value(arg), Token::Value(value)) => {
                if self.tree.argument(arg).kind.is_collection() {
                    Ok((State::CollectionValue(arg), Effect::Append { arg, value }))
                } else {
                    Ok((State::Entry, Effect::Commit { arg, value }))
                }
            }
            (State::Value(arg), other) => Err(self.missing_value(arg, other.raw())),
            (State::CollectionValue(arg), Token::Value(value)) => {
                if self.tree.argument(arg).positional {
                    return Ok((State::CollectionValue(arg), Effect::BindPositional { arg, value }));
                }
                // A subcommand name ends a greedy collection flag.
                if self.expects_subcommand() {
                    if let Some(sub) = self.tree.lookup_subcommand(self.current, value) {
                        return Ok((State::Entry, Effect::Descend(sub)));
                    }
                }
                Ok((State::CollectionValue(arg), Effect::Append { arg, value }))
            }
            (State::Entry | State::CollectionValue(_), Token::Separator) => {
                Ok((State::AllPositional, Effect::None))
            }
            (State::Entry | State::CollectionValue(_), Token::Flag(name)) => self.flag_name(name),
            (State::Entry | State::CollectionValue(_), Token::CompositeFlag { name, value, .. }) => {
                self.composite_flag(name, value)
            }
            (State::Entry, Token::Value(value)) => self.positional_or_subcommand(value),
        }
    }

    fn flag_name<'a>(&self, name: &str) -> Result<(State, Effect<'a>)> {
        let arg = self.lookup(name)?;
        let argument = self.tree.argument(arg);
        if argument.kind.is_bool() {
            Ok((State::Entry, Effect::Commit { arg, value: "" }))
        } else {
            Ok((State::Value(arg), Effect::Select(arg)))
        }
    }

    fn composite_flag<'a>(&self, name: &str, value: &'a str) -> Result<(State, Effect<'a>)> {
        let arg = self.lookup(name)?;
        if self.tree.argument(arg).kind.is_collection() {
            Ok((State::Entry, Effect::Append { arg, value }))
        } else {
            Ok((State::Entry, Effect::Commit { arg, value }))
        }
    }

    fn positional_or_subcommand<'a>(&self, value: &'a str) -> Result<(State, Effect<'a>)> {
        if self.expects_subcommand() {
            if let Some(sub) = self.tree.lookup_subcommand(self.current, value) {
                return Ok((State::Entry, Effect::Descend(sub)));
            }
            if self.tree.command(self.current).positionals.is_empty() {
                return Err(ParseError::CommandNotFound(value.to_string()));
            }
        }
        let arg = self.positional_slot(value)?;
        let next = if self.tree.argument(arg).kind.is_collection() {
            State::CollectionValue(arg)
        } else {
            State::Entry
        };
        Ok((next, Effect::BindPositional { arg, value }))
    }

    fn positional_slot(&self, value: &str) -> Result<ArgId> {
        self.next_positional()
            .ok_or_else(|| ParseError::TooManyPositionalArguments(value.to_string()))
    }

    fn lookup(&self, name: &str) -> Result<ArgId> {
        check_flag_name(name)?;
        self.resolve_flag(name)
            .ok_or_else(|| ParseError::NoSuchFlag(name.to_string()))
    }

    fn missing_value(&self, arg: ArgId, found: &str) -> ParseError {
        ParseError::InvalidValue {
            value: found.to_string(),
            flag: self.tree.argument(arg).name().to_string(),
            reason: "expected a value".to_string(),
        }
    }

    /// Performs an effect chosen by [`transition`](Self::transition).
    pub fn apply(&mut self, effect: Effect<'_>) -> Result<()> {
        match effect {
            Effect::None => {}
            Effect::Select(arg) => self.active = Some(arg),
            Effect::Commit { arg, value } => {
                self.active = Some(arg);
                self.commit(arg, value)?;
            }
            Effect::Append { arg, value } => {
                self.active = Some(arg);
                self.append(arg, value)?;
            }
            Effect::BindPositional { arg, value } => {
                if self.tree.argument(arg).kind.is_collection() {
                    self.append(arg, value)?;
                } else {
                    self.commit(arg, value)?;
                    self.cursor += 1;
                }
                self.bound += 1;
            }
            Effect::Descend(command) => self.enter(command),
        }
        Ok(())
    }

    fn commit(&mut self, arg: ArgId, value: &str) -> Result<()> {
        let argument = self.tree.argument(arg);
        if let Some(record) = self.record.as_deref_mut() {
            argument
                .binding
                .set_scalar(record, &argument.kind, value)
                .map_err(|e| attribute(argument.name(), value, e))?;
        }
        self.tree.argument_mut(arg).mark_set();
        Ok(())
    }

    /// Appends one element; the first append of a parse replaces whatever
    /// the collection held before.
    fn append(&mut self, arg: ArgId, value: &str) -> Result<()> {
        let argument = self.tree.argument(arg);
        if let Some(record) = self.record.as_deref_mut() {
            if !argument.is_set() {
                argument.binding.clear_collection(record);
            }
            argument
                .binding
                .append(record, &argument.kind, value)
                .map_err(|e| attribute(argument.name(), value, e))?;
        }
        self.tree.argument_mut(arg).mark_set();
        Ok(())
    }

    fn enter(&mut self, command: CommandId) {
        self.current = command;
        self.cursor = 0;
        self.bound = 0;
        self.chain.push(self.tree.link(command));

        if self.globals_enabled {
            for (id, arg) in self.tree.flags(command).filter(|(_, a)| a.global) {
                for name in [&arg.long, &arg.short].into_iter().flatten() {
                    self.globals.insert(name.clone(), id);
                }
            }
        }
        let binding = &self.tree.command(command).binding;
        if let Some(record) = self.record.as_deref_mut() {
            binding.materialize(record);
        }
        debug!(command = %self.tree.command(command).path, "Entered command");
    }

    /// Resolves environment values and defaults, checks required arguments
    /// of the final command and returns the execution chain.
    pub fn finish(mut self, env: &dyn EnvSource) -> Result<Vec<ChainLink>> {
        if let State::Value(arg) = self.state {
            return Err(self.missing_value(arg, ""));
        }

        let commands: Vec<CommandId> = self.chain.iter().map(|link| link.command).collect();
        let final_command = self.current;
        for command in commands {
            for arg in self.tree.arguments_of(command) {
                self.resolve_unset(arg, env, command == final_command)?;
            }
        }
        Ok(self.chain)
    }

    fn resolve_unset(&mut self, arg: ArgId, env: &dyn EnvSource, is_final: bool) -> Result<()> {
        let argument = self.tree.argument(arg);
        if argument.is_set() {
            return Ok(());
        }

        if let Some(value) = argument.env.as_deref().and_then(|name| env.var(name)) {
            debug!(argument = argument.name(), env = ?argument.env, "Using environment value");
            if argument.kind.is_collection() {
                let words = shell_words::split(&value).map_err(|e| ParseError::InvalidValue {
                    value: value.clone(),
                    flag: argument.name().to_string(),
                    reason: e.to_string(),
                })?;
                for word in &words {
                    self.append(arg, word)?;
                }
                if words.is_empty() {
                    self.clear(arg);
                    self.tree.argument_mut(arg).mark_set();
                }
            } else {
                self.commit(arg, &value)?;
            }
            return Ok(());
        }

        if is_final && argument.required {
            return Err(ParseError::RequiredNotSet(argument.name().to_string()));
        }

        if argument.defaults.is_empty() {
            return Ok(());
        }
        let Some(record) = self.record.as_deref_mut() else {
            return Ok(());
        };
        debug!(argument = argument.name(), defaults = ?argument.defaults, "Using default value");
        let result = if argument.kind.is_collection() {
            argument.binding.clear_collection(record);
            argument
                .defaults
                .iter()
                .try_for_each(|word| argument.binding.append(record, &argument.kind, word))
        } else {
            argument
                .binding
                .set_scalar(record, &argument.kind, &argument.defaults[0])
        };
        result.map_err(|e| attribute(argument.name(), &argument.defaults.join(" "), e))
    }

    fn clear(&mut self, arg: ArgId) {
        let argument = self.tree.argument(arg);
        if let Some(record) = self.record.as_deref_mut() {
            argument.binding.clear_collection(record);
        }
    }
}

fn attribute(flag: &str, value: &str, err: CoerceError) -> ParseError {
    match err {
        CoerceError::OverCapacity(capacity) => ParseError::ArrayOverCapacity {
            flag: flag.to_string(),
            capacity,
        },
        CoerceError::Invalid(reason) => ParseError::InvalidValue {
            value: value.to_string(),
            flag: flag.to_string(),
            reason,
        },
    }
}

/// Parses `args` against `tree`, writing into `record`.
///
/// `args[0]` must name the root command, either exactly or by its last path
/// segment. Returns the execution chain, root first.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use cmdbind_core::{parse, CliOptions, FieldSchema, Record, RecordSchema, Registry, TreeBuilder, Value};
///
/// let schema = RecordSchema::new().with_field(FieldSchema::int("count"));
/// let options = CliOptions::default();
/// let mut tree = TreeBuilder::new(&options, &Registry::default()).build("app", &schema).unwrap();
/// let mut record = Record::from_schema(&schema);
///
/// let env: HashMap<String, String> = HashMap::new();
/// let chain = parse(&mut tree, &mut record, &["app", "--count", "42"], &options, &env).unwrap();
/// assert_eq!(record.field("count"), Some(&Value::Int(42)));
/// assert_eq!(chain.len(), 1);
/// ```
pub fn parse<S: AsRef<str>>(
    tree: &mut CommandTree,
    record: &mut Record,
    args: &[S],
    options: &CliOptions,
    env: &dyn EnvSource,
) -> Result<Vec<ChainLink>> {
    let Some((program, rest)) = args.split_first() else {
        return Err(ParseError::CommandNotFound(String::new()));
    };
    if !tree.matches_root(program.as_ref()) {
        return Err(ParseError::CommandNotFound(program.as_ref().to_string()));
    }

    tree.reset();
    let mut machine = StateMachine::new(tree, record, options.globals_enabled);
    machine.run(rest)?;
    machine.finish(env)
}

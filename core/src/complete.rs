//! Shell completion by replaying the parser over a partial line.
//!
//! The line is cut at the cursor, split into shell words and replayed through
//! a dry-run [`StateMachine`]. Every word but the one under the cursor is
//! consumed as in a normal parse; the last word (empty when the line ends in
//! a space) decides which candidate source answers:
//!
//! | last token    | trailing space | condition                   | source                         |
//! |---------------|----------------|-----------------------------|--------------------------------|
//! | CompositeFlag | no             |                             | the flag's values, by inline value |
//! | Flag          | yes            | flag takes a value          | the flag's values              |
//! | Flag          | no             |                             | command candidates, by prefix  |
//! | Value         | no             | prior token selected a flag | the flag's values, by prefix   |
//! | anything else |                |                             | command candidates             |
//!
//! Replay errors never surface: the replay stops at the failing word and the
//! candidates come from the state reached so far.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{ArgId, CliOptions, CommandTree, EnvSource, State, StateMachine, Token, TokenKind};

/// Line and cursor offset handed over by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub line: String,
    /// Cursor byte offset within `line`.
    pub point: usize,
}

impl CompletionRequest {
    pub fn new(line: impl Into<String>, point: usize) -> Self {
        Self {
            line: line.into(),
            point,
        }
    }

    /// Reads the request from the two completion variables. Both must be
    /// present; an unparsable cursor offset means "end of line".
    pub fn from_env(env: &dyn EnvSource, options: &CliOptions) -> Option<Self> {
        let line = env.var(&options.completion_line_var)?;
        let point = env.var(&options.completion_point_var)?;
        let point = point.trim().parse().unwrap_or(line.len());
        Some(Self { line, point })
    }
}

/// Where candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source<'a> {
    Command { prefix: &'a str },
    Argument { arg: ArgId, prefix: &'a str },
    Nothing,
}

/// Completion candidates for `line` with the cursor at byte `point`,
/// deduplicated and sorted.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{complete, CliOptions, FieldSchema, RecordSchema, Registry, TreeBuilder};
///
/// let schema = RecordSchema::new()
///     .with_field(FieldSchema::bool("verbose"))
///     .with_field(FieldSchema::bool("version"))
///     .with_field(FieldSchema::bool("quiet"));
/// let mut tree = TreeBuilder::new(&CliOptions::default(), &Registry::default())
///     .build("app", &schema)
///     .unwrap();
///
/// let line = "app --ver";
/// assert_eq!(complete(&mut tree, line, line.len(), false), vec!["--verbose", "--version"]);
/// ```
pub fn complete(tree: &mut CommandTree, line: &str, point: usize, globals_enabled: bool) -> Vec<String> {
    let mut point = point.min(line.len());
    while !line.is_char_boundary(point) {
        point -= 1;
    }
    let line = &line[..point];

    let (words, closed) = split_words(line);
    let trailing_space = closed && line.ends_with(char::is_whitespace);
    let Some((program, rest)) = words.split_first() else {
        return Vec::new();
    };
    if !tree.matches_root(program) {
        debug!(program = %program, "Completion for unknown command");
        return Vec::new();
    }

    let (replay, partial) = match (trailing_space, rest.split_last()) {
        (true, _) => (rest, None),
        (false, Some((last, init))) => (init, Some(last.as_str())),
        // Cursor still on the program name.
        (false, None) => return Vec::new(),
    };

    tree.reset();
    let mut machine = StateMachine::dry_run(tree, globals_enabled);
    for word in replay {
        if let Err(err) = machine.step(word) {
            debug!(word = %word, error = %err, "Completion replay stopped");
            break;
        }
    }

    let source = select_source(&machine, partial);
    debug!(source = ?source, state = ?machine.state(), "Completion source");

    let candidates = match source {
        Source::Command { prefix } => command_candidates(&machine, prefix),
        Source::Argument { arg, prefix } => {
            let argument = machine.tree().argument(arg);
            if argument.kind.is_bool() {
                Vec::new()
            } else {
                argument.complete(prefix)
            }
        }
        Source::Nothing => Vec::new(),
    };

    candidates
        .into_iter()
        .map(|c| c.trim_end_matches(' ').to_string())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn select_source<'a>(machine: &StateMachine<'_>, partial: Option<&'a str>) -> Source<'a> {
    let awaiting = match machine.state() {
        State::Value(arg) => Some(arg),
        _ => None,
    };

    let Some(partial) = partial else {
        // Trailing space: `--flag ` awaiting its value, or a fresh word.
        return match (machine.last_kinds().0, awaiting) {
            (Some(TokenKind::Flag), Some(arg)) => Source::Argument { arg, prefix: "" },
            _ => Source::Command { prefix: "" },
        };
    };

    let token = match machine.state() {
        State::AllPositional => Token::Value(partial),
        _ => Token::classify(partial),
    };
    match token {
        Token::CompositeFlag { name, value, .. } => match machine.resolve_flag(name) {
            Some(arg) => Source::Argument { arg, prefix: value },
            None => Source::Nothing,
        },
        Token::Value(value) => match (machine.last_kinds().0, awaiting) {
            (Some(TokenKind::Flag), Some(arg)) => Source::Argument { arg, prefix: value },
            _ => Source::Command { prefix: value },
        },
        Token::Flag(_) | Token::Separator => Source::Command { prefix: partial },
    }
}

/// Subcommands, unset flags, globals and the next positional's values.
fn command_candidates(machine: &StateMachine<'_>, prefix: &str) -> Vec<String> {
    let tree = machine.tree();
    let current = machine.current();
    let mut names = Vec::new();

    if machine.state() != State::AllPositional {
        if machine.expects_subcommand() {
            names.extend(tree.subcommand_names(current).map(str::to_string));
        }

        let offered = |id: ArgId| {
            let arg = tree.argument(id);
            !arg.is_set() || arg.kind.is_collection()
        };
        for (id, arg) in tree.flags(current) {
            if offered(id) {
                names.extend(arg.long.iter().cloned());
                names.extend(arg.short.iter().cloned());
            }
        }
        for (name, id) in machine.globals() {
            if offered(id) {
                names.push(name.to_string());
            }
        }
    }

    let mut out: Vec<String> = names
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    if let Some(arg) = machine.next_positional() {
        out.extend(tree.argument(arg).complete(prefix));
    }
    out
}

/// Splits a possibly unterminated shell line. The flag reports whether the
/// line ended outside a quote.
fn split_words(line: &str) -> (Vec<String>, bool) {
    if let Ok(words) = shell_words::split(line) {
        return (words, true);
    }
    for quote in ['"', '\''] {
        if let Ok(words) = shell_words::split(&format!("{line}{quote}")) {
            return (words, false);
        }
    }
    (line.split_whitespace().map(str::to_string).collect(), false)
}

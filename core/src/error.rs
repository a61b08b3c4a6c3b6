//! Error types for tree construction and argument parsing.
//!
//! Two families, split by audience:
//!
//! - [`SchemaError`] is raised while a command tree is built from a
//!   [`RecordSchema`](crate::RecordSchema). It points at a defect in the
//!   declared schema and is not something an end user can fix by typing a
//!   different command line.
//! - [`ParseError`] is raised while an argument vector is parsed. Each variant
//!   names the offending token so callers can report it back to the user.
//!
//! [`DocumentError`] covers loading serialized documents.

use thiserror::Error;

/// Schema defects detected while building a command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Root command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Two root commands registered under the same name.
    #[error("duplicate root command: {0}")]
    DuplicateCommand(String),
    /// Short name is not a single flag character (e.g. a digit or `-`).
    #[error("invalid short flag for field {field}: {short:?}")]
    InvalidShortFlag {
        /// Field that declared the short name.
        field: String,
        /// Offending character.
        short: char,
    },
    /// A non-positional field suppressed its long name and has no short name.
    #[error("flag must define short or long form: {0}")]
    MissingFlagName(String),
    /// Two flags in one command share a long or short name.
    #[error("duplicate flag in command {command}: {name}")]
    DuplicateFlag {
        /// Path of the command owning the flag table.
        command: String,
        /// Colliding name, including dashes.
        name: String,
    },
    /// Two subcommands of one command share a name.
    #[error("duplicate subcommand: {0}")]
    DuplicateSubcommand(String),
    /// Two global flags on one ancestor chain share a name.
    #[error("global args propagation collision: {0}")]
    GlobalCollision(String),
    /// A field references a completer that was never registered.
    #[error("no such completer: {0}")]
    UnknownCompleter(String),
    /// A `Custom` field has no decoder registered for its type.
    #[error("no decoder registered for type: {0}")]
    UnknownDecoder(String),
    /// A declared default value does not coerce to the field's kind.
    #[error("invalid default {value:?} for field {field}: {reason}")]
    InvalidDefault {
        /// Field that declared the default.
        field: String,
        /// Default text as declared.
        value: String,
        /// Coercion failure.
        reason: String,
    },
    /// The field's type cannot be bound to an argument.
    #[error("unsupported field {field}: {reason}")]
    UnsupportedField {
        /// Field name.
        field: String,
        /// Why the shape is rejected.
        reason: String,
    },
    /// A positional was declared after a collection positional, which would
    /// swallow every remaining value.
    #[error("positional {0} follows a collection positional")]
    PositionalAfterCollection(String),
}

/// User-input errors returned while parsing an argument vector.
///
/// Values bound from tokens before the failing one stay committed in the
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No root command or subcommand matches the token.
    #[error("command not found: {0}")]
    CommandNotFound(String),
    /// The flag is not declared on the current command or the global table.
    #[error("no such flag: {0}")]
    NoSuchFlag(String),
    /// The token looks like a flag but its name is malformed.
    #[error("invalid flag: {0}")]
    InvalidFlag(String),
    /// The value does not coerce to the argument's kind.
    #[error("invalid value: {value} for flag: {flag} ({reason})")]
    InvalidValue {
        /// Offending value text.
        value: String,
        /// Flag or positional placeholder the value was bound to.
        flag: String,
        /// Coercion failure.
        reason: String,
    },
    /// A required argument of the final command was never set.
    #[error("required argument not set: {0}")]
    RequiredNotSet(String),
    /// A value token arrived with no positional slot left.
    #[error("too many positional arguments: {0}")]
    TooManyPositionalArguments(String),
    /// A fixed-arity collection received more values than it holds.
    #[error("array over capacity: {flag} holds at most {capacity} values")]
    ArrayOverCapacity {
        /// Flag or positional placeholder.
        flag: String,
        /// Declared capacity.
        capacity: usize,
    },
}

/// Failures reading or writing a [`SchemaDocument`](crate::SchemaDocument)
/// or other serialized configuration.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;

//! Bind command lines to declarative record schemas.
//!
//! A [`RecordSchema`] describes a tree of typed fields. [`TreeBuilder`] walks
//! it into a [`CommandTree`]: scalar and collection fields become flags or
//! positionals, by-value records become prefixed argument groups and optional
//! records become subcommands. Parsing drives a [`StateMachine`] over the
//! argument vector and writes straight into a live [`Record`].
//!
//! - [`Cli`]: registry, roots, parsing, completion and lifecycle hooks.
//! - [`parse`]: one tree against one record.
//! - [`complete`]: shell completion by replaying the parser over a partial
//!   line.
//! - [`Runner`]: persistent and per-command [`Hooks`] over the execution
//!   chain, governed by an [`OnErrorStrategy`].
//! - [`SchemaDocument`]: a root schema plus enum tables, loadable from JSON
//!   or YAML.
//!
//! Schema mistakes surface as [`SchemaError`] while building the tree;
//! command-line mistakes surface as [`ParseError`] at the first bad token.
//! Values bound from earlier tokens stay in the record; nothing is rolled
//! back.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use cmdbind_core::*;
//!
//! let schema = RecordSchema::new()
//!     .with_field(FieldSchema::bool("verbose").short('v').global())
//!     .with_field(FieldSchema::command(
//!         "serve",
//!         RecordSchema::new()
//!             .with_field(FieldSchema::uint("port").default_value("8080"))
//!             .with_field(FieldSchema::list("hosts", FieldType::String).positional()),
//!     ));
//!
//! let options = CliOptions { globals_enabled: true, ..CliOptions::default() };
//! let mut cli = Cli::new(options);
//! cli.add_command("app", &schema).unwrap();
//!
//! let env: HashMap<String, String> = HashMap::new();
//! cli.parse_with_env(&["app", "serve", "-v", "a", "b"], &env).unwrap();
//!
//! let record = cli.record("app").unwrap();
//! assert_eq!(record.field("verbose"), Some(&Value::Bool(true)));
//! let serve = record.field("serve").and_then(Value::present).and_then(Value::as_record).unwrap();
//! assert_eq!(serve.field("port"), Some(&Value::Uint(8080)));
//! assert_eq!(serve.field("hosts").and_then(Value::as_list).map(<[Value]>::len), Some(2));
//!
//! let paths: Vec<_> = cli.execution_chain().iter().map(|link| link.path.as_str()).collect();
//! assert_eq!(paths, vec!["app", "app serve"]);
//! ```

mod case;
mod cli;
mod coerce;
mod complete;
mod completer;
mod enums;
mod error;
mod machine;
mod options;
mod package;
mod path;
mod runner;
mod schema;
mod token;
mod tree;
mod value;
mod walk;

pub use case::{Case, Splicer};
pub use cli::Cli;
pub use coerce::{ArgKind, CoerceError, Named, TextDecoder};
pub use complete::{CompletionRequest, complete};
pub use completer::{Completer, FilesCompleter, HostsCompleter};
pub use enums::{EnumDef, EnumTable};
pub use error::{DocumentError, ParseError, Result, SchemaError};
pub use machine::{Effect, State, StateMachine, parse};
pub use options::{CliOptions, EnvSource, ProcessEnv};
pub use package::{DOCUMENT_VERSION, SchemaDocument, from_yaml_str};
pub use path::BindingPath;
pub use runner::{HookContext, Hooks, OnErrorStrategy, Runner};
pub use schema::{CommandTag, FieldSchema, FieldTags, FieldType, NameTag, RecordSchema};
pub use token::{Token, TokenKind};
pub use tree::{ArgId, Argument, ChainLink, Command, CommandId, CommandTree, FlagSet};
pub use value::{Optional, Record, Value};
pub use walk::{Registry, TreeBuilder};

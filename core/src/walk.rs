//! Tree construction from a record schema.
//!
//! The builder visits every field of a [`RecordSchema`] once and turns it
//! into either an [`Argument`] or a child [`Command`](crate::Command):
//!
//! - `ignored` fields are skipped.
//! - `embedded` records are inlined into the enclosing command unprefixed.
//! - By-value records, and optional records tagged as arguments, become
//!   argument groups whose flag and environment names carry the field name as
//!   a prefix.
//! - Other optional records become subcommands.
//! - Everything else becomes a flag or positional.
//!
//! Schema defects are reported as [`SchemaError`]s before any parsing happens.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::{
    ArgKind, Argument, BindingPath, CliOptions, CommandId, CommandTag, CommandTree, Completer,
    EnumTable, FieldSchema, FieldType, FilesCompleter, HostsCompleter, Named, NameTag,
    RecordSchema, SchemaError, TextDecoder,
};

/// Named enum tables, completers and decoders available to the builder.
#[derive(Clone)]
pub struct Registry {
    enums: HashMap<String, Arc<EnumTable>>,
    completers: HashMap<String, Arc<dyn Completer>>,
    decoders: HashMap<String, Arc<dyn TextDecoder>>,
}

impl Default for Registry {
    /// Registry holding the built-in `files` and `hosts` completers.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_completer("files", FilesCompleter);
        registry.register_completer("hosts", HostsCompleter::default());
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut completers: Vec<_> = self.completers.keys().collect();
        completers.sort();
        let mut decoders: Vec<_> = self.decoders.keys().collect();
        decoders.sort();
        f.debug_struct("Registry")
            .field("enums", &self.enums.len())
            .field("completers", &completers)
            .field("decoders", &decoders)
            .finish()
    }
}

impl Registry {
    /// Registry without built-ins.
    pub fn empty() -> Self {
        Self {
            enums: HashMap::new(),
            completers: HashMap::new(),
            decoders: HashMap::new(),
        }
    }

    /// Binds an enum table to integer fields whose `type_name` matches.
    pub fn register_enum(&mut self, table: EnumTable) {
        self.enums
            .insert(table.type_name().to_string(), Arc::new(table));
    }

    /// Registers a completer usable from a field's `complete` tag.
    pub fn register_completer(&mut self, name: &str, completer: impl Completer + 'static) {
        self.completers.insert(name.to_string(), Arc::new(completer));
    }

    /// Registers a decoder for fields whose `type_name` matches.
    pub fn register_decoder(&mut self, type_name: &str, decoder: impl TextDecoder + 'static) {
        self.decoders.insert(type_name.to_string(), Arc::new(decoder));
    }

    pub fn enum_table(&self, type_name: &str) -> Option<&EnumTable> {
        self.enums.get(type_name).map(Arc::as_ref)
    }

    fn decoder_for(&self, field: &FieldSchema) -> Option<Named<dyn TextDecoder>> {
        let type_name = field.type_name.as_deref()?;
        self.decoders
            .get(type_name)
            .map(|d| Named::new(type_name, Arc::clone(d)))
    }
}

/// Naming context of the record being walked.
#[derive(Debug, Clone)]
struct Scope {
    path: BindingPath,
    prefix: String,
    env_prefix: String,
    is_arg: bool,
}

/// Builds a [`CommandTree`] from a root schema.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{CliOptions, FieldSchema, RecordSchema, Registry, TreeBuilder};
///
/// let schema = RecordSchema::new().with_field(FieldSchema::group(
///     "db",
///     RecordSchema::new().with_field(FieldSchema::string("host")),
/// ));
/// let tree = TreeBuilder::new(&CliOptions::default(), &Registry::default())
///     .build("app", &schema)
///     .unwrap();
///
/// let host = tree.lookup_flag(tree.root(), "--db.host").unwrap();
/// assert_eq!(tree.argument(host).env.as_deref(), Some("DB_HOST"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    options: &'a CliOptions,
    registry: &'a Registry,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(options: &'a CliOptions, registry: &'a Registry) -> Self {
        Self { options, registry }
    }

    /// Walks `schema` into a tree rooted at a command called `name`.
    pub fn build(&self, name: &str, schema: &RecordSchema) -> Result<CommandTree, SchemaError> {
        let mut tree = CommandTree::new(name, None)?;
        let root = tree.root();
        let scope = Scope {
            path: BindingPath::root(),
            prefix: String::new(),
            env_prefix: String::new(),
            is_arg: false,
        };
        self.walk(&mut tree, root, schema, &scope)?;
        if self.options.globals_enabled {
            check_globals(&tree)?;
        }
        debug!(command = name, "Built command tree");
        Ok(tree)
    }

    fn walk(
        &self,
        tree: &mut CommandTree,
        command: CommandId,
        schema: &RecordSchema,
        scope: &Scope,
    ) -> Result<(), SchemaError> {
        for field in &schema.fields {
            if field.tags.ignored {
                continue;
            }

            let name = self.arg_name(field, &scope.prefix);
            let env = self.env_name(field, &scope.env_prefix);
            let path = scope.path.child(&field.name);

            let Some((record, optional)) = self.record_shape(field) else {
                self.add_argument(tree, command, field, name, env, path)?;
                continue;
            };

            if field.tags.embedded {
                let inner = Scope { path, ..scope.clone() };
                self.walk(tree, command, record, &inner)?;
                continue;
            }

            if scope.is_arg || !optional || field.tags.command == CommandTag::Argument {
                let inner = Scope {
                    path,
                    prefix: name.unwrap_or_default(),
                    env_prefix: env.unwrap_or_default(),
                    is_arg: true,
                };
                self.walk(tree, command, record, &inner)?;
                continue;
            }

            let command_name = match &field.tags.command {
                CommandTag::Named(name) => name.clone(),
                _ => self.options.cmd_case.apply(&field.name),
            };
            let usage = field.tags.usage.clone();
            let sub = tree.add_subcommand(command, &command_name, usage, path.clone())?;
            debug!(command = %tree.command(sub).path, "Added subcommand");
            let inner = Scope {
                path,
                prefix: String::new(),
                env_prefix: String::new(),
                is_arg: false,
            };
            self.walk(tree, sub, record, &inner)?;
        }
        Ok(())
    }

    /// Record schema behind a field, and whether it sits behind an optional.
    /// Fields with a registered decoder are scalars whatever their shape.
    fn record_shape<'s>(&self, field: &'s FieldSchema) -> Option<(&'s RecordSchema, bool)> {
        if self.registry.decoder_for(field).is_some() {
            return None;
        }
        match &field.ty {
            FieldType::Record(schema) => Some((schema, false)),
            FieldType::Optional(inner) => match inner.as_ref() {
                FieldType::Record(schema) => Some((schema, true)),
                _ => None,
            },
            _ => None,
        }
    }

    fn arg_name(&self, field: &FieldSchema, prefix: &str) -> Option<String> {
        let name = match &field.tags.long {
            NameTag::Skip => return None,
            NameTag::Explicit(name) => return Some(name.clone()),
            NameTag::Name(name) => name.clone(),
            NameTag::Auto => self.options.arg_case.apply(&field.name),
        };
        Some(self.options.arg_splicer.splice(prefix, &name))
    }

    fn env_name(&self, field: &FieldSchema, prefix: &str) -> Option<String> {
        let name = match &field.tags.env {
            NameTag::Skip => return None,
            NameTag::Explicit(name) => return Some(name.clone()),
            NameTag::Name(name) => name.clone(),
            NameTag::Auto => self.options.env_case.apply(&field.name),
        };
        Some(self.options.env_splicer.splice(prefix, &name))
    }

    fn add_argument(
        &self,
        tree: &mut CommandTree,
        command: CommandId,
        field: &FieldSchema,
        name: Option<String>,
        env: Option<String>,
        path: BindingPath,
    ) -> Result<(), SchemaError> {
        let tags = &field.tags;
        let kind = self.kind_for(field, &field.ty, false)?;
        let placeholder = name
            .as_deref()
            .unwrap_or(&field.name)
            .to_uppercase();

        let mut arg = Argument::new(kind, path, placeholder);
        arg.env = env;
        arg.required = tags.required;
        arg.positional = tags.positional;
        arg.global = tags.global && !tags.positional;
        arg.usage = tags.usage.clone();

        if !tags.positional {
            if let Some(short) = tags.short {
                if short.is_ascii_digit() || short == '-' || short == '=' || short.is_whitespace() {
                    return Err(SchemaError::InvalidShortFlag {
                        field: field.name.clone(),
                        short,
                    });
                }
                arg.short = Some(format!("-{short}"));
            }
            arg.long = name.filter(|n| !n.is_empty()).map(|n| format!("--{n}"));
            if arg.long.is_none() && arg.short.is_none() {
                return Err(SchemaError::MissingFlagName(field.name.clone()));
            }
        }

        if let Some(default) = &tags.default {
            arg.defaults = self.parse_default(field, &arg.kind, default)?;
        }

        for completer in &tags.complete {
            let inner = self
                .registry
                .completers
                .get(completer)
                .ok_or_else(|| SchemaError::UnknownCompleter(completer.clone()))?;
            arg.completers.push(Named::new(completer, Arc::clone(inner)));
        }

        debug!(
            command = %tree.command(command).path,
            argument = arg.name(),
            kind = ?arg.kind,
            "Added argument"
        );
        tree.add_argument(command, arg)?;
        Ok(())
    }

    fn kind_for(
        &self,
        field: &FieldSchema,
        ty: &FieldType,
        in_collection: bool,
    ) -> Result<ArgKind, SchemaError> {
        let unsupported = |reason: &str| SchemaError::UnsupportedField {
            field: field.name.clone(),
            reason: reason.to_string(),
        };

        match ty {
            FieldType::Optional(inner) => return self.kind_for(field, inner, in_collection),
            FieldType::List(_) | FieldType::Array(..) if in_collection => {
                return Err(unsupported("nested collections are not supported"));
            }
            FieldType::List(element) => {
                return Ok(ArgKind::Collection {
                    element: Box::new(self.kind_for(field, element, true)?),
                    capacity: None,
                });
            }
            FieldType::Array(element, len) => {
                return Ok(ArgKind::Collection {
                    element: Box::new(self.kind_for(field, element, true)?),
                    capacity: Some(*len),
                });
            }
            _ => {}
        }

        if let Some(decoder) = self.registry.decoder_for(field) {
            return Ok(ArgKind::Custom(decoder));
        }

        let enum_table = || {
            field
                .type_name
                .as_deref()
                .and_then(|t| self.registry.enums.get(t))
                .cloned()
        };

        match ty {
            FieldType::Bool => Ok(ArgKind::Bool),
            FieldType::Float => Ok(ArgKind::Float),
            FieldType::String => Ok(ArgKind::String),
            FieldType::Int(bits) | FieldType::Uint(bits) if !matches!(*bits, 8 | 16 | 32 | 64) => {
                Err(unsupported("integer width must be 8, 16, 32 or 64"))
            }
            FieldType::Int(bits) => Ok(match enum_table() {
                Some(table) => ArgKind::Enum {
                    table,
                    unsigned: false,
                },
                None => ArgKind::Int { bits: *bits },
            }),
            FieldType::Uint(bits) => Ok(match enum_table() {
                Some(table) => ArgKind::Enum {
                    table,
                    unsigned: true,
                },
                None => ArgKind::Uint { bits: *bits },
            }),
            FieldType::Custom => Err(SchemaError::UnknownDecoder(
                field.type_name.clone().unwrap_or_else(|| field.name.clone()),
            )),
            FieldType::Record(_) => Err(unsupported("records cannot be collection elements")),
            FieldType::Optional(_) | FieldType::List(_) | FieldType::Array(..) => {
                Err(unsupported("unexpected wrapper type"))
            }
        }
    }

    fn parse_default(
        &self,
        field: &FieldSchema,
        kind: &ArgKind,
        text: &str,
    ) -> Result<Vec<String>, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidDefault {
            field: field.name.clone(),
            value: text.to_string(),
            reason,
        };

        let words = if kind.is_collection() {
            shell_words::split(text).map_err(|e| invalid(e.to_string()))?
        } else {
            vec![text.to_string()]
        };
        if let Some(cap) = kind.capacity() {
            if words.len() > cap {
                return Err(invalid(format!("more than {cap} values")));
            }
        }
        for word in &words {
            kind.coerce(word).map_err(|e| invalid(e.to_string()))?;
        }
        Ok(words)
    }
}

/// Rejects two global flags sharing a name on one root-to-leaf chain.
fn check_globals(tree: &CommandTree) -> Result<(), SchemaError> {
    for command in tree.walk() {
        let mut seen = HashSet::new();
        for ancestor in tree.ancestry(command) {
            for (_, arg) in tree.flags(ancestor).filter(|(_, a)| a.global) {
                for name in [&arg.long, &arg.short].into_iter().flatten() {
                    if !seen.insert(name.as_str()) {
                        return Err(SchemaError::GlobalCollision(name.clone()));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn build(schema: &RecordSchema) -> Result<CommandTree, SchemaError> {
        TreeBuilder::new(&CliOptions::default(), &Registry::default()).build("app", schema)
    }

    #[test]
    fn test_flag_names_follow_options() {
        let schema = RecordSchema::new()
            .with_field(FieldSchema::uint("maxRetries").short('r'))
            .with_field(FieldSchema::string("dryRun").env("PLAN_ONLY"));
        let tree = build(&schema).unwrap();
        let root = tree.root();

        let retries = tree.argument(tree.lookup_flag(root, "--max-retries").unwrap());
        assert_eq!(retries.short.as_deref(), Some("-r"));
        assert_eq!(retries.env.as_deref(), Some("MAX_RETRIES"));
        assert_eq!(retries.placeholder, "MAX-RETRIES");
        assert_eq!(tree.lookup_flag(root, "-r"), tree.lookup_flag(root, "--max-retries"));

        let dry = tree.argument(tree.lookup_flag(root, "--dry-run").unwrap());
        assert_eq!(dry.env.as_deref(), Some("PLAN_ONLY"));
    }

    #[test]
    fn test_groups_prefix_names_and_explicit_names_do_not() {
        let db = RecordSchema::new()
            .with_field(FieldSchema::string("host"))
            .with_field(FieldSchema::uint("port").explicit_long("db-port").explicit_env("PGPORT"));
        let cache = RecordSchema::new().with_field(FieldSchema::string("host"));
        let schema = RecordSchema::new()
            .with_field(FieldSchema::group("db", db))
            .with_field(FieldSchema::command("cache", cache).as_argument());
        let tree = build(&schema).unwrap();
        let root = tree.root();

        let host = tree.argument(tree.lookup_flag(root, "--db.host").unwrap());
        assert_eq!(host.env.as_deref(), Some("DB_HOST"));
        assert_eq!(host.binding.to_string(), "db.host");
        assert!(tree.lookup_flag(root, "--cache.host").is_some());
        assert!(!tree.has_subcommands(root));

        let port = tree.argument(tree.lookup_flag(root, "--db-port").unwrap());
        assert_eq!(port.env.as_deref(), Some("PGPORT"));
    }

    #[test]
    fn test_duplicate_explicit_names_across_groups_collide() {
        let inner = RecordSchema::new().with_field(FieldSchema::string("a").explicit_long("same"));
        let schema = RecordSchema::new()
            .with_field(FieldSchema::group("one", inner.clone()))
            .with_field(FieldSchema::group("two", inner));
        assert!(matches!(
            build(&schema),
            Err(SchemaError::DuplicateFlag { name, .. }) if name == "--same"
        ));
    }

    #[test]
    fn test_embedded_record_is_inlined() {
        let common = RecordSchema::new().with_field(FieldSchema::bool("debug"));
        let schema = RecordSchema::new().with_field(FieldSchema::group("common", common).embedded());
        let tree = build(&schema).unwrap();

        let debug = tree.argument(tree.lookup_flag(tree.root(), "--debug").unwrap());
        assert_eq!(debug.binding.to_string(), "common.debug");
        assert_eq!(debug.env.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_optional_record_becomes_subcommand() {
        let schema = RecordSchema::new()
            .with_field(FieldSchema::command(
                "setUrl",
                RecordSchema::new().with_field(FieldSchema::string("url").positional()),
            ))
            .with_field(FieldSchema::command("rm", RecordSchema::new()).command_name("remove"));
        let tree = build(&schema).unwrap();
        let root = tree.root();

        let set_url = tree.lookup_subcommand(root, "set-url").unwrap();
        assert_eq!(tree.command(set_url).binding.to_string(), "setUrl");
        let url = tree.argument(tree.positional_at(set_url, 0).unwrap());
        assert_eq!(url.placeholder, "URL");
        assert!(tree.lookup_subcommand(root, "remove").is_some());
        assert_eq!(tree.subcommand_names(root).collect::<Vec<_>>(), vec!["set-url", "remove"]);
    }

    #[test]
    fn test_ignored_fields_are_skipped() {
        let schema = RecordSchema::new().with_field(FieldSchema::string("secret").ignored());
        let tree = build(&schema).unwrap();
        assert_eq!(tree.flags(tree.root()).count(), 0);
    }

    #[test]
    fn test_enum_and_decoder_binding() {
        let mut registry = Registry::default();
        registry.register_enum(EnumTable::new("Level", [("low", 1), ("high", 2)]));
        registry.register_decoder("Addr", |s: &str| Ok::<_, String>(Value::Str(s.to_string())));
        let schema = RecordSchema::new()
            .with_field(FieldSchema::enumeration("level", "Level"))
            .with_field(FieldSchema::custom("addr", "Addr"))
            .with_field(
                FieldSchema::list("levels", FieldType::Uint(8)).with_type_name("Level"),
            );
        let tree = TreeBuilder::new(&CliOptions::default(), &registry)
            .build("app", &schema)
            .unwrap();
        let root = tree.root();

        let level = tree.argument(tree.lookup_flag(root, "--level").unwrap());
        assert!(matches!(level.kind, ArgKind::Enum { unsigned: false, .. }));
        let addr = tree.argument(tree.lookup_flag(root, "--addr").unwrap());
        assert!(matches!(addr.kind, ArgKind::Custom(_)));
        let levels = tree.argument(tree.lookup_flag(root, "--levels").unwrap());
        assert!(matches!(
            levels.kind.element(),
            ArgKind::Enum { unsigned: true, .. }
        ));
    }

    #[test]
    fn test_schema_errors() {
        let cases = [
            (
                FieldSchema::bool("x").short('1'),
                SchemaError::InvalidShortFlag {
                    field: "x".into(),
                    short: '1',
                },
            ),
            (FieldSchema::bool("x").no_long(), SchemaError::MissingFlagName("x".into())),
            (FieldSchema::string("x").complete("nope"), SchemaError::UnknownCompleter("nope".into())),
            (FieldSchema::custom("x", "Nope"), SchemaError::UnknownDecoder("Nope".into())),
            (
                FieldSchema::new("x", FieldType::Int(12)),
                SchemaError::UnsupportedField {
                    field: "x".into(),
                    reason: "integer width must be 8, 16, 32 or 64".into(),
                },
            ),
        ];
        for (field, expected) in cases {
            let schema = RecordSchema::new().with_field(field);
            assert_eq!(build(&schema).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_defaults_are_validated_and_split() {
        let schema = RecordSchema::new()
            .with_field(FieldSchema::list("tags", FieldType::String).default_value("a 'b c'"));
        let tree = build(&schema).unwrap();
        let tags = tree.argument(tree.lookup_flag(tree.root(), "--tags").unwrap());
        assert_eq!(tags.defaults, vec!["a", "b c"]);

        let bad = RecordSchema::new().with_field(FieldSchema::int("n").default_value("ten"));
        assert!(matches!(build(&bad), Err(SchemaError::InvalidDefault { .. })));

        let over = RecordSchema::new()
            .with_field(FieldSchema::array("pair", FieldType::Int(32), 2).default_value("1 2 3"));
        assert!(matches!(build(&over), Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_global_collisions_only_on_one_chain() {
        let options = CliOptions {
            globals_enabled: true,
            ..CliOptions::default()
        };
        let registry = Registry::default();
        let builder = TreeBuilder::new(&options, &registry);

        // Same global name in sibling subtrees and a non-global shadow below.
        let ok = RecordSchema::new()
            .with_field(FieldSchema::bool("verbose").global())
            .with_field(FieldSchema::command(
                "a",
                RecordSchema::new()
                    .with_field(FieldSchema::bool("verbose"))
                    .with_field(FieldSchema::bool("trace").global()),
            ))
            .with_field(FieldSchema::command(
                "b",
                RecordSchema::new().with_field(FieldSchema::bool("trace").global()),
            ));
        assert!(builder.build("app", &ok).is_ok());

        let clash = RecordSchema::new()
            .with_field(FieldSchema::command(
                "a",
                RecordSchema::new().with_field(FieldSchema::bool("verbose").global()),
            ))
            .with_field(FieldSchema::bool("verbose").global());
        assert_eq!(
            builder.build("app", &clash).unwrap_err(),
            SchemaError::GlobalCollision("--verbose".into())
        );
    }
}

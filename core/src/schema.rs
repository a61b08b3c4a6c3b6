//! Declarative record schema.
//!
//! A [`RecordSchema`] describes the fields of a configuration record and the
//! command-line metadata attached to each field. It is the input of the tree
//! builder ([`TreeBuilder`](crate::TreeBuilder)) and of
//! [`Record::from_schema`](crate::Record::from_schema). The types are designed
//! for serialization with [`serde`] so schemas can be shipped as JSON or YAML
//! documents.

use serde::{Deserialize, Serialize};

/// Shape of a record field.
///
/// Integer widths are given in bits and must be one of 8, 16, 32 or 64.
///
/// # Examples
///
/// ```
/// use cmdbind_core::FieldType;
///
/// let ty = FieldType::List(Box::new(FieldType::String));
/// assert!(ty.is_collection());
/// assert!(!FieldType::Int(32).is_collection());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean switch.
    Bool,
    /// Signed integer of the given bit width.
    Int(u8),
    /// Unsigned integer of the given bit width.
    Uint(u8),
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// Value produced only by a registered text decoder.
    Custom,
    /// Growable collection.
    List(Box<FieldType>),
    /// Fixed-arity collection holding at most `len` elements.
    Array(Box<FieldType>, usize),
    /// Optional container, materialized on first write.
    Optional(Box<FieldType>),
    /// Nested record.
    Record(RecordSchema),
}

impl FieldType {
    /// Returns `true` for `List` and `Array`, looking through `Optional`.
    pub fn is_collection(&self) -> bool {
        match self {
            Self::List(_) | Self::Array(..) => true,
            Self::Optional(inner) => inner.is_collection(),
            _ => false,
        }
    }
}

/// Long-name or environment-name override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTag {
    /// Derive the name from the field name and the configured case.
    #[default]
    Auto,
    /// Do not generate this name at all.
    Skip,
    /// Use this name; enclosing argument-group prefixes still apply.
    Name(String),
    /// Use this name verbatim, ignoring enclosing prefixes.
    Explicit(String),
}

/// How a nested optional record is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandTag {
    /// Subcommand named after the field.
    #[default]
    Auto,
    /// Subcommand with an explicit name.
    Named(String),
    /// Not a subcommand: walk the record as a prefixed argument group.
    Argument,
}

/// Command-line metadata attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTags {
    /// Field is not exposed on the command line.
    pub ignored: bool,
    /// Parsing fails when the field is left unset.
    pub required: bool,
    /// Bound by position instead of by flag name.
    pub positional: bool,
    /// Reachable from every descendant command.
    pub global: bool,
    /// Record fields are inlined into the parent without a prefix.
    pub embedded: bool,
    /// Subcommand interpretation of an optional record.
    pub command: CommandTag,
    /// Long flag name override.
    pub long: NameTag,
    /// Environment variable name override.
    pub env: NameTag,
    /// Single-character short flag.
    pub short: Option<char>,
    /// Default value text, shell-word split for collections.
    pub default: Option<String>,
    /// One-line usage text.
    pub usage: Option<String>,
    /// Names of registered completers.
    pub complete: Vec<String>,
}

/// Schema for one record field.
///
/// Use the typed constructors ([`bool`](FieldSchema::bool),
/// [`int`](FieldSchema::int), [`command`](FieldSchema::command), ...) and
/// chain builder methods to attach metadata.
///
/// # Examples
///
/// ```
/// use cmdbind_core::FieldSchema;
///
/// let port = FieldSchema::uint("port")
///     .short('p')
///     .default_value("8080")
///     .usage("Port to listen on");
/// assert_eq!(port.tags.short, Some('p'));
/// assert_eq!(port.tags.default.as_deref(), Some("8080"));
///
/// let files = FieldSchema::list("files", cmdbind_core::FieldType::String).positional();
/// assert!(files.tags.positional);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field identifier inside the record.
    pub name: String,
    /// Field shape.
    pub ty: FieldType,
    /// Named type used to look up enum tables and text decoders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Command-line metadata.
    #[serde(default)]
    pub tags: FieldTags,
}

impl FieldSchema {
    /// Creates a field with default metadata.
    pub fn new(name: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            type_name: None,
            tags: FieldTags::default(),
        }
    }

    /// Boolean switch.
    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// 64-bit signed integer.
    pub fn int(name: &str) -> Self {
        Self::new(name, FieldType::Int(64))
    }

    /// 64-bit unsigned integer.
    pub fn uint(name: &str) -> Self {
        Self::new(name, FieldType::Uint(64))
    }

    /// Float.
    pub fn float(name: &str) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// String.
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Growable collection of `element`.
    pub fn list(name: &str, element: FieldType) -> Self {
        Self::new(name, FieldType::List(Box::new(element)))
    }

    /// Fixed-arity collection of `element`.
    pub fn array(name: &str, element: FieldType, len: usize) -> Self {
        Self::new(name, FieldType::Array(Box::new(element), len))
    }

    /// Optional value, absent until written.
    pub fn optional(name: &str, inner: FieldType) -> Self {
        Self::new(name, FieldType::Optional(Box::new(inner)))
    }

    /// Nested record walked as a prefixed argument group.
    pub fn group(name: &str, schema: RecordSchema) -> Self {
        Self::new(name, FieldType::Record(schema))
    }

    /// Optional nested record, which becomes a subcommand.
    pub fn command(name: &str, schema: RecordSchema) -> Self {
        Self::new(
            name,
            FieldType::Optional(Box::new(FieldType::Record(schema))),
        )
    }

    /// Integer field bound to the enum table registered as `type_name`.
    pub fn enumeration(name: &str, type_name: &str) -> Self {
        Self::int(name).with_type_name(type_name)
    }

    /// Field decoded by the text decoder registered as `type_name`.
    pub fn custom(name: &str, type_name: &str) -> Self {
        Self::new(name, FieldType::Custom).with_type_name(type_name)
    }

    /// Sets the named type.
    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    /// Sets a short flag character.
    pub fn short(mut self, short: char) -> Self {
        self.tags.short = Some(short);
        self
    }

    /// Overrides the long name (still prefixed inside argument groups).
    pub fn long(mut self, long: &str) -> Self {
        self.tags.long = NameTag::Name(long.to_string());
        self
    }

    /// Overrides the long name verbatim.
    pub fn explicit_long(mut self, long: &str) -> Self {
        self.tags.long = NameTag::Explicit(long.to_string());
        self
    }

    /// Suppresses the long name.
    pub fn no_long(mut self) -> Self {
        self.tags.long = NameTag::Skip;
        self
    }

    /// Overrides the environment variable name.
    pub fn env(mut self, env: &str) -> Self {
        self.tags.env = NameTag::Name(env.to_string());
        self
    }

    /// Overrides the environment variable name verbatim.
    pub fn explicit_env(mut self, env: &str) -> Self {
        self.tags.env = NameTag::Explicit(env.to_string());
        self
    }

    /// Disables the environment fallback.
    pub fn no_env(mut self) -> Self {
        self.tags.env = NameTag::Skip;
        self
    }

    /// Declares a default value.
    pub fn default_value(mut self, value: &str) -> Self {
        self.tags.default = Some(value.to_string());
        self
    }

    /// Adds usage text.
    pub fn usage(mut self, usage: &str) -> Self {
        self.tags.usage = Some(usage.to_string());
        self
    }

    /// Attaches a named completer.
    pub fn complete(mut self, completer: &str) -> Self {
        self.tags.complete.push(completer.to_string());
        self
    }

    /// Marks as required.
    pub fn required(mut self) -> Self {
        self.tags.required = true;
        self
    }

    /// Marks as positional.
    pub fn positional(mut self) -> Self {
        self.tags.positional = true;
        self
    }

    /// Marks as global.
    pub fn global(mut self) -> Self {
        self.tags.global = true;
        self
    }

    /// Inlines a record field into its parent.
    pub fn embedded(mut self) -> Self {
        self.tags.embedded = true;
        self
    }

    /// Hides the field from the command line.
    pub fn ignored(mut self) -> Self {
        self.tags.ignored = true;
        self
    }

    /// Walks an optional record as an argument group instead of a subcommand.
    pub fn as_argument(mut self) -> Self {
        self.tags.command = CommandTag::Argument;
        self
    }

    /// Names the subcommand explicitly.
    pub fn command_name(mut self, name: &str) -> Self {
        self.tags.command = CommandTag::Named(name.to_string());
        self
    }
}

/// Ordered field list of one record.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{FieldSchema, RecordSchema};
///
/// let schema = RecordSchema::new()
///     .with_field(FieldSchema::bool("verbose").short('v'))
///     .with_field(FieldSchema::command(
///         "serve",
///         RecordSchema::new().with_field(FieldSchema::uint("port")),
///     ));
///
/// assert_eq!(schema.fields.len(), 2);
/// assert!(schema.field("serve").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Cli, CliOptions, DocumentError, EnumDef, EnumTable, RecordSchema, SchemaError};

/// Current schema document format version.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Serializable bundle of one root schema with the enum tables it uses.
///
/// Documents are what the `cmdbind` tool loads from JSON or YAML.
///
/// # Examples
///
/// ```
/// use cmdbind_core::*;
///
/// let mut document = SchemaDocument::new(
///     "serve",
///     RecordSchema::new().with_field(FieldSchema::enumeration("level", "Level")),
/// );
/// document.enums.push(EnumDef::new("Level", [("debug", 0), ("info", 1)]));
///
/// let cli = document.into_cli(CliOptions::default()).unwrap();
/// assert!(cli.tree("serve").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Document format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Root command name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Enum tables referenced by `type_name` from integer fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumDef>,
    /// The root record.
    pub root: RecordSchema,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl SchemaDocument {
    pub fn new(name: impl Into<String>, root: RecordSchema) -> Self {
        Self {
            version: default_version(),
            name: name.into(),
            description: None,
            enums: Vec::new(),
            root,
        }
    }

    /// Reads a document from YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, DocumentError> {
        from_yaml_str(raw)
    }

    /// Writes the document as YAML, in the same map layout as its JSON form.
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_yaml::to_string(&value)?)
    }

    /// Registers the enum tables and builds the root command.
    pub fn into_cli(self, options: CliOptions) -> Result<Cli, SchemaError> {
        let mut cli = Cli::new(options);
        for def in &self.enums {
            cli.register_enum(EnumTable::from(def));
        }
        cli.add_command(&self.name, &self.root)?;
        Ok(cli)
    }
}

/// Deserializes YAML text using the JSON data model.
///
/// Enum variants that carry data are read from single-key maps such as
/// `ty: {list: string}` rather than YAML tags, so one document reads the same
/// whether it was written as JSON or YAML.
pub fn from_yaml_str<T: DeserializeOwned>(raw: &str) -> Result<T, DocumentError> {
    let value: serde_json::Value = serde_yaml::from_str(raw)?;
    Ok(serde_json::from_value(value)?)
}

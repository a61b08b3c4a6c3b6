//! Enum tables mapping symbolic names to integer values.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bidirectional, case-insensitive name/value table for one enum type.
///
/// Names are stored upper-cased; lookups ignore case.
///
/// # Examples
///
/// ```
/// use cmdbind_core::EnumTable;
///
/// let table = EnumTable::new("Level", [("debug", 0), ("info", 1), ("warn", 2)]);
/// assert_eq!(table.value("Info"), Some(1));
/// assert_eq!(table.name(2), Some("WARN"));
/// assert_eq!(table.complete("d"), vec!["DEBUG".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTable {
    type_name: String,
    values: IndexMap<String, i64>,
    names: HashMap<i64, String>,
}

impl EnumTable {
    /// Builds a table. Later duplicates of a name win.
    pub fn new<I, S>(type_name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut values = IndexMap::new();
        let mut names = HashMap::new();
        for (name, value) in entries {
            let name = name.as_ref().to_uppercase();
            names.entry(value).or_insert_with(|| name.clone());
            values.insert(name, value);
        }
        Self {
            type_name: type_name.to_string(),
            values,
            names,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks up a value by name, ignoring case.
    pub fn value(&self, name: &str) -> Option<i64> {
        self.values.get(&name.to_uppercase()).copied()
    }

    /// Returns the canonical name of a value.
    pub fn name(&self, value: i64) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Names starting with `prefix`, compared case-insensitively.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_uppercase();
        self.values
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

/// Serializable enum declaration, as carried by schema documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    /// Named type that fields reference through `type_name`.
    pub type_name: String,
    /// Symbolic names and their values.
    pub values: IndexMap<String, i64>,
}

impl EnumDef {
    pub fn new<'a>(type_name: &str, values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            type_name: type_name.to_string(),
            values: values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl From<&EnumDef> for EnumTable {
    fn from(def: &EnumDef) -> Self {
        EnumTable::new(&def.type_name, def.values.iter().map(|(k, v)| (k, *v)))
    }
}

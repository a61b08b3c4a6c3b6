//! Live record model.
//!
//! A [`Record`] is the authoritative owner of every parsed value. It is
//! created zeroed from a [`RecordSchema`] and mutated in place through
//! [`BindingPath`](crate::BindingPath)s while a command line is parsed.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{FieldType, RecordSchema};

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// Collection in occurrence order.
    List(Vec<Value>),
    /// Nested record.
    Record(Record),
    /// Pointer-like container, absent until first written.
    Optional(Optional),
    /// Opaque value produced by a custom decoder.
    Json(serde_json::Value),
}

/// Optional container holding the zero value it materializes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Optional {
    zero: Box<Value>,
    inner: Option<Box<Value>>,
}

impl Optional {
    /// Creates an absent optional that materializes to `zero`.
    pub fn absent(zero: Value) -> Self {
        Self {
            zero: Box::new(zero),
            inner: None,
        }
    }

    /// Returns the held value, if present.
    pub fn get(&self) -> Option<&Value> {
        self.inner.as_deref()
    }

    /// Returns `true` once the optional has been written.
    pub fn is_present(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns the held value, allocating the zero value first if absent.
    pub fn materialize(&mut self) -> &mut Value {
        let zero = &self.zero;
        self.inner.get_or_insert_with(|| zero.clone())
    }

    /// Drops the held value.
    pub fn clear(&mut self) {
        self.inner = None;
    }
}

impl Value {
    /// Zero value for a field type.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdbind_core::{FieldType, Value};
    ///
    /// assert_eq!(Value::zero(&FieldType::Int(32)), Value::Int(0));
    /// assert_eq!(
    ///     Value::zero(&FieldType::List(Box::new(FieldType::String))),
    ///     Value::List(vec![]),
    /// );
    /// ```
    pub fn zero(ty: &FieldType) -> Self {
        match ty {
            FieldType::Bool => Self::Bool(false),
            FieldType::Int(_) => Self::Int(0),
            FieldType::Uint(_) => Self::Uint(0),
            FieldType::Float => Self::Float(0.0),
            FieldType::String => Self::Str(String::new()),
            FieldType::Custom => Self::Json(serde_json::Value::Null),
            FieldType::List(_) | FieldType::Array(..) => Self::List(Vec::new()),
            FieldType::Optional(inner) => Self::Optional(Optional::absent(Self::zero(inner))),
            FieldType::Record(schema) => Self::Record(Record::from_schema(schema)),
        }
    }

    /// Looks through a present optional; `None` for an absent one.
    pub fn present(&self) -> Option<&Value> {
        match self {
            Self::Optional(opt) => opt.get().and_then(Value::present),
            other => Some(other),
        }
    }

    /// Returns the concrete slot, allocating optional containers on the way.
    pub fn materialize(&mut self) -> &mut Value {
        match self {
            Self::Optional(opt) => opt.materialize().materialize(),
            other => other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.present()? {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.present()? {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.present()? {
            Self::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.present()? {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.present()? {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.present()? {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self.present()? {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Converts to a JSON value. Absent optionals become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Uint(u) => Json::from(*u),
            Self::Float(f) => Json::from(*f),
            Self::Str(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Record(record) => record.to_json(),
            Self::Optional(opt) => opt.get().map(Value::to_json).unwrap_or(Json::Null),
            Self::Json(value) => value.clone(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Uint(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => serializer.collect_seq(items),
            Self::Record(record) => record.serialize(serializer),
            Self::Optional(opt) => match opt.get() {
                Some(inner) => serializer.serialize_some(inner),
                None => serializer.serialize_none(),
            },
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

/// Insertion-ordered field map.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{FieldSchema, Record, RecordSchema, Value};
///
/// let schema = RecordSchema::new()
///     .with_field(FieldSchema::int("count"))
///     .with_field(FieldSchema::string("name"));
/// let record = Record::from_schema(&schema);
///
/// assert_eq!(record.field("count"), Some(&Value::Int(0)));
/// assert_eq!(record.to_json(), serde_json::json!({"count": 0, "name": ""}));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with every declared field set to its zero value.
    pub fn from_schema(schema: &RecordSchema) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|f| (f.name.clone(), Value::zero(&f.ty)))
            .collect();
        Self { fields }
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Deserializes the record into a caller-defined type.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdbind_core::{FieldSchema, Record, RecordSchema, Value};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Opts {
    ///     count: i64,
    /// }
    ///
    /// let mut record = Record::from_schema(&RecordSchema::new().with_field(FieldSchema::int("count")));
    /// record.insert("count", Value::Int(7));
    /// let opts: Opts = record.deserialize().unwrap();
    /// assert_eq!(opts.count, 7);
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_json())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

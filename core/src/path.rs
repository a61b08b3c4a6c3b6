//! Binding paths into a live record.
//!
//! A [`BindingPath`] is the ordered list of field names leading from the root
//! record to one field. Paths are produced by the tree builder from the same
//! schema the record was created from, so a step naming a field the record
//! does not have is a programming error and panics.

use std::fmt;

use crate::{ArgKind, CoerceError, Record, Value};

/// Locator for one field inside a [`Record`].
///
/// Writes allocate absent optional containers on the way down; reads never
/// allocate and return `None` past an absent optional.
///
/// # Examples
///
/// ```
/// use cmdbind_core::{BindingPath, FieldSchema, Record, RecordSchema, Value};
///
/// let schema = RecordSchema::new().with_field(FieldSchema::command(
///     "remote",
///     RecordSchema::new().with_field(FieldSchema::string("url")),
/// ));
/// let mut record = Record::from_schema(&schema);
/// let url = BindingPath::root().child("remote").child("url");
///
/// assert!(url.get(&record).is_none());
/// url.set(&mut record, Value::Str("git@host".into()));
/// assert_eq!(url.get(&record).and_then(Value::as_str), Some("git@host"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingPath {
    steps: Vec<String>,
}

impl BindingPath {
    /// Path addressing the root record itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extends the path by one field.
    pub fn child(&self, field: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(field.to_string());
        Self { steps }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Reads the addressed value without allocating.
    ///
    /// Returns `None` for the root path and for paths running through an
    /// absent optional.
    pub fn get<'r>(&self, record: &'r Record) -> Option<&'r Value> {
        let (last, parents) = self.steps.split_last()?;
        let mut current = record;
        for step in parents {
            current = current.field(step)?.as_record()?;
        }
        current.field(last)
    }

    /// Reads the addressed record, looking through a present optional.
    pub fn get_record<'r>(&self, record: &'r Record) -> Option<&'r Record> {
        if self.is_root() {
            return Some(record);
        }
        self.get(record)?.as_record()
    }

    /// Resolves the addressed slot for writing.
    ///
    /// Intermediate optional containers are materialized. The final slot is
    /// returned as declared, so an optional leaf is still wrapped.
    ///
    /// # Panics
    ///
    /// Panics on the root path, when a step names a missing field, or when an
    /// intermediate step is not a record.
    pub fn resolve<'r>(&self, record: &'r mut Record) -> &'r mut Value {
        let Some((last, parents)) = self.steps.split_last() else {
            panic!("binding path: the root record has no value slot");
        };
        let mut current = record;
        for step in parents {
            current = match current.field_mut(step).map(Value::materialize) {
                Some(Value::Record(next)) => next,
                Some(_) => panic!("binding path {self}: {step} is not a record"),
                None => panic!("binding path {self}: no field {step}"),
            };
        }
        match current.field_mut(last) {
            Some(slot) => slot,
            None => panic!("binding path {self}: no field {last}"),
        }
    }

    /// Allocates every optional on the path, including the leaf.
    pub fn materialize(&self, record: &mut Record) {
        if !self.is_root() {
            self.resolve(record).materialize();
        }
    }

    /// Writes a value, replacing the previous one.
    pub fn set(&self, record: &mut Record, value: Value) {
        *self.resolve(record).materialize() = value;
    }

    /// Appends one element to the addressed collection.
    ///
    /// # Panics
    ///
    /// Panics when the addressed field is not a collection.
    pub fn push(
        &self,
        record: &mut Record,
        value: Value,
        capacity: Option<usize>,
    ) -> Result<(), CoerceError> {
        let slot = self.resolve(record).materialize();
        let Value::List(items) = slot else {
            panic!("binding path {self}: not a collection");
        };
        match capacity {
            Some(cap) if items.len() >= cap => return Err(CoerceError::OverCapacity(cap)),
            _ => {}
        }
        items.push(value);
        Ok(())
    }

    /// Empties the addressed collection.
    pub fn clear_collection(&self, record: &mut Record) {
        if let Value::List(items) = self.resolve(record).materialize() {
            items.clear();
        }
    }

    /// Coerces `token` with `kind` and writes the result.
    pub fn set_scalar(
        &self,
        record: &mut Record,
        kind: &ArgKind,
        token: &str,
    ) -> Result<(), CoerceError> {
        let value = kind.coerce(token)?;
        self.set(record, value);
        Ok(())
    }

    /// Coerces `token` as one element of `kind` and appends it.
    pub fn append(
        &self,
        record: &mut Record,
        kind: &ArgKind,
        token: &str,
    ) -> Result<(), CoerceError> {
        let value = kind.element().coerce(token)?;
        self.push(record, value, kind.capacity())
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.steps.join("."))
        }
    }
}

//! Value coercion from string tokens.
//!
//! Every argument carries an [`ArgKind`] decided once at tree-construction
//! time. Parsing never inspects the record's shape; it only asks the kind to
//! turn a token into a [`Value`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::{EnumTable, Value};

/// Caller-supplied text decoder for custom value types.
///
/// Implemented for any `Fn(&str) -> Result<Value, String>`.
pub trait TextDecoder: Send + Sync {
    /// Decodes `text`, returning a human-readable reason on failure.
    fn decode(&self, text: &str) -> Result<Value, String>;
}

impl<F> TextDecoder for F
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync,
{
    fn decode(&self, text: &str) -> Result<Value, String> {
        self(text)
    }
}

/// A shared capability registered under a name.
pub struct Named<T: ?Sized> {
    pub name: String,
    pub inner: Arc<T>,
}

impl<T: ?Sized> Named<T> {
    pub fn new(name: &str, inner: Arc<T>) -> Self {
        Self {
            name: name.to_string(),
            inner,
        }
    }
}

impl<T: ?Sized> Clone for Named<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Named<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Named").field(&self.name).finish()
    }
}

/// Coercion failure, not yet attributed to a flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("{0}")]
    Invalid(String),
    #[error("collection holds at most {0} values")]
    OverCapacity(usize),
}

/// Declared kind of an argument.
#[derive(Clone)]
pub enum ArgKind {
    Bool,
    /// Signed integer with a bit width of 8, 16, 32 or 64.
    Int { bits: u8 },
    /// Unsigned integer with a bit width of 8, 16, 32 or 64.
    Uint { bits: u8 },
    Float,
    String,
    /// Integer looked up by symbolic name.
    Enum { table: Arc<EnumTable>, unsigned: bool },
    /// Delegates to a registered decoder.
    Custom(Named<dyn TextDecoder>),
    /// Repeated element; `capacity` bounds fixed-arity collections.
    Collection {
        element: Box<ArgKind>,
        capacity: Option<usize>,
    },
}

impl fmt::Debug for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("Bool"),
            Self::Int { bits } => write!(f, "Int{bits}"),
            Self::Uint { bits } => write!(f, "Uint{bits}"),
            Self::Float => f.write_str("Float"),
            Self::String => f.write_str("String"),
            Self::Enum { table, .. } => write!(f, "Enum({})", table.type_name()),
            Self::Custom(decoder) => write!(f, "Custom({})", decoder.name),
            Self::Collection { element, capacity } => match capacity {
                Some(cap) => write!(f, "[{element:?}; {cap}]"),
                None => write!(f, "[{element:?}]"),
            },
        }
    }
}

impl ArgKind {
    /// Booleans take no separate value token.
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }

    /// Element kind of a collection, or the kind itself.
    pub fn element(&self) -> &ArgKind {
        match self {
            Self::Collection { element, .. } => element,
            other => other,
        }
    }

    /// Fixed capacity of an array collection.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Collection { capacity, .. } => *capacity,
            _ => None,
        }
    }

    /// Enum table consulted for this kind or its element.
    pub fn enum_table(&self) -> Option<&EnumTable> {
        match self.element() {
            Self::Enum { table, .. } => Some(table.as_ref()),
            _ => None,
        }
    }

    /// Coerces a single token. Collections coerce one element.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdbind_core::{ArgKind, Value};
    ///
    /// assert_eq!(ArgKind::Bool.coerce("").unwrap(), Value::Bool(true));
    /// assert_eq!(ArgKind::Bool.coerce("FALSE").unwrap(), Value::Bool(false));
    /// assert_eq!(ArgKind::Int { bits: 64 }.coerce("-42").unwrap(), Value::Int(-42));
    /// assert!(ArgKind::Int { bits: 8 }.coerce("300").is_err());
    /// ```
    pub fn coerce(&self, token: &str) -> Result<Value, CoerceError> {
        match self {
            Self::Bool => parse_bool(token).map(Value::Bool),
            Self::Int { bits } => parse_int(token, *bits).map(Value::Int),
            Self::Uint { bits } => parse_uint(token, *bits).map(Value::Uint),
            Self::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CoerceError::Invalid(e.to_string())),
            Self::String => Ok(Value::Str(token.to_string())),
            Self::Enum { table, unsigned } => {
                let value = table.value(token).ok_or_else(|| {
                    CoerceError::Invalid(format!("unknown {} value", table.type_name()))
                })?;
                if *unsigned {
                    u64::try_from(value)
                        .map(Value::Uint)
                        .map_err(|e| CoerceError::Invalid(e.to_string()))
                } else {
                    Ok(Value::Int(value))
                }
            }
            Self::Custom(decoder) => decoder.inner.decode(token).map_err(CoerceError::Invalid),
            Self::Collection { element, .. } => element.coerce(token),
        }
    }
}

fn parse_bool(token: &str) -> Result<bool, CoerceError> {
    if token.is_empty() || token.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if token.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoerceError::Invalid("expected true or false".to_string()))
    }
}

fn parse_int(token: &str, bits: u8) -> Result<i64, CoerceError> {
    let value = token
        .parse::<i64>()
        .map_err(|e| CoerceError::Invalid(e.to_string()))?;
    if bits < 64 {
        let max = (1i64 << (bits - 1)) - 1;
        let min = -(1i64 << (bits - 1));
        if value < min || value > max {
            return Err(CoerceError::Invalid(format!(
                "out of range for {bits}-bit integer"
            )));
        }
    }
    Ok(value)
}

fn parse_uint(token: &str, bits: u8) -> Result<u64, CoerceError> {
    let value = token
        .parse::<u64>()
        .map_err(|e| CoerceError::Invalid(e.to_string()))?;
    if bits < 64 && value > (1u64 << bits) - 1 {
        return Err(CoerceError::Invalid(format!(
            "out of range for {bits}-bit unsigned integer"
        )));
    }
    Ok(value)
}

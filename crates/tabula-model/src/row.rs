//! Row records and identity resolution.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::RowId;

/// Read-only access to the fields of a caller-defined row.
///
/// The engine never interprets rows beyond this: identity, parent pointers,
/// search and filter predicates all go through string views of single fields.
pub trait RowAccess {
    /// String view of a field, `None` when the field is absent or null.
    fn field_text(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// A JSON object row as delivered by the REST API and the push channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a row from `(key, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wraps a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Identifier stored in the `id` field, if any.
    pub fn id(&self) -> Option<RowId> {
        self.field_text("id").map(|id| RowId::new(id.into_owned()))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl RowAccess for Row {
    fn field_text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

impl RowAccess for Value {
    fn field_text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

type RowKeyFn<R> = dyn Fn(&R, usize) -> RowId + Send + Sync;

/// How a row's identifier is derived: a named field, or a caller function of
/// `(row, index)`.
pub enum RowKey<R> {
    Field(String),
    Custom(Arc<RowKeyFn<R>>),
}

impl<R> RowKey<R> {
    pub fn field(key: impl Into<String>) -> Self {
        Self::Field(key.into())
    }

    pub fn custom(f: impl Fn(&R, usize) -> RowId + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }
}

impl<R: RowAccess> RowKey<R> {
    /// Resolves the id of `row` found at `index` in its page.
    ///
    /// A row missing its id field falls back to its index so that it still
    /// gets a distinct identifier within the page.
    pub fn resolve(&self, row: &R, index: usize) -> RowId {
        match self {
            Self::Field(key) => row
                .field_text(key)
                .map(|id| RowId::new(id.into_owned()))
                .unwrap_or_else(|| RowId::new(index.to_string())),
            Self::Custom(f) => f(row, index),
        }
    }

    /// The row's own id, without the index fallback.
    ///
    /// `None` when the id field is missing or empty. Custom keys always
    /// resolve, as if the row were first on its page.
    pub fn try_resolve(&self, row: &R) -> Option<RowId> {
        match self {
            Self::Field(key) => row
                .field_text(key)
                .filter(|id| !id.is_empty())
                .map(|id| RowId::new(id.into_owned())),
            Self::Custom(f) => Some(f(row, 0)),
        }
    }
}

impl<R> Default for RowKey<R> {
    fn default() -> Self {
        Self::Field("id".to_string())
    }
}

impl<R> Clone for RowKey<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(key) => Self::Field(key.clone()),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for RowKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(key) => f.debug_tuple("Field").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

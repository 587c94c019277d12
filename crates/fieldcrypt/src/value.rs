//! Dynamic, introspectable field values and their container shapes.
//!
//! A [`Value`] is what the engine sees when it reads a directive-bearing
//! field: a string, one of the five supported containers, or something it
//! must reject (null, a non-string scalar, a nested structure).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Runtime container classification of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerShape {
    /// A single string.
    Scalar,
    /// Ordered, index-addressed sequence.
    List,
    /// Unordered collection of distinct values.
    Set,
    /// Key/value mapping; only values are transformed.
    Map,
    /// FIFO sequence.
    Queue,
    /// Fixed-size, one-dimensional sequence.
    Array,
}

impl ContainerShape {
    /// The five container shapes served by strategies.
    pub const CONTAINERS: [ContainerShape; 5] = [
        ContainerShape::List,
        ContainerShape::Set,
        ContainerShape::Map,
        ContainerShape::Queue,
        ContainerShape::Array,
    ];

    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            ContainerShape::Scalar => "Scalar",
            ContainerShape::List => "List",
            ContainerShape::Set => "Set",
            ContainerShape::Map => "Map",
            ContainerShape::Queue => "Queue",
            ContainerShape::Array => "Array",
        }
    }
}

impl fmt::Display for ContainerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A nested structure that is not a recognised container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Record {
    /// Concrete type name, reported in `UnsupportedContainerType` errors.
    pub type_name: String,
    /// Declared fields.
    pub fields: BTreeMap<String, Value>,
}

/// The in-memory value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Text scalar; the only element type the engine transforms.
    Str(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Set of distinct values.
    Set(BTreeSet<Value>),
    /// Mapping with keys of any variant.
    Map(BTreeMap<Value, Value>),
    /// FIFO sequence.
    Queue(VecDeque<Value>),
    /// Fixed-size, one-dimensional sequence.
    Array(Box<[Value]>),
    /// Nested structure.
    Object(Record),
}

impl Value {
    /// Build a [`Value::List`] of strings.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Set`] of strings.
    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Queue`] of strings.
    pub fn queue<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        Value::Queue(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Array`] of strings.
    pub fn array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Map`] from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a [`Value::Object`] for a nested structure named `type_name`.
    pub fn object<I, K>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(Record {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The container shape, or `None` when the value is neither a string nor
    /// one of the five supported containers.
    pub fn shape(&self) -> Option<ContainerShape> {
        match self {
            Value::Str(_) => Some(ContainerShape::Scalar),
            Value::List(_) => Some(ContainerShape::List),
            Value::Set(_) => Some(ContainerShape::Set),
            Value::Map(_) => Some(ContainerShape::Map),
            Value::Queue(_) => Some(ContainerShape::Queue),
            Value::Array(_) => Some(ContainerShape::Array),
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Object(_) => None,
        }
    }

    /// Concrete runtime type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Queue(_) => "Queue",
            Value::Array(_) => "Array",
            Value::Object(record) => &record.type_name,
        }
    }

    /// Number of elements (entries for a map); `None` for non-containers.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(v) => Some(v.len()),
            Value::Set(v) => Some(v.len()),
            Value::Map(v) => Some(v.len()),
            Value::Queue(v) => Some(v.len()),
            Value::Array(v) => Some(v.len()),
            _ => None,
        }
    }

    /// `true` for a container with no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl fmt::Display for Value {
    /// Compact rendering used for map keys in error locations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "<{}>", other.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

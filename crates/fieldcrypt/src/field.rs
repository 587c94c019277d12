//! Typed accessors that expose a struct field to the engine as a [`Value`].
//!
//! A [`CryptoField`] is the read/write half of a field binding: the engine
//! reads the current value, transforms it, and writes a same-shape value
//! back. Writing back a value of a different shape is a [`ShapeMismatch`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use thiserror::Error;

use crate::value::Value;

/// The engine tried to store a value the field's Rust type cannot hold.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot store a `{found}` in a field of type `{expected}`")]
pub struct ShapeMismatch {
    pub expected: &'static str,
    pub found: String,
}

impl ShapeMismatch {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.type_name().to_owned(),
        }
    }
}

/// A directive-bearing struct field.
pub trait CryptoField: Send {
    /// Snapshot of the current value.
    fn read(&self) -> Value;

    /// Replace the current value.
    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch>;

    /// Rust type name of the field, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An element type that typed containers can hold.
pub trait FieldElement: Sized + Send {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self, ShapeMismatch>;
}

impl FieldElement for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ShapeMismatch> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ShapeMismatch::new("String", &other)),
        }
    }
}

impl FieldElement for Option<String> {
    fn to_value(&self) -> Value {
        self.clone().map_or(Value::Null, Value::Str)
    }

    fn from_value(value: Value) -> Result<Self, ShapeMismatch> {
        match value {
            Value::Str(s) => Ok(Some(s)),
            Value::Null => Ok(None),
            other => Err(ShapeMismatch::new("Option<String>", &other)),
        }
    }
}

impl FieldElement for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ShapeMismatch> {
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CryptoField for $ty {
                fn read(&self) -> Value {
                    FieldElement::to_value(self)
                }

                fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
                    *self = <$ty as FieldElement>::from_value(value)?;
                    Ok(())
                }
            }
        )*
    };
}

scalar_field!(String, Option<String>, Value);

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

fn elements<T: FieldElement, C: FromIterator<T>>(
    items: impl IntoIterator<Item = Value>,
) -> Result<C, ShapeMismatch> {
    items.into_iter().map(T::from_value).collect()
}

impl<T: FieldElement> CryptoField for Vec<T> {
    fn read(&self) -> Value {
        Value::List(self.iter().map(FieldElement::to_value).collect())
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::List(items) => elements::<T, _>(items)?,
            other => return Err(ShapeMismatch::new("Vec", &other)),
        };
        Ok(())
    }
}

impl<T: FieldElement> CryptoField for VecDeque<T> {
    fn read(&self) -> Value {
        Value::Queue(self.iter().map(FieldElement::to_value).collect())
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Queue(items) => elements::<T, _>(items)?,
            other => return Err(ShapeMismatch::new("VecDeque", &other)),
        };
        Ok(())
    }
}

impl<T: FieldElement> CryptoField for Box<[T]> {
    fn read(&self) -> Value {
        Value::Array(self.iter().map(FieldElement::to_value).collect())
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Array(items) => elements::<T, _>(items.into_vec())?,
            other => return Err(ShapeMismatch::new("Box<[_]>", &other)),
        };
        Ok(())
    }
}

impl<T: FieldElement + Ord> CryptoField for BTreeSet<T> {
    fn read(&self) -> Value {
        Value::Set(self.iter().map(FieldElement::to_value).collect())
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Set(items) => elements::<T, _>(items)?,
            other => return Err(ShapeMismatch::new("BTreeSet", &other)),
        };
        Ok(())
    }
}

impl<T: FieldElement + Eq + Hash> CryptoField for HashSet<T> {
    fn read(&self) -> Value {
        Value::Set(self.iter().map(FieldElement::to_value).collect())
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Set(items) => elements::<T, _>(items)?,
            other => return Err(ShapeMismatch::new("HashSet", &other)),
        };
        Ok(())
    }
}

fn entries<K, V, C>(map: BTreeMap<Value, Value>) -> Result<C, ShapeMismatch>
where
    K: FieldElement,
    V: FieldElement,
    C: FromIterator<(K, V)>,
{
    map.into_iter()
        .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
        .collect()
}

impl<K: FieldElement + Ord, V: FieldElement> CryptoField for BTreeMap<K, V> {
    fn read(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Map(map) => entries::<K, V, _>(map)?,
            other => return Err(ShapeMismatch::new("BTreeMap", &other)),
        };
        Ok(())
    }
}

impl<K: FieldElement + Eq + Hash, V: FieldElement> CryptoField for HashMap<K, V> {
    fn read(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn write(&mut self, value: Value) -> Result<(), ShapeMismatch> {
        *self = match value {
            Value::Map(map) => entries::<K, V, _>(map)?,
            other => return Err(ShapeMismatch::new("HashMap", &other)),
        };
        Ok(())
    }
}

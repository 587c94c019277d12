//! Key/value maps. Only values are transformed.

use super::{ContainerStrategy, ElementContext};
use crate::error::CryptoError;
use crate::value::{ContainerShape, Value};

/// Map over the values of a [`Value::Map`]; keys pass through unchanged and
/// unchecked. Element locations name the key, e.g. `Profile.attributes["k1"]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStrategy;

impl ContainerStrategy for MapStrategy {
    fn name(&self) -> &'static str {
        "map"
    }

    fn shape(&self) -> ContainerShape {
        ContainerShape::Map
    }

    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        match container {
            Value::Map(entries) => {
                let out = ctx.executor.map(entries.into_iter().collect(), |_, (key, value)| {
                    let value = ctx.transform_element(value, &key)?;
                    Ok((key, value))
                })?;
                Ok(Value::Map(out.into_iter().collect()))
            }
            other => Err(ctx.wrong_shape(self.name(), &other)),
        }
    }
}

//! Fixed-size, one-dimensional arrays.

use super::{ContainerStrategy, ElementContext};
use crate::error::CryptoError;
use crate::value::{ContainerShape, Value};

/// Order-preserving map over a [`Value::Array`]. The output always has the
/// input's length.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayStrategy;

impl ContainerStrategy for ArrayStrategy {
    fn name(&self) -> &'static str {
        "array"
    }

    fn shape(&self) -> ContainerShape {
        ContainerShape::Array
    }

    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        match container {
            Value::Array(items) => {
                let out = ctx.transform_all(items.into_vec())?;
                Ok(Value::Array(out.into_boxed_slice()))
            }
            other => Err(ctx.wrong_shape(self.name(), &other)),
        }
    }
}

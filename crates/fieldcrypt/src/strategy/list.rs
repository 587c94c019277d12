//! Ordered, index-addressed sequences.

use super::{ContainerStrategy, ElementContext};
use crate::error::CryptoError;
use crate::value::{ContainerShape, Value};

/// Order-preserving map over a [`Value::List`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListStrategy;

impl ContainerStrategy for ListStrategy {
    fn name(&self) -> &'static str {
        "list"
    }

    fn shape(&self) -> ContainerShape {
        ContainerShape::List
    }

    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        match container {
            Value::List(items) => ctx.transform_all(items).map(Value::List),
            other => Err(ctx.wrong_shape(self.name(), &other)),
        }
    }
}

//! Sets of distinct values.

use std::collections::BTreeSet;

use tracing::debug;

use super::{ContainerStrategy, ElementContext};
use crate::error::CryptoError;
use crate::value::{ContainerShape, Value};

/// Map over a [`Value::Set`] into a new set.
///
/// Two elements that transform to the same output collapse into one. With a
/// correct key and IV this only happens for ECB-style determinism on equal
/// inputs, which a set cannot contain, so it is accepted rather than guarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetStrategy;

impl ContainerStrategy for SetStrategy {
    fn name(&self) -> &'static str {
        "set"
    }

    fn shape(&self) -> ContainerShape {
        ContainerShape::Set
    }

    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        match container {
            Value::Set(items) => {
                let before = items.len();
                let out: BTreeSet<Value> = ctx.transform_all(items.into_iter().collect())?.into_iter().collect();
                if out.len() != before {
                    debug!(
                        location = ctx.location,
                        before,
                        after = out.len(),
                        "set elements collapsed after transform"
                    );
                }
                Ok(Value::Set(out))
            }
            other => Err(ctx.wrong_shape(self.name(), &other)),
        }
    }
}

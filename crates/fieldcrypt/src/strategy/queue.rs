//! FIFO queues.

use super::{ContainerStrategy, ElementContext};
use crate::error::CryptoError;
use crate::value::{ContainerShape, Value};

/// FIFO-preserving map over a [`Value::Queue`]. Position `0` is the head.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStrategy;

impl ContainerStrategy for QueueStrategy {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn shape(&self) -> ContainerShape {
        ContainerShape::Queue
    }

    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        match container {
            Value::Queue(items) => {
                let out = ctx.transform_all(items.into_iter().collect())?;
                Ok(Value::Queue(out.into()))
            }
            other => Err(ctx.wrong_shape(self.name(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::CryptoDirective;
    use crate::error::Operation;
    use crate::keys::KeyMaterial;
    use crate::strategy::testing::Tagging;
    use crate::strategy::Executor;

    #[test]
    fn keeps_fifo_order() {
        let keys = KeyMaterial::default();
        let directive = CryptoDirective::encrypt_default();
        let executor = Executor::default();
        let ctx = ElementContext {
            backend: &Tagging,
            directive: &directive,
            keys: &keys,
            operation: Operation::Encrypt,
            location: "Job.steps",
            executor: &executor,
        };
        let out = QueueStrategy
            .transform(Value::queue(["first", "second", "third"]), &ctx)
            .unwrap();
        let Value::Queue(mut q) = out else {
            panic!("expected a queue");
        };
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_front(), Some(Value::from("enc:first")));
        assert_eq!(q.pop_front(), Some(Value::from("enc:second")));
        assert_eq!(q.pop_front(), Some(Value::from("enc:third")));
    }
}

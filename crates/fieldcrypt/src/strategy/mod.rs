//! Container strategies: one traversal per container shape, each exposing the
//! four-pipeline contract.
//!
//! A strategy never contains cryptographic logic. It walks its shape, hands
//! every element to [`ElementContext::transform_element`], and rebuilds a
//! container of the same shape from the results. Per-element failures are
//! typed there: null elements are [`CryptoError::EmptyData`], non-strings
//! [`CryptoError::UnsupportedDataType`], backend failures
//! [`CryptoError::ContainerCrypto`].

mod array;
mod list;
mod map;
mod queue;
mod registry;
mod set;

pub use array::ArrayStrategy;
pub use list::ListStrategy;
pub use map::MapStrategy;
pub use queue::QueueStrategy;
pub use registry::StrategyRegistry;
pub use set::SetStrategy;

use std::fmt::Display;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error};

use crate::backend::CryptoBackend;
use crate::directive::CryptoDirective;
use crate::error::{CryptoError, Operation};
use crate::keys::KeyMaterial;
use crate::value::{ContainerShape, Value};

/// Containers with more elements than this are transformed in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 50;

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Element-wise map that switches to a rayon data-parallel map above a size
/// threshold. Results are always collected positionally.
#[derive(Clone, Debug)]
pub struct Executor {
    threshold: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Executor {
    /// Parallel above `threshold` elements, on rayon's global pool.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            pool: None,
        }
    }

    /// Parallel above `threshold` elements, on a dedicated pool of `workers`
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns the rayon error if the pool cannot be built.
    pub fn with_workers(threshold: usize, workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fieldcrypt-worker-{i}"))
            .build()?;
        Ok(Self {
            threshold,
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a container of `len` elements is processed in parallel.
    pub fn is_parallel(&self, len: usize) -> bool {
        len > self.threshold
    }

    /// Apply `f` to every `(index, item)`, stopping at the first error.
    ///
    /// Output order always matches input order. In parallel mode the error
    /// returned is one of the failing elements, not necessarily the first.
    pub fn map<T, U, F>(&self, items: Vec<T>, f: F) -> Result<Vec<U>, CryptoError>
    where
        T: Send,
        U: Send,
        F: Fn(usize, T) -> Result<U, CryptoError> + Send + Sync,
    {
        if !self.is_parallel(items.len()) {
            return items
                .into_iter()
                .enumerate()
                .map(|(i, item)| f(i, item))
                .collect();
        }

        debug!(elements = items.len(), "transforming container in parallel");
        let run = || {
            items
                .into_par_iter()
                .enumerate()
                .map(|(i, item)| f(i, item))
                .collect::<Result<Vec<U>, CryptoError>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_THRESHOLD)
    }
}

// ---------------------------------------------------------------------------
// ElementContext
// ---------------------------------------------------------------------------

/// Everything a strategy needs to transform one container's elements.
#[derive(Clone, Copy)]
pub struct ElementContext<'a> {
    pub backend: &'a dyn CryptoBackend,
    pub directive: &'a CryptoDirective,
    pub keys: &'a KeyMaterial,
    pub operation: Operation,
    /// `Record.field` path of the container being processed.
    pub location: &'a str,
    pub executor: &'a Executor,
}

impl<'a> ElementContext<'a> {
    /// The same context bound to another pipeline.
    pub fn for_operation(self, operation: Operation) -> Self {
        Self { operation, ..self }
    }

    /// `Record.field[position]`.
    pub fn element_location(&self, position: impl Display) -> String {
        format!("{}[{position}]", self.location)
    }

    /// Transform one element at `position` within the container.
    pub fn transform_element(&self, element: Value, position: impl Display) -> Result<Value, CryptoError> {
        self.transform_at(element, || self.element_location(&position))
    }

    /// Transform a value that is not inside a container (a scalar field).
    pub fn transform_scalar(&self, value: Value) -> Result<Value, CryptoError> {
        self.transform_at(value, || self.location.to_owned())
    }

    fn transform_at(&self, value: Value, location: impl Fn() -> String) -> Result<Value, CryptoError> {
        let operation = self.operation;
        let text = match value {
            Value::Str(text) => text,
            Value::Null => {
                let location = location();
                error!(%operation, %location, "null value");
                return Err(CryptoError::EmptyData { operation, location });
            }
            other => {
                let location = location();
                let type_name = other.type_name().to_owned();
                error!(%operation, %location, %type_name, "element is not a string");
                return Err(CryptoError::UnsupportedDataType {
                    operation,
                    location,
                    type_name,
                    value: other,
                });
            }
        };
        if !operation.is_encrypt() && text.trim().is_empty() {
            let location = location();
            error!(%operation, %location, "empty ciphertext");
            return Err(CryptoError::EmptyData { operation, location });
        }

        self.apply(&text).map(Value::Str).map_err(|source| {
            let location = location();
            error!(%operation, %location, error = %source, "backend rejected value");
            CryptoError::ContainerCrypto {
                operation,
                location,
                source,
            }
        })
    }

    fn apply(&self, text: &str) -> Result<String, crate::backend::BackendError> {
        let d = self.directive;
        let keys = self.keys;
        match self.operation {
            Operation::Encrypt => self.backend.encrypt_symmetric(
                d.algorithm,
                d.mode,
                d.padding,
                keys.symmetric_key(self.operation),
                keys.iv_bytes(),
                text,
            ),
            Operation::Decrypt => self.backend.decrypt_symmetric(
                d.algorithm,
                d.mode,
                d.padding,
                keys.symmetric_key(self.operation),
                keys.iv_bytes(),
                text,
            ),
            Operation::AsymmetricEncrypt => {
                self.backend
                    .encrypt_asymmetric(text, keys.private_key(), keys.public_key())
            }
            Operation::AsymmetricDecrypt => {
                self.backend
                    .decrypt_asymmetric(text, keys.private_key(), keys.public_key())
            }
        }
    }

    /// Transform a sequence of elements, positionally.
    pub(crate) fn transform_all(&self, items: Vec<Value>) -> Result<Vec<Value>, CryptoError> {
        self.executor
            .map(items, |i, element| self.transform_element(element, i))
    }

    /// Error for a strategy handed a container of another shape.
    pub(crate) fn wrong_shape(&self, strategy: &str, value: &Value) -> CryptoError {
        CryptoError::general(
            self.operation,
            format!(
                "{strategy} strategy cannot process a `{}` at {}",
                value.type_name(),
                self.location
            ),
        )
    }
}

// ---------------------------------------------------------------------------
// ContainerStrategy
// ---------------------------------------------------------------------------

/// Traversal of one container shape.
///
/// Implementors provide [`transform`](ContainerStrategy::transform); the four
/// pipeline entry points bind the context to their operation and delegate.
pub trait ContainerStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn shape(&self) -> ContainerShape;

    /// Map every element through `ctx.operation`, returning a container of
    /// the same shape.
    fn transform(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError>;

    fn encrypt_symmetric(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        self.transform(container, &ctx.for_operation(Operation::Encrypt))
    }

    fn decrypt_symmetric(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        self.transform(container, &ctx.for_operation(Operation::Decrypt))
    }

    fn encrypt_asymmetric(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        self.transform(container, &ctx.for_operation(Operation::AsymmetricEncrypt))
    }

    fn decrypt_asymmetric(&self, container: Value, ctx: &ElementContext<'_>) -> Result<Value, CryptoError> {
        self.transform(container, &ctx.for_operation(Operation::AsymmetricDecrypt))
    }
}

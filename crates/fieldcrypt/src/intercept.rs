//! The interception layer: field discovery around boundary operations.
//!
//! A structure opts in by implementing [`CryptoRecord`], usually through
//! [`crypto_record!`](crate::crypto_record), which lists its directly declared
//! directive-bearing fields. [`Interceptor::on_exit`] runs an operation and
//! encrypts the fields of its result; [`Interceptor::on_entry`] decrypts the
//! fields of an operation's arguments and then runs it.
//!
//! # Atomicity
//!
//! Processing is two-phase. Every directive field of every scanned record is
//! read and transformed first; values are written back only once all of them
//! succeeded. A failure on any field leaves every field as it was, and the
//! wrapped operation's result is dropped (`on_exit`) or the operation is
//! never invoked (`on_entry`).
//!
//! Nested records are not recursed into; only the top-level fields listed by
//! [`CryptoRecord::bindings`] are processed.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::backend::{CryptoBackend, StandardBackend};
use crate::directive::FieldDirectives;
use crate::dispatch::{ContainerDispatcher, Direction};
use crate::error::{CryptoError, Operation};
use crate::field::CryptoField;
use crate::keys::KeyProvider;
use crate::strategy::{Executor, StrategyRegistry};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Records and arguments
// ---------------------------------------------------------------------------

/// One directive-bearing field of a record, borrowed for one interception.
pub struct FieldBinding<'a> {
    /// Declared field name.
    pub name: &'static str,
    /// Accessor into the owning record.
    pub slot: &'a mut dyn CryptoField,
    pub directives: FieldDirectives,
}

impl std::fmt::Debug for FieldBinding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("type", &self.slot.type_name())
            .field("directives", &self.directives)
            .finish()
    }
}

/// A structure whose directly declared fields may carry directives.
pub trait CryptoRecord {
    /// Name used in error locations (`Profile.phone`).
    fn record_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// The directive-bearing fields, in declaration order.
    fn bindings(&mut self) -> Vec<FieldBinding<'_>>;
}

impl<T: CryptoRecord> CryptoRecord for Box<T> {
    fn record_name(&self) -> &'static str {
        (**self).record_name()
    }

    fn bindings(&mut self) -> Vec<FieldBinding<'_>> {
        (**self).bindings()
    }
}

/// `None` has no fields.
impl<T: CryptoRecord> CryptoRecord for Option<T> {
    fn record_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.record_name(),
            None => "None",
        }
    }

    fn bindings(&mut self) -> Vec<FieldBinding<'_>> {
        self.as_mut().map(CryptoRecord::bindings).unwrap_or_default()
    }
}

/// An argument list that [`Interceptor::on_entry`] can scan.
pub trait Arguments {
    /// The non-null record arguments, in order.
    fn records(&mut self) -> Vec<&mut dyn CryptoRecord>;
}

/// A non-record argument, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Plain<T>(pub T);

impl<T> Arguments for Plain<T> {
    fn records(&mut self) -> Vec<&mut dyn CryptoRecord> {
        Vec::new()
    }
}

impl Arguments for () {
    fn records(&mut self) -> Vec<&mut dyn CryptoRecord> {
        Vec::new()
    }
}

impl<T: CryptoRecord> Arguments for &mut T {
    fn records(&mut self) -> Vec<&mut dyn CryptoRecord> {
        let record: &mut dyn CryptoRecord = &mut **self;
        vec![record]
    }
}

/// `None` is a null argument and is skipped.
impl<A: Arguments> Arguments for Option<A> {
    fn records(&mut self) -> Vec<&mut dyn CryptoRecord> {
        self.as_mut().map(Arguments::records).unwrap_or_default()
    }
}

macro_rules! tuple_arguments {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Arguments),+> Arguments for ($($name,)+) {
            fn records(&mut self) -> Vec<&mut dyn CryptoRecord> {
                let mut out = Vec::new();
                $(out.extend(self.$idx.records());)+
                out
            }
        }
    };
}

tuple_arguments!(A.0);
tuple_arguments!(A.0, B.1);
tuple_arguments!(A.0, B.1, C.2);
tuple_arguments!(A.0, B.1, C.2, D.3);
tuple_arguments!(A.0, B.1, C.2, D.3, E.4);
tuple_arguments!(A.0, B.1, C.2, D.3, E.4, F.5);

/// Implement [`CryptoRecord`] for a struct by listing its directive fields.
///
/// ```
/// use fieldcrypt::{crypto_record, CryptoDirective, FieldDirectives};
///
/// struct Customer {
///     id: u64,
///     email: Option<String>,
///     phones: Vec<String>,
/// }
///
/// crypto_record!(Customer {
///     email: FieldDirectives::both(CryptoDirective::decrypt_default()),
///     phones: FieldDirectives::encrypt(CryptoDirective::encrypt_default()),
/// });
/// ```
#[macro_export]
macro_rules! crypto_record {
    ($ty:ty { $($field:ident : $directives:expr),* $(,)? }) => {
        impl $crate::CryptoRecord for $ty {
            fn record_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn bindings(&mut self) -> ::std::vec::Vec<$crate::FieldBinding<'_>> {
                ::std::vec![
                    $(
                        $crate::FieldBinding {
                            name: stringify!($field),
                            slot: &mut self.$field,
                            directives: $directives,
                        },
                    )*
                ]
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Interceptor
// ---------------------------------------------------------------------------

/// Runs boundary operations with field-level encryption on exit and
/// decryption on entry.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Interceptor {
    dispatcher: ContainerDispatcher,
    keys: Arc<dyn KeyProvider>,
}

impl Interceptor {
    pub fn new(dispatcher: ContainerDispatcher, keys: Arc<dyn KeyProvider>) -> Self {
        Self { dispatcher, keys }
    }

    /// The built-in strategies and [`StandardBackend`], with the default
    /// parallel threshold.
    pub fn with_defaults(keys: Arc<dyn KeyProvider>) -> Self {
        let backend: Arc<dyn CryptoBackend> = Arc::new(StandardBackend::new());
        let dispatcher = ContainerDispatcher::new(
            Arc::new(StrategyRegistry::with_defaults()),
            backend,
            Executor::default(),
        );
        Self::new(dispatcher, keys)
    }

    pub fn dispatcher(&self) -> &ContainerDispatcher {
        &self.dispatcher
    }

    pub fn keys(&self) -> &dyn KeyProvider {
        self.keys.as_ref()
    }

    /// Run `op`, then encrypt the encrypt-directive fields of its result.
    ///
    /// An error from `op` is returned unchanged. A [`CryptoError`] drops the
    /// result and is converted with `E::from`.
    pub fn on_exit<R, E, F>(&self, op: F) -> Result<R, E>
    where
        R: CryptoRecord,
        E: From<CryptoError>,
        F: FnOnce() -> Result<R, E>,
    {
        let mut result = op()?;
        self.encrypt_record(&mut result)?;
        Ok(result)
    }

    /// Decrypt the decrypt-directive fields of every non-null record in
    /// `args`, then run `op` with them and return its result unmodified.
    ///
    /// On a [`CryptoError`] `op` is never invoked.
    pub fn on_entry<A, R, E, F>(&self, mut args: A, op: F) -> Result<R, E>
    where
        A: Arguments,
        E: From<CryptoError>,
        F: FnOnce(A) -> Result<R, E>,
    {
        self.process(args.records(), Direction::Decrypt)?;
        op(args)
    }

    /// Encrypt the encrypt-directive fields of `record` in place.
    pub fn encrypt_record(&self, record: &mut dyn CryptoRecord) -> Result<(), CryptoError> {
        self.process(vec![record], Direction::Encrypt)
    }

    /// Decrypt the decrypt-directive fields of `record` in place.
    pub fn decrypt_record(&self, record: &mut dyn CryptoRecord) -> Result<(), CryptoError> {
        self.process(vec![record], Direction::Decrypt)
    }

    fn process(&self, mut records: Vec<&mut dyn CryptoRecord>, direction: Direction) -> Result<(), CryptoError> {
        let mut staged: Vec<(FieldBinding<'_>, Value, String)> = Vec::new();

        for record in records.iter_mut() {
            let record_name = record.record_name();
            for binding in record.bindings() {
                let location = format!("{record_name}.{}", binding.name);
                if let Some(value) = self.stage(&binding, direction, &location)? {
                    staged.push((binding, value, location));
                }
            }
        }

        debug!(?direction, fields = staged.len(), "writing back processed fields");
        for (binding, value, location) in staged {
            binding.slot.write(value).map_err(|e| {
                let operation = match direction {
                    Direction::Encrypt => Operation::Encrypt,
                    Direction::Decrypt => Operation::Decrypt,
                };
                error!(%operation, %location, error = %e, "field cannot hold processed value");
                CryptoError::general_with(operation, format!("cannot write back {location}"), e)
            })?;
        }
        Ok(())
    }

    /// Compute the new value of one field without touching it. `None` means
    /// the field is left alone.
    fn stage(&self, binding: &FieldBinding<'_>, direction: Direction, location: &str) -> Result<Option<Value>, CryptoError> {
        let Some(directive) = binding.directives.for_direction(direction == Direction::Encrypt) else {
            return Ok(None);
        };
        let Some(family) = directive.algorithm.family() else {
            warn!(
                location,
                algorithm = %directive.algorithm,
                "unrecognized algorithm on directive; field left unchanged"
            );
            return Ok(None);
        };
        let operation = direction.operation(family);

        let value = binding.slot.read();
        if value.is_null() {
            error!(%operation, location, "null field value");
            return Err(CryptoError::EmptyData {
                operation,
                location: location.to_owned(),
            });
        }

        let keys = self.keys.resolve(&directive.algorithm).map_err(|e| {
            error!(%operation, location, error = %e, "key material unavailable");
            CryptoError::general_with(operation, format!("key material unavailable for {}", directive.algorithm), e)
        })?;

        self.dispatcher
            .dispatch(value, directive, &keys, direction, location)
            .map(Some)
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

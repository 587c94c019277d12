//! `fieldcrypt`: declarative field-level encryption.
//!
//! Records declare per-field [`CryptoDirective`]s; an [`Interceptor`] wraps
//! a call, decrypting annotated fields of its arguments on entry and
//! encrypting annotated fields of its result on exit.
//!
//! Layering, bottom to top:
//! 1. [`backend`]: the cipher primitives ([`StandardBackend`]).
//! 2. [`strategy`]: per-container traversal ([`ContainerStrategy`]) and the
//!    [`StrategyRegistry`].
//! 3. [`dispatch`]: shape detection, validation, routing to a strategy.
//! 4. [`intercept`]: directive discovery and two-phase write-back.
//!
//! Every failure surfaces as one of the six [`CryptoError`] variants.

pub mod backend;
pub mod directive;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod intercept;
pub mod keys;
pub mod settings;
pub mod strategy;
pub mod value;

pub use backend::{BackendError, CryptoBackend, StandardBackend};
pub use directive::{AlgorithmFamily, BlockMode, CryptoAlgorithm, CryptoDirective, FieldDirectives, PaddingScheme};
pub use dispatch::{ContainerDispatcher, Direction};
pub use error::{BoxedCause, CryptoError, ErrorKind, Operation};
pub use field::{CryptoField, FieldElement, ShapeMismatch};
pub use intercept::{Arguments, CryptoRecord, FieldBinding, Interceptor, Plain};
pub use keys::{normalize_iv, KeyError, KeyMaterial, KeyProvider, SecretBytes, StaticKeys};
pub use settings::{CryptoSettings, KeyRing, RsaKeySettings, SettingsError, SymmetricKeySettings};
pub use strategy::{ContainerStrategy, ElementContext, Executor, StrategyRegistry};
pub use value::{ContainerShape, Record, Value};

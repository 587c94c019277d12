//! The Container Dispatch Service.
//!
//! Given one field value and its directive, [`ContainerDispatcher::dispatch`]
//! picks the pipeline, validates keys, classifies the value's shape, checks
//! every element up front and hands the container to its strategy. A
//! container is all-or-nothing: nothing is transformed unless every element
//! is a string or null.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::backend::{CryptoBackend, MAX_SINGLE_BLOCK_PLAINTEXT};
use crate::directive::{AlgorithmFamily, CryptoDirective};
use crate::error::{CryptoError, Operation};
use crate::keys::{validate as validate_keys, KeyMaterial};
use crate::strategy::{ElementContext, Executor, StrategyRegistry};
use crate::value::{ContainerShape, Value};

/// Asymmetric containers larger than this are processed with a warning.
pub const ASYMMETRIC_CONTAINER_WARN_LEN: usize = 100;

/// Which lifecycle point a field is processed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// On exit from a boundary operation.
    Encrypt,
    /// On entry to a boundary operation.
    Decrypt,
}

impl Direction {
    /// The pipeline for this direction within `family`.
    pub fn operation(self, family: AlgorithmFamily) -> Operation {
        match (self, family) {
            (Direction::Encrypt, AlgorithmFamily::Symmetric) => Operation::Encrypt,
            (Direction::Decrypt, AlgorithmFamily::Symmetric) => Operation::Decrypt,
            (Direction::Encrypt, AlgorithmFamily::Asymmetric) => Operation::AsymmetricEncrypt,
            (Direction::Decrypt, AlgorithmFamily::Asymmetric) => Operation::AsymmetricDecrypt,
        }
    }

    fn plain_operation(self) -> Operation {
        match self {
            Direction::Encrypt => Operation::Encrypt,
            Direction::Decrypt => Operation::Decrypt,
        }
    }
}

/// Routes field values to strategies and the crypto backend.
#[derive(Clone)]
pub struct ContainerDispatcher {
    registry: Arc<StrategyRegistry>,
    backend: Arc<dyn CryptoBackend>,
    executor: Executor,
}

impl ContainerDispatcher {
    pub fn new(registry: Arc<StrategyRegistry>, backend: Arc<dyn CryptoBackend>, executor: Executor) -> Self {
        Self {
            registry,
            backend,
            executor,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Encrypt or decrypt `value`, returning a value of the same shape.
    ///
    /// `location` is the `Record.field` path used in errors and logs.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::EmptyData`] for a null value, a null element or blank
    ///   ciphertext.
    /// - [`CryptoError::UnsupportedContainerType`] when the value is neither a
    ///   string nor a supported container.
    /// - [`CryptoError::UnsupportedDataType`] for the first non-string element.
    /// - [`CryptoError::ContainerCrypto`] when the backend fails on an element.
    /// - [`CryptoError::InvalidKeyFormat`] / [`CryptoError::General`] for bad
    ///   key material, an unrecognized algorithm or a missing strategy.
    pub fn dispatch(
        &self,
        value: Value,
        directive: &CryptoDirective,
        keys: &KeyMaterial,
        direction: Direction,
        location: &str,
    ) -> Result<Value, CryptoError> {
        let Some(family) = directive.algorithm.family() else {
            let operation = direction.plain_operation();
            error!(%operation, location, algorithm = %directive.algorithm, "unrecognized algorithm");
            return Err(CryptoError::general(
                operation,
                format!("unrecognized algorithm {} on {location}", directive.algorithm),
            ));
        };
        let operation = direction.operation(family);

        if value.is_null() {
            error!(%operation, location, "null field value");
            return Err(CryptoError::EmptyData {
                operation,
                location: location.to_owned(),
            });
        }

        validate_keys(directive, keys, operation).inspect_err(|e| {
            error!(%operation, location, error = %e, "key material rejected");
        })?;

        let Some(shape) = value.shape() else {
            let type_name = value.type_name().to_owned();
            error!(%operation, location, %type_name, "unsupported container type");
            return Err(CryptoError::UnsupportedContainerType {
                operation,
                location: location.to_owned(),
                type_name,
            });
        };

        if family == AlgorithmFamily::Asymmetric {
            warn_on_asymmetric_cost(&value, location);
        }

        let ctx = ElementContext {
            backend: self.backend.as_ref(),
            directive,
            keys,
            operation,
            location,
            executor: &self.executor,
        };

        if shape == ContainerShape::Scalar {
            debug!(%operation, location, %shape, "dispatching scalar field");
            return ctx.transform_scalar(value);
        }

        let Some(strategy) = self.registry.get(shape) else {
            error!(%operation, location, %shape, "no strategy registered");
            return Err(CryptoError::general(
                operation,
                format!("no strategy registered for shape {shape}"),
            ));
        };

        precheck_elements(&value, &ctx)?;

        debug!(
            %operation,
            location,
            %shape,
            strategy = strategy.name(),
            elements = value.len().unwrap_or_default(),
            parallel = self.executor.is_parallel(value.len().unwrap_or_default()),
            "dispatching container field"
        );

        match operation {
            Operation::Encrypt => strategy.encrypt_symmetric(value, &ctx),
            Operation::Decrypt => strategy.decrypt_symmetric(value, &ctx),
            Operation::AsymmetricEncrypt => strategy.encrypt_asymmetric(value, &ctx),
            Operation::AsymmetricDecrypt => strategy.decrypt_asymmetric(value, &ctx),
        }
    }
}

impl std::fmt::Debug for ContainerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerDispatcher")
            .field("registry", &self.registry)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Reject the container if any element (or map value) is neither a string
/// nor null. Runs before any element reaches the backend.
fn precheck_elements(value: &Value, ctx: &ElementContext<'_>) -> Result<(), CryptoError> {
    let reject = |position: String, element: &Value| -> Result<(), CryptoError> {
        let location = ctx.element_location(position);
        let type_name = element.type_name().to_owned();
        error!(operation = %ctx.operation, %location, %type_name, "container holds a non-string element");
        Err(CryptoError::UnsupportedDataType {
            operation: ctx.operation,
            location,
            type_name,
            value: element.clone(),
        })
    };
    let acceptable = |v: &Value| matches!(v, Value::Str(_) | Value::Null);

    match value {
        Value::List(items) => first_bad(items.iter(), acceptable).map_or(Ok(()), |(i, v)| reject(i.to_string(), v)),
        Value::Queue(items) => first_bad(items.iter(), acceptable).map_or(Ok(()), |(i, v)| reject(i.to_string(), v)),
        Value::Array(items) => first_bad(items.iter(), acceptable).map_or(Ok(()), |(i, v)| reject(i.to_string(), v)),
        Value::Set(items) => first_bad(items.iter(), acceptable).map_or(Ok(()), |(i, v)| reject(i.to_string(), v)),
        Value::Map(entries) => entries
            .iter()
            .find(|(_, v)| !acceptable(*v))
            .map_or(Ok(()), |(k, v)| reject(k.to_string(), v)),
        _ => Ok(()),
    }
}

fn first_bad<'v>(
    items: impl Iterator<Item = &'v Value>,
    acceptable: impl Fn(&Value) -> bool,
) -> Option<(usize, &'v Value)> {
    items.enumerate().find(|(_, v)| !acceptable(*v))
}

fn warn_on_asymmetric_cost(value: &Value, location: &str) {
    if let Some(len) = value.len().filter(|&n| n > ASYMMETRIC_CONTAINER_WARN_LEN) {
        warn!(location, elements = len, "large container under RSA; expect slow processing");
    }
    if let Some(text) = value.as_str() {
        if text.len() > MAX_SINGLE_BLOCK_PLAINTEXT {
            warn!(location, bytes = text.len(), "RSA input exceeds one block; it will be segmented");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{test_keys, MockCryptoBackend, StandardBackend};
    use crate::directive::{BlockMode, CryptoAlgorithm, PaddingScheme};
    use crate::error::ErrorKind;
    use crate::keys::SecretBytes;

    const SCENARIO_KEY: &str = "1234567890123456";

    fn aes_cbc() -> CryptoDirective {
        CryptoDirective::new(CryptoAlgorithm::Aes, BlockMode::Cbc, PaddingScheme::Pkcs5)
    }

    fn aes_keys() -> KeyMaterial {
        KeyMaterial::symmetric(SCENARIO_KEY, Some(SecretBytes::from(SCENARIO_KEY)))
    }

    fn dispatcher(backend: Arc<dyn CryptoBackend>) -> ContainerDispatcher {
        ContainerDispatcher::new(Arc::new(StrategyRegistry::with_defaults()), backend, Executor::default())
    }

    fn standard() -> ContainerDispatcher {
        dispatcher(Arc::new(StandardBackend::new()))
    }

    fn round_trip(d: &ContainerDispatcher, directive: &CryptoDirective, keys: &KeyMaterial, value: Value) -> Value {
        let encrypted = d
            .dispatch(value.clone(), directive, keys, Direction::Encrypt, "T.f")
            .unwrap();
        assert_ne!(encrypted, value);
        d.dispatch(encrypted, directive, keys, Direction::Decrypt, "T.f")
            .unwrap()
    }

    #[test]
    fn scenario_aes_cbc_pkcs5_hello_world() {
        let d = standard();
        let out = round_trip(&d, &aes_cbc(), &aes_keys(), Value::from("hello world"));
        assert_eq!(out, Value::from("hello world"));
    }

    #[test]
    fn every_shape_round_trips() {
        let d = standard();
        let keys = aes_keys();
        for value in [
            Value::list(["a", "b", "c"]),
            Value::set(["x", "y"]),
            Value::map([("k1", "v1"), ("k2", "v2")]),
            Value::queue(["first", "second", "third"]),
            Value::array(["p", "q"]),
        ] {
            assert_eq!(round_trip(&d, &aes_cbc(), &keys, value.clone()), value);
        }
    }

    #[test]
    fn des_and_rsa_round_trip() {
        let d = standard();
        let des = CryptoDirective::new(CryptoAlgorithm::Des, BlockMode::Cfb, PaddingScheme::Pkcs5);
        let des_keys = KeyMaterial::symmetric("12345678", Some(SecretBytes::from("abcdefgh")));
        let v = Value::queue(["one", "two"]);
        assert_eq!(round_trip(&d, &des, &des_keys, v.clone()), v);

        let rsa = test_keys::rsa_1024();
        let rsa_keys = KeyMaterial::asymmetric(rsa.private_pkcs8.as_str(), rsa.public_spki.as_str());
        let v = Value::list(["alpha", "beta"]);
        assert_eq!(round_trip(&d, &CryptoDirective::rsa(), &rsa_keys, v.clone()), v);
    }

    #[test]
    fn rsa_private_only_keys_encrypt_through_dispatch() {
        let d = standard();
        let rsa = test_keys::rsa_1024();
        let keys = KeyMaterial::asymmetric(rsa.private_pkcs8.as_str(), "");
        let out = round_trip(&d, &CryptoDirective::rsa(), &keys, Value::from("x"));
        assert_eq!(out, Value::from("x"));
    }

    #[test]
    fn large_list_parallel_matches_sequential() {
        let keys = aes_keys();
        let directive = CryptoDirective::new(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::Pkcs5);
        let input = Value::list((0..200).map(|i| format!("value-{i:04}")));
        let sequential = ContainerDispatcher::new(
            Arc::new(StrategyRegistry::with_defaults()),
            Arc::new(StandardBackend::new()),
            Executor::new(usize::MAX),
        );
        let parallel = standard();
        let a = sequential
            .dispatch(input.clone(), &directive, &keys, Direction::Encrypt, "T.f")
            .unwrap();
        let b = parallel
            .dispatch(input, &directive, &keys, Direction::Encrypt, "T.f")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mixed_list_fails_before_any_backend_call() {
        let mut backend = MockCryptoBackend::new();
        backend.expect_encrypt_symmetric().times(0);
        let d = dispatcher(Arc::new(backend));
        let err = d
            .dispatch(
                Value::List(vec![Value::from("a"), Value::Int(5), Value::from("b")]),
                &aes_cbc(),
                &aes_keys(),
                Direction::Encrypt,
                "Profile.emails",
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDataType);
        assert_eq!(err.location(), Some("Profile.emails[1]"));
        let CryptoError::UnsupportedDataType { value, type_name, .. } = err else {
            unreachable!()
        };
        assert_eq!(value, Value::Int(5));
        assert_eq!(type_name, "Int");
    }

    #[test]
    fn map_with_non_string_value_names_key() {
        let mut backend = MockCryptoBackend::new();
        backend.expect_encrypt_symmetric().times(0);
        let d = dispatcher(Arc::new(backend));
        let value = Value::Map(
            [
                (Value::from("ok"), Value::from("v")),
                (Value::from("bad"), Value::Bool(true)),
            ]
            .into_iter()
            .collect(),
        );
        let err = d
            .dispatch(value, &aes_cbc(), &aes_keys(), Direction::Encrypt, "P.attrs")
            .unwrap_err();
        assert_eq!(err.location(), Some("P.attrs[\"bad\"]"));
    }

    #[test]
    fn null_value_and_null_element() {
        let d = standard();
        let err = d
            .dispatch(Value::Null, &aes_cbc(), &aes_keys(), Direction::Encrypt, "P.phone")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
        assert_eq!(err.operation(), Operation::Encrypt);

        let err = d
            .dispatch(
                Value::List(vec![Value::from("a"), Value::Null]),
                &aes_cbc(),
                &aes_keys(),
                Direction::Encrypt,
                "P.emails",
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
        assert_eq!(err.location(), Some("P.emails[1]"));
    }

    #[test]
    fn empty_containers_pass_through() {
        let d = standard();
        for value in [Value::list(Vec::<String>::new()), Value::map(Vec::<(String, String)>::new())] {
            let out = d
                .dispatch(value.clone(), &aes_cbc(), &aes_keys(), Direction::Encrypt, "T.f")
                .unwrap();
            assert_eq!(out, value);
        }
    }

    #[test]
    fn nested_object_is_unsupported_container() {
        let d = standard();
        let nested = Value::object("Address", [("city", Value::from("Oslo"))]);
        let err = d
            .dispatch(nested, &aes_cbc(), &aes_keys(), Direction::Encrypt, "P.address")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedContainerType);
        assert!(err.to_string().contains("Address"));
    }

    #[test]
    fn unsupported_scalar_types() {
        let d = standard();
        let err = d
            .dispatch(Value::Int(7), &aes_cbc(), &aes_keys(), Direction::Encrypt, "P.age")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedContainerType);
    }

    #[test]
    fn missing_strategy_is_general_error() {
        let mut registry = StrategyRegistry::with_defaults();
        registry.unregister(ContainerShape::Queue);
        let d = ContainerDispatcher::new(Arc::new(registry), Arc::new(StandardBackend::new()), Executor::default());
        let err = d
            .dispatch(Value::queue(["a"]), &aes_cbc(), &aes_keys(), Direction::Encrypt, "T.q")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
        assert!(err.to_string().contains("Queue"));
    }

    #[test]
    fn bad_key_is_rejected_before_backend() {
        let mut backend = MockCryptoBackend::new();
        backend.expect_encrypt_symmetric().times(0);
        let d = dispatcher(Arc::new(backend));
        let keys = KeyMaterial::symmetric("short", Some(SecretBytes::from(SCENARIO_KEY)));
        let err = d
            .dispatch(Value::from("x"), &aes_cbc(), &keys, Direction::Encrypt, "T.f")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }

    #[test]
    fn backend_failure_wraps_cause() {
        use std::error::Error as _;

        let d = standard();
        let err = d
            .dispatch(Value::from("zz-not-cipher"), &aes_cbc(), &aes_keys(), Direction::Decrypt, "T.f")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerCryptoError);
        assert_eq!(err.operation(), Operation::Decrypt);
        assert!(err.source().is_some());
    }

    #[test]
    fn rsa_selects_asymmetric_operation() {
        let mut backend = MockCryptoBackend::new();
        backend
            .expect_encrypt_asymmetric()
            .times(1)
            .returning(|plain, _, _| Ok(format!("rsa({plain})")));
        let d = dispatcher(Arc::new(backend));
        let keys = KeyMaterial::asymmetric("", "QUJD");
        let out = d
            .dispatch(Value::from("x"), &CryptoDirective::rsa(), &keys, Direction::Encrypt, "T.f")
            .unwrap();
        assert_eq!(out, Value::from("rsa(x)"));
    }

    #[test]
    fn unrecognized_algorithm_is_general_error() {
        let d = standard();
        let directive = CryptoDirective::new(
            CryptoAlgorithm::Unrecognized("SM4"),
            BlockMode::Cbc,
            PaddingScheme::Pkcs5,
        );
        let err = d
            .dispatch(Value::from("x"), &directive, &aes_keys(), Direction::Encrypt, "T.f")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }
}

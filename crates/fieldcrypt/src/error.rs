//! The closed error taxonomy shared by every layer of the engine.
//!
//! Errors are created at the point of failure and propagate unchanged to the
//! caller of [`Interceptor::on_exit`](crate::Interceptor::on_exit) /
//! [`Interceptor::on_entry`](crate::Interceptor::on_entry). Nothing is retried
//! and nothing is downgraded to a log line, with the single exception of a
//! directive naming an unrecognized algorithm.
//!
//! # Redaction
//!
//! Plaintext and ciphertext strings never appear in an error. Locations name
//! the record, field and element (`Profile.emails[2]`); only non-string
//! offending values (which cannot be secrets by construction) are embedded.

use std::fmt;

use thiserror::Error;

use crate::backend::BackendError;
use crate::value::Value;

/// Which of the four crypto pipelines an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Symmetric encryption (AES / DES).
    Encrypt,
    /// Symmetric decryption (AES / DES).
    Decrypt,
    /// Asymmetric encryption (RSA).
    AsymmetricEncrypt,
    /// Asymmetric decryption (RSA).
    AsymmetricDecrypt,
}

impl Operation {
    /// `true` for the two encrypt pipelines.
    pub fn is_encrypt(self) -> bool {
        matches!(self, Operation::Encrypt | Operation::AsymmetricEncrypt)
    }

    /// `true` for the two asymmetric pipelines.
    pub fn is_asymmetric(self) -> bool {
        matches!(
            self,
            Operation::AsymmetricEncrypt | Operation::AsymmetricDecrypt
        )
    }

    /// Short label used in messages and log fields.
    pub fn label(self) -> &'static str {
        match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::AsymmetricEncrypt => "asymmetric encrypt",
            Operation::AsymmetricDecrypt => "asymmetric decrypt",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of a [`CryptoError`], one per row of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A field, container or element value is null.
    EmptyData,
    /// The runtime type of a field value is neither a string nor a supported container.
    UnsupportedContainerType,
    /// An element inside a container is not a string.
    UnsupportedDataType,
    /// The crypto backend failed on a value.
    ContainerCryptoError,
    /// Key material is not in the expected encoding.
    InvalidKeyFormat,
    /// Anything else: bad key/IV length, missing key, registry misconfiguration.
    GeneralError,
}

/// Boxed cause attached to [`CryptoError::General`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A typed engine failure.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The value at `location` is null.
    #[error("{operation} failed: {location} must not be null")]
    EmptyData {
        /// Pipeline that rejected the value.
        operation: Operation,
        /// Record, field and element path.
        location: String,
    },

    /// The value at `location` is not a string or a supported container.
    #[error("{operation} failed: {location} has unsupported container type `{type_name}`")]
    UnsupportedContainerType {
        /// Pipeline that rejected the value.
        operation: Operation,
        /// Record and field path.
        location: String,
        /// Concrete runtime type name of the value.
        type_name: String,
    },

    /// An element at `location` is not a string.
    #[error("{operation} failed: {location} holds a `{type_name}`; only strings can be processed")]
    UnsupportedDataType {
        /// Pipeline that rejected the container.
        operation: Operation,
        /// Record, field and index or key of the element.
        location: String,
        /// Concrete runtime type name of the element.
        type_name: String,
        /// The offending element.
        value: Value,
    },

    /// The crypto backend rejected the value at `location`.
    #[error("{operation} failed for {location}")]
    ContainerCrypto {
        /// Pipeline that invoked the backend.
        operation: Operation,
        /// Record, field and element path.
        location: String,
        /// Error raised by the backend.
        #[source]
        source: BackendError,
    },

    /// Key material is not in the expected encoding.
    #[error("{operation} failed: invalid key format: {message}")]
    InvalidKeyFormat {
        /// Pipeline that validated the key.
        operation: Operation,
        /// What is wrong with the key (never the key itself).
        message: String,
    },

    /// Any other failure.
    #[error("{operation} failed: {message}")]
    General {
        /// Pipeline that failed.
        operation: Operation,
        /// Human-readable description.
        message: String,
        /// Underlying cause, when there is one.
        #[source]
        source: Option<BoxedCause>,
    },
}

impl CryptoError {
    /// Shorthand for a [`CryptoError::General`] without a cause.
    pub fn general(operation: Operation, message: impl Into<String>) -> Self {
        CryptoError::General {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`CryptoError::General`] wrapping `cause`.
    pub fn general_with(
        operation: Operation,
        message: impl Into<String>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        CryptoError::General {
            operation,
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// The decision-table row this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::EmptyData { .. } => ErrorKind::EmptyData,
            CryptoError::UnsupportedContainerType { .. } => ErrorKind::UnsupportedContainerType,
            CryptoError::UnsupportedDataType { .. } => ErrorKind::UnsupportedDataType,
            CryptoError::ContainerCrypto { .. } => ErrorKind::ContainerCryptoError,
            CryptoError::InvalidKeyFormat { .. } => ErrorKind::InvalidKeyFormat,
            CryptoError::General { .. } => ErrorKind::GeneralError,
        }
    }

    /// The pipeline the error was raised in.
    pub fn operation(&self) -> Operation {
        match self {
            CryptoError::EmptyData { operation, .. }
            | CryptoError::UnsupportedContainerType { operation, .. }
            | CryptoError::UnsupportedDataType { operation, .. }
            | CryptoError::ContainerCrypto { operation, .. }
            | CryptoError::InvalidKeyFormat { operation, .. }
            | CryptoError::General { operation, .. } => *operation,
        }
    }

    /// The record/field/element path, for the variants that carry one.
    pub fn location(&self) -> Option<&str> {
        match self {
            CryptoError::EmptyData { location, .. }
            | CryptoError::UnsupportedContainerType { location, .. }
            | CryptoError::UnsupportedDataType { location, .. }
            | CryptoError::ContainerCrypto { location, .. } => Some(location),
            CryptoError::InvalidKeyFormat { .. } | CryptoError::General { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn kind_and_operation_accessors() {
        let e = CryptoError::EmptyData {
            operation: Operation::Decrypt,
            location: "Profile.phone".into(),
        };
        assert_eq!(e.kind(), ErrorKind::EmptyData);
        assert_eq!(e.operation(), Operation::Decrypt);
        assert_eq!(e.location(), Some("Profile.phone"));

        let e = CryptoError::general(Operation::Encrypt, "no strategy registered for shape Map");
        assert_eq!(e.kind(), ErrorKind::GeneralError);
        assert!(e.location().is_none());
    }

    #[test]
    fn display_names_location_and_type() {
        let e = CryptoError::UnsupportedDataType {
            operation: Operation::Encrypt,
            location: "Profile.emails[1]".into(),
            type_name: "Int".into(),
            value: Value::Int(5),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("encrypt failed"), "{msg}");
        assert!(msg.contains("Profile.emails[1]"), "{msg}");
        assert!(msg.contains("`Int`"), "{msg}");
    }

    #[test]
    fn container_crypto_exposes_backend_cause() {
        let e = CryptoError::ContainerCrypto {
            operation: Operation::AsymmetricDecrypt,
            location: "Profile.codes[0]".into(),
            source: BackendError::Cipher,
        };
        assert_eq!(e.kind(), ErrorKind::ContainerCryptoError);
        assert!(e.source().is_some());
        assert!(e.to_string().contains("asymmetric decrypt"));
    }

    #[test]
    fn operation_predicates() {
        assert!(Operation::Encrypt.is_encrypt());
        assert!(!Operation::AsymmetricDecrypt.is_encrypt());
        assert!(Operation::AsymmetricEncrypt.is_asymmetric());
        assert!(!Operation::Decrypt.is_asymmetric());
    }
}

//! Key material handed to the engine per call, the provider seam that
//! resolves it, and the length/format checks applied before any value is
//! transformed.
//!
//! # Security invariants
//!
//! - Key and IV bytes are zeroed when dropped and never appear in `Debug`
//!   output, logs or errors.
//! - The engine never adjusts a key or IV. Normalisation is provider policy
//!   ([`normalize_iv`]) applied when material is resolved.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::directive::{CryptoAlgorithm, CryptoDirective};
use crate::error::{CryptoError, Operation};

/// Valid AES key lengths in bytes.
pub const AES_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// DES key length in bytes.
pub const DES_KEY_LEN: usize = 8;

/// Errors produced by a [`KeyProvider`].
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key material is configured for the algorithm.
    #[error("no key material configured for {0}")]
    NotConfigured(CryptoAlgorithm),

    /// The provider has no notion of the algorithm.
    #[error("algorithm {0} is not supported by this key provider")]
    Unsupported(CryptoAlgorithm),
}

// ---------------------------------------------------------------------------
// SecretBytes
// ---------------------------------------------------------------------------

/// Heap buffer for key or IV bytes, zeroed on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SecretBytes {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBytes([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// KeyMaterial
// ---------------------------------------------------------------------------

/// The key pair and IV resolved for one algorithm, immutable for one call.
///
/// For symmetric algorithms both keys are the same secret. For RSA,
/// `encrypt_key` holds the private key and `decrypt_key` the public key, both
/// as base64 DER text; there is no IV.
#[derive(Clone, Debug, Default)]
pub struct KeyMaterial {
    pub encrypt_key: SecretBytes,
    pub decrypt_key: SecretBytes,
    pub iv: Option<SecretBytes>,
}

impl KeyMaterial {
    /// Material for AES or DES.
    pub fn symmetric(key: impl Into<SecretBytes>, iv: Option<SecretBytes>) -> Self {
        let key = key.into();
        Self {
            encrypt_key: key.clone(),
            decrypt_key: key,
            iv,
        }
    }

    /// Material for RSA.
    pub fn asymmetric(private_key: impl Into<SecretBytes>, public_key: impl Into<SecretBytes>) -> Self {
        Self {
            encrypt_key: private_key.into(),
            decrypt_key: public_key.into(),
            iv: None,
        }
    }

    pub fn private_key(&self) -> &[u8] {
        self.encrypt_key.expose()
    }

    pub fn public_key(&self) -> &[u8] {
        self.decrypt_key.expose()
    }

    /// IV bytes, empty when absent.
    pub fn iv_bytes(&self) -> &[u8] {
        match &self.iv {
            Some(iv) => iv.expose(),
            None => &[],
        }
    }

    /// The symmetric key for `operation`.
    pub fn symmetric_key(&self, operation: Operation) -> &[u8] {
        if operation.is_encrypt() {
            self.encrypt_key.expose()
        } else {
            self.decrypt_key.expose()
        }
    }
}

// ---------------------------------------------------------------------------
// KeyProvider
// ---------------------------------------------------------------------------

/// Resolves key material per algorithm.
///
/// Implementations must be safe to call concurrently; the engine calls
/// [`resolve`](KeyProvider::resolve) once per directive field per call.
pub trait KeyProvider: Send + Sync {
    fn resolve(&self, algorithm: &CryptoAlgorithm) -> Result<KeyMaterial, KeyError>;
}

/// A provider that always returns the same material.
#[derive(Debug, Clone, Default)]
pub struct StaticKeys {
    pub aes: Option<KeyMaterial>,
    pub des: Option<KeyMaterial>,
    pub rsa: Option<KeyMaterial>,
}

impl KeyProvider for StaticKeys {
    fn resolve(&self, algorithm: &CryptoAlgorithm) -> Result<KeyMaterial, KeyError> {
        let slot = match algorithm {
            CryptoAlgorithm::Aes => &self.aes,
            CryptoAlgorithm::Des => &self.des,
            CryptoAlgorithm::Rsa => &self.rsa,
            CryptoAlgorithm::Unrecognized(_) => return Err(KeyError::Unsupported(*algorithm)),
        };
        slot.clone().ok_or(KeyError::NotConfigured(*algorithm))
    }
}

/// Truncate or zero-pad `iv` to `len` bytes.
pub fn normalize_iv(iv: &[u8], len: usize) -> SecretBytes {
    let mut out = vec![0u8; len];
    let n = iv.len().min(len);
    out[..n].copy_from_slice(&iv[..n]);
    SecretBytes(out)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check `keys` against `directive` before any value is transformed.
///
/// # Errors
///
/// - [`CryptoError::General`] for a wrong key or IV length, or a missing key.
/// - [`CryptoError::InvalidKeyFormat`] for an RSA key that is not base64.
pub fn validate(
    directive: &CryptoDirective,
    keys: &KeyMaterial,
    operation: Operation,
) -> Result<(), CryptoError> {
    match directive.algorithm {
        CryptoAlgorithm::Aes => {
            let key = keys.symmetric_key(operation);
            if !AES_KEY_LENGTHS.contains(&key.len()) {
                return Err(CryptoError::general(
                    operation,
                    format!(
                        "invalid AES key length {}: expected 16, 24 or 32 bytes",
                        key.len()
                    ),
                ));
            }
            validate_iv(directive, keys, operation)
        }
        CryptoAlgorithm::Des => {
            let key = keys.symmetric_key(operation);
            if key.len() != DES_KEY_LEN {
                return Err(CryptoError::general(
                    operation,
                    format!("invalid DES key length {}: expected 8 bytes", key.len()),
                ));
            }
            validate_iv(directive, keys, operation)
        }
        CryptoAlgorithm::Rsa => {
            // Encryption falls back to the public half of the private key.
            let (missing_role, usable) = if operation.is_encrypt() {
                (
                    "public",
                    !keys.public_key().is_empty() || !keys.private_key().is_empty(),
                )
            } else {
                ("private", !keys.private_key().is_empty())
            };
            if !usable {
                return Err(CryptoError::general(
                    operation,
                    format!("RSA {missing_role} key is not configured"),
                ));
            }
            for (role, key) in [("public", keys.public_key()), ("private", keys.private_key())] {
                if !key.is_empty() {
                    check_base64(key).map_err(|message| CryptoError::InvalidKeyFormat {
                        operation,
                        message: format!("RSA {role} key {message}"),
                    })?;
                }
            }
            Ok(())
        }
        CryptoAlgorithm::Unrecognized(name) => Err(CryptoError::general(
            operation,
            format!("unrecognized algorithm {name}"),
        )),
    }
}

fn validate_iv(
    directive: &CryptoDirective,
    keys: &KeyMaterial,
    operation: Operation,
) -> Result<(), CryptoError> {
    if !directive.mode.requires_iv() {
        return Ok(());
    }
    let expected = directive.algorithm.block_size().unwrap_or_default();
    match &keys.iv {
        None => Err(CryptoError::general(
            operation,
            format!("{} mode requires an IV", directive.mode),
        )),
        Some(iv) if iv.len() != expected => Err(CryptoError::general(
            operation,
            format!(
                "invalid {} IV length {}: expected {expected} bytes",
                directive.algorithm,
                iv.len()
            ),
        )),
        Some(_) => Ok(()),
    }
}

/// Decode base64 key text, ignoring ASCII whitespace.
pub(crate) fn decode_key_text(key: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: Vec<u8> = key
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

fn check_base64(key: &[u8]) -> Result<(), &'static str> {
    match decode_key_text(key) {
        Ok(mut der) => {
            der.zeroize();
            Ok(())
        }
        Err(_) => Err("is not valid base64"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{BlockMode, PaddingScheme};
    use crate::error::ErrorKind;

    fn aes(mode: BlockMode) -> CryptoDirective {
        CryptoDirective::new(CryptoAlgorithm::Aes, mode, PaddingScheme::Pkcs5)
    }

    #[test]
    fn secret_bytes_redacted_in_debug() {
        let keys = KeyMaterial::symmetric("1234567890123456", None);
        let dbg = format!("{keys:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("1234567890123456"));
    }

    #[test]
    fn aes_key_lengths() {
        let iv = Some(SecretBytes::from("1234567890123456"));
        for key in ["1234567890123456", "123456789012345678901234"] {
            let keys = KeyMaterial::symmetric(key, iv.clone());
            assert!(validate(&aes(BlockMode::Cbc), &keys, Operation::Encrypt).is_ok());
        }
        let keys = KeyMaterial::symmetric("short", iv);
        let err = validate(&aes(BlockMode::Cbc), &keys, Operation::Encrypt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }

    #[test]
    fn ecb_needs_no_iv() {
        let keys = KeyMaterial::symmetric("1234567890123456", None);
        assert!(validate(&aes(BlockMode::Ecb), &keys, Operation::Encrypt).is_ok());
        let err = validate(&aes(BlockMode::Cbc), &keys, Operation::Decrypt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }

    #[test]
    fn des_iv_must_be_eight_bytes() {
        let directive = CryptoDirective::new(CryptoAlgorithm::Des, BlockMode::Cbc, PaddingScheme::Pkcs5);
        let ok = KeyMaterial::symmetric("12345678", Some(SecretBytes::from("abcdefgh")));
        assert!(validate(&directive, &ok, Operation::Encrypt).is_ok());
        let bad = KeyMaterial::symmetric("12345678", Some(SecretBytes::from("abcdefghijklmnop")));
        assert!(validate(&directive, &bad, Operation::Encrypt).is_err());
    }

    #[test]
    fn rsa_key_must_be_base64() {
        let keys = KeyMaterial::asymmetric("", "not base64 !!");
        let err = validate(&CryptoDirective::rsa(), &keys, Operation::AsymmetricEncrypt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidKeyFormat);
    }

    #[test]
    fn rsa_missing_key_is_general() {
        let keys = KeyMaterial::asymmetric("", "QUJD");
        assert!(validate(&CryptoDirective::rsa(), &keys, Operation::AsymmetricEncrypt).is_ok());
        let err = validate(&CryptoDirective::rsa(), &keys, Operation::AsymmetricDecrypt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }

    #[test]
    fn rsa_private_only_pair_can_encrypt() {
        let keys = KeyMaterial::asymmetric("QUJD", "");
        assert!(validate(&CryptoDirective::rsa(), &keys, Operation::AsymmetricEncrypt).is_ok());
        let none = KeyMaterial::asymmetric("", "");
        let err = validate(&CryptoDirective::rsa(), &none, Operation::AsymmetricEncrypt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GeneralError);
    }

    #[test]
    fn normalize_iv_truncates_and_pads() {
        assert_eq!(normalize_iv(b"12345678901234567890", 16).expose(), b"1234567890123456");
        assert_eq!(normalize_iv(b"abc", 8).expose(), b"abc\0\0\0\0\0");
    }

    #[test]
    fn static_keys_report_missing_material() {
        let keys = StaticKeys::default();
        assert!(matches!(
            keys.resolve(&CryptoAlgorithm::Des),
            Err(KeyError::NotConfigured(CryptoAlgorithm::Des))
        ));
        assert!(matches!(
            keys.resolve(&CryptoAlgorithm::Unrecognized("SM4")),
            Err(KeyError::Unsupported(_))
        ));
    }
}

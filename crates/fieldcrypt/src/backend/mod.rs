//! The Crypto Backend: stateless string-to-string cipher transforms.
//!
//! The engine only ever talks to [`CryptoBackend`]. [`StandardBackend`] is the
//! default implementation:
//!
//! - **Symmetric** (AES-128/192/256 chosen by key length, DES) in ECB, CBC,
//!   CFB, OFB and CTR. Ciphertext is lowercase hex; decryption also accepts
//!   standard base64.
//! - **Asymmetric** RSA with PKCS#1 v1.5 encryption padding, segmented for
//!   inputs longer than one block. Ciphertext is standard base64.
//!
//! Implementations must be pure and safe to call from many threads at once;
//! containers above the parallel threshold are transformed concurrently.

mod asymmetric;
mod symmetric;

pub use asymmetric::MAX_SINGLE_BLOCK_PLAINTEXT;

#[cfg(test)]
pub(crate) use asymmetric::test_keys;

use thiserror::Error;

use crate::directive::{BlockMode, CryptoAlgorithm, PaddingScheme};

/// Errors produced by the backend layer.
///
/// Variants never carry plaintext, ciphertext or key bytes.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The block transform itself failed.
    #[error("cipher operation failed")]
    Cipher,

    #[error("invalid {algorithm} key length: {len} bytes")]
    InvalidKeyLength { algorithm: &'static str, len: usize },

    #[error("invalid key or IV length for {algorithm}/{mode}")]
    InvalidKeyIvLength {
        algorithm: &'static str,
        mode: BlockMode,
    },

    /// ECB/CBC without padding on input that is not a whole number of blocks.
    #[error("input of {len} bytes is not a multiple of the {block_size}-byte block size")]
    NotBlockAligned { len: usize, block_size: usize },

    /// Ciphertext is neither hex nor base64.
    #[error("ciphertext is neither hex nor base64")]
    Encoding,

    /// Padding did not verify after decryption (wrong key, IV or scheme).
    #[error("invalid {0} padding")]
    Unpad(PaddingScheme),

    #[error("decrypted bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0} is not supported by this backend")]
    UnsupportedAlgorithm(CryptoAlgorithm),

    /// Key text decoded but is not a usable RSA key.
    #[error("invalid RSA {0} key")]
    InvalidKey(&'static str),

    #[error("RSA operation failed")]
    Rsa(#[from] rsa::Error),

    #[error("ciphertext is empty")]
    EmptyCiphertext,
}

/// Cipher transforms consumed by the engine.
///
/// For RSA, `private_key` and `public_key` are base64 DER text. Encryption
/// uses the public key and decryption the private key; the other half may be
/// empty. For ECB, `iv` is empty.
#[cfg_attr(test, mockall::automock)]
pub trait CryptoBackend: Send + Sync {
    fn encrypt_symmetric(
        &self,
        algorithm: CryptoAlgorithm,
        mode: BlockMode,
        padding: PaddingScheme,
        key: &[u8],
        iv: &[u8],
        plaintext: &str,
    ) -> Result<String, BackendError>;

    fn decrypt_symmetric(
        &self,
        algorithm: CryptoAlgorithm,
        mode: BlockMode,
        padding: PaddingScheme,
        key: &[u8],
        iv: &[u8],
        ciphertext: &str,
    ) -> Result<String, BackendError>;

    fn encrypt_asymmetric(
        &self,
        plaintext: &str,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<String, BackendError>;

    fn decrypt_asymmetric(
        &self,
        ciphertext: &str,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<String, BackendError>;
}

/// RustCrypto-backed implementation of [`CryptoBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBackend;

impl StandardBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoBackend for StandardBackend {
    fn encrypt_symmetric(
        &self,
        algorithm: CryptoAlgorithm,
        mode: BlockMode,
        padding: PaddingScheme,
        key: &[u8],
        iv: &[u8],
        plaintext: &str,
    ) -> Result<String, BackendError> {
        let ciphertext = symmetric::encrypt(algorithm, mode, padding, key, iv, plaintext.as_bytes())?;
        Ok(hex::encode(ciphertext))
    }

    fn decrypt_symmetric(
        &self,
        algorithm: CryptoAlgorithm,
        mode: BlockMode,
        padding: PaddingScheme,
        key: &[u8],
        iv: &[u8],
        ciphertext: &str,
    ) -> Result<String, BackendError> {
        let bytes = decode_ciphertext(ciphertext)?;
        let plaintext = symmetric::decrypt(algorithm, mode, padding, key, iv, bytes)?;
        Ok(String::from_utf8(plaintext)?)
    }

    fn encrypt_asymmetric(
        &self,
        plaintext: &str,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<String, BackendError> {
        asymmetric::encrypt(plaintext.as_bytes(), private_key, public_key)
    }

    fn decrypt_asymmetric(
        &self,
        ciphertext: &str,
        private_key: &[u8],
        _public_key: &[u8],
    ) -> Result<String, BackendError> {
        let plaintext = asymmetric::decrypt(ciphertext, private_key)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

/// Hex when the text is entirely hex digits of even length, base64 otherwise.
fn decode_ciphertext(text: &str) -> Result<Vec<u8>, BackendError> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let text = text.trim();
    if text.is_empty() {
        return Err(BackendError::EmptyCiphertext);
    }
    if text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(text).map_err(|_| BackendError::Encoding);
    }
    STANDARD.decode(text).map_err(|_| BackendError::Encoding)
}

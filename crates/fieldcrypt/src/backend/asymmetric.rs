//! RSA with PKCS#1 v1.5 encryption padding.
//!
//! Keys are base64 DER: SubjectPublicKeyInfo / PKCS#8 first, bare PKCS#1 as a
//! fallback. Inputs longer than one block are split into `k - 11` byte
//! segments whose `k`-byte ciphertexts are concatenated before base64.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroize;

use super::BackendError;
use crate::keys::decode_key_text;

/// PKCS#1 v1.5 overhead per segment.
const PKCS1_OVERHEAD: usize = 11;

/// Largest plaintext a 1024-bit key encrypts in a single segment.
pub const MAX_SINGLE_BLOCK_PLAINTEXT: usize = 128 - PKCS1_OVERHEAD;

/// Plaintext bytes per segment for a `modulus_len`-byte key.
fn segment_len(modulus_len: usize) -> Result<usize, BackendError> {
    modulus_len
        .checked_sub(PKCS1_OVERHEAD)
        .filter(|&n| n > 0)
        .ok_or(BackendError::InvalidKey("public"))
}

fn public_key(text: &[u8]) -> Result<RsaPublicKey, BackendError> {
    let der = decode_key_text(text).map_err(|_| BackendError::InvalidKey("public"))?;
    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|_| BackendError::InvalidKey("public"))
}

fn private_key(text: &[u8]) -> Result<RsaPrivateKey, BackendError> {
    let mut der = decode_key_text(text).map_err(|_| BackendError::InvalidKey("private"))?;
    let key = RsaPrivateKey::from_pkcs8_der(&der)
        .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
        .map_err(|_| BackendError::InvalidKey("private"));
    der.zeroize();
    key
}

/// Encrypt with the public key. When only the private key is configured its
/// public half is used.
pub(super) fn encrypt(plaintext: &[u8], private: &[u8], public: &[u8]) -> Result<String, BackendError> {
    let key = if public.is_empty() {
        RsaPublicKey::from(private_key(private)?)
    } else {
        public_key(public)?
    };
    let segment = segment_len(key.size())?;
    let mut rng = rand::thread_rng();
    let mut out = Vec::with_capacity(plaintext.len().div_ceil(segment).max(1) * key.size());
    if plaintext.is_empty() {
        out.extend(key.encrypt(&mut rng, Pkcs1v15Encrypt, &[])?);
    }
    for chunk in plaintext.chunks(segment) {
        out.extend(key.encrypt(&mut rng, Pkcs1v15Encrypt, chunk)?);
    }
    Ok(STANDARD.encode(out))
}

/// Decrypt with the private key.
pub(super) fn decrypt(ciphertext: &str, private: &[u8]) -> Result<Vec<u8>, BackendError> {
    let ciphertext = ciphertext.trim();
    if ciphertext.is_empty() {
        return Err(BackendError::EmptyCiphertext);
    }
    let bytes = STANDARD.decode(ciphertext).map_err(|_| BackendError::Encoding)?;
    let key = private_key(private)?;
    let k = key.size();
    if bytes.len() % k != 0 {
        return Err(BackendError::NotBlockAligned {
            len: bytes.len(),
            block_size: k,
        });
    }
    let mut out = Vec::with_capacity(bytes.len());
    for chunk in bytes.chunks(k) {
        out.extend(key.decrypt(Pkcs1v15Encrypt, chunk)?);
    }
    Ok(out)
}

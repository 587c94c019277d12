//! AES and DES in the five supported block modes.
//!
//! Padding comes from `cipher::block_padding` for every mode, stream-like
//! modes included, so a given (mode, padding) pair always produces the same
//! ciphertext length as the common JCE-style providers. ISO10126 pads with
//! PKCS#7 bytes and accepts any filler when unpadding.

use aes::{Aes128, Aes192, Aes256};
use cipher::block_padding::{Iso10126, NoPadding, PadType, Pkcs7, RawPadding, ZeroPadding};
use cipher::{
    AsyncStreamCipher, BlockDecryptMut, BlockEncryptMut, BlockSizeUser, KeyInit, KeyIvInit, StreamCipher,
};
use des::Des;

use super::BackendError;
use crate::directive::{BlockMode, CryptoAlgorithm, PaddingScheme};

/// Generates `encrypt`/`decrypt` for one concrete block cipher. `$ctr` is the
/// counter flavour matching the cipher's block size.
macro_rules! block_cipher_suite {
    ($module:ident, $cipher:ty, $ctr:ty, $label:literal) => {
        mod $module {
            use super::*;

            fn bad_length(mode: BlockMode) -> BackendError {
                BackendError::InvalidKeyIvLength {
                    algorithm: $label,
                    mode,
                }
            }

            fn encrypt_with<P: RawPadding>(
                mode: BlockMode,
                key: &[u8],
                iv: &[u8],
                data: &[u8],
            ) -> Result<Vec<u8>, BackendError> {
                let block_size = <$cipher as BlockSizeUser>::block_size();
                match mode {
                    BlockMode::Ecb => Ok(ecb::Encryptor::<$cipher>::new_from_slice(key)
                        .map_err(|_| bad_length(mode))?
                        .encrypt_padded_vec_mut::<P>(data)),
                    BlockMode::Cbc => Ok(cbc::Encryptor::<$cipher>::new_from_slices(key, iv)
                        .map_err(|_| bad_length(mode))?
                        .encrypt_padded_vec_mut::<P>(data)),
                    BlockMode::Cfb => {
                        let mut buf = pad_stream::<P>(data, block_size);
                        cfb_mode::Encryptor::<$cipher>::new_from_slices(key, iv)
                            .map_err(|_| bad_length(mode))?
                            .encrypt(&mut buf);
                        Ok(buf)
                    }
                    BlockMode::Ofb => {
                        let mut buf = pad_stream::<P>(data, block_size);
                        ofb::Ofb::<$cipher>::new_from_slices(key, iv)
                            .map_err(|_| bad_length(mode))?
                            .apply_keystream(&mut buf);
                        Ok(buf)
                    }
                    BlockMode::Ctr => {
                        let mut buf = pad_stream::<P>(data, block_size);
                        <$ctr>::new_from_slices(key, iv)
                            .map_err(|_| bad_length(mode))?
                            .apply_keystream(&mut buf);
                        Ok(buf)
                    }
                }
            }

            fn decrypt_with<P: RawPadding>(
                mode: BlockMode,
                padding: PaddingScheme,
                key: &[u8],
                iv: &[u8],
                data: &[u8],
            ) -> Result<Vec<u8>, BackendError> {
                let block_size = <$cipher as BlockSizeUser>::block_size();
                let mut buf = data.to_vec();
                match mode {
                    BlockMode::Ecb => {
                        return ecb::Decryptor::<$cipher>::new_from_slice(key)
                            .map_err(|_| bad_length(mode))?
                            .decrypt_padded_vec_mut::<P>(data)
                            .map_err(|_| BackendError::Unpad(padding));
                    }
                    BlockMode::Cbc => {
                        return cbc::Decryptor::<$cipher>::new_from_slices(key, iv)
                            .map_err(|_| bad_length(mode))?
                            .decrypt_padded_vec_mut::<P>(data)
                            .map_err(|_| BackendError::Unpad(padding));
                    }
                    BlockMode::Cfb => cfb_mode::Decryptor::<$cipher>::new_from_slices(key, iv)
                        .map_err(|_| bad_length(mode))?
                        .decrypt(&mut buf),
                    BlockMode::Ofb => ofb::Ofb::<$cipher>::new_from_slices(key, iv)
                        .map_err(|_| bad_length(mode))?
                        .apply_keystream(&mut buf),
                    BlockMode::Ctr => <$ctr>::new_from_slices(key, iv)
                        .map_err(|_| bad_length(mode))?
                        .apply_keystream(&mut buf),
                }
                unpad_stream::<P>(buf, block_size, padding)
            }

            pub(super) fn encrypt(
                mode: BlockMode,
                padding: PaddingScheme,
                key: &[u8],
                iv: &[u8],
                data: &[u8],
            ) -> Result<Vec<u8>, BackendError> {
                match padding {
                    PaddingScheme::NoPadding => encrypt_with::<NoPadding>(mode, key, iv, data),
                    PaddingScheme::ZeroPadding => encrypt_with::<ZeroPadding>(mode, key, iv, data),
                    PaddingScheme::Pkcs5 => encrypt_with::<Pkcs7>(mode, key, iv, data),
                    PaddingScheme::Iso10126 => encrypt_with::<Iso10126>(mode, key, iv, data),
                }
            }

            pub(super) fn decrypt(
                mode: BlockMode,
                padding: PaddingScheme,
                key: &[u8],
                iv: &[u8],
                data: &[u8],
            ) -> Result<Vec<u8>, BackendError> {
                match padding {
                    PaddingScheme::NoPadding => decrypt_with::<NoPadding>(mode, padding, key, iv, data),
                    PaddingScheme::ZeroPadding => decrypt_with::<ZeroPadding>(mode, padding, key, iv, data),
                    PaddingScheme::Pkcs5 => decrypt_with::<Pkcs7>(mode, padding, key, iv, data),
                    PaddingScheme::Iso10126 => decrypt_with::<Iso10126>(mode, padding, key, iv, data),
                }
            }
        }
    };
}

block_cipher_suite!(aes128, Aes128, ctr::Ctr128BE<Aes128>, "AES");
block_cipher_suite!(aes192, Aes192, ctr::Ctr128BE<Aes192>, "AES");
block_cipher_suite!(aes256, Aes256, ctr::Ctr128BE<Aes256>, "AES");
block_cipher_suite!(des64, Des, ctr::Ctr64BE<Des>, "DES");

type Transform = fn(BlockMode, PaddingScheme, &[u8], &[u8], &[u8]) -> Result<Vec<u8>, BackendError>;

/// Pick the cipher for `algorithm` and key length: (block size, encrypt, decrypt).
fn select(algorithm: CryptoAlgorithm, key: &[u8]) -> Result<(usize, Transform, Transform), BackendError> {
    match (algorithm, key.len()) {
        (CryptoAlgorithm::Aes, 16) => Ok((16, aes128::encrypt as Transform, aes128::decrypt as Transform)),
        (CryptoAlgorithm::Aes, 24) => Ok((16, aes192::encrypt as Transform, aes192::decrypt as Transform)),
        (CryptoAlgorithm::Aes, 32) => Ok((16, aes256::encrypt as Transform, aes256::decrypt as Transform)),
        (CryptoAlgorithm::Des, 8) => Ok((8, des64::encrypt as Transform, des64::decrypt as Transform)),
        (CryptoAlgorithm::Aes, len) => Err(BackendError::InvalidKeyLength {
            algorithm: "AES",
            len,
        }),
        (CryptoAlgorithm::Des, len) => Err(BackendError::InvalidKeyLength {
            algorithm: "DES",
            len,
        }),
        (other, _) => Err(BackendError::UnsupportedAlgorithm(other)),
    }
}

fn is_block_mode(mode: BlockMode) -> bool {
    matches!(mode, BlockMode::Ecb | BlockMode::Cbc)
}

pub(super) fn encrypt(
    algorithm: CryptoAlgorithm,
    mode: BlockMode,
    padding: PaddingScheme,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, BackendError> {
    let (block_size, encrypt, _) = select(algorithm, key)?;
    // `NoPadding` in a block mode panics inside `cipher` on a partial block.
    if is_block_mode(mode) && padding == PaddingScheme::NoPadding && plaintext.len() % block_size != 0 {
        return Err(BackendError::NotBlockAligned {
            len: plaintext.len(),
            block_size,
        });
    }
    encrypt(mode, padding, key, iv, plaintext)
}

pub(super) fn decrypt(
    algorithm: CryptoAlgorithm,
    mode: BlockMode,
    padding: PaddingScheme,
    key: &[u8],
    iv: &[u8],
    ciphertext: Vec<u8>,
) -> Result<Vec<u8>, BackendError> {
    let (block_size, _, decrypt) = select(algorithm, key)?;
    if is_block_mode(mode) && ciphertext.len() % block_size != 0 {
        return Err(BackendError::NotBlockAligned {
            len: ciphertext.len(),
            block_size,
        });
    }
    decrypt(mode, padding, key, iv, &ciphertext)
}

// ---------------------------------------------------------------------------
// Stream-mode padding
// ---------------------------------------------------------------------------

/// Pad `data` the way `encrypt_padded_vec_mut` would, for modes that take
/// any length.
fn pad_stream<P: RawPadding>(data: &[u8], block_size: usize) -> Vec<u8> {
    let tail = data.len() % block_size;
    match P::TYPE {
        PadType::NoPadding => return data.to_vec(),
        PadType::Ambiguous if tail == 0 => return data.to_vec(),
        PadType::Reversible | PadType::Ambiguous => {}
    }
    let body = data.len() - tail;
    let mut buf = Vec::with_capacity(body + block_size);
    buf.extend_from_slice(data);
    buf.resize(body + block_size, 0);
    P::raw_pad(&mut buf[body..], tail);
    buf
}

/// Strip padding from the last block of stream-mode plaintext.
fn unpad_stream<P: RawPadding>(
    mut buf: Vec<u8>,
    block_size: usize,
    padding: PaddingScheme,
) -> Result<Vec<u8>, BackendError> {
    match P::TYPE {
        PadType::NoPadding => return Ok(buf),
        PadType::Ambiguous if buf.is_empty() => return Ok(buf),
        PadType::Reversible | PadType::Ambiguous => {}
    }
    if buf.is_empty() || buf.len() % block_size != 0 {
        return Err(BackendError::Unpad(padding));
    }
    let body = buf.len() - block_size;
    let kept = P::raw_unpad(&buf[body..])
        .map_err(|_| BackendError::Unpad(padding))?
        .len();
    buf.truncate(body + kept);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [BlockMode; 5] = [
        BlockMode::Ecb,
        BlockMode::Cbc,
        BlockMode::Cfb,
        BlockMode::Ofb,
        BlockMode::Ctr,
    ];

    fn round_trip(algorithm: CryptoAlgorithm, key: &[u8], iv: &[u8], padding: PaddingScheme, text: &str) {
        for mode in MODES {
            let ct = encrypt(algorithm, mode, padding, key, iv, text.as_bytes())
                .unwrap_or_else(|e| panic!("{algorithm}/{mode}/{padding}: {e}"));
            assert_ne!(ct, text.as_bytes());
            let pt = decrypt(algorithm, mode, padding, key, iv, ct)
                .unwrap_or_else(|e| panic!("{algorithm}/{mode}/{padding}: {e}"));
            assert_eq!(pt, text.as_bytes(), "{algorithm}/{mode}/{padding}");
        }
    }

    #[test]
    fn aes_all_modes_and_key_sizes() {
        let iv = b"abcdefghijklmnop";
        for key in [&b"1234567890123456"[..], b"123456789012345678901234", b"12345678901234567890123456789012"] {
            round_trip(CryptoAlgorithm::Aes, key, iv, PaddingScheme::Pkcs5, "hello world");
            round_trip(CryptoAlgorithm::Aes, key, iv, PaddingScheme::Iso10126, "hello world");
            round_trip(CryptoAlgorithm::Aes, key, iv, PaddingScheme::ZeroPadding, "hello world");
        }
    }

    #[test]
    fn des_all_modes() {
        round_trip(CryptoAlgorithm::Des, b"12345678", b"abcdefgh", PaddingScheme::Pkcs5, "secret value");
        round_trip(CryptoAlgorithm::Des, b"12345678", b"abcdefgh", PaddingScheme::ZeroPadding, "x");
    }

    #[test]
    fn no_padding_needs_aligned_input_in_block_modes() {
        let key = b"1234567890123456";
        let err = encrypt(CryptoAlgorithm::Aes, BlockMode::Cbc, PaddingScheme::NoPadding, key, key, b"short")
            .unwrap_err();
        assert!(matches!(err, BackendError::NotBlockAligned { len: 5, block_size: 16 }));
        round_trip(CryptoAlgorithm::Aes, key, key, PaddingScheme::NoPadding, "exactly16bytes!!");
    }

    #[test]
    fn no_padding_allows_any_length_in_stream_modes() {
        let key = b"1234567890123456";
        let ct = encrypt(CryptoAlgorithm::Aes, BlockMode::Ctr, PaddingScheme::NoPadding, key, key, b"short").unwrap();
        assert_eq!(ct.len(), 5);
    }

    #[test]
    fn pkcs5_always_adds_a_block_when_aligned() {
        let key = b"1234567890123456";
        for mode in [BlockMode::Ecb, BlockMode::Ctr] {
            let ct = encrypt(CryptoAlgorithm::Aes, mode, PaddingScheme::Pkcs5, key, key, &[1u8; 16]).unwrap();
            assert_eq!(ct.len(), 32, "{mode}");
        }
    }

    #[test]
    fn zero_padding_leaves_aligned_input_alone() {
        let key = b"1234567890123456";
        for mode in MODES {
            let ct = encrypt(CryptoAlgorithm::Aes, mode, PaddingScheme::ZeroPadding, key, key, &[1u8; 16]).unwrap();
            assert_eq!(ct.len(), 16, "{mode}");
        }
    }

    #[test]
    fn iso10126_accepts_any_filler() {
        let key = b"1234567890123456";
        let mut block = b"hello world".to_vec();
        block.extend_from_slice(&[0xa7, 0x13, 0x5c, 0xe2, 0x05]);
        let ct = encrypt(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::NoPadding, key, &[], &block).unwrap();
        let pt = decrypt(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::Iso10126, key, &[], ct).unwrap();
        assert_eq!(pt, b"hello world");
        let err = decrypt(
            CryptoAlgorithm::Aes,
            BlockMode::Ecb,
            PaddingScheme::Pkcs5,
            key,
            &[],
            encrypt(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::NoPadding, key, &[], &block).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Unpad(PaddingScheme::Pkcs5)));
    }

    #[test]
    fn stream_pkcs5_rejects_truncated_plaintext() {
        let key = b"1234567890123456";
        let ct = encrypt(CryptoAlgorithm::Aes, BlockMode::Ctr, PaddingScheme::Pkcs5, key, key, b"hello").unwrap();
        let err = decrypt(CryptoAlgorithm::Aes, BlockMode::Ctr, PaddingScheme::Pkcs5, key, key, ct[..15].to_vec())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unpad(PaddingScheme::Pkcs5)));
    }

    #[test]
    fn wrong_key_fails_unpad_or_decodes_differently() {
        let ct = encrypt(
            CryptoAlgorithm::Aes,
            BlockMode::Ecb,
            PaddingScheme::Pkcs5,
            b"1234567890123456",
            &[],
            b"hello world",
        )
        .unwrap();
        let result = decrypt(
            CryptoAlgorithm::Aes,
            BlockMode::Ecb,
            PaddingScheme::Pkcs5,
            b"6543210987654321",
            &[],
            ct,
        );
        assert!(result.map_or(true, |pt| pt != b"hello world"));
    }

    #[test]
    fn rejects_bad_key_length_and_rsa() {
        assert!(matches!(
            encrypt(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::Pkcs5, b"short", &[], b"x"),
            Err(BackendError::InvalidKeyLength { algorithm: "AES", len: 5 })
        ));
        assert!(matches!(
            encrypt(CryptoAlgorithm::Rsa, BlockMode::Ecb, PaddingScheme::Pkcs5, b"12345678", &[], b"x"),
            Err(BackendError::UnsupportedAlgorithm(CryptoAlgorithm::Rsa))
        ));
    }

    #[test]
    fn misaligned_ciphertext_is_rejected() {
        let err = decrypt(
            CryptoAlgorithm::Aes,
            BlockMode::Cbc,
            PaddingScheme::Pkcs5,
            b"1234567890123456",
            b"1234567890123456",
            vec![0u8; 15],
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::NotBlockAligned { .. }));
    }
}

//! The `Profile` record served by the gateway and its in-memory store.
//!
//! Directive fields travel as ciphertext on the wire and are held as
//! plaintext in the store.

pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use fieldcrypt::{crypto_record, BlockMode, CryptoAlgorithm, CryptoDirective, FieldDirectives, PaddingScheme};
use serde::{Deserialize, Serialize};

pub use store::ProfileStore;

/// AES/CBC/PKCS5 both ways, so a profile read back can be posted again.
const AES_CBC: FieldDirectives = FieldDirectives::both(CryptoDirective::new(
    CryptoAlgorithm::Aes,
    BlockMode::Cbc,
    PaddingScheme::Pkcs5,
));

const DES_ECB: FieldDirectives = FieldDirectives::both(CryptoDirective::new(
    CryptoAlgorithm::Des,
    BlockMode::Ecb,
    PaddingScheme::Pkcs5,
));

/// A customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name; never encrypted.
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

crypto_record!(Profile {
    phone: AES_CBC,
    emails: AES_CBC,
    tags: DES_ECB,
    attributes: AES_CBC,
});

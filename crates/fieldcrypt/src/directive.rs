//! Per-field crypto directives: which algorithm, block mode and padding to use
//! when a field is encrypted on the way out and decrypted on the way in.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Failure to parse a directive component from its conventional name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveParseError {
    #[error("unknown block mode `{0}`")]
    Mode(String),

    #[error("unknown padding scheme `{0}`")]
    Padding(String),
}

// ---------------------------------------------------------------------------
// CryptoAlgorithm
// ---------------------------------------------------------------------------

/// Pipeline family an algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    Symmetric,
    Asymmetric,
}

/// Algorithm named by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoAlgorithm {
    /// AES-128/192/256, selected by key length.
    Aes,
    /// Single DES.
    Des,
    /// RSA with PKCS#1 v1.5 encryption padding.
    Rsa,
    /// A name this build does not support. Fields carrying it are skipped
    /// with a warning instead of failing the call.
    Unrecognized(&'static str),
}

impl CryptoAlgorithm {
    /// `None` for [`CryptoAlgorithm::Unrecognized`].
    pub fn family(self) -> Option<AlgorithmFamily> {
        match self {
            CryptoAlgorithm::Aes | CryptoAlgorithm::Des => Some(AlgorithmFamily::Symmetric),
            CryptoAlgorithm::Rsa => Some(AlgorithmFamily::Asymmetric),
            CryptoAlgorithm::Unrecognized(_) => None,
        }
    }

    /// Conventional upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            CryptoAlgorithm::Aes => "AES",
            CryptoAlgorithm::Des => "DES",
            CryptoAlgorithm::Rsa => "RSA",
            CryptoAlgorithm::Unrecognized(name) => name,
        }
    }

    /// Block size in bytes for the symmetric algorithms; also the IV length
    /// every mode but ECB requires.
    pub fn block_size(self) -> Option<usize> {
        match self {
            CryptoAlgorithm::Aes => Some(16),
            CryptoAlgorithm::Des => Some(8),
            CryptoAlgorithm::Rsa | CryptoAlgorithm::Unrecognized(_) => None,
        }
    }

    /// Parse a directive's algorithm name. Never fails: names outside the
    /// supported set map to [`CryptoAlgorithm::Unrecognized`], which requires
    /// a `'static` name.
    pub fn from_name(name: &'static str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "AES" => CryptoAlgorithm::Aes,
            "DES" => CryptoAlgorithm::Des,
            "RSA" => CryptoAlgorithm::Rsa,
            _ => CryptoAlgorithm::Unrecognized(name),
        }
    }
}

impl fmt::Display for CryptoAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// BlockMode / PaddingScheme
// ---------------------------------------------------------------------------

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMode {
    Ecb,
    Cbc,
    Cfb,
    Ofb,
    Ctr,
}

impl BlockMode {
    pub fn name(self) -> &'static str {
        match self {
            BlockMode::Ecb => "ECB",
            BlockMode::Cbc => "CBC",
            BlockMode::Cfb => "CFB",
            BlockMode::Ofb => "OFB",
            BlockMode::Ctr => "CTR",
        }
    }

    /// ECB is the only mode that takes no IV.
    pub fn requires_iv(self) -> bool {
        !matches!(self, BlockMode::Ecb)
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockMode {
    type Err = DirectiveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECB" => Ok(BlockMode::Ecb),
            "CBC" => Ok(BlockMode::Cbc),
            "CFB" => Ok(BlockMode::Cfb),
            "OFB" => Ok(BlockMode::Ofb),
            "CTR" => Ok(BlockMode::Ctr),
            _ => Err(DirectiveParseError::Mode(s.to_owned())),
        }
    }
}

/// Padding applied to plaintext before a block transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddingScheme {
    /// Plaintext must already be block aligned in ECB/CBC.
    NoPadding,
    /// Zero bytes up to the block boundary; trailing zeros stripped on decrypt.
    ZeroPadding,
    /// PKCS#5/PKCS#7.
    Pkcs5,
    /// Random filler bytes followed by the pad length.
    Iso10126,
}

impl PaddingScheme {
    pub fn name(self) -> &'static str {
        match self {
            PaddingScheme::NoPadding => "NoPadding",
            PaddingScheme::ZeroPadding => "ZeroPadding",
            PaddingScheme::Pkcs5 => "PKCS5Padding",
            PaddingScheme::Iso10126 => "ISO10126Padding",
        }
    }
}

impl fmt::Display for PaddingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaddingScheme {
    type Err = DirectiveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOPADDING" => Ok(PaddingScheme::NoPadding),
            "ZEROPADDING" => Ok(PaddingScheme::ZeroPadding),
            "PKCS5PADDING" | "PKCS7PADDING" => Ok(PaddingScheme::Pkcs5),
            "ISO10126PADDING" => Ok(PaddingScheme::Iso10126),
            _ => Err(DirectiveParseError::Padding(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// Algorithm, mode and padding for one direction of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CryptoDirective {
    pub algorithm: CryptoAlgorithm,
    pub mode: BlockMode,
    pub padding: PaddingScheme,
}

impl CryptoDirective {
    pub const fn new(algorithm: CryptoAlgorithm, mode: BlockMode, padding: PaddingScheme) -> Self {
        Self {
            algorithm,
            mode,
            padding,
        }
    }

    /// AES/ECB/PKCS5Padding, the default for encrypt directives.
    pub const fn encrypt_default() -> Self {
        Self::new(CryptoAlgorithm::Aes, BlockMode::Ecb, PaddingScheme::Pkcs5)
    }

    /// AES/CBC/PKCS5Padding, the default for decrypt directives.
    pub const fn decrypt_default() -> Self {
        Self::new(CryptoAlgorithm::Aes, BlockMode::Cbc, PaddingScheme::Pkcs5)
    }

    /// Shorthand for an RSA directive; mode and padding are ignored by the
    /// asymmetric pipelines.
    pub const fn rsa() -> Self {
        Self::new(CryptoAlgorithm::Rsa, BlockMode::Ecb, PaddingScheme::Pkcs5)
    }
}

impl fmt::Display for CryptoDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.algorithm, self.mode, self.padding)
    }
}

/// The two independent directive kinds attached to a field.
///
/// `encrypt` applies when the field leaves a boundary operation
/// ([`Interceptor::on_exit`](crate::Interceptor::on_exit)); `decrypt` applies
/// when it enters one ([`Interceptor::on_entry`](crate::Interceptor::on_entry)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldDirectives {
    pub encrypt: Option<CryptoDirective>,
    pub decrypt: Option<CryptoDirective>,
}

impl FieldDirectives {
    pub const fn new(encrypt: Option<CryptoDirective>, decrypt: Option<CryptoDirective>) -> Self {
        Self { encrypt, decrypt }
    }

    /// Encrypt on exit only.
    pub const fn encrypt(directive: CryptoDirective) -> Self {
        Self::new(Some(directive), None)
    }

    /// Decrypt on entry only.
    pub const fn decrypt(directive: CryptoDirective) -> Self {
        Self::new(None, Some(directive))
    }

    /// The same directive in both directions.
    pub const fn both(directive: CryptoDirective) -> Self {
        Self::new(Some(directive), Some(directive))
    }

    /// The directive that applies to `encrypting` (on exit) or not (on entry).
    pub fn for_direction(&self, encrypting: bool) -> Option<&CryptoDirective> {
        if encrypting {
            self.encrypt.as_ref()
        } else {
            self.decrypt.as_ref()
        }
    }
}

//! Key material and engine tuning loaded from configuration, and the
//! [`KeyRing`] provider that serves it.
//!
//! Settings come from an optional TOML file overlaid with `FIELDCRYPT_*`
//! environment variables, where `__` separates nested keys:
//!
//! ```toml
//! parallel_threshold = 50
//!
//! [aes]
//! key = "1234567890123456"
//! iv = "1234567890123456"
//!
//! [des]
//! key = "12345678"
//! iv = "12345678"
//!
//! [rsa]
//! private_key = "MIICdQIBADANBgkqhkiG9w0BAQEFAASC..."
//! public_key = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCB..."
//! ```
//!
//! `FIELDCRYPT_AES__KEY` overrides `aes.key`, and so on.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::directive::CryptoAlgorithm;
use crate::keys::{normalize_iv, KeyError, KeyMaterial, KeyProvider, SecretBytes};
use crate::strategy::{Executor, DEFAULT_PARALLEL_THRESHOLD};

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "FIELDCRYPT";

/// Errors produced while loading or applying settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load crypto settings")]
    Load(#[from] config::ConfigError),

    #[error("invalid crypto settings: {0}")]
    Invalid(String),

    #[error("failed to build worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Key and IV for one symmetric algorithm.
#[derive(Clone, Default, Deserialize)]
pub struct SymmetricKeySettings {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub iv: String,

    /// Truncate or zero-pad the IV to the algorithm's block size.
    #[serde(default = "default_true")]
    pub auto_adjust_iv: bool,
}

/// RSA key pair as base64 DER text.
#[derive(Clone, Default, Deserialize)]
pub struct RsaKeySettings {
    #[serde(default)]
    pub private_key: String,

    #[serde(default)]
    pub public_key: String,
}

/// All key material plus engine tuning.
#[derive(Clone, Deserialize)]
pub struct CryptoSettings {
    #[serde(default)]
    pub aes: SymmetricKeySettings,

    #[serde(default)]
    pub des: SymmetricKeySettings,

    #[serde(default)]
    pub rsa: RsaKeySettings,

    /// Containers with more elements than this are processed in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Size of a dedicated worker pool; rayon's global pool when unset.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

fn default_true() -> bool {
    true
}
fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

impl Default for CryptoSettings {
    fn default() -> Self {
        Self {
            aes: SymmetricKeySettings::default(),
            des: SymmetricKeySettings::default(),
            rsa: RsaKeySettings::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            worker_threads: None,
        }
    }
}

impl CryptoSettings {
    /// Load from `path` (TOML, optional) overlaid with `FIELDCRYPT_*`
    /// environment variables, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] if a source cannot be read or parsed,
    /// [`SettingsError::Invalid`] if validation fails.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let settings: CryptoSettings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text, without environment overrides.
    ///
    /// # Errors
    ///
    /// As for [`CryptoSettings::load`].
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        let settings: CryptoSettings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check tuning values. Key lengths are checked per call by the engine,
    /// so a partially configured file still loads.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.worker_threads == Some(0) {
            return Err(SettingsError::Invalid("worker_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// The element executor these settings describe.
    pub fn executor(&self) -> Result<Executor, SettingsError> {
        match self.worker_threads {
            Some(n) => Ok(Executor::with_workers(self.parallel_threshold, n)?),
            None => Ok(Executor::new(self.parallel_threshold)),
        }
    }

    /// Key material for `algorithm`, with the IV policy applied.
    pub fn key_material(&self, algorithm: &CryptoAlgorithm) -> Result<KeyMaterial, KeyError> {
        match algorithm {
            CryptoAlgorithm::Aes => symmetric_material(&self.aes, *algorithm),
            CryptoAlgorithm::Des => symmetric_material(&self.des, *algorithm),
            CryptoAlgorithm::Rsa => {
                if self.rsa.private_key.is_empty() && self.rsa.public_key.is_empty() {
                    return Err(KeyError::NotConfigured(*algorithm));
                }
                Ok(KeyMaterial::asymmetric(
                    self.rsa.private_key.as_str(),
                    self.rsa.public_key.as_str(),
                ))
            }
            CryptoAlgorithm::Unrecognized(_) => Err(KeyError::Unsupported(*algorithm)),
        }
    }
}

fn symmetric_material(
    settings: &SymmetricKeySettings,
    algorithm: CryptoAlgorithm,
) -> Result<KeyMaterial, KeyError> {
    if settings.key.is_empty() {
        return Err(KeyError::NotConfigured(algorithm));
    }
    let iv = match (settings.iv.is_empty(), algorithm.block_size()) {
        (true, _) => None,
        (false, Some(len)) if settings.auto_adjust_iv => Some(normalize_iv(settings.iv.as_bytes(), len)),
        (false, _) => Some(SecretBytes::from(settings.iv.as_str())),
    };
    Ok(KeyMaterial::symmetric(settings.key.as_str(), iv))
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "[REDACTED]"
    }
}

impl std::fmt::Debug for SymmetricKeySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKeySettings")
            .field("key", &redact(&self.key))
            .field("iv", &redact(&self.iv))
            .field("auto_adjust_iv", &self.auto_adjust_iv)
            .finish()
    }
}

impl std::fmt::Debug for RsaKeySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeySettings")
            .field("private_key", &redact(&self.private_key))
            .field("public_key", &redact(&self.public_key))
            .finish()
    }
}

impl std::fmt::Debug for CryptoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoSettings")
            .field("aes", &self.aes)
            .field("des", &self.des)
            .field("rsa", &self.rsa)
            .field("parallel_threshold", &self.parallel_threshold)
            .field("worker_threads", &self.worker_threads)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// KeyRing
// ---------------------------------------------------------------------------

/// Shared, lock-free holder of the current [`CryptoSettings`].
///
/// Backed by [`ArcSwap`] so interception calls never block and a refresh task
/// can atomically swap in new key material. A call resolves its keys once and
/// keeps that snapshot for its whole duration.
#[derive(Clone, Debug)]
pub struct KeyRing {
    inner: Arc<ArcSwap<CryptoSettings>>,
}

impl KeyRing {
    pub fn new(settings: CryptoSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// The current settings snapshot.
    pub fn current(&self) -> Arc<CryptoSettings> {
        self.inner.load_full()
    }

    /// Atomically replace the settings.
    pub fn replace(&self, settings: CryptoSettings) {
        self.inner.store(Arc::new(settings));
        info!("crypto key material replaced");
    }
}

impl Default for KeyRing {
    fn default() -> Self {
        Self::new(CryptoSettings::default())
    }
}

impl KeyProvider for KeyRing {
    fn resolve(&self, algorithm: &CryptoAlgorithm) -> Result<KeyMaterial, KeyError> {
        self.inner.load().key_material(algorithm)
    }
}

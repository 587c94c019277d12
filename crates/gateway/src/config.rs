//! Configuration loading and validation for the gateway.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if any variable is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// TOML file holding key material. `FIELDCRYPT_*` variables apply on top
    /// either way.
    #[serde(default)]
    pub crypto_settings_path: Option<String>,

    /// How often (seconds) to reload key material.
    #[serde(default = "default_key_refresh_interval")]
    pub key_refresh_interval_secs: u64,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}
fn default_key_refresh_interval() -> u64 {
    300
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.key_refresh_interval_secs == 0 {
            anyhow::bail!("KEY_REFRESH_INTERVAL_SECS must be > 0");
        }
        if let Some(path) = &self.crypto_settings_path {
            if path.trim().is_empty() {
                anyhow::bail!("CRYPTO_SETTINGS_PATH must not be empty when set");
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            log_level: default_log_level(),
            crypto_settings_path: None,
            key_refresh_interval_secs: default_key_refresh_interval(),
        }
    }
}

//! Key material loading and background refresh.
//!
//! Startup loads [`CryptoSettings`] once and seeds the [`KeyRing`].
//! [`refresh_task`] then reloads them on a configurable interval; a failed
//! reload keeps the previous keys in service.

use std::time::Duration;

use anyhow::{Context, Result};
use fieldcrypt::{CryptoSettings, KeyRing};
use tokio::time;
use tracing::warn;

use crate::config::Config;

/// Load settings from the configured file and environment.
///
/// # Errors
///
/// Returns an error if the file is unreadable or the settings are invalid.
pub fn load(cfg: &Config) -> Result<CryptoSettings> {
    CryptoSettings::load(cfg.crypto_settings_path.as_deref()).context("failed to load crypto settings")
}

/// Spawn a task that reloads key material every
/// `cfg.key_refresh_interval_secs` seconds.
///
/// The first reload fires after one full interval; startup is assumed to have
/// seeded the ring already.
pub fn refresh_task(cfg: Config, ring: KeyRing) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(cfg.key_refresh_interval_secs);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match load(&cfg) {
                Ok(settings) => ring.replace(settings),
                Err(e) => warn!(error = %e, "key refresh failed; retaining previous keys"),
            }
        }
    })
}

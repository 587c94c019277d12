//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use fieldcrypt::{Interceptor, KeyRing};

use crate::profile::ProfileStore;

/// Application state shared across all request handlers.
///
/// All fields are `Arc`-backed so Axum can clone the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Field encryption around profile handlers.
    pub interceptor: Interceptor,
    /// Current key material; also the interceptor's key provider.
    pub keys: KeyRing,
    pub profiles: ProfileStore,
}

impl AppState {
    pub fn new(interceptor: Interceptor, keys: KeyRing, profiles: ProfileStore) -> Self {
        Self {
            interceptor,
            keys,
            profiles,
        }
    }

    /// Default engine wiring around `keys`.
    pub fn with_keys(keys: KeyRing) -> Self {
        let interceptor = Interceptor::with_defaults(Arc::new(keys.clone()));
        Self::new(interceptor, keys, ProfileStore::new())
    }
}

impl Default for AppState {
    /// No key material loaded; suitable for tests.
    fn default() -> Self {
        Self::with_keys(KeyRing::default())
    }
}

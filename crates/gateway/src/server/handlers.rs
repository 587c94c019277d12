//! Axum request handlers for all service endpoints.
//!
//! Profile handlers are boundary operations: creation decrypts the incoming
//! record on entry, retrieval encrypts the stored record on exit. The engine
//! is synchronous and CPU-bound, so interception runs on the blocking pool.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{CreatedResponse, ErrorResponse, HealthResponse},
    ServiceError,
};
use fieldcrypt::{CryptoAlgorithm, KeyProvider};
use tracing::{debug, info};
use uuid::Uuid;

use super::{error::ApiError, state::AppState};
use crate::profile::Profile;

/// `POST /profiles`: decrypt the directive fields of the posted profile and
/// store the plaintext.
pub async fn create_profile(
    State(state): State<AppState>,
    Json(profile): Json<Profile>,
) -> Result<Response, ApiError> {
    let interceptor = state.interceptor.clone();
    let profile = tokio::task::spawn_blocking(move || {
        let mut profile = profile;
        interceptor.on_entry(&mut profile, |p| Ok::<_, ApiError>(p.clone()))
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("interception task failed: {e}")))??;

    let id = state.profiles.insert(profile).await;
    let profiles = state.profiles.len().await;
    info!(%id, profiles, "profile stored");
    let body = CreatedResponse { id: id.to_string() };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `GET /profiles/:id`: return a stored profile with its directive fields
/// encrypted.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    let stored = state
        .profiles
        .get(&id)
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("no profile with id {id}")))?;

    let interceptor = state.interceptor.clone();
    let profile = tokio::task::spawn_blocking(move || interceptor.on_exit(|| Ok::<_, ApiError>(stored)))
        .await
        .map_err(|e| ServiceError::Internal(format!("interception task failed: {e}")))??;

    debug!(%id, "profile served");
    Ok(Json(profile))
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` when AES key material resolves and `503 Service
/// Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let keys_loaded = state.keys.resolve(&CryptoAlgorithm::Aes).is_ok();
    let strategies = state.interceptor.dispatcher().registry().len();

    let (status_code, status_str) = if keys_loaded && strategies > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        keys_loaded,
        strategies,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn assert_send<T: Send>(_: &T) {}

    fn profile() -> Profile {
        Profile {
            name: "Ada".into(),
            phone: "555-0100".into(),
            emails: vec![],
            tags: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn handler_futures_are_send() {
        let state = AppState::default();
        let create = create_profile(State(state.clone()), Json(profile()));
        assert_send(&create);
        let read = get_profile(State(state.clone()), Path(Uuid::new_v4()));
        assert_send(&read);
        assert_send(&health(State(state)));
    }

    #[tokio::test]
    async fn create_without_keys_stores_nothing() {
        let state = AppState::default();
        // No key material: the request is rejected before anything is stored.
        let result = create_profile(State(state.clone()), Json(profile())).await;
        assert!(result.is_err());
        assert_eq!(state.profiles.len().await, 0);
    }
}

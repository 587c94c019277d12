//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Upper bound on a profile request, interception included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/profiles", post(handlers::create_profile))
        .route("/profiles/:id", get(handlers::get_profile))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use fieldcrypt::{CryptoSettings, KeyRing};
    use serde_json::Value as Json;
    use tower::ServiceExt;

    use crate::profile::Profile;

    const KEYS: &str = r#"
        [aes]
        key = "1234567890123456"
        iv = "1234567890123456"

        [des]
        key = "12345678"
    "#;

    fn keyed_state() -> AppState {
        AppState::with_keys(KeyRing::new(CryptoSettings::from_toml(KEYS).unwrap()))
    }

    fn plaintext() -> Profile {
        Profile {
            name: "Ada".into(),
            phone: "555-0100".into(),
            emails: vec!["ada@example.com".into(), "ada@work.example".into()],
            tags: BTreeSet::from(["vip".to_owned()]),
            attributes: BTreeMap::from([("city".to_owned(), "London".to_owned())]),
        }
    }

    fn encrypted(state: &AppState) -> Profile {
        let mut profile = plaintext();
        state.interceptor.encrypt_record(&mut profile).unwrap();
        profile
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Json) {
        let resp: Response = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Json::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_profile(body: &impl serde::Serialize) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/profiles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn request_timeout_is_thirty_seconds() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (status, _) = send(build(AppState::default()), get("/unknown")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_degraded_without_keys() {
        let (status, body) = send(build(AppState::default()), get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["keys_loaded"], false);
        assert_eq!(body["strategies"], 5);
    }

    #[tokio::test]
    async fn health_is_ok_with_keys() {
        let (status, body) = send(build(keyed_state()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_stores_plaintext_and_get_returns_ciphertext() {
        let state = keyed_state();
        let wire = encrypted(&state);
        assert_ne!(wire.phone, plaintext().phone);
        assert_eq!(wire.name, "Ada");

        let (status, body) = send(build(state.clone()), post_profile(&wire)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id: uuid::Uuid = body["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(state.profiles.get(&id).await, Some(plaintext()));

        let (status, body) = send(build(state.clone()), get(&format!("/profiles/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let served: Profile = serde_json::from_value(body).unwrap();
        assert_eq!(served, wire);
    }

    #[tokio::test]
    async fn unknown_profile_is_404() {
        let uri = format!("/profiles/{}", uuid::Uuid::new_v4());
        let (status, body) = send(build(keyed_state()), get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn undecryptable_field_is_400_and_nothing_stored() {
        let state = keyed_state();
        let mut wire = encrypted(&state);
        wire.emails.push("%%% not ciphertext %%%".into());

        let (status, body) = send(build(state.clone()), post_profile(&wire)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "ContainerCryptoError");
        assert!(body["message"].as_str().unwrap().contains("Profile.emails[2]"));
        assert_eq!(state.profiles.len().await, 0);
    }

    #[tokio::test]
    async fn blank_field_is_empty_data() {
        let state = keyed_state();
        let mut wire = encrypted(&state);
        wire.phone = "   ".into();

        let (status, body) = send(build(state), post_profile(&wire)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "EmptyData");
    }

    #[tokio::test]
    async fn missing_keys_is_503() {
        let wire = encrypted(&keyed_state());
        let (status, body) = send(build(AppState::default()), post_profile(&wire)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "GeneralError");
    }
}

//! Conversion of engine and service failures into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use fieldcrypt::{CryptoError, ErrorKind};
use tracing::warn;

/// Error returned by profile handlers.
#[derive(Debug)]
pub struct ApiError {
    error: ServiceError,
    kind: Option<ErrorKind>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self { error, kind: None }
    }
}

impl From<CryptoError> for ApiError {
    /// Data problems are the caller's fault (400); key problems are ours
    /// (503). A cipher failure is a bad ciphertext on decrypt, an internal
    /// failure on encrypt.
    fn from(e: CryptoError) -> Self {
        let kind = e.kind();
        let message = e.to_string();
        let error = match kind {
            ErrorKind::EmptyData | ErrorKind::UnsupportedDataType | ErrorKind::UnsupportedContainerType => {
                ServiceError::BadRequest(message)
            }
            ErrorKind::ContainerCryptoError if e.operation().is_encrypt() => ServiceError::EncryptionFailure(message),
            ErrorKind::ContainerCryptoError => ServiceError::BadRequest(message),
            ErrorKind::InvalidKeyFormat | ErrorKind::GeneralError => ServiceError::Unavailable(message),
        };
        Self {
            error,
            kind: Some(kind),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.error, "request failed");
        }
        let mut body = ErrorResponse::new(self.error.code(), self.error.to_string());
        if let Some(kind) = self.kind() {
            body = body.with_kind(format!("{kind:?}"));
        }
        (status, Json(body)).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error taxonomy for the account lifecycle. Every operation translates
/// collaborator failures into one of these at its boundary; nothing rawer
/// crosses into the response layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("mail dispatch failed: {0}")]
    Mail(String),
    #[error("stored credential is malformed")]
    CorruptCredential,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<crate::auth::repo_types::StoreError> for AuthError {
    fn from(e: crate::auth::repo_types::StoreError) -> Self {
        use crate::auth::repo_types::StoreError;
        match e {
            StoreError::DuplicateEmail => AuthError::Conflict("Email already exists".into()),
            StoreError::NotFound => AuthError::NotFound("User not found".into()),
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Upload(_)
            | AuthError::Mail(_)
            | AuthError::CorruptCredential
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let message = if status.is_server_error() {
            // Do not leak internals to clients.
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message, "success": false }))).into_response()
    }
}

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure of the hashing engine itself. A wrong password is not an error.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token")]
    Invalid,
    #[error("expired token")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Backend(e.to_string())
    }
}

/// Outward-facing error. Variants are coarse: the caller never
/// learns whether an email exists or why a token was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    DuplicateUser,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
    #[error("signing failure: {0}")]
    SigningFailure(String),
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::DuplicateUser => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::StorageFailure(_)
            | AuthError::CryptoFailure(_)
            | AuthError::SigningFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to clients.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid credentials".into(),
            AuthError::DuplicateUser => "User already exists".into(),
            AuthError::Unauthorized => "Unauthorized".into(),
            AuthError::StorageFailure(_)
            | AuthError::CryptoFailure(_)
            | AuthError::SigningFailure(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AuthError::StorageFailure(detail) => error!(error = %detail, "storage failure"),
            AuthError::CryptoFailure(detail) => error!(error = %detail, "crypto failure"),
            AuthError::SigningFailure(detail) => error!(error = %detail, "signing failure"),
            AuthError::DuplicateUser => warn!("registration conflict"),
            _ => {}
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::CryptoFailure(msg) => AuthError::CryptoFailure(msg),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AuthError::DuplicateUser,
            StoreError::Backend(msg) => AuthError::StorageFailure(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => AuthError::SigningFailure(msg),
            TokenError::Malformed | TokenError::Invalid | TokenError::Expired => {
                AuthError::Unauthorized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kinds_collapse_to_unauthorized() {
        for kind in [TokenError::Malformed, TokenError::Invalid, TokenError::Expired] {
            let err = AuthError::from(kind);
            assert!(matches!(err, AuthError::Unauthorized));
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn store_conflict_becomes_duplicate_user() {
        let err = AuthError::from(StoreError::Conflict);
        assert!(matches!(err, AuthError::DuplicateUser));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AuthError::StorageFailure("connection refused at 10.0.0.3".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("10.0.0.3"));
    }
}

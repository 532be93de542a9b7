use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::error;
use uuid::Uuid;

use super::{claims::Identity, error::AuthError};

/// User ID attached by the request gate.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(identity) => Ok(AuthUser(identity.user_id)),
            None => {
                // handler mounted outside the gate
                error!(path = %parts.uri.path(), "no identity on request");
                Err(AuthError::Unauthorized)
            }
        }
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        error::AuthError,
        repo_types::NewUser,
    },
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);

    if name.is_empty() {
        return Err(AuthError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation("Password too short".into()));
    }

    if state.store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateUser);
    }

    let password_hash = state.passwords.hash_async(req.password).await?;

    // A concurrent registration may win between the lookup and here; the
    // store's uniqueness check turns that into DuplicateUser as well.
    let user = state
        .store
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;

    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "user registered");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, AuthError> {
    let email = normalize_email(&req.email);

    let user = match state.store.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            state.passwords.verify_dummy_async(req.password).await;
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let ok = state
        .passwords
        .verify_async(req.password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<PublicUser, AuthError> {
    // A valid token for a user that no longer exists is still just "unauthorized".
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;
    Ok(user.into())
}

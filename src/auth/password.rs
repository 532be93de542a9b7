use std::sync::Arc;

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::auth::error::CredentialError;

/// Argon2id hashing with a configurable time cost.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    // Verified against when the account does not exist, so that branch
    // does the same amount of work as a real mismatch.
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        let params = Params::new(Params::DEFAULT_M_COST, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| {
                error!(error = %e, cost, "invalid argon2 params");
                CredentialError::CryptoFailure(e.to_string())
            })?;
        let mut service = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        service.dummy_hash = Arc::from(service.hash("gatekeeper-dummy-credential")?);
        Ok(service)
    }

    fn engine(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .engine()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                CredentialError::CryptoFailure(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch. Errors only when `hash` is not a parseable
    /// PHC string or the engine itself fails.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            CredentialError::CryptoFailure(e.to_string())
        })?;
        match self.engine().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(CredentialError::CryptoFailure(e.to_string()))
            }
        }
    }

    pub fn verify_dummy(&self, plain: &str) {
        let _ = self.verify(plain, &self.dummy_hash);
    }

    pub async fn hash_async(&self, plain: String) -> Result<String, CredentialError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&plain))
            .await
            .map_err(|e| CredentialError::CryptoFailure(e.to_string()))?
    }

    pub async fn verify_async(&self, plain: String, hash: String) -> Result<bool, CredentialError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify(&plain, &hash))
            .await
            .map_err(|e| CredentialError::CryptoFailure(e.to_string()))?
    }

    pub async fn verify_dummy_async(&self, plain: String) {
        let this = self.clone();
        let _ = tokio::task::spawn_blocking(move || this.verify_dummy(&plain)).await;
    }
}

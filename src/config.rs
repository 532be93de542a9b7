use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    /// Argon2 time cost (number of passes over memory).
    pub cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

pub const DEFAULT_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_HASH_COST: u32 = 10;

/// Unset falls back to `default`; set but unparseable is an error.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gatekeeper".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gatekeeper-users".into()),
            ttl_seconds: env_or("JWT_TTL_SECONDS", DEFAULT_TTL_SECONDS)?,
        };
        let hash = HashConfig {
            cost: env_or("HASH_COST", DEFAULT_HASH_COST)?,
        };
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            jwt,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_uses_default_only_when_unset() {
        assert_eq!(env_or("GATEKEEPER_TEST_UNSET_VAR", 42u32).unwrap(), 42);
        std::env::set_var("GATEKEEPER_TEST_SET_VAR", "1200");
        assert_eq!(env_or("GATEKEEPER_TEST_SET_VAR", 3600i64).unwrap(), 1200);
    }

    #[test]
    fn env_or_rejects_garbage() {
        std::env::set_var("GATEKEEPER_TEST_GARBAGE_VAR", "not-a-number");
        let err = env_or("GATEKEEPER_TEST_GARBAGE_VAR", 7i64).unwrap_err();
        assert!(err.to_string().contains("GATEKEEPER_TEST_GARBAGE_VAR"));
    }
}

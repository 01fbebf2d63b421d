//! Environment-based configuration for the recommendation platform.
//!
//! All configuration is read from environment variables with the `RECO_`
//! prefix, with `.env` file support via dotenvy and a `validate()` step that
//! rejects unusable values before any service starts. Override hierarchy:
//! defaults < .env < environment.

use crate::error::RecoError;
use std::path::PathBuf;
use std::str::FromStr;

/// Load a `.env` file if one exists. Missing files are not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Configuration loader trait
///
/// Standardized loading and validation of configuration from environment
/// variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from `RECO_`-prefixed environment variables,
    /// falling back to defaults for optional values.
    fn from_env() -> Result<Self, RecoError>;

    /// Validate configuration values, returning a `Config` error with a
    /// clear message on the first failing check.
    fn validate(&self) -> Result<(), RecoError>;
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, RecoError> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| RecoError::config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

/// Which consistency coordinator a deployment runs.
///
/// `Local` serves and mutates one in-process model guarded by a mutex and
/// persists to a snapshot file. `Shared` holds no in-process state and runs
/// every mutation as a lock-guarded load/update/save round trip against the
/// Redis snapshot. A deployment runs exactly one mode; the two must never be
/// pointed at the same logical model concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingMode {
    Local,
    Shared,
}

impl FromStr for ServingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "shared" => Ok(Self::Shared),
            other => Err(format!("unknown serving mode: {other}")),
        }
    }
}

/// Model hyperparameters and snapshot location.
///
/// # Environment Variables
///
/// - `RECO_MODEL_FACTORS` (default: 32): latent dimension k
/// - `RECO_MODEL_LEARNING_RATE` (default: 0.01)
/// - `RECO_MODEL_REGULARIZATION` (default: 0.02)
/// - `RECO_MODEL_SEED` (default: 1): RNG seed for cold-start vectors
/// - `RECO_MODEL_SNAPSHOT_PATH` (default: data/model.snapshot): local mode file
/// - `RECO_MODEL_KEY` (default: reco:model:v1): shared mode Redis key
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub factors: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    pub seed: u64,
    pub snapshot_path: PathBuf,
    pub model_key: String,
}

impl ConfigLoader for ModelConfig {
    fn from_env() -> Result<Self, RecoError> {
        Ok(Self {
            factors: env_parse("RECO_MODEL_FACTORS", 32)?,
            learning_rate: env_parse("RECO_MODEL_LEARNING_RATE", 0.01)?,
            regularization: env_parse("RECO_MODEL_REGULARIZATION", 0.02)?,
            seed: env_parse("RECO_MODEL_SEED", 1)?,
            snapshot_path: env_var("RECO_MODEL_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/model.snapshot")),
            model_key: env_var("RECO_MODEL_KEY").unwrap_or_else(|| "reco:model:v1".to_string()),
        })
    }

    fn validate(&self) -> Result<(), RecoError> {
        if self.factors == 0 {
            return Err(RecoError::config("RECO_MODEL_FACTORS must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(RecoError::config("RECO_MODEL_LEARNING_RATE must be positive"));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(RecoError::config("RECO_MODEL_REGULARIZATION must be non-negative"));
        }
        if self.model_key.is_empty() {
            return Err(RecoError::config("RECO_MODEL_KEY must not be empty"));
        }
        Ok(())
    }
}

/// Redis connection, distributed lock, and queue settings.
///
/// # Environment Variables
///
/// - `RECO_REDIS_URL` (default: redis://127.0.0.1:6379)
/// - `RECO_REDIS_LOCK_TIMEOUT_MS` (default: 30000): lock acquisition deadline
/// - `RECO_REDIS_LOCK_RETRY_MS` (default: 100): poll interval while waiting
/// - `RECO_REDIS_LOCK_TTL_MS` (default: 30000): lock expiry guard
/// - `RECO_REDIS_QUEUE_KEY` (default: reco:interactions)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub lock_timeout_ms: u64,
    pub lock_retry_ms: u64,
    pub lock_ttl_ms: u64,
    pub queue_key: String,
}

impl ConfigLoader for RedisConfig {
    fn from_env() -> Result<Self, RecoError> {
        Ok(Self {
            url: env_var("RECO_REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            lock_timeout_ms: env_parse("RECO_REDIS_LOCK_TIMEOUT_MS", 30_000)?,
            lock_retry_ms: env_parse("RECO_REDIS_LOCK_RETRY_MS", 100)?,
            lock_ttl_ms: env_parse("RECO_REDIS_LOCK_TTL_MS", 30_000)?,
            queue_key: env_var("RECO_REDIS_QUEUE_KEY")
                .unwrap_or_else(|| "reco:interactions".to_string()),
        })
    }

    fn validate(&self) -> Result<(), RecoError> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(RecoError::config("RECO_REDIS_URL must be a redis:// or rediss:// URL"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(RecoError::config("RECO_REDIS_LOCK_TIMEOUT_MS must be positive"));
        }
        if self.lock_retry_ms == 0 || self.lock_retry_ms > self.lock_timeout_ms {
            return Err(RecoError::config(
                "RECO_REDIS_LOCK_RETRY_MS must be positive and not exceed the lock timeout",
            ));
        }
        if self.lock_ttl_ms == 0 {
            return Err(RecoError::config("RECO_REDIS_LOCK_TTL_MS must be positive"));
        }
        if self.queue_key.is_empty() {
            return Err(RecoError::config("RECO_REDIS_QUEUE_KEY must not be empty"));
        }
        Ok(())
    }
}

/// HTTP service settings.
///
/// # Environment Variables
///
/// - `RECO_SERVICE_HOST` (default: 0.0.0.0)
/// - `RECO_SERVICE_PORT` (default: 8080)
/// - `RECO_SERVICE_MODE` (default: local): `local` or `shared`
/// - `RECO_SERVICE_REQUIRE_API_KEY` (default: false)
/// - `RECO_SERVICE_API_KEY_PREFIX` (default: reco:api_key:)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub mode: ServingMode,
    pub require_api_key: bool,
    pub api_key_prefix: String,
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, RecoError> {
        Ok(Self {
            host: env_var("RECO_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("RECO_SERVICE_PORT", 8080)?,
            mode: env_parse("RECO_SERVICE_MODE", ServingMode::Local)?,
            require_api_key: env_parse("RECO_SERVICE_REQUIRE_API_KEY", false)?,
            api_key_prefix: env_var("RECO_SERVICE_API_KEY_PREFIX")
                .unwrap_or_else(|| "reco:api_key:".to_string()),
        })
    }

    fn validate(&self) -> Result<(), RecoError> {
        if self.host.is_empty() {
            return Err(RecoError::config("RECO_SERVICE_HOST must not be empty"));
        }
        if self.port == 0 {
            return Err(RecoError::config("RECO_SERVICE_PORT must be non-zero"));
        }
        if self.require_api_key && self.api_key_prefix.is_empty() {
            return Err(RecoError::config(
                "RECO_SERVICE_API_KEY_PREFIX must not be empty when API keys are required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_model_config() -> ModelConfig {
        ModelConfig {
            factors: 32,
            learning_rate: 0.01,
            regularization: 0.02,
            seed: 1,
            snapshot_path: PathBuf::from("data/model.snapshot"),
            model_key: "reco:model:v1".to_string(),
        }
    }

    #[test]
    fn test_model_config_validate() {
        assert!(base_model_config().validate().is_ok());

        let mut cfg = base_model_config();
        cfg.factors = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base_model_config();
        cfg.learning_rate = -0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = base_model_config();
        cfg.regularization = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_redis_config_validate() {
        let cfg = RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            lock_timeout_ms: 30_000,
            lock_retry_ms: 100,
            lock_ttl_ms: 30_000,
            queue_key: "reco:interactions".to_string(),
        };
        assert!(cfg.validate().is_ok());

        let mut bad = cfg.clone();
        bad.url = "http://127.0.0.1".to_string();
        assert!(bad.validate().is_err());

        let mut bad = cfg.clone();
        bad.lock_retry_ms = 60_000;
        assert!(bad.validate().is_err());

        let mut bad = cfg;
        bad.lock_timeout_ms = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_serving_mode_parse() {
        assert_eq!("local".parse::<ServingMode>().ok(), Some(ServingMode::Local));
        assert_eq!("Shared".parse::<ServingMode>().ok(), Some(ServingMode::Shared));
        assert!("clustered".parse::<ServingMode>().is_err());
    }
}

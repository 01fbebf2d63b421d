//! # Reco Core
//!
//! Shared building blocks for the recommendation platform: the platform-wide
//! error type, environment-based configuration loaders, and validation
//! helpers for ingest and query payloads.
//!
//! ## Modules
//!
//! - `error`: Error types and HTTP status mapping
//! - `config`: Configuration loading and validation
//! - `validation`: Payload validation utilities

pub mod config;
pub mod error;
pub mod validation;

pub use config::{load_dotenv, ConfigLoader, ModelConfig, RedisConfig, ServiceConfig, ServingMode};
pub use error::RecoError;
pub use validation::{validate_duration, validate_top_n, validate_watch_time, MAX_TOP_N};

/// Result type alias for platform operations
pub type Result<T> = std::result::Result<T, RecoError>;

//! Configuration loading, validation, and hashing.
//!
//! TOML on disk, `serde` for deserialization, and a small `validation`
//! pass that rejects obviously-broken configs before the orchestrator ever
//! spawns a task — the same shape as the teacher's `config` module.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, FrontierConfig, KvConfig, OrchestratorConfig, PolitenessConfig, UserAgentConfig,
};
pub use validation::validate;

use thiserror::Error;

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid value in config: {0}")]
    InvalidUrl(String),
}

//! Combobox error types
//!
//! Interaction never fails; only loading options can.

use thiserror::Error;

/// Errors raised while building combobox options
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Options file is not valid TOML or has unknown values
    #[error("Failed to parse combobox options: {0}")]
    Parse(#[from] toml::de::Error),

    /// PageUp/PageDown must move at least one candidate
    #[error("Page size must be at least 1")]
    ZeroPageSize,
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

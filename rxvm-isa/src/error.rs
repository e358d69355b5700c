//! # Error Types for the RXVM instruction set

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IsaError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    // Program buffer errors
    #[error("Invalid program size: expected {expected} bytes, found {found} bytes")]
    InvalidProgramSize { expected: usize, found: usize },

    // Instruction errors
    #[error("Invalid instruction length: expected 8 bytes, found {found} bytes")]
    InvalidInstructionLength { found: usize },

    #[error("Invalid register index: {0} (valid range: 0-7)")]
    InvalidRegister(u8),
}

impl IsaError {
    /// Check if this error originates from configuration validation
    pub fn is_config_error(&self) -> bool {
        matches!(self, IsaError::InvalidConfig(_))
    }
}

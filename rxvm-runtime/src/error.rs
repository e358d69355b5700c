//! Runtime error types for RXVM
//!
//! Every variant is a construction-time failure. Once a VM is built, compiling
//! and executing programs cannot fail.

use rxvm_isa::IsaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("ISA error: {0}")]
    IsaError(#[from] IsaError),

    #[error("Allocation failed: {bytes} bytes for {what}")]
    AllocationFailed { bytes: usize, what: &'static str },

    #[error("Unsupported platform: {reason}")]
    UnsupportedPlatform { reason: String },

    #[error("Dataset too small: expected {expected} blocks, found {found}")]
    DatasetTooSmall { expected: u64, found: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rxvm_isa::ConfigError;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_allocation_failed_display() {
        let err = RuntimeError::AllocationFailed {
            bytes: 2097152,
            what: "scratchpad",
        };
        assert_eq!(
            err.to_string(),
            "Allocation failed: 2097152 bytes for scratchpad"
        );
    }

    #[test]
    fn test_unsupported_platform_display() {
        let err = RuntimeError::UnsupportedPlatform {
            reason: "double rounding".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported platform: double rounding");
    }

    #[test]
    fn test_dataset_too_small_display() {
        let err = RuntimeError::DatasetTooSmall {
            expected: 100,
            found: 10,
        };
        assert_eq!(
            err.to_string(),
            "Dataset too small: expected 100 blocks, found 10"
        );
    }

    #[test]
    fn test_isa_error_from() {
        let isa_err: IsaError = ConfigError::ZeroProgramCount.into();
        let runtime_err: RuntimeError = isa_err.into();
        assert!(runtime_err.to_string().contains("program_count"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = IoError::new(ErrorKind::Other, "spawn failed");
        let runtime_err: RuntimeError = io_err.into();
        assert!(runtime_err.to_string().contains("spawn failed"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuntimeError>();
    }
}

//! Disassembler errors

use rxvm_isa::IsaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisassemblerError {
    #[error("Invalid program buffer: {0}")]
    InvalidProgram(#[from] IsaError),

    #[error("Truncated instruction stream: {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;

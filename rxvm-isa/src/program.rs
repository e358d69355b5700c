//! Program buffer
//!
//! A program is the 128-byte entropy block followed by 256 encoded
//! instructions, exactly as produced by the byte generator.

use crate::error::IsaError;
use crate::instruction::{Instruction, INSTRUCTION_SIZE};

/// Instructions per program
pub const PROGRAM_SIZE: usize = 256;

/// 64-bit entropy words preceding the instructions
pub const ENTROPY_SIZE: usize = 16;

/// Size of the serialized program buffer in bytes
pub const PROGRAM_BYTES: usize = ENTROPY_SIZE * 8 + PROGRAM_SIZE * INSTRUCTION_SIZE;

/// Generated program: entropy block plus a fixed-size instruction array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Entropy words used to derive the program configuration
    pub entropy: [u64; ENTROPY_SIZE],

    /// Instruction array
    pub instructions: [Instruction; PROGRAM_SIZE],
}

impl Program {
    /// Create an all-zero program (every instruction decodes as `IADD_RS r0, r0`)
    pub fn new() -> Self {
        Self {
            entropy: [0; ENTROPY_SIZE],
            instructions: [Instruction::default(); PROGRAM_SIZE],
        }
    }

    /// Parse a program buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IsaError> {
        if bytes.len() != PROGRAM_BYTES {
            return Err(IsaError::InvalidProgramSize {
                expected: PROGRAM_BYTES,
                found: bytes.len(),
            });
        }

        let (entropy_bytes, code_bytes) = bytes.split_at(ENTROPY_SIZE * 8);
        let mut program = Self::new();

        for (word, chunk) in program.entropy.iter_mut().zip(entropy_bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }

        for (instr, chunk) in program
            .instructions
            .iter_mut()
            .zip(code_bytes.chunks_exact(INSTRUCTION_SIZE))
        {
            *instr = Instruction::from_slice(chunk)?;
        }

        Ok(program)
    }

    /// Serialize to the program buffer layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PROGRAM_BYTES);
        for word in &self.entropy {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        for instr in &self.instructions {
            bytes.extend_from_slice(&instr.to_bytes());
        }
        bytes
    }

    /// Get an entropy word
    #[inline]
    pub fn entropy(&self, index: usize) -> u64 {
        self.entropy[index % ENTROPY_SIZE]
    }

    /// Number of instructions (always 256)
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

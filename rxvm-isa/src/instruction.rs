//! # Instruction Layout for RXVM
//!
//! Every instruction is 8 bytes, little-endian:
//!
//! ```text
//! | opcode (8) | dst (8) | src (8) | mod (8) | imm32 (32) |
//! ```
//!
//! `mod` packs three sub-fields:
//!
//! ```text
//! | cond (4) | shift (2) | mem (2) |
//!   7..4       3..2        1..0
//! ```
//!
//! All bit patterns are valid. `dst` and `src` are reduced modulo the
//! register count before use, and the opcode byte is mapped to a kind
//! through [`crate::opcode::OPCODE_TABLE`].

use crate::error::IsaError;
use crate::opcode::InstructionKind;
use crate::register::{Register, REGISTER_COUNT};
use serde::{Deserialize, Serialize};

/// Encoded instruction size in bytes
pub const INSTRUCTION_SIZE: usize = 8;

/// A single VM instruction (pure data view, no execution semantics)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u8,
    pub dst: u8,
    pub src: u8,
    pub modifier: u8,
    pub imm32: u32,
}

impl Instruction {
    pub const fn new(opcode: u8, dst: u8, src: u8, modifier: u8, imm32: u32) -> Self {
        Self {
            opcode,
            dst,
            src,
            modifier,
            imm32,
        }
    }

    /// Decode from the 8-byte encoding
    pub const fn from_bytes(bytes: [u8; INSTRUCTION_SIZE]) -> Self {
        Self {
            opcode: bytes[0],
            dst: bytes[1],
            src: bytes[2],
            modifier: bytes[3],
            imm32: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Decode from a slice that must be exactly 8 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IsaError> {
        let bytes: [u8; INSTRUCTION_SIZE] = bytes
            .try_into()
            .map_err(|_| IsaError::InvalidInstructionLength { found: bytes.len() })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Encode to the 8-byte layout
    pub const fn to_bytes(&self) -> [u8; INSTRUCTION_SIZE] {
        let imm = self.imm32.to_le_bytes();
        [
            self.opcode,
            self.dst,
            self.src,
            self.modifier,
            imm[0],
            imm[1],
            imm[2],
            imm[3],
        ]
    }

    /// Instruction kind selected by the opcode byte
    #[inline]
    pub fn kind(&self) -> InstructionKind {
        InstructionKind::from_opcode(self.opcode)
    }

    /// Memory tier selector (bits 0-1 of `mod`)
    #[inline]
    pub const fn mod_mem(&self) -> u8 {
        self.modifier & 0b11
    }

    /// Shift amount (bits 2-3 of `mod`)
    #[inline]
    pub const fn mod_shift(&self) -> u8 {
        (self.modifier >> 2) & 0b11
    }

    /// Condition selector (bits 4-7 of `mod`)
    #[inline]
    pub const fn mod_cond(&self) -> u8 {
        self.modifier >> 4
    }

    /// Destination register index, reduced modulo 8
    #[inline]
    pub const fn dst_index(&self) -> usize {
        self.dst as usize % REGISTER_COUNT
    }

    /// Source register index, reduced modulo 8
    #[inline]
    pub const fn src_index(&self) -> usize {
        self.src as usize % REGISTER_COUNT
    }

    #[inline]
    pub fn dst_register(&self) -> Register {
        Register::from_operand(self.dst)
    }

    #[inline]
    pub fn src_register(&self) -> Register {
        Register::from_operand(self.src)
    }

    /// Immediate sign-extended to 64 bits
    #[inline]
    pub const fn imm_sext(&self) -> u64 {
        self.imm32 as i32 as i64 as u64
    }
}

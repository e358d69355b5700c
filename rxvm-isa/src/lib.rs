//! # RXVM Instruction Set
//!
//! Data model of a deterministic proof-of-work virtual machine.
//!
//! ## Key Features
//! - Fixed 8-byte instructions (opcode, dst, src, mod, imm32)
//! - 256 opcode values mapped to 29 instruction kinds by a frequency table
//! - 8 integer registers and three banks of 4 double-precision pairs
//! - Programs of 256 instructions plus a 16-word entropy block
//! - Three-tier scratchpad addressing (L1 ⊂ L2 ⊂ L3)

pub mod config;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod register;

pub use config::{Config, ConfigError, CACHE_LINE_SIZE};
pub use error::IsaError;
pub use instruction::{Instruction, INSTRUCTION_SIZE};
pub use opcode::{InstructionKind, FREQUENCIES, OPCODE_SPACE, OPCODE_TABLE};
pub use program::{Program, ENTROPY_SIZE, PROGRAM_BYTES, PROGRAM_SIZE};
pub use register::{FloatBank, Register, FLOAT_REGISTER_COUNT, REGISTER_COUNT};

/// Register whose IADD_RS form carries a displacement immediate
pub const REGISTER_NEEDS_DISPLACEMENT: usize = 5;

/// ISTORE condition values at or above this select the L3 tier
pub const STORE_L3_CONDITION: u8 = 14;

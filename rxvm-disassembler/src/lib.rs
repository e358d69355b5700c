//! # RXVM Disassembler
//!
//! Render RXVM instructions and programs as human-readable assembly.
//!
//! The text mirrors what the bytecode compiler sees: register forms that fall
//! back to an immediate print the immediate, and memory operands name their
//! scratchpad tier (`L1[r3+12]`, `L2[r0-8]`, `L3[4096]`).
//!
//! ## Example
//!
//! ```rust
//! use rxvm_isa::Program;
//! use rxvm_disassembler::disassemble;
//!
//! let program = Program::new();
//! let asm = disassemble(&program);
//! assert!(asm.contains("IADD_RS r0, r0, LSH 0"));
//! ```

pub mod decoder;
pub mod disassembler;
pub mod error;
pub mod formatter;

pub use decoder::{decode, decode_program, decode_stream};
pub use disassembler::{disassemble, disassemble_bytes, listing_line};
pub use error::{DisassemblerError, Result};
pub use formatter::format_instruction;

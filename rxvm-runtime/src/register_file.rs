//! Register file and per-program configuration
//!
//! ## Register File
//!
//! - `r0..r7`: 64-bit integer registers
//! - `f0..f3`: float pairs, additive group (read-write)
//! - `e0..e3`: float pairs, multiplicative group (read-write, exponent-bounded)
//! - `a0..a3`: float pairs loaded from entropy, read-only while a program runs
//!
//! ## Program Configuration
//!
//! Derived once from the program's entropy block:
//!
//! - `read_reg[0..2]` perturb the scratchpad addresses
//! - `read_reg[2..4]` perturb the dataset address
//! - `e_mask` bounds the exponent range of the E bank
//! - `ma`/`mx` seed the dataset address accumulators
//! - `dataset_offset` selects a window inside the extra dataset region

use rxvm_isa::{Config, Program, CACHE_LINE_SIZE, FLOAT_REGISTER_COUNT, REGISTER_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::float::{float_mask, small_positive_float_bits, FloatPair};

/// Size of the serialized register file in bytes
pub const REGISTER_FILE_BYTES: usize = REGISTER_COUNT * 8 + 3 * FLOAT_REGISTER_COUNT * 16;

/// Complete architectural register state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterFile {
    pub r: [u64; REGISTER_COUNT],
    pub f: [FloatPair; FLOAT_REGISTER_COUNT],
    pub e: [FloatPair; FLOAT_REGISTER_COUNT],
    pub a: [FloatPair; FLOAT_REGISTER_COUNT],
}

impl RegisterFile {
    /// Registers at program start: integer and working float banks cleared,
    /// the A bank loaded from entropy words 0-7
    pub fn from_program(program: &Program) -> Self {
        let mut regs = Self::default();
        for (i, pair) in regs.a.iter_mut().enumerate() {
            *pair = FloatPair::from_bits([
                small_positive_float_bits(program.entropy(2 * i)),
                small_positive_float_bits(program.entropy(2 * i + 1)),
            ]);
        }
        regs
    }

    /// Canonical little-endian image: r, f, e, a in order
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Replace the A bank with the raw bits of a 64-byte digest
    pub fn set_a_from_digest(&mut self, digest: &[u8; 64]) {
        for (pair, chunk) in self.a.iter_mut().zip(digest.chunks_exact(16)) {
            let mut lo = [0u8; 8];
            let mut hi = [0u8; 8];
            lo.copy_from_slice(&chunk[..8]);
            hi.copy_from_slice(&chunk[8..]);
            *pair = FloatPair::from_bits([u64::from_le_bytes(lo), u64::from_le_bytes(hi)]);
        }
    }
}

/// Program-derived configuration, immutable while the program runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramConfig {
    /// Register indices mixed into the scratchpad (0, 1) and dataset (2, 3) addresses
    pub read_reg: [usize; 4],
    /// Exponent/mantissa window for the E bank
    pub e_mask: [u64; 2],
    /// Initial dataset address accumulator
    pub ma: u32,
    /// Initial dataset mix accumulator
    pub mx: u32,
    /// Byte offset of the dataset window
    pub dataset_offset: u64,
}

impl ProgramConfig {
    pub fn new(program: &Program, params: &Config) -> Self {
        let selector = program.entropy(12);
        let read_reg = [
            (selector & 1) as usize,
            2 + ((selector >> 1) & 1) as usize,
            4 + ((selector >> 2) & 1) as usize,
            6 + ((selector >> 3) & 1) as usize,
        ];

        let window = program.entropy(13) % (params.dataset_extra_items() + 1);

        Self {
            read_reg,
            e_mask: [float_mask(program.entropy(14)), float_mask(program.entropy(15))],
            ma: program.entropy(8) as u32 & params.cache_line_align_mask(),
            mx: program.entropy(10) as u32,
            dataset_offset: window * CACHE_LINE_SIZE,
        }
    }
}

//! Byte generator
//!
//! Programs and scratchpad contents are expanded from a seed by a
//! deterministic byte stream. The stream is produced by the blake3
//! extendable output function over `(domain, seed, nonce)`, so distinct
//! domains never share output even for identical seeds.

use rxvm_isa::{Program, PROGRAM_BYTES};

use crate::error::Result;

/// Deterministic `fill(seed, nonce) -> bytes` service
pub trait ByteGenerator: Send + Sync {
    /// Overwrite `out` with the stream for `(seed, nonce)`
    fn fill(&self, seed: &[u8], nonce: u64, out: &mut [u8]);
}

/// blake3 XOF keyed by a domain string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blake3Generator {
    domain: &'static str,
}

impl Blake3Generator {
    /// Stream used for program buffers
    pub const PROGRAM: Self = Self::new("rxvm 2024 program generator");

    /// Stream used for scratchpad initialization
    pub const SCRATCHPAD: Self = Self::new("rxvm 2024 scratchpad fill");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }
}

impl ByteGenerator for Blake3Generator {
    fn fill(&self, seed: &[u8], nonce: u64, out: &mut [u8]) {
        let mut hasher = blake3::Hasher::new_derive_key(self.domain);
        hasher.update(&(seed.len() as u64).to_le_bytes());
        hasher.update(seed);
        hasher.update(&nonce.to_le_bytes());
        hasher.finalize_xof().fill(out);
    }
}

/// Materialize a program buffer from the generator stream
pub fn generate_program(generator: &dyn ByteGenerator, seed: &[u8], nonce: u64) -> Result<Program> {
    let mut buffer = [0u8; PROGRAM_BYTES];
    generator.fill(seed, nonce, &mut buffer);
    Ok(Program::from_bytes(&buffer)?)
}

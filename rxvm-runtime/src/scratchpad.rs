//! Scratchpad memory
//!
//! A flat little-endian byte buffer of L3 size. Callers pass addresses that
//! were already masked to a tier, so every access is in bounds and 8-byte
//! aligned.

use crate::error::{Result, RuntimeError};
use crate::float::FloatPair;
use crate::generator::ByteGenerator;

#[derive(Debug, Clone)]
pub struct Scratchpad {
    bytes: Vec<u8>,
}

impl Scratchpad {
    /// Allocate a zeroed scratchpad of `size` bytes
    pub fn new(size: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| RuntimeError::AllocationFailed {
                bytes: size,
                what: "scratchpad",
            })?;
        bytes.resize(size, 0);
        Ok(Scratchpad { bytes })
    }

    /// Refill the whole scratchpad from the byte generator
    pub fn fill(&mut self, generator: &dyn ByteGenerator, seed: &[u8], nonce: u64) {
        generator.fill(seed, nonce, &mut self.bytes);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    #[inline]
    pub fn read_u64(&self, addr: usize) -> u64 {
        debug_assert!(addr % 8 == 0, "unaligned scratchpad read at {addr:#x}");
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[addr..addr + 8]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    pub fn write_u64(&mut self, addr: usize, value: u64) {
        debug_assert!(addr % 8 == 0, "unaligned scratchpad write at {addr:#x}");
        self.bytes[addr..addr + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Read two packed i32 values and convert them to a float pair
    #[inline]
    pub fn read_float_pair(&self, addr: usize) -> FloatPair {
        FloatPair::from_i32_pair(self.read_u64(addr))
    }

    /// Store the raw bits of a float pair (16 bytes)
    #[inline]
    pub fn write_float_pair(&mut self, addr: usize, pair: FloatPair) {
        let [lo, hi] = pair.to_bits();
        self.write_u64(addr, lo);
        self.write_u64(addr + 8, hi);
    }
}

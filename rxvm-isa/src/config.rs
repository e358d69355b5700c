//! # Configuration System for RXVM
//!
//! Sizes of the scratchpad tiers, the dataset and the cache, plus the loop and
//! branch parameters. All derived address masks are computed here so the
//! compiler and the execution loop agree on them bit for bit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dataset block size in bytes (one cache line)
pub const CACHE_LINE_SIZE: u64 = 64;

/// Largest condition field value encodable in `mod`
const MAX_CONDITION: u32 = 15;

/// VM parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Config {
    /// Scratchpad L1 tier size in bytes (power of two)
    pub scratchpad_l1: u32,
    /// Scratchpad L2 tier size in bytes (power of two)
    pub scratchpad_l2: u32,
    /// Scratchpad L3 tier size in bytes (power of two), the full scratchpad
    pub scratchpad_l3: u32,
    /// Dataset base size in bytes (power of two)
    pub dataset_base_size: u64,
    /// Extra dataset bytes past the base size (multiple of 64)
    pub dataset_extra_size: u64,
    /// Cache size in bytes (multiple of 64)
    pub cache_size: u64,
    /// Cache lines mixed into every derived dataset block
    pub cache_accesses: u32,
    /// Execution loop iterations per program
    pub program_iterations: u32,
    /// Programs chained per hash
    pub program_count: u32,
    /// Condition window width in bits (branch taken with probability 1/2^jump_bits)
    pub jump_bits: u8,
    /// Bit offset added to the `mod` condition field when placing the window
    pub jump_offset: u8,
}

impl Config {
    /// Production parameters
    /// - Scratchpad: 16 KiB / 256 KiB / 2 MiB
    /// - Dataset: 2 GiB base + 32 MiB - 64 extra
    /// - Cache: 256 MiB
    /// - 2048 iterations, 8 chained programs
    pub const DEFAULT: Self = Self {
        scratchpad_l1: 16 * 1024,
        scratchpad_l2: 256 * 1024,
        scratchpad_l3: 2 * 1024 * 1024,
        dataset_base_size: 2 * 1024 * 1024 * 1024,
        dataset_extra_size: 33_554_368,
        cache_size: 256 * 1024 * 1024,
        cache_accesses: 8,
        program_iterations: 2048,
        program_count: 8,
        jump_bits: 8,
        jump_offset: 8,
    };

    /// Reduced dataset and cache for tests and light experiments.
    ///
    /// Scratchpad, loop and branch parameters match [`Config::DEFAULT`].
    pub const SMALL: Self = Self {
        dataset_base_size: 1024 * 1024,
        dataset_extra_size: 65_472,
        cache_size: 256 * 1024,
        ..Self::DEFAULT
    };

    /// L1 address mask (8-byte aligned)
    #[inline]
    pub const fn l1_mask(&self) -> u32 {
        (self.scratchpad_l1 - 1) & !7
    }

    /// L2 address mask (8-byte aligned)
    #[inline]
    pub const fn l2_mask(&self) -> u32 {
        (self.scratchpad_l2 - 1) & !7
    }

    /// L3 address mask (8-byte aligned)
    #[inline]
    pub const fn l3_mask(&self) -> u32 {
        (self.scratchpad_l3 - 1) & !7
    }

    /// L3 address mask aligned to 64 bytes, used by the loop mix-in
    #[inline]
    pub const fn l3_mask64(&self) -> u32 {
        (self.scratchpad_l3 - 1) & !63
    }

    /// Mask aligning a dataset address to a cache line inside the base region
    #[inline]
    pub const fn cache_line_align_mask(&self) -> u32 {
        ((self.dataset_base_size - 1) & !(CACHE_LINE_SIZE - 1)) as u32
    }

    /// Number of 64-byte items in the extra region
    #[inline]
    pub const fn dataset_extra_items(&self) -> u64 {
        self.dataset_extra_size / CACHE_LINE_SIZE
    }

    /// Total number of dataset blocks
    #[inline]
    pub const fn dataset_block_count(&self) -> u64 {
        (self.dataset_base_size + self.dataset_extra_size) / CACHE_LINE_SIZE
    }

    /// Number of cache lines
    #[inline]
    pub const fn cache_line_count(&self) -> u64 {
        self.cache_size / CACHE_LINE_SIZE
    }

    /// Condition window mask before shifting (`2^jump_bits - 1`)
    #[inline]
    pub const fn condition_mask(&self) -> u64 {
        (1u64 << self.jump_bits) - 1
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tiers = [self.scratchpad_l1, self.scratchpad_l2, self.scratchpad_l3];
        if tiers.iter().any(|size| !size.is_power_of_two() || *size < 64) {
            return Err(ConfigError::ScratchpadTierNotPowerOfTwo);
        }
        // Each tier must be a strict subset of the next
        if self.scratchpad_l1 >= self.scratchpad_l2 || self.scratchpad_l2 >= self.scratchpad_l3 {
            return Err(ConfigError::ScratchpadTiersNotNested);
        }

        if !self.dataset_base_size.is_power_of_two() || self.dataset_base_size < CACHE_LINE_SIZE {
            return Err(ConfigError::DatasetBaseNotPowerOfTwo);
        }
        // Dataset addresses are carried in 32-bit accumulators
        if self.dataset_base_size > 1 << 32 {
            return Err(ConfigError::DatasetBaseTooLarge);
        }
        if self.dataset_extra_size % CACHE_LINE_SIZE != 0 {
            return Err(ConfigError::DatasetExtraMisaligned);
        }

        if self.cache_size < CACHE_LINE_SIZE || self.cache_size % CACHE_LINE_SIZE != 0 {
            return Err(ConfigError::InvalidCacheSize);
        }
        if self.cache_accesses == 0 {
            return Err(ConfigError::ZeroCacheAccesses);
        }

        if self.program_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.program_count == 0 {
            return Err(ConfigError::ZeroProgramCount);
        }

        // The shifted condition window must fit in 64 bits for every `mod` value
        let window_top = self.jump_bits as u32 + self.jump_offset as u32 + MAX_CONDITION;
        if self.jump_bits == 0 || window_top > 64 {
            return Err(ConfigError::InvalidJumpBits);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ scratchpad: {}/{}/{} KiB, dataset: {} + {} bytes ({} blocks), cache: {} KiB, iterations: {}, programs: {}, jump: {}@{} }}",
            self.scratchpad_l1 / 1024,
            self.scratchpad_l2 / 1024,
            self.scratchpad_l3 / 1024,
            self.dataset_base_size,
            self.dataset_extra_size,
            self.dataset_block_count(),
            self.cache_size / 1024,
            self.program_iterations,
            self.program_count,
            self.jump_bits,
            self.jump_offset,
        )
    }
}

/// Configuration error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Scratchpad tiers must be powers of two of at least 64 bytes
    ScratchpadTierNotPowerOfTwo,
    /// L1 < L2 < L3 must hold
    ScratchpadTiersNotNested,
    /// Dataset base size must be a power of two of at least 64 bytes
    DatasetBaseNotPowerOfTwo,
    /// Dataset base size must not exceed 4 GiB
    DatasetBaseTooLarge,
    /// Dataset extra size must be a multiple of 64
    DatasetExtraMisaligned,
    /// Cache size must be a non-zero multiple of 64
    InvalidCacheSize,
    /// At least one cache access per dataset block
    ZeroCacheAccesses,
    /// At least one loop iteration
    ZeroIterations,
    /// At least one chained program
    ZeroProgramCount,
    /// Condition window must be non-empty and fit in 64 bits
    InvalidJumpBits,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ScratchpadTierNotPowerOfTwo => {
                write!(f, "scratchpad tiers must be powers of two of at least 64 bytes")
            }
            ConfigError::ScratchpadTiersNotNested => {
                write!(f, "scratchpad tiers must satisfy L1 < L2 < L3")
            }
            ConfigError::DatasetBaseNotPowerOfTwo => {
                write!(f, "dataset_base_size must be a power of two of at least 64 bytes")
            }
            ConfigError::DatasetBaseTooLarge => {
                write!(f, "dataset_base_size must not exceed 4 GiB")
            }
            ConfigError::DatasetExtraMisaligned => {
                write!(f, "dataset_extra_size must be a multiple of 64")
            }
            ConfigError::InvalidCacheSize => {
                write!(f, "cache_size must be a non-zero multiple of 64")
            }
            ConfigError::ZeroCacheAccesses => {
                write!(f, "cache_accesses must be at least 1")
            }
            ConfigError::ZeroIterations => {
                write!(f, "program_iterations must be at least 1")
            }
            ConfigError::ZeroProgramCount => {
                write!(f, "program_count must be at least 1")
            }
            ConfigError::InvalidJumpBits => {
                write!(f, "jump_bits must be at least 1 and jump_bits + jump_offset + 15 must not exceed 64")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

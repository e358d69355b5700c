//! Key-derived cache
//!
//! The cache is a block of memory expanded from a key. Dataset blocks are
//! derived from it on demand: each block hashes a chain of pseudo-randomly
//! selected cache lines, so deriving one block costs `cache_accesses` random
//! reads plus one blake3 compression per line.

use rxvm_isa::{Config, CACHE_LINE_SIZE};
use tracing::debug;

use crate::dataset::{DatasetBlock, DatasetSource, BLOCK_WORDS};
use crate::error::{Result, RuntimeError};

const CACHE_FILL_CONTEXT: &str = "rxvm 2024 cache fill";
const BLOCK_DERIVE_CONTEXT: &str = "rxvm 2024 dataset block";

/// Odd multiplier used to walk cache lines
const LINE_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct Cache {
    words: Vec<u64>,
    line_count: u64,
    accesses: u32,
    block_count: u64,
}

impl Cache {
    /// Expand `key` into a cache of `params.cache_size` bytes
    pub fn new(key: &[u8], params: &Config) -> Result<Self> {
        params.validate().map_err(rxvm_isa::IsaError::from)?;

        let size = params.cache_size as usize;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| RuntimeError::AllocationFailed { bytes: size, what: "cache" })?;
        bytes.resize(size, 0);

        let mut hasher = blake3::Hasher::new_derive_key(CACHE_FILL_CONTEXT);
        hasher.update(key);
        hasher.finalize_xof().fill(&mut bytes);

        let words = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        debug!(
            bytes = size,
            lines = params.cache_line_count(),
            accesses = params.cache_accesses,
            "cache initialized"
        );

        Ok(Self {
            words,
            line_count: params.cache_line_count(),
            accesses: params.cache_accesses,
            block_count: params.dataset_block_count(),
        })
    }

    #[inline]
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Size in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len() * 8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn line(&self, index: u64) -> &[u64] {
        let start = (index % self.line_count) as usize * BLOCK_WORDS;
        &self.words[start..start + BLOCK_WORDS]
    }
}

impl DatasetSource for Cache {
    fn derive_block(&self, index: u64) -> DatasetBlock {
        let mut hasher = blake3::Hasher::new_derive_key(BLOCK_DERIVE_CONTEXT);
        hasher.update(&index.to_le_bytes());

        let mut cursor = index;
        for _ in 0..self.accesses {
            let line = self.line(cursor);
            for word in line {
                hasher.update(&word.to_le_bytes());
            }
            cursor = (cursor ^ line[0]).wrapping_mul(LINE_STEP).rotate_left(29);
        }

        let mut bytes = [0u8; CACHE_LINE_SIZE as usize];
        hasher.finalize_xof().fill(&mut bytes);

        let mut block = [0u64; BLOCK_WORDS];
        for (word, chunk) in block.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        block
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("bytes", &self.len())
            .field("accesses", &self.accesses)
            .field("block_count", &self.block_count)
            .finish()
    }
}

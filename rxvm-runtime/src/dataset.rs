//! Dataset access
//!
//! The VM reads one 64-byte block per loop iteration. Blocks come from a
//! [`DatasetSource`], either through a fully materialized [`FullDataset`] or
//! derived on demand by a [`LightDataset`], which can hide derivation latency
//! behind a [`PrefetchPipeline`].
//!
//! Whatever the access mode, a block index always yields the same block.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use rxvm_isa::{Config, IsaError, CACHE_LINE_SIZE};
use tracing::debug;

use crate::error::{Result, RuntimeError};
use crate::prefetch::{PrefetchPipeline, PrefetchStats};

/// Words per dataset block
pub const BLOCK_WORDS: usize = (CACHE_LINE_SIZE / 8) as usize;

/// One cache-line-sized dataset block
pub type DatasetBlock = [u64; BLOCK_WORDS];

/// Block index addressed by a byte address
#[inline]
pub const fn block_index(address: u64) -> u64 {
    address / CACHE_LINE_SIZE
}

/// Deterministic block derivation, shared read-only between threads
pub trait DatasetSource: Send + Sync {
    /// Derive block `index`
    fn derive_block(&self, index: u64) -> DatasetBlock;

    /// Number of addressable blocks
    fn block_count(&self) -> u64;
}

impl<S: DatasetSource + ?Sized> DatasetSource for Arc<S> {
    fn derive_block(&self, index: u64) -> DatasetBlock {
        (**self).derive_block(index)
    }

    fn block_count(&self) -> u64 {
        (**self).block_count()
    }
}

/// Dataset reads issued by the execution loop.
///
/// The loop announces the next address with `prefetch` one iteration before
/// it calls `read` for it. Implementations without a pipeline may ignore the
/// hint.
pub trait DatasetAccess {
    fn prefetch(&mut self, address: u64);

    fn read(&mut self, address: u64) -> DatasetBlock;
}

impl<D: DatasetAccess + ?Sized> DatasetAccess for &mut D {
    fn prefetch(&mut self, address: u64) {
        (**self).prefetch(address)
    }

    fn read(&mut self, address: u64) -> DatasetBlock {
        (**self).read(address)
    }
}

// ============================================================================
// Full dataset
// ============================================================================

/// Every block materialized in memory
#[derive(Clone)]
pub struct FullDataset {
    blocks: Arc<Vec<DatasetBlock>>,
}

impl FullDataset {
    /// Derive all `params.dataset_block_count()` blocks on a dedicated pool
    /// of `threads` workers (`0` lets rayon pick)
    pub fn build(source: &dyn DatasetSource, params: &Config, threads: usize) -> Result<Self> {
        params.validate().map_err(IsaError::from)?;

        let count = params.dataset_block_count();
        if source.block_count() < count {
            return Err(RuntimeError::DatasetTooSmall {
                expected: count,
                found: source.block_count(),
            });
        }

        let len = count as usize;
        let mut blocks: Vec<DatasetBlock> = Vec::new();
        blocks
            .try_reserve_exact(len)
            .map_err(|_| RuntimeError::AllocationFailed {
                bytes: len * CACHE_LINE_SIZE as usize,
                what: "dataset",
            })?;
        blocks.resize(len, [0; BLOCK_WORDS]);

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("rxvm-dataset-{index}"))
            .build()?;
        debug!(blocks = len, threads = pool.current_num_threads(), "building dataset");

        pool.install(|| {
            blocks
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, block)| *block = source.derive_block(index as u64));
        });

        Ok(Self {
            blocks: Arc::new(blocks),
        })
    }

    /// Wrap blocks derived elsewhere
    pub fn from_blocks(blocks: Vec<DatasetBlock>, params: &Config) -> Result<Self> {
        let expected = params.dataset_block_count();
        if (blocks.len() as u64) < expected {
            return Err(RuntimeError::DatasetTooSmall {
                expected,
                found: blocks.len() as u64,
            });
        }
        Ok(Self {
            blocks: Arc::new(blocks),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn block(&self, index: u64) -> &DatasetBlock {
        &self.blocks[index as usize]
    }
}

impl DatasetSource for FullDataset {
    fn derive_block(&self, index: u64) -> DatasetBlock {
        *self.block(index)
    }

    fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }
}

impl DatasetAccess for FullDataset {
    #[inline]
    fn prefetch(&mut self, _address: u64) {}

    #[inline]
    fn read(&mut self, address: u64) -> DatasetBlock {
        *self.block(block_index(address))
    }
}

impl std::fmt::Debug for FullDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullDataset").field("blocks", &self.blocks.len()).finish()
    }
}

// ============================================================================
// Light dataset
// ============================================================================

/// Blocks derived on demand from a shared source
pub struct LightDataset {
    source: Arc<dyn DatasetSource>,
    pipeline: Option<PrefetchPipeline>,
}

impl LightDataset {
    /// Derive every block synchronously in the calling thread
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            pipeline: None,
        }
    }

    /// Derive blocks on a background thread, one iteration ahead
    pub fn with_prefetch(source: Arc<dyn DatasetSource>) -> Result<Self> {
        let pipeline = PrefetchPipeline::new(Arc::clone(&source))?;
        Ok(Self {
            source,
            pipeline: Some(pipeline),
        })
    }

    #[inline]
    pub fn is_pipelined(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Pipeline counters, `None` in synchronous mode
    pub fn prefetch_stats(&self) -> Option<PrefetchStats> {
        self.pipeline.as_ref().map(PrefetchPipeline::stats)
    }
}

impl DatasetAccess for LightDataset {
    fn prefetch(&mut self, address: u64) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.prepare_block(address);
        }
    }

    fn read(&mut self, address: u64) -> DatasetBlock {
        match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.get_block(address),
            None => self.source.derive_block(block_index(address)),
        }
    }
}

impl std::fmt::Debug for LightDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightDataset")
            .field("blocks", &self.source.block_count())
            .field("pipelined", &self.is_pipelined())
            .finish()
    }
}

//! # RXVM Runtime
//!
//! Deterministic proof-of-work virtual machine.
//!
//! A program of 256 random instructions is compiled once into bytecode and
//! then iterated over a scratchpad and a large dataset. The result is a bit
//! exact function of the input on every host: integer operations wrap, all
//! addresses are masked and float rounding is done in software.
//!
//! ## Features
//!
//! - **Bytecode compiler**: operand resolution, tier masks, backward branches
//! - **Execution loop**: fixed iteration count, one dataset block per iteration
//! - **Dataset access**: full in-memory dataset or on-demand derivation
//! - **Prefetch pipeline**: single-slot background block derivation
//! - **Chained hashing**: several programs per hash, keyed finalization
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rxvm_isa::Config;
//! use rxvm_runtime::{Cache, Hasher, LightDataset, VMConfig, VM};
//!
//! let params = Config::SMALL;
//! let cache = Arc::new(Cache::new(b"network key", &params).unwrap());
//! let dataset = LightDataset::with_prefetch(cache).unwrap();
//! let vm = VM::new(dataset, VMConfig::with_params(params)).unwrap();
//! let mut hasher = Hasher::new(vm, [0u8; 32]);
//! let digest = hasher.hash(b"block header").unwrap();
//! println!("{digest:02x?}");
//! ```

pub mod arith;
pub mod bytecode;
pub mod cache;
pub mod compiler;
pub mod dataset;
pub mod error;
pub mod execute;
pub mod float;
pub mod generator;
pub mod hasher;
pub mod prefetch;
pub mod register_file;
pub mod scratchpad;
pub mod vm;

use std::sync::Arc;

pub use bytecode::{ByteCode, Bytecode, FloatSlot, IntSource, MemOperand};
pub use cache::Cache;
pub use compiler::compile;
pub use dataset::{DatasetAccess, DatasetBlock, DatasetSource, FullDataset, LightDataset};
pub use error::{Result, RuntimeError};
pub use float::{FloatPair, RoundingMode};
pub use generator::{generate_program, Blake3Generator, ByteGenerator};
pub use hasher::{Hasher, HASH_SIZE, KEY_SIZE};
pub use prefetch::{PrefetchPipeline, PrefetchStats};
pub use register_file::{ProgramConfig, RegisterFile};
pub use scratchpad::Scratchpad;
pub use vm::{VMConfig, VM};

/// One-shot light-mode hash
///
/// Builds a cache from `key`, runs a pipelined light dataset and finalizes
/// with a key derived from the same bytes.
pub fn hash(key: &[u8], input: &[u8], params: &rxvm_isa::Config) -> Result<[u8; HASH_SIZE]> {
    let cache = Arc::new(Cache::new(key, params)?);
    let dataset = LightDataset::with_prefetch(cache)?;
    let vm = VM::new(dataset, VMConfig::with_params(*params))?;
    let mut hasher = Hasher::new(vm, *blake3::hash(key).as_bytes());
    hasher.hash(input)
}

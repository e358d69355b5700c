//! Stress tests
//!
//! Long-running checks over many programs, many hashes and irregular dataset
//! access. The default parameters keep each test within a few seconds.

use std::collections::HashSet;
use std::sync::Arc;

use rxvm_isa::Config;
use rxvm_runtime::{
    compile, generate_program, Blake3Generator, Cache, DatasetAccess, DatasetSource, Hasher,
    LightDataset, PrefetchPipeline, VMConfig, VM,
};

fn params() -> Config {
    Config {
        program_iterations: 32,
        program_count: 2,
        ..Config::SMALL
    }
}

// ============================================================================
// Many hashes
// ============================================================================

#[test]
fn test_many_hashes_are_distinct() {
    let params = params();
    let source = Arc::new(Cache::new(b"stress", &params).unwrap());
    let dataset = LightDataset::with_prefetch(source).unwrap();
    let vm = VM::new(dataset, VMConfig::with_params(params)).unwrap();
    let mut hasher = Hasher::new(vm, [5; 32]);

    let mut seen = HashSet::new();
    for nonce in 0u32..64 {
        let digest = hasher.hash(&nonce.to_le_bytes()).unwrap();
        assert!(seen.insert(digest), "digest collision at nonce {nonce}");
    }
    assert_eq!(hasher.hashes(), 64);
}

#[test]
fn test_interleaved_hashers_do_not_interfere() {
    let params = params();
    let source = Arc::new(Cache::new(b"interleave", &params).unwrap());
    let hasher = || {
        let dataset = LightDataset::with_prefetch(source.clone()).unwrap();
        let vm = VM::new(dataset, VMConfig::with_params(params)).unwrap();
        Hasher::new(vm, [6; 32])
    };

    let mut a = hasher();
    let mut b = hasher();
    let mut reference = hasher();

    for nonce in 0u32..16 {
        let input = nonce.to_be_bytes();
        let left = a.hash(&input).unwrap();
        let right = b.hash(&input).unwrap();
        assert_eq!(left, right);
        assert_eq!(left, reference.hash(&input).unwrap());
    }
}

// ============================================================================
// Many programs
// ============================================================================

#[test]
fn test_many_programs_compile_within_bounds() {
    let params = Config::DEFAULT;
    for nonce in 0..500 {
        let program = generate_program(&Blake3Generator::PROGRAM, b"compile", nonce).unwrap();
        let bytecode = compile(&program, &params);
        for (index, target) in bytecode.branches() {
            assert!((target as isize) < index as isize);
            assert!(target >= -1);
        }
        for entry in bytecode.entries() {
            if let Some(mem) = entry.memory_operand() {
                assert!(mem.mask <= params.l3_mask());
            }
        }
    }
}

#[test]
fn test_many_programs_run_in_one_vm() {
    let params = params();
    let source = Arc::new(Cache::new(b"programs", &params).unwrap());
    let mut vm = VM::new(LightDataset::new(source), VMConfig::with_params(params)).unwrap();

    let mut seen = HashSet::new();
    for nonce in 0..32 {
        let program = generate_program(&Blake3Generator::PROGRAM, b"run", nonce).unwrap();
        let regs = *vm.run(&program);
        assert!(seen.insert(regs.r), "register collision at nonce {nonce}");
    }
}

// ============================================================================
// Pipeline under irregular access
// ============================================================================

#[test]
fn test_pipeline_random_access_pattern() {
    let params = params();
    let source: Arc<dyn DatasetSource> = Arc::new(Cache::new(b"pipeline", &params).unwrap());
    let blocks = source.block_count();
    let mut pipeline = PrefetchPipeline::new(source.clone()).unwrap();

    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for step in 0..2_000u64 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let index = state % blocks;

        match step % 4 {
            0 | 1 => {
                pipeline.prepare_block(index * 64);
                assert_eq!(pipeline.get_block(index * 64), source.derive_block(index));
            }
            2 => {
                pipeline.prepare_block(index * 64);
            }
            _ => {
                let other = (index + 1) % blocks;
                assert_eq!(pipeline.get_block(other * 64), source.derive_block(other));
            }
        }
    }

    let stats = pipeline.stats();
    assert_eq!(stats.hits + stats.misses, 1_500);
    assert_eq!(stats.requests + stats.skipped, 1_500);
    assert!(stats.hits + stats.discarded <= stats.requests);
}

#[test]
fn test_light_dataset_long_sequential_scan() {
    let params = params();
    let source = Arc::new(Cache::new(b"scan", &params).unwrap());
    let mut plain = LightDataset::new(source.clone());
    let mut pipelined = LightDataset::with_prefetch(source).unwrap();

    let mut address = 0u64;
    pipelined.prefetch(address);
    for _ in 0..1_000 {
        let expected = plain.read(address);
        let next = (address + 64 * 37) % (params.dataset_block_count() * 64);
        assert_eq!(pipelined.read(address), expected);
        pipelined.prefetch(next);
        address = next;
    }

    let stats = pipelined.prefetch_stats().unwrap();
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.hits, 1_000);
}

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::{hint::black_box, sync::Arc};

use rxvm_isa::Config;
use rxvm_runtime::{
    compile, generate_program, Blake3Generator, Cache, FullDataset, Hasher, LightDataset,
    VMConfig, VM,
};

fn bench_params() -> Config {
    Config {
        program_count: 2,
        ..Config::SMALL
    }
}

fn benchmark_compile(c: &mut Criterion) {
    let program = generate_program(&Blake3Generator::PROGRAM, b"bench", 0).unwrap();
    let params = Config::DEFAULT;
    c.bench_function("compile program", |b| {
        b.iter(|| compile(black_box(&program), black_box(&params)))
    });
}

fn benchmark_run(c: &mut Criterion) {
    let params = bench_params();
    let cache = Arc::new(Cache::new(b"bench key", &params).unwrap());
    let full = FullDataset::build(&*cache, &params, 4).unwrap();
    let program = generate_program(&Blake3Generator::PROGRAM, b"bench", 0).unwrap();

    let mut group = c.benchmark_group("run program");
    group.sample_size(10);

    let mut vm = VM::new(full, VMConfig::with_params(params)).unwrap();
    group.bench_function(BenchmarkId::new("dataset", "full"), |b| {
        b.iter(|| *vm.run(black_box(&program)))
    });

    let mut vm = VM::new(LightDataset::new(cache.clone()), VMConfig::with_params(params)).unwrap();
    group.bench_function(BenchmarkId::new("dataset", "light"), |b| {
        b.iter(|| *vm.run(black_box(&program)))
    });

    let light = LightDataset::with_prefetch(cache.clone()).unwrap();
    let mut vm = VM::new(light, VMConfig::with_params(params)).unwrap();
    group.bench_function(BenchmarkId::new("dataset", "light-prefetch"), |b| {
        b.iter(|| *vm.run(black_box(&program)))
    });

    group.finish();
}

fn benchmark_hash(c: &mut Criterion) {
    let params = bench_params();
    let cache = Arc::new(Cache::new(b"bench key", &params).unwrap());
    let full = FullDataset::build(&*cache, &params, 4).unwrap();
    let vm = VM::new(full, VMConfig::with_params(params)).unwrap();
    let mut hasher = Hasher::new(vm, [0x42; 32]);

    let mut group = c.benchmark_group("hash");
    group.sample_size(10);
    group.bench_function("chained", |b| {
        b.iter(|| hasher.hash(black_box(b"benchmark input")).unwrap())
    });
    group.finish();
}

criterion_group!(benches, benchmark_compile, benchmark_run, benchmark_hash);
criterion_main!(benches);

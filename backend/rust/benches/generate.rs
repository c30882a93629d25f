// benches/generate.rs - Maze carving and solving throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_maze_generator::{exit_cell, generate_seeded, shortest_path, ENTRANCE};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for dimension in [11usize, 51, 201] {
        group.bench_with_input(BenchmarkId::from_parameter(dimension), &dimension, |b, &d| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                black_box(generate_seeded(d, seed).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let dimension = 201;
    let grid = generate_seeded(dimension, 17).unwrap();
    c.bench_function("shortest_path_201", |b| {
        b.iter(|| black_box(shortest_path(&grid, ENTRANCE, exit_cell(dimension))))
    });
}

criterion_group!(benches, bench_generate, bench_solve);
criterion_main!(benches);

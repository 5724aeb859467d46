//! Benchmark for standardization and seeded k-means clustering
//!
//! Run with: cargo bench --bench cluster_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use rfvkit::pipeline::{cluster_customers, ClusterConfig, CustomerMetrics, StandardScaler};

/// Generate a synthetic customer population with plausible RFV spreads
fn generate_customers(n: usize, seed: u64) -> Vec<CustomerMetrics> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    (0..n)
        .map(|i| CustomerMetrics {
            customer_id: format!("c{:06}", i),
            recency: rng.gen_range(0..365i64),
            frequency: rng.gen_range(1..60u32),
            value: rng.gen::<f64>() * 5_000.0,
        })
        .collect()
}

/// Benchmark full clustering for varying population sizes
fn benchmark_clustering_by_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering_by_population");
    group.sample_size(10);

    let population_sizes = [100, 1_000, 10_000];

    for n in population_sizes {
        let customers = generate_customers(n, 42);
        let config = ClusterConfig::new(4, 42);

        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &customers,
            |b, customers| {
                b.iter(|| {
                    let _ = cluster_customers(black_box(customers), black_box(&config));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark clustering for varying k at a fixed population
fn benchmark_clustering_by_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering_by_k");
    group.sample_size(10);

    let customers = generate_customers(5_000, 42);
    let cluster_counts = [2, 4, 8, 16];

    for k in cluster_counts {
        let config = ClusterConfig::new(k, 42);

        group.bench_with_input(BenchmarkId::from_parameter(k), &config, |b, config| {
            b.iter(|| {
                let _ = cluster_customers(black_box(&customers), black_box(config));
            });
        });
    }

    group.finish();
}

/// Benchmark the cost of additional restarts
fn benchmark_restart_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("restart_scaling");
    group.sample_size(10);

    let customers = generate_customers(2_000, 42);
    let restart_counts = [1, 5, 10, 20];

    for n_init in restart_counts {
        let config = ClusterConfig {
            n_init,
            ..ClusterConfig::new(4, 42)
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(n_init),
            &config,
            |b, config| {
                b.iter(|| {
                    let _ = cluster_customers(black_box(&customers), black_box(config));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark z-score fitting and transformation on its own
fn benchmark_standard_scaler(c: &mut Criterion) {
    let mut group = c.benchmark_group("standard_scaler");
    group.sample_size(50);

    let n = 100_000;
    let customers = generate_customers(n, 42);
    let points: Vec<[f64; 3]> = customers
        .iter()
        .map(|m| [m.recency as f64, m.frequency as f64, m.value])
        .collect();

    group.throughput(Throughput::Elements(n as u64));

    group.bench_function("fit", |b| {
        b.iter(|| {
            let _ = StandardScaler::fit(black_box(&points));
        });
    });

    let scaler = StandardScaler::fit(&points).unwrap();
    group.bench_function("transform", |b| {
        b.iter(|| {
            let _ = scaler.transform(black_box(&points));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_clustering_by_population,
    benchmark_clustering_by_k,
    benchmark_restart_scaling,
    benchmark_standard_scaler,
);
criterion_main!(benches);

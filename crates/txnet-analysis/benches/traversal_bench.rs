//! Benchmarks for the graph traversals.
//!
//! Uses generated in-memory graphs for reproducible performance testing.
//! Run with: `cargo bench --package txnet-analysis`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use txnet_analysis::cycles::find_return_cycles;
use txnet_analysis::subnetwork::largest_subnetwork;
use txnet_analysis::TransactionGraph;
use txnet_data::{AccountRecord, TransferRecord};

fn address(n: usize) -> String {
    format!("0x{n:040x}")
}

/// A single directed ring over `size` accounts.
fn ring(size: usize) -> TransactionGraph {
    let accounts: Vec<AccountRecord> = (0..size)
        .map(|n| AccountRecord::new(address(n), (n as u128 + 1) * 1_000_000_000_000_000))
        .collect();
    let transfers: Vec<TransferRecord> = (0..size)
        .map(|n| TransferRecord::new(n as u64, address(n), address((n + 1) % size), 1))
        .collect();
    TransactionGraph::from_records(&accounts, &transfers).expect("ring builds")
}

/// Each account sends to the next `fan_out` accounts, wrapping around.
fn mesh(size: usize, fan_out: usize) -> TransactionGraph {
    let accounts: Vec<AccountRecord> = (0..size)
        .map(|n| AccountRecord::new(address(n), n as u128))
        .collect();
    let transfers: Vec<TransferRecord> = (0..size)
        .flat_map(|n| (1..=fan_out).map(move |k| (n, (n + k) % size)))
        .enumerate()
        .map(|(seq, (from, to))| TransferRecord::new(seq as u64, address(from), address(to), 1))
        .collect();
    TransactionGraph::from_records(&accounts, &transfers).expect("mesh builds")
}

/// Benchmark: one witness per seed around a 200-account ring.
fn bench_cycles_ring_200(c: &mut Criterion) {
    let graph = ring(200);
    c.bench_function("cycles_ring_200", |b| {
        b.iter(|| find_return_cycles(black_box(&graph)).expect("ring has seeds"))
    });
}

/// Benchmark: cycle search on a 100-account mesh with fan-out 3.
fn bench_cycles_mesh_100(c: &mut Criterion) {
    let graph = mesh(100, 3);
    c.bench_function("cycles_mesh_100", |b| {
        b.iter(|| find_return_cycles(black_box(&graph)).expect("mesh has seeds"))
    });
}

/// Benchmark: largest subnetwork over a 500-account mesh.
fn bench_subnetwork_mesh_500(c: &mut Criterion) {
    let graph = mesh(500, 2);
    c.bench_function("subnetwork_mesh_500", |b| {
        b.iter(|| largest_subnetwork(black_box(&graph)).expect("mesh has seeds"))
    });
}

criterion_group!(
    benches,
    bench_cycles_ring_200,
    bench_cycles_mesh_100,
    bench_subnetwork_mesh_500
);
criterion_main!(benches);

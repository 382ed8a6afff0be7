//! Benchmarks for protocol runs
//!
//! Run with: cargo bench -p qpv-protocol

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qpv_protocol::{Basis, FidelityAttack, FidelityStrategy, HonestSetup, ProtocolConfig};

fn config(rounds: u64) -> ProtocolConfig {
    ProtocolConfig {
        rounds,
        bases: 4,
        seed: Some(1),
        max_rounds: Some(rounds * 50),
        ..ProtocolConfig::default()
    }
}

/// Benchmark full honest runs
fn bench_honest_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("honest_run");

    for rounds in &[10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rounds", rounds), rounds, |b, &n| {
            let setup = HonestSetup::at_verification(config(n)).unwrap();
            b.iter(|| black_box(setup.run().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark full attack runs
fn bench_attack_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("attack_run");

    for rounds in &[10u64, 100] {
        group.bench_with_input(BenchmarkId::new("rounds", rounds), rounds, |b, &n| {
            let attack = FidelityAttack::new(config(n), -5.0, 5.0).unwrap();
            b.iter(|| black_box(attack.run().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark the fidelity decision alone
fn bench_decision(c: &mut Criterion) {
    let strategy = FidelityStrategy::new(8, 0.4);
    let adversary = Basis { theta: 3, phi: 5 };
    let metadata = Basis { theta: 6, phi: 2 }.conceal(4, 8);
    c.bench_function("fidelity_decision", |b| {
        b.iter(|| {
            strategy
                .respond(black_box(true), black_box(adversary), metadata, black_box(4))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_honest_run, bench_attack_run, bench_decision);
criterion_main!(benches);

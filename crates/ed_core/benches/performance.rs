//! Performance benchmarks for ed_core using Criterion.rs.

use bevy_ecs::prelude::World;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ed_core::distributions::SimRng;
use ed_core::generation::{acuity_score, draw_clinical};
use ed_core::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use ed_core::scenario::{build_scenario, EdConfig};

fn bench_simulation_run(c: &mut Criterion) {
    let scenarios = vec![("one_day", 1.0), ("three_days", 3.0), ("one_week", 7.0)];

    let mut group = c.benchmark_group("simulation_run");
    group.sample_size(10);
    for (name, days) in scenarios {
        group.bench_with_input(BenchmarkId::from_parameter(name), &days, |b, &days| {
            b.iter(|| {
                let mut world = World::new();
                let config = EdConfig::default().with_seed(42).with_days(days);
                build_scenario(&mut world, &config).expect("default config is valid");
                initialize_simulation(&mut world);
                let mut schedule = simulation_schedule();
                black_box(run_until_empty(&mut world, &mut schedule, 10_000_000));
            });
        });
    }
    group.finish();
}

fn bench_triage(c: &mut Criterion) {
    let config = EdConfig::default();
    let mut rng = SimRng::seeded(Some(42));

    c.bench_function("triage_draw_and_score", |b| {
        b.iter(|| {
            let clinical = draw_clinical(&config.triage, &mut rng.0);
            black_box(acuity_score(&config.triage.weights, &clinical, 3))
        });
    });
}

criterion_group!(benches, bench_simulation_run, bench_triage);
criterion_main!(benches);

//! Stage dispatch micro-benchmarks.
//!
//! Measures one Update pass over mixed workloads: a component writer, a
//! resource writer, and a fan of parallel readers. The interesting number is
//! the dispatch overhead per tick, not the system bodies.

use cadence_bench::particle_app;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn stage_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_pass");

    for &entities in &[64usize, 1024] {
        for &readers in &[2usize, 8] {
            let mut app = particle_app(entities, readers);
            app.startup().unwrap();

            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{entities}ents_{readers}readers")),
                &(),
                |b, _| {
                    b.iter(|| {
                        app.update().unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, stage_pass);
criterion_main!(benches);

#![expect(missing_docs, reason = "benchmarks")]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use phased_bench::{
    AddressStepper, LocalMemoryWorkload, PrimeWorkload, SharedMemoryWorkload, StepPolicy,
    Workload, random_buffer,
};

// Small enough to allocate quickly, large enough to miss in the caches when stepped through.
const BUFFER_WORDS: usize = 16 * 1024 * 1024;

fn entrypoint(c: &mut Criterion) {
    let mut g = c.benchmark_group("stepper");

    for policy in [StepPolicy::Randomized, StepPolicy::FixedStride] {
        g.bench_function(policy.to_string(), |b| {
            let mut stepper = AddressStepper::with_seed(policy, 42);
            let mut position = 0;

            b.iter(|| {
                position = stepper.next(black_box(position), true, BUFFER_WORDS);
                position
            });
        });
    }

    g.finish();

    let mut g = c.benchmark_group("workload");

    g.bench_function("prime", |b| {
        let mut workload = PrimeWorkload::new();

        b.iter(|| workload.do_work());
    });

    g.bench_function("local_memory", |b| {
        let mut workload = LocalMemoryWorkload::new(BUFFER_WORDS, true, StepPolicy::Randomized);
        workload.warm();

        b.iter(|| workload.do_work());
    });

    g.bench_function("shared_memory", |b| {
        let buffer: Arc<[u32]> = random_buffer(BUFFER_WORDS).into();
        let mut workload = SharedMemoryWorkload::new(buffer, true, StepPolicy::Randomized);

        b.iter(|| workload.do_work());
    });

    g.finish();
}

criterion_group!(benches, entrypoint);
criterion_main!(benches);

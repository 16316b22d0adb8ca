use criterion::{black_box, criterion_group, criterion_main, Criterion};
use totality_sync::UnfreezeQueue;

pub fn benchmark(c: &mut Criterion) {
    let queue = UnfreezeQueue::<u64>::new();
    {
        let mut uncontended = c.benchmark_group("uncontended");
        uncontended.bench_function("insert fresh", |b| {
            let mut k = 0;
            b.iter(|| {
                k += 1;
                black_box(queue.insert(k));
            });
        });
        uncontended.bench_function("insert duplicate", |b| {
            queue.insert(0);
            b.iter(|| {
                black_box(queue.insert(0));
            });
        });
        uncontended.bench_function("insert + drain", |b| {
            b.iter(|| {
                queue.insert(black_box(1));
                black_box(queue.drain());
            });
        });
    }
    queue.drain();

    {
        let mut contended = c.benchmark_group("insert contention");
        testbench::run_under_contention(
            || black_box(queue.insert(black_box(7))),
            || {
                contended.bench_function("insert duplicate", |b| {
                    b.iter(|| {
                        black_box(queue.insert(7));
                    })
                });
                contended.bench_function("contains", |b| {
                    b.iter(|| {
                        black_box(queue.contains(&7));
                    })
                });
            },
        );
    }

    {
        let mut drain_contended = c.benchmark_group("drain contention");
        testbench::run_under_contention(
            || black_box(queue.drain()),
            || {
                drain_contended.bench_function("insert", |b| {
                    let mut k = 0;
                    b.iter(|| {
                        k += 1;
                        black_box(queue.insert(k));
                    })
                });
            },
        );
    }
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

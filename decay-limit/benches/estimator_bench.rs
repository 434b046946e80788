use std::fmt;
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::DefaultKeyedRateLimiter;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::Clock;
use governor::clock::QuantaClock;

use decay_limit::DecayEstimator;
use decay_limit::Reason;
use decay_limit::Strategy;

const CLIENTS: usize = 1_024;

// Wrapper to bridge Governor's keyed limiter into the decay-limit Strategy trait
struct GovernorStrategy {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: QuantaClock,
}

impl fmt::Debug for GovernorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GovernorStrategy")
    }
}

impl Strategy for GovernorStrategy {
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        match self.limiter.check_key(&key.to_owned()) {
            Ok(_) => ControlFlow::Continue(()),
            Err(negative) => {
                let now = self.clock.now();
                let wait: Duration = negative.wait_time_from(now);
                ControlFlow::Break(Reason::TooFrequent {
                    estimated_interval: Duration::ZERO,
                    retry_after: wait,
                })
            }
        }
    }
}

fn client_keys() -> Arc<Vec<String>> {
    Arc::new((0..CLIENTS).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect())
}

fn bench_single_strategy<S: Strategy>(group_name: &str, c: &mut Criterion, strategy: Arc<S>) {
    let keys = client_keys();
    let mut group = c.benchmark_group(group_name);

    group.bench_function("single-threaded", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % CLIENTS;
            let _ = black_box(strategy.as_ref()).process(&keys[i]);
        })
    });

    group.finish();
}

fn bench_parallel_strategy<S: Strategy + Send + Sync + 'static>(
    group_name: &str,
    c: &mut Criterion,
    strategy: Arc<S>,
) {
    let keys = client_keys();
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for t in 0..n {
                        let s = Arc::clone(&strategy);
                        let bar = Arc::clone(&barrier);
                        let keys = Arc::clone(&keys);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for i in 0..iters_per_thread {
                                let key = &keys[(i as usize + t) % CLIENTS];
                                let _ = black_box(s.process(key));
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let limit_val = 1_000_000;

    // Permissive interval so we measure bookkeeping, not rejections
    let decay = Arc::new(DecayEstimator::new(Duration::from_nanos(1)));
    let disabled = Arc::new(DecayEstimator::new(Duration::ZERO));

    let gov_quota = Quota::per_minute(NonZeroU32::new(limit_val).unwrap());
    let gov = Arc::new(GovernorStrategy {
        limiter: Arc::new(RateLimiter::keyed(gov_quota)),
        clock: QuantaClock::default(),
    });

    bench_single_strategy("DecayEstimator", c, Arc::clone(&decay));
    bench_parallel_strategy("DecayEstimator", c, decay);

    bench_single_strategy("DecayEstimator-Disabled", c, Arc::clone(&disabled));

    bench_single_strategy("Governor-Keyed", c, Arc::clone(&gov));
    bench_parallel_strategy("Governor-Keyed", c, gov);
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);

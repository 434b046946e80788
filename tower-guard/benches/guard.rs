use std::sync::Arc;
use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use decay_limit::DecayEstimator;
use futures::stream::FuturesUnordered;
use futures::stream::StreamExt;
use http::Request;
use http::Response;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::service_fn;
use tower::util::BoxCloneSyncService;
use tower_guard::AdmissionLayer;
use tower_guard::ExecutionGuard;
use tower_guard::ExecutionLayer;
use tower_guard::ManagedGuardLayer;

// --- HELPERS & TYPES ---

type BenchService = BoxCloneSyncService<Request<String>, Response<String>, BoxError>;

async fn noop_handler(_req: Request<String>) -> Result<Response<String>, BoxError> {
    Ok(Response::new("ok".to_string()))
}

fn by_body(req: &Request<String>) -> String {
    req.body().clone()
}

fn request(client: usize) -> Request<String> {
    Request::builder()
        .body(format!("client-{}", client % 1_024))
        .unwrap()
}

/// Generic runner for single-call overhead benchmarks
fn bench_overhead(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
) {
    group.bench_function(id, |b| {
        let mut client = 0;
        b.to_async(rt).iter(|| {
            client += 1;
            let mut s = svc.clone();
            let req = request(client);
            async move {
                let res = s.ready().await.unwrap().call(req).await;
                black_box(res)
            }
        });
    });
}

/// Generic runner for burst/contention benchmarks
fn bench_burst(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
    burst_size: usize,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let s = svc.clone();
            async move {
                let mut futures = FuturesUnordered::new();
                for client in 0..burst_size {
                    let mut local_svc = s.clone();
                    futures.push(async move {
                        local_svc.ready().await.unwrap().call(request(client)).await
                    });
                }
                while let Some(res) = futures.next().await {
                    let _ = black_box(res);
                }
            }
        });
    });
}

// --- MAIN BENCHMARK ---

fn bench_all_scenarios(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();

    let burst_size = 1000;

    // Use a tiny interval so we measure the overhead of the bookkeeping,
    // not rejections.
    let estimator = Arc::new(DecayEstimator::new(Duration::from_nanos(1)));
    let timeout = Duration::from_secs(1);

    // Define Scenarios (ID, Service)
    let scenarios: Vec<(&str, BenchService)> = vec![
        (
            "unguarded",
            BoxCloneSyncService::new(service_fn(noop_handler)),
        ),
        (
            "admission",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(AdmissionLayer::new(estimator.clone(), by_body))
                    .service(service_fn(noop_handler)),
            ),
        ),
        (
            "execution_inline",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(ExecutionLayer::new(Duration::ZERO, by_body))
                    .service(service_fn(noop_handler)),
            ),
        ),
        (
            "execution_spawned",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(ExecutionLayer::new(timeout, by_body))
                    .service(service_fn(noop_handler)),
            ),
        ),
        (
            "tower_timeout",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .timeout(timeout)
                    .service(service_fn(noop_handler)),
            ),
        ),
        (
            "managed",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(ManagedGuardLayer::with_estimator(
                        estimator.clone(),
                        ExecutionGuard::new(timeout),
                        by_body,
                    ))
                    .service(service_fn(noop_handler)),
            ),
        ),
    ];

    // Run Overhead Group
    let mut overhead_group = c.benchmark_group("Middleware Overhead");
    for (id, svc) in &scenarios {
        bench_overhead(&mut overhead_group, &rt, id, svc.clone());
    }
    overhead_group.finish();

    // Run Contention Group
    let mut contention_group = c.benchmark_group("High Contention (1000 Tasks)");
    for (id, svc) in &scenarios {
        bench_burst(&mut contention_group, &rt, id, svc.clone(), burst_size);
    }
    contention_group.finish();
}

criterion_group!(benches, bench_all_scenarios);
criterion_main!(benches);

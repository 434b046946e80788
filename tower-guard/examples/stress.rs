use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;

use tower_guard::GuardConfig;
use tower_guard::GuardError;
use tower_guard::ManagedGuardLayer;

/// Fire a burst of requests from a handful of clients through the guard.
#[derive(Debug, Parser)]
struct Args {
    /// Minimum average spacing between requests from one client (0 disables)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "20ms")]
    rate_duration: Duration,

    /// Deadline for each handler (0 disables)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "50ms")]
    exec_timeout: Duration,

    /// Number of distinct clients
    #[arg(long, default_value_t = 4)]
    clients: usize,

    /// Number of requests to send
    #[arg(long, default_value_t = 200)]
    requests: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // 1. Setup the guard
    let config = GuardConfig::default()
        .with_rate_duration(args.rate_duration)
        .with_exec_timeout(args.exec_timeout);
    let layer = ManagedGuardLayer::new(config, |req: &(usize, usize)| {
        format!("client-{}", req.0)
    });

    // 2. Define a "Work" service; every tenth request is slow
    let service = tower::service_fn(|(_, i): (usize, usize)| async move {
        let work = if i % 10 == 0 { 100 } else { 1 };
        sleep(Duration::from_millis(work)).await;
        Ok::<&str, tower::BoxError>("Request Successful")
    });

    let guarded_service = layer.layer(service);

    println!("🚀 Starting Stress Test...");
    println!("{config:?}");
    println!("Clients: {}\n", args.clients);

    // 3. Fire the requests instantly
    let mut tasks = Vec::new();
    for i in 0..args.requests {
        let mut svc = guarded_service.clone();
        let client = i % args.clients.max(1);
        tasks.push(tokio::spawn(async move {
            match svc.ready().await {
                Ok(ready_svc) => match ready_svc.call((client, i)).await {
                    Ok(resp) => println!("[{i:03}] ✅ client-{client} {resp}"),
                    Err(e) => {
                        if let Some(guard_err) = e.downcast_ref::<GuardError>() {
                            println!("[{i:03}] ❌ Guard Rejected: {guard_err}");
                        } else {
                            println!("[{i:03}] 💥 Unexpected Error: {e}");
                        }
                    }
                },
                Err(e) => println!("[{i:03}] ⚠️ Service Unavailable: {e}"),
            }
        }));
    }

    // Wait for all requests to finish
    for task in tasks {
        let _ = task.await;
    }

    println!("\n🏁 Stress test complete.");
}

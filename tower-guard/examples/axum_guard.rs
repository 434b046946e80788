use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router, error_handling::HandleErrorLayer, extract::Request, http::StatusCode,
    response::IntoResponse, routing::get,
};
use tower::BoxError;
use tower::ServiceBuilder;
use tower_guard::{GuardConfig, GuardError, ManagedGuardLayer, RealIp};

#[tokio::main]
async fn main() {
    // 1. Setup Guard: 1MiB bodies, one request per 100ms per client, 2s handlers
    let config = GuardConfig::new(1 << 20, Duration::from_millis(100), Duration::from_secs(2));

    // 2. Setup Managed Layer keyed by client IP
    let managed_layer = ManagedGuardLayer::<_, Request>::new(config, RealIp);

    // 3. Build the Router
    let app = Router::new()
        .route("/", get(|| async { "Hello, Guard!" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "Too late"
            }),
        )
        .layer(
            ServiceBuilder::new()
                // 1. The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_guard_error))
                // 2. The middle layer: introduces BoxError
                .layer(managed_layer)
                // 3. Converts the Route's Infallible to BoxError
                // so that ManagedGuardLayer is happy wrapping it.
                .map_err(BoxError::from),
        );

    // The body limit wraps the request body, so it sits outside the guard
    let app = match config.body_limit() {
        Some(body_limit) => app.layer(body_limit),
        None => app,
    };

    // 4. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    println!("📡 Listening on http://127.0.0.1:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

/// The signature must match BoxError -> IntoResponse
async fn handle_guard_error(err: BoxError) -> impl IntoResponse {
    if let Some(guard_err) = err.downcast_ref::<GuardError>() {
        guard_err.clone().into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
    }
}

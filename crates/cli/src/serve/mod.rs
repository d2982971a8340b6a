//! `tracker serve` -- HTTP JSON API over the produce ledger.
//!
//! This is the transport boundary: it authenticates callers, resolves their
//! actor identity, and hands that identity to the ledger. Request bodies
//! never carry an actor.
//!
//! Security features:
//! - Bearer-token authentication mapped to actor identities by config
//! - Reads open to anonymous observers; writes require a principal
//! - CORS headers on all responses (permissive for wallet front-ends)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//!
//! Endpoints:
//! - GET  /health                      - Server status (exempt from rate limit)
//! - GET  /produces                    - Range listing (`offset`, `limit`)
//! - GET  /produces/total              - Count of registered produce
//! - GET  /produces/{id}               - Produce snapshot
//! - GET  /produces/{id}/history       - Append-ordered update history
//! - POST /produces                    - Register produce
//! - POST /produces/{id}/updates       - Append an update
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracker_core::{Actor, SystemClock};
use tracker_storage::{JournalStore, Ledger};

use self::handlers::{
    handle_append_update, handle_get_history, handle_get_produce, handle_health,
    handle_list_produces, handle_not_found, handle_register, handle_total,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default and maximum page size for `GET /produces`.
const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 500;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, kind: &str, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"error": message, "kind": kind})),
    )
}

/// Everything `start_server` needs, resolved from config and flags.
pub(crate) struct ServeOptions {
    pub(crate) bind: String,
    pub(crate) port: u16,
    pub(crate) journal: PathBuf,
    pub(crate) principals: HashMap<String, Actor>,
    pub(crate) rate_limit: u64,
    pub(crate) tls_cert: Option<PathBuf>,
    pub(crate) tls_key: Option<PathBuf>,
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/produces",
            get(handle_list_produces).post(handle_register),
        )
        .route("/produces/total", get(handle_total))
        .route("/produces/{id}", get(handle_get_produce))
        .route("/produces/{id}/history", get(handle_get_history))
        .route(
            "/produces/{id}/updates",
            axum::routing::post(handle_append_update),
        )
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Open the journal, replay it, and serve until Ctrl+C.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
pub(crate) async fn start_server(opts: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let store = JournalStore::open(&opts.journal).await?;
    let journal = store.path().display().to_string();
    let ledger = Ledger::open(store, SystemClock).await?;
    info!(
        journal = %journal,
        produces = ledger.total_produces().await,
        "ledger loaded"
    );

    if opts.principals.is_empty() {
        warn!("no principals configured; the API is read-only");
    } else {
        info!(principals = opts.principals.len(), "token authentication enabled");
    }
    info!(rate_limit = opts.rate_limit, "requests per minute per IP");

    let state = Arc::new(AppState {
        ledger,
        rate_limiter: RateLimiter::new(opts.rate_limit),
        principals: opts.principals,
    });
    let app = build_router(state);

    let addr = format!("{}:{}", opts.bind, opts.port);

    // TLS support via axum-server + rustls (requires `tls` feature)
    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&opts.tls_cert, &opts.tls_key) {
        let config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        info!("produce tracker listening on https://{}", addr);
        axum_server::bind_rustls(socket_addr, config)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
        return Ok(());
    }
    #[cfg(not(feature = "tls"))]
    if opts.tls_cert.is_some() || opts.tls_key.is_some() {
        return Err("TLS requested but this build lacks the `tls` feature".into());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("produce tracker listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}

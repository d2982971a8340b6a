//! HTTP middleware: rate limiting and principal resolution.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::{AppState, Caller};

/// Rate limiting middleware. Checks per-IP request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // /health is exempt (for load balancer health checks)
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(%ip, retry_after, "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "kind": "rate_limited",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Extract a credential from `Authorization: Bearer <token>` or
/// `X-API-Key: <token>`.
fn presented_token(request: &Request<axum::body::Body>) -> Option<&str> {
    let headers = request.headers();
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim());
        }
    }
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Principal resolution middleware.
///
/// A presented token must map to a configured principal (403 otherwise).
/// Requests without credentials continue as [`Caller::Anonymous`], which
/// only read endpoints accept. The resolved caller is stored in the request
/// extensions for handlers.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = match presented_token(&request) {
        Some(token) => match state.principals.get(token) {
            Some(actor) => Caller::Principal(actor.clone()),
            None => {
                return super::json_error(StatusCode::FORBIDDEN, "forbidden", "invalid API key")
                    .into_response()
            }
        },
        None => Caller::Anonymous,
    };

    if matches!(caller, Caller::Anonymous) && request.method() != Method::GET {
        return super::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        )
        .into_response();
    }

    request.extensions_mut().insert(caller);
    next.run(request).await
}

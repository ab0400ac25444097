use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::models::RateLimitExceeded;
use crate::rate_limit::{Decision, RATE_LIMIT_MESSAGE, client_ip};
use crate::state::AppState;

/// Runs ahead of every handler. Requests to the protected route are checked
/// against the limiter and rejected with 429 once the caller is over the limit.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let route = request.uri().path().to_string();
    if !state.rate_limiter.applies_to(&route) {
        return next.run(request).await;
    }

    let caller = client_ip(request.headers(), remote_addr);
    let decision = state
        .rate_limiter
        .should_allow(&caller, &route, state.clock.now());

    if decision.allowed {
        return next.run(request).await;
    }

    RATE_LIMITED_TOTAL.inc();
    tracing::warn!(caller = %caller, route = %route, limit = decision.limit, "rate limit exceeded");
    too_many_requests(decision)
}

fn too_many_requests(decision: Decision) -> Response {
    let body = RateLimitExceeded {
        error: RATE_LIMIT_MESSAGE.to_string(),
        max_requests: decision.limit,
        window_size_minutes: decision.window_minutes,
    };

    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_requests_response() {
        let resp = too_many_requests(Decision {
            allowed: false,
            limit: 3,
            window_minutes: 1,
        });

        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}

use axum::http::StatusCode;
use axum::response::IntoResponse;

pub async fn metrics_handler() -> impl IntoResponse {
    match crate::metrics::render() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            tracing::error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

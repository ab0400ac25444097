use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge, register_histogram};
use std::string::FromUtf8Error;
use thiserror::Error;


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("petclinic_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("petclinic_rate_limited_total", "Requests rejected with 429").unwrap();
    pub static ref ANALYSIS_LATENCY: Histogram = register_histogram!(
        "petclinic_analysis_latency_seconds",
        "Latency of a full pet analysis run in seconds"
    )
    .unwrap();
    pub static ref ANALYSIS_FAILURES: Counter =
        register_counter!("petclinic_analysis_failures_total", "Pet analysis runs that failed").unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge =
        register_gauge!("petclinic_rate_limit_keys", "Current number of tracked rate limit keys").unwrap();
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("encode error: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("invalid UTF-8 in metrics: {0}")]
    Utf8(#[from] FromUtf8Error),
}

// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

//! Prometheus metrics middleware.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Safe to call once at startup.
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    if let Ok(handle) = builder.install_recorder() {
        let _ = PROMETHEUS_HANDLE.set(handle);
    }
}

/// Middleware recording request counts and latency per route.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let method_str = method_to_str(&method);

    counter!(
        "http_requests_total",
        "method" => method_str.to_string(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method_str.to_string(),
        "path" => path
    )
    .record(duration);

    response
}

fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PATCH => "PATCH",
        Method::DELETE => "DELETE",
        Method::PUT => "PUT",
        _ => "OTHER",
    }
}

/// Business metric: a ride matched to a driver.
pub fn record_ride_matched(tier: &str) {
    counter!("rides_matched_total", "tier" => tier.to_string()).increment(1);
}

/// Business metric: a ride cancelled because no driver could be assigned.
pub fn record_matching_exhausted(tier: &str) {
    counter!("matching_exhausted_total", "tier" => tier.to_string()).increment(1);
}

/// Business metric: location pings accepted on the fast path.
pub fn record_location_ping() {
    counter!("location_pings_total").increment(1);
}

/// Business metric: slow-path flushes dropped because the queue was full.
pub fn record_location_flush_dropped() {
    counter!("location_flush_dropped_total").increment(1);
}

/// Handler for the /metrics endpoint in Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        let output = handle.render();
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            output,
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

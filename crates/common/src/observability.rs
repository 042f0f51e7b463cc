use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static DRIVE_FLUSH_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "focusdash_drive_flush_total",
        "Full-document writes issued to the Drive config file"
    )
    .expect("register drive_flush_total")
});

pub static DRIVE_FLUSH_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "focusdash_drive_flush_errors_total",
        "Drive config writes that failed and were dropped"
    )
    .expect("register drive_flush_errors_total")
});

pub static STORAGE_FALLBACK_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "focusdash_storage_fallback_total",
        "Times the persistence facade fell back to local storage"
    )
    .expect("register storage_fallback_total")
});

pub static TODOIST_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "focusdash_todoist_requests_total",
        "Requests relayed to the Todoist API"
    )
    .expect("register todoist_requests_total")
});

pub static TODOIST_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "focusdash_todoist_errors_total",
        "Todoist relay requests that failed upstream"
    )
    .expect("register todoist_errors_total")
});

/// Register every counter so untouched ones still show up as zero.
fn register_all() {
    for counter in [
        &DRIVE_FLUSH_TOTAL,
        &DRIVE_FLUSH_ERRORS_TOTAL,
        &STORAGE_FALLBACK_TOTAL,
        &TODOIST_REQUESTS_TOTAL,
        &TODOIST_ERRORS_TOTAL,
    ] {
        Lazy::force(counter);
    }
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    register_all();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

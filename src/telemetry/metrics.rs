//! Metric instrument factories for photo-dispatch.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint these resolve to no-op instruments.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("photo-dispatch")
}

/// Counter: claim attempts.
/// Labels: `result` ("ok" | "empty" | "error").
pub fn claims() -> Counter<u64> {
    meter()
        .u64_counter("dispatch.claims")
        .with_description("Number of lease claim attempts")
        .build()
}

/// Counter: photos sent to a worker and answered.
pub fn photos_judged() -> Counter<u64> {
    meter()
        .u64_counter("dispatch.photos_judged")
        .with_description("Number of per-photo verdicts received from workers")
        .build()
}

/// Counter: post verdicts reported back to workers.
/// Labels: `verdict`.
pub fn verdicts() -> Counter<u64> {
    meter()
        .u64_counter("dispatch.verdicts")
        .with_description("Number of posts fully processed, by verdict")
        .build()
}

/// Counter: verdict writes to the store.
/// Labels: `result` ("ok" | "error").
pub fn result_writes() -> Counter<u64> {
    meter()
        .u64_counter("dispatch.result_writes")
        .with_description("Number of verdict writes")
        .build()
}

/// Counter: ended worker sessions.
/// Labels: `cause`.
pub fn sessions_terminated() -> Counter<u64> {
    meter()
        .u64_counter("dispatch.sessions_terminated")
        .with_description("Number of worker sessions that ended")
        .build()
}

/// Histogram: time from claim to `end`, in milliseconds.
pub fn post_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("dispatch.post_duration_ms")
        .with_description("Time to process one post")
        .with_unit("ms")
        .build()
}

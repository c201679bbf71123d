// Engine metrics, exposed by the API at /metrics

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref SUBMISSIONS_CREATED: IntCounter = counter(
        "arbiter_submissions_created_total",
        "Submissions accepted by the judge",
    );
    pub static ref TRANSPORT_RETRIES: IntCounter = counter(
        "arbiter_transport_retries_total",
        "Requests re-sent after a transient transport failure",
    );
    pub static ref DECODE_FAILURES: IntCounter = counter(
        "arbiter_decode_failures_total",
        "Response fields that could not be base64-decoded",
    );
    pub static ref POLL_TIMEOUTS: IntCounter = counter(
        "arbiter_poll_timeouts_total",
        "Submissions still pending when the poll budget ran out",
    );
    pub static ref VERDICTS: IntCounterVec = {
        let vec = IntCounterVec::new(
            Opts::new("arbiter_verdicts_total", "Verdicts produced, by judge status id"),
            &["status"],
        )
        .unwrap_or_else(|e| panic!("invalid metric definition: {}", e));
        // Duplicate registration only happens if this initializer runs twice
        let _ = REGISTRY.register(Box::new(vec.clone()));
        vec
    };
}

fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).unwrap_or_else(|e| panic!("invalid metric {}: {}", name, e));
    let _ = REGISTRY.register(Box::new(counter.clone()));
    counter
}

pub fn record_verdict(status_id: Option<i32>) {
    let label = status_id.map_or_else(|| "none".to_string(), |id| id.to_string());
    VERDICTS.with_label_values(&[label.as_str()]).inc();
}

/// Render all engine metrics in the Prometheus text format
pub fn render() -> String {
    // Touch lazies so every series shows up even before first use
    lazy_static::initialize(&SUBMISSIONS_CREATED);
    lazy_static::initialize(&TRANSPORT_RETRIES);
    lazy_static::initialize(&DECODE_FAILURES);
    lazy_static::initialize(&POLL_TIMEOUTS);
    lazy_static::initialize(&VERDICTS);

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

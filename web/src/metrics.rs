use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

// Progress Metrics
lazy_static! {
    pub static ref CHALLENGES_COMPLETED: IntCounterVec = register_int_counter_vec!(
        "challenges_completed_total",
        "Total number of correctly answered challenges",
        &["category"]
    )
    .unwrap();
    pub static ref ANSWERS_SUBMITTED: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total answers submitted",
        &["outcome"]
    )
    .unwrap();
    pub static ref ACHIEVEMENTS_AWARDED: IntCounter = register_int_counter!(
        "achievements_awarded_total",
        "Total number of achievements awarded"
    )
    .unwrap();
    pub static ref DAILY_CHALLENGE_SERVED: IntCounter = register_int_counter!(
        "daily_challenge_served_total",
        "Number of times the daily challenge was requested"
    )
    .unwrap();
    pub static ref PROGRESS_RESETS: IntCounter =
        register_int_counter!("progress_resets_total", "Total number of progress resets").unwrap();
    pub static ref OPERATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "operation_failures_total",
        "Operations that collapsed to an empty result",
        &["operation"]
    )
    .unwrap();
}

// Session Metrics
lazy_static! {
    pub static ref GATE_REDIRECTS: IntCounterVec = register_int_counter_vec!(
        "gate_redirects_total",
        "Requests redirected by the session gate",
        &["target"]
    )
    .unwrap();
}

// API Performance Metrics
lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["endpoint", "method", "status"]
    )
    .unwrap();
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["endpoint", "method"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap();
}

pub fn record_http_request(endpoint: &str, method: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint, method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[endpoint, method])
        .observe(duration);
}

pub fn record_answer(outcome: &str) {
    ANSWERS_SUBMITTED.with_label_values(&[outcome]).inc();
}

pub fn record_completion(category: &str, new_achievements: usize) {
    CHALLENGES_COMPLETED.with_label_values(&[category]).inc();
    ACHIEVEMENTS_AWARDED.inc_by(new_achievements as u64);
}

pub fn record_failure(operation: &str) {
    OPERATION_FAILURES.with_label_values(&[operation]).inc();
}

pub fn record_redirect(target: &str) {
    GATE_REDIRECTS.with_label_values(&[target]).inc();
}

/// Text exposition of every registered metric.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

//! Engine metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus exporter. Without an installed recorder these are no-ops.

use metrics::{counter, histogram};
use vthumb_models::{AttemptOutcome, VisionVerdict};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "vthumb_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "vthumb_cache_misses_total";
    pub const RUNS_TOTAL: &str = "vthumb_generation_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "vthumb_generation_run_duration_seconds";
    pub const ATTEMPTS_TOTAL: &str = "vthumb_attempts_total";
    pub const ORACLE_CALLS_TOTAL: &str = "vthumb_oracle_calls_total";
    pub const SINGLE_FLIGHT_JOINS_TOTAL: &str = "vthumb_single_flight_joins_total";
    pub const DIAGNOSTICS_DROPPED_TOTAL: &str = "vthumb_diagnostics_dropped_total";
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Record a finished generation run. `outcome` is `ranked`,
/// `dark_fallback` or `failed`.
pub fn record_run(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one sampling attempt. `error_kind` refines `error` outcomes.
pub fn record_attempt(outcome: AttemptOutcome, error_kind: Option<&str>) {
    let labels = [
        ("outcome", outcome.as_str().to_string()),
        ("kind", error_kind.unwrap_or("none").to_string()),
    ];
    counter!(names::ATTEMPTS_TOTAL, &labels).increment(1);
}

pub fn record_oracle_call(verdict: &VisionVerdict) {
    let labels = [("verdict", verdict.as_str().to_string())];
    counter!(names::ORACLE_CALLS_TOTAL, &labels).increment(1);
}

pub fn record_single_flight_join() {
    counter!(names::SINGLE_FLIGHT_JOINS_TOTAL).increment(1);
}

pub fn record_diagnostic_dropped() {
    counter!(names::DIAGNOSTICS_DROPPED_TOTAL).increment(1);
}

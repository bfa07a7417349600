use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec,
};

/// Label substituted when a response carries empty provider/model strings.
pub const DEFAULT_LABEL: &str = "unknown";

pub static AI_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("ai_reviewer_ai_calls_total", "Total AI calls", &["provider"])
        .expect("ai calls metric")
});

pub static AI_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ai_reviewer_ai_errors_total",
        "Total AI errors",
        &["provider"]
    )
    .expect("ai errors metric")
});

pub static AI_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ai_reviewer_ai_latency_seconds",
        "AI call latency",
        &["provider"]
    )
    .expect("ai latency metric")
});

pub static AI_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ai_reviewer_ai_tokens_total",
        "Tokens consumed per provider and model",
        &["provider", "model", "type"]
    )
    .expect("ai tokens metric")
});

pub static AI_COST: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ai_reviewer_ai_cost_usd_total",
        "Estimated spend per provider and model in USD",
        &["provider", "model"]
    )
    .expect("ai cost metric")
});

/// Maps a response label to the metric label, defaulting empty strings.
pub fn label(raw: &str) -> &str {
    if raw.is_empty() {
        DEFAULT_LABEL
    } else {
        raw
    }
}

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

pub static BUDGET_BLOCKS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ai_reviewer_budget_block_total",
        "Review chunks denied by the budget guard, by scope",
        &["scope"]
    )
    .expect("budget blocks metric")
});

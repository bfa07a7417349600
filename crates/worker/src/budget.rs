use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::metrics;

/// Spend ledger keyed by PR and by UTC day; monotonic, nothing is deleted.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    async fn add_spend(&self, repo: &str, pr: u64, usd: f64, at: DateTime<Utc>) -> Result<()>;
    async fn pr_spend(&self, repo: &str, pr: u64) -> Result<f64>;
    async fn daily_spend(&self, day: DateTime<Utc>) -> Result<f64>;
}

#[derive(Default)]
pub struct MemoryBudgetStore {
    inner: Mutex<SpendState>,
}

#[derive(Default)]
struct SpendState {
    by_pr: HashMap<String, f64>,
    by_day: HashMap<String, f64>,
}

impl MemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SpendState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn pr_key(repo: &str, pr: u64) -> String {
    format!("{repo}#{pr}")
}

fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl BudgetStore for MemoryBudgetStore {
    async fn add_spend(&self, repo: &str, pr: u64, usd: f64, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.lock();
        *state.by_pr.entry(pr_key(repo, pr)).or_default() += usd;
        *state.by_day.entry(day_key(at)).or_default() += usd;
        Ok(())
    }

    async fn pr_spend(&self, repo: &str, pr: u64) -> Result<f64> {
        Ok(self.lock().by_pr.get(&pr_key(repo, pr)).copied().unwrap_or(0.0))
    }

    async fn daily_spend(&self, day: DateTime<Utc>) -> Result<f64> {
        Ok(self.lock().by_day.get(&day_key(day)).copied().unwrap_or(0.0))
    }
}

/// Outcome of a budget admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied { reason: String },
}

/// Admission control over per-PR and per-day spend.
///
/// Limits at or below zero are unlimited; a disabled guard grants everything.
pub struct BudgetGuard {
    enabled: bool,
    daily_limit_usd: f64,
    pr_limit_usd: f64,
    store: Option<Arc<dyn BudgetStore>>,
}

impl BudgetGuard {
    pub fn new(
        enabled: bool,
        daily_limit_usd: f64,
        pr_limit_usd: f64,
        store: Option<Arc<dyn BudgetStore>>,
    ) -> Self {
        Self {
            enabled,
            daily_limit_usd,
            pr_limit_usd,
            store,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 0.0, 0.0, None)
    }

    pub fn enabled(&self) -> bool {
        self.enabled && self.store.is_some()
    }

    pub async fn allow(
        &self,
        repo: &str,
        pr: u64,
        projected_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let Some(store) = self.store.as_ref().filter(|_| self.enabled) else {
            return Ok(Admission::Granted);
        };

        let pr_spend = store.pr_spend(repo, pr).await?;
        if self.pr_limit_usd > 0.0 && pr_spend + projected_usd > self.pr_limit_usd {
            metrics::BUDGET_BLOCKS.with_label_values(&["pr"]).inc();
            return Ok(Admission::Denied {
                reason: format!("PR budget exceeded (limit={:.4} USD)", self.pr_limit_usd),
            });
        }

        let day_spend = store.daily_spend(now).await?;
        if self.daily_limit_usd > 0.0 && day_spend + projected_usd > self.daily_limit_usd {
            metrics::BUDGET_BLOCKS.with_label_values(&["daily"]).inc();
            return Ok(Admission::Denied {
                reason: format!("Daily budget exceeded (limit={:.4} USD)", self.daily_limit_usd),
            });
        }

        Ok(Admission::Granted)
    }

    pub async fn record(&self, repo: &str, pr: u64, usd: f64, now: DateTime<Utc>) -> Result<()> {
        if !self.enabled || usd <= 0.0 {
            return Ok(());
        }
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.add_spend(repo, pr, usd, now).await
    }
}

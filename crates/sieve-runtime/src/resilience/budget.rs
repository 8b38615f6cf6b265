//! Token budgets and spend estimation.
//!
//! Budgets are optional: a run without limits still accumulates
//! [`LlmUsage`] so the reporter can show what it cost.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Stage;
use crate::providers::TokenUsage;

/// Token allowance for one scope (a stage, or the whole run).
#[derive(Debug)]
pub struct TokenBudget {
    pub max_tokens: u64,
    used: AtomicU64,
}

impl TokenBudget {
    pub fn new(max_tokens: u64) -> Self {
        Self {
            max_tokens,
            used: AtomicU64::new(0),
        }
    }

    pub fn can_afford(&self, tokens: u64) -> bool {
        self.remaining() >= tokens
    }

    pub fn record(&self, tokens: u64) {
        self.used.fetch_add(tokens, Ordering::SeqCst);
    }

    pub fn remaining(&self) -> u64 {
        self.max_tokens.saturating_sub(self.used())
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }
}

/// Price per million tokens: (input, output).
///
/// Cached input tokens bill at a quarter of the input rate.
fn price_per_million(model: &str) -> (f64, f64) {
    match model {
        m if m.contains("2.5-pro") => (1.25, 10.0),
        m if m.contains("2.5-flash-lite") => (0.10, 0.40),
        m if m.contains("2.5-flash") => (0.30, 2.50),
        m if m.contains("2.0-flash-lite") => (0.075, 0.30),
        m if m.contains("2.0-flash") => (0.10, 0.40),
        m if m.contains("1.5-pro") => (1.25, 5.0),
        m if m.contains("1.5-flash") => (0.075, 0.30),
        _ => (0.10, 0.40),
    }
}

const CACHED_INPUT_DISCOUNT: f64 = 0.25;

/// Accumulated model usage for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_tokens: u64,

    /// Number of completed model calls
    pub llm_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add one call's usage. Returns that call's estimated cost.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) -> f64 {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.cached_tokens += u64::from(usage.cached_tokens);
        self.total_tokens += u64::from(usage.total());
        self.llm_calls += 1;

        let cost = Self::estimate_cost(usage, model);
        self.estimated_cost += cost;
        cost
    }

    /// Estimated USD cost of one call.
    pub fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        let (input_rate, output_rate) = price_per_million(model);

        let cached = usage.cached_tokens.min(usage.prompt_tokens);
        let uncached = usage.prompt_tokens - cached;

        let input_cost = f64::from(uncached) / 1_000_000.0 * input_rate;
        let cached_cost = f64::from(cached) / 1_000_000.0 * input_rate * CACHED_INPUT_DISCOUNT;
        let output_cost = f64::from(usage.completion_tokens) / 1_000_000.0 * output_rate;

        input_cost + cached_cost + output_cost
    }
}

/// Per-stage and global budgets plus accumulated usage.
#[derive(Debug)]
pub struct BudgetTracker {
    stage_budgets: HashMap<Stage, TokenBudget>,
    global_budget: Option<TokenBudget>,
    usage: RwLock<LlmUsage>,
}

impl BudgetTracker {
    /// `None` leaves that scope unlimited.
    pub fn new(global_max: Option<u64>, per_stage_max: Option<u64>) -> Self {
        let stage_budgets = match per_stage_max {
            Some(max) => Stage::ALL
                .into_iter()
                .map(|stage| (stage, TokenBudget::new(max)))
                .collect(),
            None => HashMap::new(),
        };

        Self {
            stage_budgets,
            global_budget: global_max.map(TokenBudget::new),
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    /// Track usage without enforcing any limit.
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    pub fn can_afford(&self, stage: Stage, estimated_tokens: u64) -> bool {
        let stage_ok = self
            .stage_budgets
            .get(&stage)
            .map(|b| b.can_afford(estimated_tokens))
            .unwrap_or(true);

        let global_ok = self
            .global_budget
            .as_ref()
            .map(|b| b.can_afford(estimated_tokens))
            .unwrap_or(true);

        stage_ok && global_ok
    }

    /// Record one call. Returns its estimated cost in USD.
    pub fn record_usage(&self, stage: Stage, usage: &TokenUsage, model: &str) -> f64 {
        let total = u64::from(usage.total());

        if let Some(budget) = self.stage_budgets.get(&stage) {
            budget.record(total);
        }
        if let Some(budget) = &self.global_budget {
            budget.record(total);
        }

        self.usage.write().add(usage, model)
    }

    pub fn usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    /// `None` when the run has no global limit.
    pub fn remaining_global(&self) -> Option<u64> {
        self.global_budget.as_ref().map(TokenBudget::remaining)
    }

    /// `None` when stages have no limit.
    pub fn remaining_stage(&self, stage: Stage) -> Option<u64> {
        self.stage_budgets.get(&stage).map(TokenBudget::remaining)
    }

    pub fn reset(&self) {
        for budget in self.stage_budgets.values() {
            budget.reset();
        }
        if let Some(budget) = &self.global_budget {
            budget.reset();
        }
        *self.usage.write() = LlmUsage::default();
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}

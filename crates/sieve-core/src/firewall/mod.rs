//! Heuristic firewall.
//!
//! **Question**: Can we decide this entity without paying for a model call?
//!
//! Stages run in strict order and the first decisive stage wins:
//!
//! | Stage | Signal table | Outcome |
//! |-------|--------------|---------|
//! | 1 | wealth manager | `REJECT`, `WEALTH_MANAGER`, 0.95 |
//! | 2 | investment fund (skipped on "family capital") | `REJECT`, `INVESTMENT_FUND`, 0.90 |
//! | 3 | family office (n distinct matches) | `PASS`, `FAMILY_OFFICE`, min(0.8, 0.25n) |
//! | 4 | nothing matched | `UNCERTAIN`, `UNKNOWN`, 0.0, `llm_required` |
//!
//! The firewall is pure and total: no I/O, no state, no failure mode.

pub mod patterns;

use crate::types::{EntityType, FirewallDecision};

use patterns::{
    first_signal, matching_signals, mentions_family_capital, FAMILY_OFFICE_SIGNALS,
    INVESTMENT_FUND_SIGNALS, WEALTH_MANAGER_SIGNALS,
};

/// Confidence for a wealth manager rejection.
pub const WEALTH_MANAGER_CONFIDENCE: f64 = 0.95;

/// Confidence for an investment fund rejection.
pub const INVESTMENT_FUND_CONFIDENCE: f64 = 0.90;

/// Confidence contributed by each distinct family office signal.
pub const FAMILY_OFFICE_SIGNAL_WEIGHT: f64 = 0.25;

/// Cap on family office pass confidence; the rest is left to the scorer.
pub const FAMILY_OFFICE_MAX_CONFIDENCE: f64 = 0.8;

/// The zero-cost heuristic stage in front of every model call.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFirewall;

impl HeuristicFirewall {
    pub fn new() -> Self {
        Self
    }

    /// Screen an entity from its text and domain.
    ///
    /// `company_name` only labels the trace; matching runs over
    /// `company_text + " " + domain`. Any input, including empty strings,
    /// yields a decision.
    pub fn check(&self, company_name: &str, company_text: &str, domain: &str) -> FirewallDecision {
        let combined = format!("{} {}", company_text, domain);
        let decision = Self::decide(&combined);

        tracing::debug!(
            company = company_name,
            domain = domain,
            decision = ?decision.decision,
            entity_type = %decision.entity_type,
            confidence = decision.confidence,
            "Firewall decision"
        );

        decision
    }

    fn decide(combined: &str) -> FirewallDecision {
        // Stage 1: wealth managers outrank everything
        if let Some(signal) = first_signal(&WEALTH_MANAGER_SIGNALS, combined) {
            return FirewallDecision::reject(
                EntityType::WealthManager,
                WEALTH_MANAGER_CONFIDENCE,
                format!("Wealth manager signal: '{}'", signal),
            );
        }

        // Stage 2: funds, unless the vehicle is family capital
        if !mentions_family_capital(combined) {
            if let Some(signal) = first_signal(&INVESTMENT_FUND_SIGNALS, combined) {
                return FirewallDecision::reject(
                    EntityType::InvestmentFund,
                    INVESTMENT_FUND_CONFIDENCE,
                    format!("Investment fund signal: '{}'", signal),
                );
            }
        }

        // Stage 3: count distinct family office signals
        let signals = matching_signals(&FAMILY_OFFICE_SIGNALS, combined);
        if !signals.is_empty() {
            let confidence = (signals.len() as f64 * FAMILY_OFFICE_SIGNAL_WEIGHT)
                .min(FAMILY_OFFICE_MAX_CONFIDENCE);
            return FirewallDecision::pass(
                confidence,
                format!(
                    "Family office signals ({}): {}",
                    signals.len(),
                    signals.join(", ")
                ),
            );
        }

        // Stage 4
        FirewallDecision::uncertain()
    }
}

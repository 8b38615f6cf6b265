//! Per-stage circuit breaker.
//!
//! When a stage's model calls fail repeatedly its circuit opens, and the
//! stage returns its error-sourced result without calling the model until
//! the recovery timeout passes.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::Stage;

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,

    /// Time open before a trial call is allowed
    #[serde(with = "crate::config::human_duration")]
    pub recovery_timeout: Duration,

    /// Trial successes needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// State of one stage's circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

/// One circuit per [`Stage`], so classification and scoring recover
/// independently.
#[derive(Debug)]
pub struct CircuitBreaker {
    states: RwLock<HashMap<Stage, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// True if calls for `stage` should be skipped.
    ///
    /// An open circuit whose recovery timeout has passed moves to half-open
    /// and lets the call through.
    pub fn is_open(&self, stage: Stage) -> bool {
        let mut states = self.states.write();
        let opened_at = match states.get(&stage) {
            Some(CircuitState::Open { opened_at }) => *opened_at,
            _ => return false,
        };

        if opened_at.elapsed() < self.config.recovery_timeout {
            return true;
        }

        states.insert(stage, CircuitState::HalfOpen { successes: 0 });
        tracing::info!(stage = %stage, "Circuit half-open, allowing trial call");
        false
    }

    pub fn record_success(&self, stage: Stage) {
        let mut states = self.states.write();
        match states.get(&stage).cloned() {
            Some(CircuitState::HalfOpen { successes }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(stage, CircuitState::Closed { failures: 0 });
                    tracing::info!(stage = %stage, "Circuit closed after recovery");
                } else {
                    states.insert(
                        stage,
                        CircuitState::HalfOpen {
                            successes: successes + 1,
                        },
                    );
                }
            }
            Some(CircuitState::Closed { failures }) if failures > 0 => {
                states.insert(stage, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    pub fn record_failure(&self, stage: Stage) {
        let mut states = self.states.write();
        let failures = match states.get(&stage).cloned() {
            Some(CircuitState::Closed { failures }) => failures + 1,
            None => 1,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(
                    stage,
                    CircuitState::Open {
                        opened_at: Instant::now(),
                    },
                );
                tracing::warn!(stage = %stage, "Circuit reopened after failed trial call");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures >= self.config.failure_threshold {
            states.insert(
                stage,
                CircuitState::Open {
                    opened_at: Instant::now(),
                },
            );
            tracing::warn!(
                stage = %stage,
                failures = failures,
                "Circuit opened after repeated failures"
            );
        } else {
            states.insert(stage, CircuitState::Closed { failures });
        }
    }

    pub fn state(&self, stage: Stage) -> CircuitState {
        self.states
            .read()
            .get(&stage)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    /// Close every circuit.
    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

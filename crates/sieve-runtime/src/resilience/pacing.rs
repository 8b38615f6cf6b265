//! Spacing between model calls.
//!
//! A [`Pacer`] is shared by every caller in a batch. Each call to
//! [`Pacer::acquire`] reserves the next start slot under a short lock and
//! then sleeps outside it, so waiting callers never block the lock.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// How often model calls may start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimit {
    /// No spacing.
    #[default]
    Unlimited,

    /// At least `interval` between consecutive call starts.
    FixedInterval {
        #[serde(with = "crate::config::human_duration")]
        interval: Duration,
    },

    /// Bursts of up to `capacity` calls, one token back every `refill_every`.
    TokenBucket {
        capacity: u32,
        #[serde(with = "crate::config::human_duration")]
        refill_every: Duration,
    },
}

#[derive(Debug)]
enum PacerState {
    Unlimited,
    Fixed {
        interval: Duration,
        next_slot: Option<Instant>,
    },
    Bucket {
        capacity: f64,
        refill_every: Duration,
        // Goes negative when callers are queued
        tokens: f64,
        last_refill: Instant,
    },
}

/// Shared rate limiter for model calls.
#[derive(Debug)]
pub struct Pacer {
    limit: RateLimit,
    state: Mutex<PacerState>,
}

impl Pacer {
    pub fn new(limit: RateLimit) -> Self {
        let state = match &limit {
            RateLimit::Unlimited => PacerState::Unlimited,
            RateLimit::FixedInterval { interval } => PacerState::Fixed {
                interval: *interval,
                next_slot: None,
            },
            RateLimit::TokenBucket {
                capacity,
                refill_every,
            } => PacerState::Bucket {
                capacity: f64::from(*capacity),
                refill_every: *refill_every,
                tokens: f64::from(*capacity),
                last_refill: Instant::now(),
            },
        };

        Self {
            limit,
            state: Mutex::new(state),
        }
    }

    pub fn limit(&self) -> &RateLimit {
        &self.limit
    }

    /// Wait until this caller may start a call.
    pub async fn acquire(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Pacing model call");
            tokio::time::sleep(wait).await;
        }
    }

    /// Reserve a start slot. Returns how long the caller must wait.
    fn reserve(&self, now: Instant) -> Duration {
        let mut state = self.state.lock();
        match &mut *state {
            PacerState::Unlimited => Duration::ZERO,

            PacerState::Fixed {
                interval,
                next_slot,
            } => {
                let slot = match *next_slot {
                    Some(next) if next > now => next,
                    _ => now,
                };
                *next_slot = Some(slot + *interval);
                slot - now
            }

            PacerState::Bucket {
                capacity,
                refill_every,
                tokens,
                last_refill,
            } => {
                let period = refill_every.as_secs_f64();
                if period > 0.0 {
                    let elapsed = now.saturating_duration_since(*last_refill).as_secs_f64();
                    *tokens = (*tokens + elapsed / period).min(*capacity);
                } else {
                    *tokens = *capacity;
                }
                *last_refill = now;

                let wait = if *tokens >= 1.0 {
                    Duration::ZERO
                } else {
                    Duration::from_secs_f64((1.0 - *tokens) * period)
                };
                *tokens -= 1.0;
                wait
            }
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(RateLimit::Unlimited)
    }
}

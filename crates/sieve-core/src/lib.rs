//! # sieve-core
//!
//! Deterministic building blocks for family office screening.
//!
//! This crate holds everything in the pipeline that does not talk to a
//! model:
//! - the heuristic firewall that rejects obvious non-family-offices for free
//! - the closed data model shared by every stage
//! - lenient parsing of model responses into that model
//! - target profile (ICP) loading and schema validation
//! - the run reporter and its Markdown rendering
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: the firewall is a pure function of its input
//! 2. **No I/O**: apart from explicit profile file loaders
//! 3. **Thread-safe reporting**: one [`RunReporter`] can be shared by all workers
//!
//! ## Example
//!
//! ```rust
//! use sieve_core::{HeuristicFirewall, FirewallVerdict};
//!
//! let firewall = HeuristicFirewall::new();
//! let decision = firewall.check(
//!     "Summit Wealth Partners",
//!     "A registered investment advisor serving high net worth clients.",
//!     "summitwealth.com",
//! );
//! assert_eq!(decision.decision, FirewallVerdict::Reject);
//! ```

pub mod firewall;
pub mod profile;
pub mod reporter;
pub mod response;
pub mod types;

pub use firewall::HeuristicFirewall;
pub use profile::{validate_profile_schema, ProfileError, TargetProfile};
pub use reporter::{RunReport, RunReporter};
pub use response::{parse_structured, ParseStrategy, Parsed, ResponseParseError};
pub use types::{
    clamp_confidence, ClassificationResult, ClassificationSource, CostTag, EntitySubtype,
    EntityType, FirewallCost, FirewallDecision, FirewallVerdict, FoStatus, Gate,
    PipelineOutcome, Recommendation, ScoreResult, ScoreSource,
};

//! Tracing setup for embedding applications.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "sieve_core=info,sieve_runtime=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, or `default_filter`
/// when it is unset or unparsable.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

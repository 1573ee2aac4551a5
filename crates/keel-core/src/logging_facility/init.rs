//! Logging initialization
//!
//! The snapshot layer is a library: the deployment engine binary hosting
//! it installs a subscriber once at startup, and hosts that already manage
//! their own subscriber skip this module entirely. Installation is
//! best-effort and never displaces an existing subscriber.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset
///
/// Step lifecycle events log at debug and would flood a deployment log;
/// the default surfaces checkpoints, warnings, and errors only.
const DEFAULT_FILTER: &str = "keel=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable subscriber for interactive engine runs
///
/// Returns `false` when a subscriber was already installed (the existing
/// one stays in place).
///
/// # Example
///
/// ```
/// use keel_core::logging_facility::init_text;
///
/// init_text();
/// ```
pub fn init_text() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber for deployment services
///
/// Returns `false` when a subscriber was already installed.
pub fn init_json() -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

//! # sage-telemetry
//!
//! Logging setup for the Oracle Sage binaries.
//!
//! Output goes to stderr so it never interleaves with chat answers on
//! stdout. The filter comes from `RUST_LOG` when it parses, otherwise from
//! the level passed in (default `info`).
//!
//! ```rust,ignore
//! sage_telemetry::init_telemetry("sage-cli")?;
//! tracing::info!(collection = "oracle_knowledge_base", "ready");
//! ```
//!
//! [`EventCapture`] records events in memory so tests can assert on what was
//! logged.

pub mod capture;

pub use capture::{CaptureLayer, CapturedEvent, EventCapture};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Level used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LEVEL: &str = "info";

/// Build the event filter from a `RUST_LOG`-style value.
///
/// Falls back to `default_level` when `env` is missing, blank or does not
/// parse.
pub fn build_filter(env: Option<&str>, default_level: &str) -> EnvFilter {
    env.map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn filter_from_env(default_level: &str) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(env.as_deref(), default_level)
}

/// Install human-readable logging at the default level.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    init_with_level(service_name, DEFAULT_LEVEL)
}

/// Install human-readable logging with a custom default level.
pub fn init_with_level(service_name: &str, level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter_from_env(level))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;
    tracing::debug!(service = service_name, "logging initialized");
    Ok(())
}

/// Install JSON logging (one object per line) at the default level.
pub fn init_json(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter_from_env(DEFAULT_LEVEL))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    tracing::debug!(service = service_name, "json logging initialized");
    Ok(())
}

//! # Structured Logging
//!
//! The executor emits `tracing` events under the `lumen_protocol` target
//! tree: transaction outcomes from `lumen_protocol::ledger`, per-kind
//! decisions from `lumen_protocol::executor`, and flow-check diagnostics
//! from `lumen_protocol::executor::flow` at `debug`.
//!
//! Embedding processes call [`init_logging`] once; tests call
//! [`try_init_test_logging`] as often as they like. `RUST_LOG` always wins
//! over the built-in filters.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ledger decisions at info. Flow diagnostics stay quiet unless asked for.
pub const DEFAULT_FILTER: &str = "warn,lumen_protocol=info,lumen_protocol::executor::flow=warn";

/// Only rejections and consensus-visible warnings.
pub const TEST_FILTER: &str = "lumen_protocol=warn";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggingError {
    #[error("unknown log format {0:?}, expected \"pretty\" or \"json\"")]
    UnknownFormat(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines with source locations.
    #[default]
    Pretty,
    /// One flattened JSON object per event, so `tx_id`, `kind` and
    /// `category` land as top-level keys.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber with `filter_directives` (usually
/// [`DEFAULT_FILTER`]) unless `RUST_LOG` is set, e.g.
///
/// ```text
/// RUST_LOG=lumen_protocol::executor::flow=debug
/// ```
pub fn init_logging(filter_directives: &str, format: LogFormat) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(filter(filter_directives));
    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_target(true),
            )
            .try_init(),
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)?;
    tracing::info!(?format, "executor logging initialized");
    Ok(())
}

/// Install a test-writer subscriber with [`TEST_FILTER`] if none is
/// installed yet. Returns `false` when another subscriber owns the process.
pub fn try_init_test_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter(TEST_FILTER))
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}

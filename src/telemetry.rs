//! Structured logging setup.
//!
//! stdout carries the relation stream, so every event goes to stderr.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

/// Installs the global subscriber with the given filter expression.
///
/// A subscriber that is already installed is left in place.
pub fn init(filter: &str) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|error| ConfigError::LogFilter {
        filter: filter.to_string(),
        reason: error.to_string(),
    })?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

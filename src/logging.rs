// src/logging.rs

//! Opt-in logging setup using `tracing` + `tracing-subscriber`.
//!
//! The library itself only emits `tracing` events; embedding applications
//! usually install their own subscriber. This helper is for binaries and
//! tests that just want output.
//!
//! Priority for determining the log level:
//! 1. explicit `level` argument (if provided)
//! 2. `DAGPOOL_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::{anyhow, Result};
use tracing_subscriber::fmt;

/// Install a global subscriber. Fails if one is already installed.
pub fn init_logging(level: Option<tracing::Level>) -> Result<()> {
    let level = match level {
        Some(level) => level,
        None => std::env::var("DAGPOOL_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {err}"))
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

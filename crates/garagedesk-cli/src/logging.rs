// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Diagnostics go to stderr through `tracing`; stdout carries command output
//! only.

use anyhow::{Result, anyhow};
use std::io::{self, IsTerminal};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `warn` or `garagedesk_app=debug,info`.
    pub directive: String,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl LogConfig {
    /// No `-v` keeps the configured level; `-v` is debug; `-vv` and up is
    /// trace.
    pub fn from_verbosity(verbosity: u8, configured: &str) -> Self {
        let directive = match verbosity {
            0 => configured.to_owned(),
            1 => "debug".to_owned(),
            _ => "trace".to_owned(),
        };
        Self {
            directive,
            with_ansi: io::stderr().is_terminal(),
            with_target: verbosity > 0,
        }
    }
}

/// `RUST_LOG` wins when it is set and parses.
pub fn build_env_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.directive)
        .map_err(|error| anyhow!("invalid log filter {:?}: {error}", config.directive))
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

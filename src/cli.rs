//! Command-line interface parsing for weathercache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `RelayConfig`. Every flag can also be set through a
//! `WEATHERCACHE_*` environment variable.

use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use crate::data::weather::DEFAULT_FETCH_TIMEOUT;
use crate::data::{RequestDefaults, DEFAULT_ENDPOINT, DEFAULT_UPDATE_INTERVAL_MINUTES};

/// Error types for CLI argument validation
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("Invalid sweep interval: {0} hours. Must be a positive number")]
    InvalidSweepInterval(f64),

    #[error("Invalid default update interval: {0} minutes. Must be a positive number")]
    InvalidUpdateInterval(f64),

    #[error("Invalid default endpoint '{0}': must be an http(s) URL")]
    InvalidEndpoint(String),

    #[error("Invalid fetch timeout: must be at least 1 second")]
    InvalidFetchTimeout,

    #[error("Invalid channel capacity: must be at least 1")]
    InvalidChannelCapacity,
}

/// weathercache - cache and relay weather API responses
///
/// Reads newline-delimited JSON requests on stdin and writes the relayed
/// responses as newline-delimited JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "weathercache")]
#[command(about = "Read-through cache relaying weather API responses")]
#[command(version)]
pub struct Cli {
    /// Hours between sweeps that evict expired entries
    #[arg(
        long,
        env = "WEATHERCACHE_SWEEP_INTERVAL_HOURS",
        value_name = "HOURS",
        default_value_t = 12.0
    )]
    pub sweep_interval_hours: f64,

    /// Update interval in minutes for requests that do not carry one
    #[arg(
        long,
        env = "WEATHERCACHE_DEFAULT_UPDATE_INTERVAL",
        value_name = "MINUTES",
        default_value_t = DEFAULT_UPDATE_INTERVAL_MINUTES
    )]
    pub default_update_interval: f64,

    /// Endpoint for requests that do not name one
    #[arg(
        long,
        env = "WEATHERCACHE_DEFAULT_ENDPOINT",
        value_name = "URL",
        default_value = DEFAULT_ENDPOINT
    )]
    pub default_endpoint: String,

    /// Seconds before an upstream request is abandoned
    #[arg(
        long,
        env = "WEATHERCACHE_FETCH_TIMEOUT_SECS",
        value_name = "SECS",
        default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs()
    )]
    pub fetch_timeout_secs: u64,

    /// Responses buffered before the writer applies backpressure
    #[arg(
        long,
        env = "WEATHERCACHE_CHANNEL_CAPACITY",
        value_name = "N",
        default_value_t = 64
    )]
    pub channel_capacity: usize,
}

/// Runtime configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub sweep_interval: Duration,
    pub defaults: RequestDefaults,
    pub fetch_timeout: Duration,
    pub channel_capacity: usize,
}

impl RelayConfig {
    /// Creates a RelayConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(RelayConfig)` when every value is usable
    /// * `Err(CliError)` naming the first invalid value
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let sweep_interval = positive_duration(cli.sweep_interval_hours * 3600.0)
            .ok_or(CliError::InvalidSweepInterval(cli.sweep_interval_hours))?;

        if !cli.default_update_interval.is_finite() || cli.default_update_interval <= 0.0 {
            return Err(CliError::InvalidUpdateInterval(cli.default_update_interval));
        }

        match Url::parse(&cli.default_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(CliError::InvalidEndpoint(cli.default_endpoint.clone())),
        }

        if cli.fetch_timeout_secs == 0 {
            return Err(CliError::InvalidFetchTimeout);
        }
        if cli.channel_capacity == 0 {
            return Err(CliError::InvalidChannelCapacity);
        }

        Ok(RelayConfig {
            sweep_interval,
            defaults: RequestDefaults {
                endpoint: cli.default_endpoint.clone(),
                update_interval_minutes: cli.default_update_interval,
            },
            fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
            channel_capacity: cli.channel_capacity,
        })
    }
}

fn positive_duration(secs: f64) -> Option<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
}

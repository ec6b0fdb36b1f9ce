//! weathercache - relay weather API responses through an in-memory cache
//!
//! Requests arrive as newline-delimited JSON on stdin; each relayed response
//! is written as one JSON line on stdout.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weathercache::cache;
use weathercache::cli::{Cli, RelayConfig};
use weathercache::data::{RequestMessage, WeatherClient, WeatherResponse};
use weathercache::{Coordinator, Janitor};

/// Sets up stderr logging; stdout is reserved for responses
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathercache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Parses one inbound line, logging and skipping anything malformed
fn parse_request(line: &str) -> Option<RequestMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, "ignoring malformed request line");
            None
        }
    }
}

/// Writes each response as a JSON line until every sender is gone
async fn write_responses(mut rx: mpsc::Receiver<WeatherResponse>) {
    let mut stdout = tokio::io::stdout();

    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_string(&response.into_json()) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to encode response");
                continue;
            }
        };
        line.push('\n');

        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            error!(error = %e, "failed to write response");
            return;
        }
        if let Err(e) = stdout.flush().await {
            error!(error = %e, "failed to flush stdout");
            return;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match RelayConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing();

    let client = WeatherClient::with_timeout(config.fetch_timeout)?;
    let store = cache::shared();
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let coordinator = Coordinator::new(store.clone(), Arc::new(client), config.defaults, tx);
    let janitor = Janitor::spawn(store, config.sweep_interval);
    let writer = tokio::spawn(write_responses(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<JoinHandle<()>> = Vec::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    info!("weathercache ready, reading requests from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(message) = parse_request(&line) {
                        pending.retain(|handle| !handle.is_finished());
                        pending.push(coordinator.dispatch(message));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "failed to read stdin");
                    break;
                }
            },
            _ = &mut interrupt => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    for handle in pending {
        if let Err(e) = handle.await {
            warn!(error = %e, "request task ended abnormally");
        }
    }
    drop(coordinator);
    janitor.shutdown().await;
    writer.await?;

    Ok(())
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bulkship sample driver.
//!
//! Enqueues a burst of login-style events against a bulk backend and drains
//! the buffer on shutdown.
//!
//! # Usage
//!
//! ```bash
//! # Ship 13 events to a local backend, flushing every 3
//! bulkship-sample --server http://localhost:9200 --threshold 3
//!
//! # Mirror batches to local files as well
//! bulkship-sample --file-log --storage ./Storage
//! ```

use anyhow::{Context, Result};
use bulkship::{Shipper, ShipperConfig};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bulkship-sample")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sample driver for the bulkship event shipper")]
struct Cli {
    /// Bulk backend server URL
    #[arg(short, long, default_value = "http://localhost:9200")]
    server: String,

    /// Destination index
    #[arg(short, long, default_value = "soxportal")]
    index: String,

    /// Number of events to enqueue
    #[arg(short, long, default_value = "13")]
    count: u32,

    /// Buffer threshold for automatic flushes
    #[arg(short, long, default_value = "3")]
    threshold: usize,

    /// Mirror batches to local files
    #[arg(long)]
    file_log: bool,

    /// Directory for file logs (with --file-log)
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Verbose mode (shipper diagnostics)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bulkship_sample=debug,bulkship=debug")
    } else {
        EnvFilter::new("bulkship_sample=info,bulkship=warn")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = ShipperConfig::new(&cli.server)
        .buffer_threshold(cli.threshold)
        .diagnostics(cli.verbose);
    if cli.file_log {
        config = config.file_sink_enabled(true);
        if let Some(dir) = &cli.storage {
            config = config.file_log_dir(dir);
        }
    }

    tracing::info!(
        server = %cli.server,
        index = %cli.index,
        count = cli.count,
        threshold = cli.threshold,
        "Starting sample run"
    );

    let shipper = Shipper::new(config).context("Failed to construct shipper")?;

    for n in 1..=cli.count {
        shipper
            .log(
                &cli.index,
                &format!("event{}", n),
                json!({
                    "timestamp": Utc::now(),
                    "event": "login",
                    "account": "local",
                    "username": format!("sox{}@timelog.dk", n),
                }),
            )
            .await;
    }

    shipper.shutdown().await;

    let stats = shipper.stats();
    tracing::info!(
        events_queued = stats.events_queued,
        events_dropped = stats.events_dropped,
        batches_sent = stats.batches_sent,
        transport_errors = stats.transport_errors,
        file_errors = stats.file_errors,
        "Sample run complete"
    );

    Ok(())
}

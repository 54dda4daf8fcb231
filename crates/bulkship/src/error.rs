// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shipper error taxonomy.
//!
//! Only [`ShipperError::Config`] ever escapes the public API (at
//! construction time). Everything else is contained inside the flush cycle
//! and surfaced through tracing and the shipper stats.

use crate::config::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the shipper's components.
#[derive(Debug, Error)]
pub enum ShipperError {
    /// Event payload could not be serialized to JSON. The item is dropped
    /// before it ever enters the queue.
    #[error("Event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Network failure or non-success response from the bulk endpoint.
    /// The batch was already consumed and is lost for the network sink.
    #[error("Bulk request failed: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// The bulk request exceeded the fixed transport timeout.
    #[error("Bulk request timed out after {0:?}")]
    Timeout(Duration),

    /// File sink I/O failure for one item's file.
    #[error("File sink write failed for {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Construction-time misconfiguration. Fatal, never caught internally.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

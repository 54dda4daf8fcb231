// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bulkship - buffered bulk event shipper.
//!
//! Accepts arbitrary structured events tagged with a destination index and
//! type, buffers them in memory, and flushes the buffer as a single batched
//! `_bulk` request to an Elasticsearch-style backend. The same batch may be
//! mirrored to local append-only files for durability.
//!
//! # Features
//!
//! - **Buffered batching**: events accumulate until a configurable threshold
//!   triggers an automatic background flush
//! - **Single-flight flush**: at most one flush cycle runs at a time
//! - **Dual sinks**: HTTP bulk endpoint plus optional per-(date, index, type)
//!   local files, with independent failure isolation
//! - **Best-effort delivery**: no retry, no persistence of unsent batches
//!
//! # Example
//!
//! ```rust,ignore
//! use bulkship::{Shipper, ShipperConfig};
//!
//! let config = ShipperConfig::new("http://localhost:9200")
//!     .buffer_threshold(50)
//!     .file_sink_enabled(true);
//!
//! let shipper = Shipper::new(config)?;
//! shipper.log("soxportal", "event1", my_event).await;
//! shipper.shutdown().await;
//! ```

mod bulk;
mod config;
mod error;
mod file_sink;
mod queue;
mod shipper;
mod transport;

pub use bulk::{BulkFormatter, FILE_LINE_BREAK, WIRE_LINE_BREAK};
pub use config::{ConfigError, ShipperConfig, ENV_PREFIX};
pub use error::ShipperError;
pub use file_sink::FileSink;
pub use queue::{EventQueue, QueuedItem};
pub use shipper::{Shipper, ShipperStats, SHUTDOWN_DRAIN};
pub use transport::{BulkTransport, HttpTransport, BULK_TIMEOUT};

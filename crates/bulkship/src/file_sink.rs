// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local file sink.
//!
//! Mirrors flushed batches to append-only files, one file per
//! (date, index, type) triple. Each item's write is independent: a failure
//! on one file does not stop the others, and the first error encountered is
//! reported after all items were attempted.

use crate::bulk::{render_date, BulkFormatter};
use crate::config::{ConfigError, ShipperConfig};
use crate::error::ShipperError;
use crate::queue::QueuedItem;
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Appends bulk blocks to per-(date, index, type) files.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    date_pattern: String,
    formatter: BulkFormatter,
}

impl FileSink {
    /// Create the sink, creating the log directory if absent. An unusable
    /// directory is a construction-time failure.
    pub fn new(config: &ShipperConfig) -> Result<Self, ConfigError> {
        fs::create_dir_all(&config.file_log_dir)?;

        Ok(Self {
            dir: config.file_log_dir.clone(),
            date_pattern: config.file_log_date_pattern.clone(),
            formatter: BulkFormatter::file(config.index_date_pattern.clone()),
        })
    }

    /// Append one block per item to its (date, index, type) file, UTF-8.
    /// Attempts every item; returns the first error encountered, if any.
    pub fn write(&self, items: &[QueuedItem]) -> Result<(), ShipperError> {
        // The directory may have been removed since construction.
        fs::create_dir_all(&self.dir).map_err(|e| ShipperError::FileWrite {
            path: self.dir.clone(),
            source: e,
        })?;

        let date = Local::now().date_naive();
        let mut first_error = None;

        for item in items {
            let path = self.dir.join(self.file_name(item, date));
            let block = self.formatter.block_at(item, date);
            if let Err(source) = append_block(&path, &block) {
                tracing::debug!(path = %path.display(), error = %source, "file append failed");
                if first_error.is_none() {
                    first_error = Some(ShipperError::FileWrite { path, source });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn file_name(&self, item: &QueuedItem, date: NaiveDate) -> String {
        let date_str = render_date(date, &self.date_pattern)
            .unwrap_or_else(|| date.format("%Y%m%d").to_string());
        format!("{}-{}-{}.json", date_str, item.index, item.doc_type)
    }
}

fn append_block(path: &PathBuf, block: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block.as_bytes())
}

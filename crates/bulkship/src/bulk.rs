// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bulk wire-format serialization.
//!
//! Turns queued items into the newline-delimited blocks the `_bulk`
//! endpoint expects: one action line naming the destination, immediately
//! followed by the source line (the item's payload), each terminated by a
//! line-break token. The wire body uses `\n`; the file sink mirrors the
//! same blocks with `\r\n`.

use crate::queue::QueuedItem;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate};
use serde::Serialize;

/// Line-break token for the HTTP bulk body.
pub const WIRE_LINE_BREAK: &str = "\n";

/// Line-break token for file sink blocks.
pub const FILE_LINE_BREAK: &str = "\r\n";

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkIndex<'a>,
}

#[derive(Serialize)]
struct BulkIndex<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
}

/// Formats snapshots of queued items into bulk blocks.
#[derive(Debug, Clone)]
pub struct BulkFormatter {
    line_break: &'static str,
    index_date_pattern: Option<String>,
}

impl BulkFormatter {
    /// Formatter for the HTTP bulk body.
    pub fn wire(index_date_pattern: Option<String>) -> Self {
        Self {
            line_break: WIRE_LINE_BREAK,
            index_date_pattern,
        }
    }

    /// Formatter for file sink blocks.
    pub fn file(index_date_pattern: Option<String>) -> Self {
        Self {
            line_break: FILE_LINE_BREAK,
            index_date_pattern,
        }
    }

    /// Serialize a snapshot in order. An empty snapshot yields an empty
    /// string, which the flush cycle treats as "nothing to send".
    pub fn format(&self, items: &[QueuedItem]) -> String {
        self.format_at(items, Local::now().date_naive())
    }

    /// Serialize one item's action + source block.
    pub fn block(&self, item: &QueuedItem) -> String {
        self.block_at(item, Local::now().date_naive())
    }

    fn format_at(&self, items: &[QueuedItem], date: NaiveDate) -> String {
        items.iter().map(|item| self.block_at(item, date)).collect()
    }

    pub(crate) fn block_at(&self, item: &QueuedItem, date: NaiveDate) -> String {
        let index_name = match &self.index_date_pattern {
            Some(pattern) => match render_date(date, pattern) {
                Some(suffix) => format!("{}{}", item.index, suffix),
                None => item.index.clone(),
            },
            None => item.index.clone(),
        };

        // Serializing two plain strings is infallible.
        let action = serde_json::to_string(&BulkAction {
            index: BulkIndex {
                index: &index_name,
                doc_type: &item.doc_type,
            },
        })
        .expect("bulk action line serialization");

        format!(
            "{}{}{}{}",
            action, self.line_break, item.payload, self.line_break
        )
    }
}

/// Render a date with a strftime pattern, rejecting malformed patterns
/// instead of panicking in chrono's Display impl.
pub(crate) fn render_date(date: NaiveDate, pattern: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    Some(date.format_with_items(items.into_iter()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    }

    #[test]
    fn test_wire_block_exact_bytes() {
        let item = QueuedItem::new("soxportal", "event1", "{\"a\":1}");
        let body = BulkFormatter::wire(None).format(&[item]);
        assert_eq!(
            body,
            "{\"index\":{\"_index\":\"soxportal\",\"_type\":\"event1\"}}\n{\"a\":1}\n"
        );
    }

    #[test]
    fn test_empty_snapshot_yields_empty_body() {
        assert_eq!(BulkFormatter::wire(None).format(&[]), "");
    }

    #[test]
    fn test_blocks_concatenate_in_order() {
        let items = vec![
            QueuedItem::new("idx", "a", "{\"n\":1}"),
            QueuedItem::new("idx", "b", "{\"n\":2}"),
        ];
        let body = BulkFormatter::wire(None).format(&items);
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"_type\":\"a\""));
        assert_eq!(lines[1], "{\"n\":1}");
        assert!(lines[2].contains("\"_type\":\"b\""));
        assert_eq!(lines[3], "{\"n\":2}");
    }

    #[test]
    fn test_index_date_suffix() {
        let item = QueuedItem::new("soxportal", "event1", "{}");
        let formatter = BulkFormatter::wire(Some("-%Y%m%d".to_string()));
        let block = formatter.block_at(&item, sample_date());
        assert!(block.starts_with("{\"index\":{\"_index\":\"soxportal-20260828\""));
    }

    #[test]
    fn test_file_blocks_use_crlf() {
        let item = QueuedItem::new("idx", "t", "{\"a\":1}");
        let block = BulkFormatter::file(None).block(&item);
        assert!(block.ends_with("\r\n"));
        assert!(block.contains("}}\r\n{\"a\":1}"));
    }

    #[test]
    fn test_render_date_rejects_malformed_pattern() {
        assert_eq!(render_date(sample_date(), "%Y%m%d").as_deref(), Some("20260828"));
        assert_eq!(render_date(sample_date(), "%"), None);
    }
}

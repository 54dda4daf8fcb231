// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory event queue.
//!
//! Append-only buffer of pending events, drained atomically by the flush
//! cycle. The mutex makes `append` and `snapshot_and_clear` mutually
//! exclusive, so an item lands either fully before or fully after a
//! snapshot and can never be lost or flushed twice.

use std::sync::Mutex;

/// One pending event, fixed at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    /// Destination index (namespace).
    pub index: String,
    /// Destination type (category).
    pub doc_type: String,
    /// Event payload, already serialized to JSON text.
    pub payload: String,
}

impl QueuedItem {
    /// Create a queued item from its parts.
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            payload: payload.into(),
        }
    }
}

/// Ordered, growable buffer of pending items (FIFO within a batch).
#[derive(Debug, Default)]
pub struct EventQueue {
    items: Mutex<Vec<QueuedItem>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the tail. Returns the post-append length, which is
    /// what the auto-flush threshold check runs against.
    pub fn append(&self, item: QueuedItem) -> usize {
        let mut items = self.items.lock().unwrap();
        items.push(item);
        items.len()
    }

    /// Atomically take the current contents and empty the queue.
    ///
    /// Items appended after the swap stay queued for the next flush; items
    /// in the returned snapshot are gone from the queue for good.
    pub fn snapshot_and_clear(&self) -> Vec<QueuedItem> {
        let mut items = self.items.lock().unwrap();
        std::mem::take(&mut *items)
    }

    /// Number of currently queued items.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// True if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

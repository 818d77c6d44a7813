//! Compensation journal for multi-structure mutations.
//!
//! A mutation touches the primary store, the balanced index, the prefix
//! indexes and the graph in turn. Each applied step is recorded here; if a
//! later step fails, the recorded steps are reversed newest-first so the
//! catalog ends up exactly as it was before the call.

use crate::catalog::CatalogEntry;
use crate::types::{BookId, OrderKey, SearchField};

/// One applied change and enough state to reverse it.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Entry stored; `next_id` is the counter before the insert.
    Stored { id: BookId, next_id: BookId },
    /// Entry removed from the store.
    Unstored(CatalogEntry),
    /// Entry replaced; holds the previous version.
    Replaced(CatalogEntry),
    /// Key inserted into the balanced index.
    Ordered(OrderKey),
    /// Key removed from the balanced index.
    Unordered(OrderKey, BookId),
    /// Text indexed under a field.
    Indexed(SearchField, String, BookId),
    /// Text unindexed from a field.
    Unindexed(SearchField, String, BookId),
    /// Graph node added.
    Noded(BookId),
    /// Graph node removed with its edges.
    Unnoded(BookId, Vec<(BookId, f64)>),
    /// Edge added or re-weighted.
    Linked {
        a: BookId,
        b: BookId,
        previous: Option<f64>,
    },
}

/// Ordered record of applied steps.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    steps: Vec<Step>,
}

impl Journal {
    pub fn record(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Steps in reverse application order.
    pub fn unwind(self) -> impl Iterator<Item = Step> {
        self.steps.into_iter().rev()
    }
}

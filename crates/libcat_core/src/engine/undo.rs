//! Bounded log of reversible mutations.

use crate::catalog::CatalogEntry;
use crate::types::BookId;
use std::collections::VecDeque;

/// A committed mutation, holding what is needed to reverse it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A book was added.
    Added {
        /// The new book.
        id: BookId,
    },
    /// A book was removed along with its edges.
    Removed {
        /// The removed entry.
        entry: CatalogEntry,
        /// Its edges at removal time, as `(neighbor, weight)`.
        edges: Vec<(BookId, f64)>,
    },
    /// A book was updated.
    Updated {
        /// The entry before the update.
        before: CatalogEntry,
    },
    /// An edge was created or re-weighted.
    Linked {
        /// One endpoint.
        a: BookId,
        /// The other endpoint.
        b: BookId,
        /// Weight before the call, if the edge existed.
        previous: Option<f64>,
    },
    /// An edge was removed.
    Unlinked {
        /// One endpoint.
        a: BookId,
        /// The other endpoint.
        b: BookId,
        /// The removed weight.
        weight: f64,
    },
}

impl Mutation {
    /// Short name used in logs and protocol responses.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Added { .. } => "add",
            Mutation::Removed { .. } => "remove",
            Mutation::Updated { .. } => "update",
            Mutation::Linked { .. } => "link",
            Mutation::Unlinked { .. } => "unlink",
        }
    }
}

/// Keeps the most recent `depth` mutations; older ones fall off the front.
#[derive(Debug, Clone)]
pub(crate) struct UndoLog {
    records: VecDeque<Mutation>,
    depth: usize,
}

impl UndoLog {
    pub fn new(depth: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(depth.min(64)),
            depth,
        }
    }

    pub fn push(&mut self, mutation: Mutation) {
        if self.depth == 0 {
            return;
        }
        if self.records.len() == self.depth {
            self.records.pop_front();
        }
        self.records.push_back(mutation);
    }

    pub fn pop(&mut self) -> Option<Mutation> {
        self.records.pop_back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(id: u64) -> Mutation {
        Mutation::Added {
            id: BookId::new(id),
        }
    }

    #[test]
    fn pops_most_recent_first() {
        let mut log = UndoLog::new(4);
        log.push(added(1));
        log.push(added(2));

        assert_eq!(log.pop(), Some(added(2)));
        assert_eq!(log.pop(), Some(added(1)));
        assert_eq!(log.pop(), None);
    }

    #[test]
    fn oldest_record_falls_off() {
        let mut log = UndoLog::new(2);
        for id in 1..=3 {
            log.push(added(id));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.pop(), Some(added(3)));
        assert_eq!(log.pop(), Some(added(2)));
        assert_eq!(log.pop(), None);
    }

    #[test]
    fn zero_depth_keeps_nothing() {
        let mut log = UndoLog::new(0);
        log.push(added(1));
        assert_eq!(log.len(), 0);
        assert_eq!(log.pop(), None);
    }
}

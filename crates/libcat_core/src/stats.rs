//! Engine statistics.
//!
//! # Usage
//!
//! ```rust
//! use libcat_core::{CatalogEntry, Library};
//!
//! let library = Library::default();
//! library.add_book(CatalogEntry::new("Dune", "Frank Herbert")).unwrap();
//!
//! let stats = library.stats();
//! assert_eq!(stats.added, 1);
//! assert_eq!(stats.books, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters.
///
/// All counters are atomic and monotonically increasing, so they can be
/// bumped from read paths that only hold a shared lock.
#[derive(Debug, Default)]
pub struct EngineStats {
    // Mutations
    added: AtomicU64,
    removed: AtomicU64,
    updated: AtomicU64,
    /// Mutations rejected before or during apply.
    rejected: AtomicU64,
    /// Mutations whose partial effects had to be compensated.
    rollbacks: AtomicU64,
    undos: AtomicU64,

    // Queries
    lookups: AtomicU64,
    searches: AtomicU64,
    recommendations: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_add(&self) {
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undo(&self) {
        self.undos.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recommendation(&self) {
        self.recommendations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of books added.
    pub fn added(&self) -> u64 {
        self.added.load(Ordering::Relaxed)
    }

    /// Returns the number of books removed.
    pub fn removed(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    /// Returns the number of books updated.
    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    /// Returns the number of rejected mutations.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Returns the number of rolled back mutations.
    ///
    /// Anything above zero points at an internal defect; rejected input is
    /// normally caught before any structure is touched.
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Returns the number of undone mutations.
    pub fn undos(&self) -> u64 {
        self.undos.load(Ordering::Relaxed)
    }

    /// Returns the number of ordered lookups and range scans.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Returns the number of prefix searches and autocompletions.
    pub fn searches(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    /// Returns the number of recommendation queries.
    pub fn recommendations(&self) -> u64 {
        self.recommendations.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the counters. Size gauges are left at zero.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            added: self.added(),
            removed: self.removed(),
            updated: self.updated(),
            rejected: self.rejected(),
            rollbacks: self.rollbacks(),
            undos: self.undos(),
            lookups: self.lookups(),
            searches: self.searches(),
            recommendations: self.recommendations(),
            ..StatsSnapshot::default()
        }
    }
}

/// A point-in-time snapshot of engine statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Books added.
    pub added: u64,
    /// Books removed.
    pub removed: u64,
    /// Books updated.
    pub updated: u64,
    /// Rejected mutations.
    pub rejected: u64,
    /// Rolled back mutations.
    pub rollbacks: u64,
    /// Undone mutations.
    pub undos: u64,
    /// Ordered lookups and range scans.
    pub lookups: u64,
    /// Prefix searches and autocompletions.
    pub searches: u64,
    /// Recommendation queries.
    pub recommendations: u64,

    /// Books currently stored.
    pub books: u64,
    /// Height of the balanced index.
    pub index_height: u64,
    /// (text, id) pairs across all prefix indexes.
    pub prefix_entries: u64,
    /// Nodes in the recommendation graph.
    pub graph_nodes: u64,
    /// Edges in the recommendation graph.
    pub graph_edges: u64,
    /// Records held by the undo log.
    pub undo_depth: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = EngineStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = EngineStats::new();
        stats.record_add();
        stats.record_add();
        stats.record_remove();
        stats.record_rejected();
        stats.record_search();

        let snap = stats.snapshot();
        assert_eq!(snap.added, 2);
        assert_eq!(snap.removed, 1);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.searches, 1);
        assert_eq!(snap.rollbacks, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(EngineStats::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_lookup();
                    s.record_recommendation();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.lookups(), 800);
        assert_eq!(stats.recommendations(), 800);
    }
}

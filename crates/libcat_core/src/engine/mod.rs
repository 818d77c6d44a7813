//! The library engine: one entry point over the store and its indexes.

mod journal;
mod state;
mod undo;

pub use undo::Mutation;

use crate::catalog::{CatalogEntry, EntryPatch};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::graph::Recommendation;
use crate::index::normalize::normalize;
use crate::stats::{EngineStats, StatsSnapshot};
use crate::types::{BookId, OrderKey, SearchField};
use parking_lot::RwLock;
use state::CatalogState;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// An in-memory library catalog.
///
/// Entries live in a primary store keyed by [`BookId`]. Three structures are
/// derived from it and kept in lockstep:
/// - a balanced index over the ordering field (lookups, range scans)
/// - one prefix index per search field (prefix search, autocomplete)
/// - a weighted recommendation graph
///
/// Every mutation is all-or-nothing across the four. Reads share a lock, so
/// no reader observes a half-applied mutation.
///
/// # Example
///
/// ```rust
/// use libcat_core::{CatalogEntry, Library};
///
/// let library = Library::default();
/// let a = library.add_book(CatalogEntry::new("Clean Code", "Robert Martin")).unwrap();
/// let b = library.add_book(CatalogEntry::new("Clean Architecture", "Robert Martin")).unwrap();
/// library.link(a, b, 0.9).unwrap();
///
/// assert_eq!(library.search("clean").len(), 2);
/// assert_eq!(library.recommend(a, 5).unwrap()[0].id, b);
/// ```
pub struct Library {
    config: EngineConfig,
    state: RwLock<CatalogState>,
    stats: Arc<EngineStats>,
}

impl Library {
    /// Creates an empty library.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        config.validate()?;
        let stats = Arc::new(EngineStats::new());
        let state = CatalogState::new(config.clone(), Arc::clone(&stats));
        info!(
            ordering = %config.ordering,
            search_fields = config.search_fields.len(),
            graph = config.register_graph_nodes,
            "library initialized"
        );
        Ok(Self {
            config,
            state: RwLock::new(state),
            stats,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the operation counters.
    pub fn counters(&self) -> &EngineStats {
        &self.stats
    }

    /// Returns counters plus current structure sizes.
    pub fn stats(&self) -> StatsSnapshot {
        let mut snapshot = self.stats.snapshot();
        let state = self.state.read();
        snapshot.books = state.store().len() as u64;
        snapshot.index_height = u64::from(state.ordered().height());
        snapshot.prefix_entries = state.prefixes().map(|(_, index)| index.len() as u64).sum();
        snapshot.graph_nodes = state.graph().node_count() as u64;
        snapshot.graph_edges = state.graph().edge_count() as u64;
        snapshot.undo_depth = state.undo_len() as u64;
        snapshot
    }

    /// Returns the number of books.
    pub fn len(&self) -> usize {
        self.state.read().store().len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // === Mutations ===

    /// Adds a book and returns its id.
    ///
    /// An entry with [`BookId::UNASSIGNED`] gets the next free id. When a
    /// link policy is configured, edges to related books are created in the
    /// same step.
    ///
    /// # Errors
    ///
    /// - `InvalidEntry` for a blank title or a missing ordering field
    /// - `DuplicateId` if the explicit id is taken
    /// - `DuplicateKey` if another book has the same ordering key
    pub fn add_book(&self, entry: CatalogEntry) -> CoreResult<BookId> {
        let id = self.mutate(|state| state.add(entry))?;
        self.stats.record_add();
        Ok(id)
    }

    /// Removes a book and its edges, returning the removed entry.
    ///
    /// # Errors
    ///
    /// Returns `BookNotFound` if `id` is unknown.
    pub fn remove_book(&self, id: BookId) -> CoreResult<CatalogEntry> {
        let entry = self.mutate(|state| state.remove(id))?;
        self.stats.record_remove();
        Ok(entry)
    }

    /// Applies a patch to a book and returns the updated entry.
    ///
    /// The book keeps its id, graph node and edges.
    ///
    /// # Errors
    ///
    /// `BookNotFound`, `InvalidEntry`, or `DuplicateKey` when the new
    /// ordering key belongs to another book. The entry is unchanged on error.
    pub fn update_book(&self, id: BookId, patch: &EntryPatch) -> CoreResult<CatalogEntry> {
        let entry = self.mutate(|state| state.update(id, patch))?;
        self.stats.record_update();
        Ok(entry)
    }

    /// Links two books, returning the previous weight if they were linked.
    ///
    /// # Errors
    ///
    /// `GraphDisabled`, `InvalidWeight`, `SelfLoop` or `NodeNotFound`.
    pub fn link(&self, a: BookId, b: BookId, weight: f64) -> CoreResult<Option<f64>> {
        self.mutate(|state| state.link(a, b, weight))
    }

    /// Unlinks two books, returning the removed weight.
    ///
    /// # Errors
    ///
    /// `GraphDisabled`, `NodeNotFound` or `EdgeNotFound`.
    pub fn unlink(&self, a: BookId, b: BookId) -> CoreResult<f64> {
        self.mutate(|state| state.unlink(a, b))
    }

    /// Reverts the most recent mutation and returns it.
    ///
    /// # Errors
    ///
    /// Returns `NothingToUndo` when the log is empty.
    pub fn undo(&self) -> CoreResult<Mutation> {
        let mutation = self.mutate(CatalogState::undo)?;
        self.stats.record_undo();
        Ok(mutation)
    }

    /// Replaces the whole catalog with `entries`, added in order.
    ///
    /// The result is the same as adding each entry to an empty library. On
    /// error the current catalog is kept. The undo log is cleared.
    ///
    /// # Errors
    ///
    /// The first error any entry would raise in [`add_book`](Self::add_book).
    pub fn rebuild_from<I>(&self, entries: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        self.rebuild_with_links(entries, Vec::new())
    }

    /// Like [`rebuild_from`](Self::rebuild_from), then restores explicit
    /// edges given as `(a, b, weight)`.
    ///
    /// # Errors
    ///
    /// Entry errors as for `rebuild_from`, or any [`link`](Self::link) error.
    pub fn rebuild_with_links<I, L>(&self, entries: I, links: L) -> CoreResult<()>
    where
        I: IntoIterator<Item = CatalogEntry>,
        L: IntoIterator<Item = (BookId, BookId, f64)>,
    {
        self.mutate(|state| {
            *state = state.rebuilt(entries, links)?;
            Ok(())
        })
    }

    // === Reads ===

    /// Returns a book by id.
    pub fn get(&self, id: BookId) -> Option<CatalogEntry> {
        self.state.read().store().get(id).cloned()
    }

    /// Returns true if `id` is in the catalog.
    pub fn contains(&self, id: BookId) -> bool {
        self.state.read().store().contains(id)
    }

    /// Finds the book with the given ordering key.
    ///
    /// Text keys are normalized, so `"clean code"` finds `"Clean Code"`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if no book has the key.
    pub fn lookup(&self, key: impl Into<OrderKey>) -> CoreResult<CatalogEntry> {
        self.stats.record_lookup();
        let key = canonical(key.into());
        let state = self.state.read();
        let id = state.ordered().find(&key)?;
        entry_of(&state, id)
    }

    /// Returns books whose ordering key lies in `[low, high]`, in key order.
    pub fn range(&self, low: impl Into<OrderKey>, high: impl Into<OrderKey>) -> Vec<CatalogEntry> {
        self.stats.record_lookup();
        let (low, high) = (canonical(low.into()), canonical(high.into()));
        let state = self.state.read();
        state
            .ordered()
            .range_scan(&low, &high)
            .filter_map(|(_, id)| state.store().get(id).cloned())
            .collect()
    }

    /// Returns books with any search field starting with `prefix`, by id.
    pub fn search(&self, prefix: &str) -> Vec<CatalogEntry> {
        self.stats.record_search();
        let state = self.state.read();
        let ids: BTreeSet<BookId> = state
            .prefixes()
            .flat_map(|(_, index)| index.prefix_search(prefix))
            .collect();
        entries_of(&state, ids)
    }

    /// Returns books whose `field` starts with `prefix`, by id.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotIndexed` if `field` has no prefix index.
    pub fn search_field(&self, field: &SearchField, prefix: &str) -> CoreResult<Vec<CatalogEntry>> {
        self.stats.record_search();
        let state = self.state.read();
        let ids = state.prefix(field)?.prefix_search(prefix);
        Ok(entries_of(&state, ids))
    }

    /// Returns books whose `field` equals `text` after normalization.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotIndexed` if `field` has no prefix index.
    pub fn exact(&self, field: &SearchField, text: &str) -> CoreResult<Vec<CatalogEntry>> {
        self.stats.record_search();
        let state = self.state.read();
        let target = normalize(text);
        // Word tokens share the trie, so each hit is re-checked against the
        // whole field value.
        let ids: BTreeSet<BookId> = state
            .prefix(field)?
            .exact_match(&target)
            .into_iter()
            .filter(|id| {
                state
                    .store()
                    .get(*id)
                    .and_then(|entry| entry.text(field))
                    .is_some_and(|value| normalize(value) == target)
            })
            .collect();
        Ok(entries_of(&state, ids))
    }

    /// Suggests up to `limit` indexed values of `field` starting with
    /// `prefix`, in lexicographic order. Suggestions are normalized.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotIndexed` if `field` has no prefix index.
    pub fn autocomplete(
        &self,
        field: &SearchField,
        prefix: &str,
        limit: usize,
    ) -> CoreResult<Vec<String>> {
        self.stats.record_search();
        let state = self.state.read();
        Ok(state.prefix(field)?.complete(prefix, limit))
    }

    /// Recommends up to `k` books related to `id`.
    ///
    /// Direct neighbors come first by descending weight, ties by ascending
    /// id. With second-degree fallback enabled, a short list is topped up
    /// with neighbors of neighbors.
    ///
    /// # Errors
    ///
    /// `GraphDisabled`, or `BookNotFound` if `id` is unknown.
    pub fn recommend(&self, id: BookId, k: usize) -> CoreResult<Vec<Recommendation>> {
        self.stats.record_recommendation();
        let state = self.state.read();
        state.require_graph()?;
        if !state.store().contains(id) {
            return Err(CoreError::BookNotFound { id });
        }
        state
            .graph()
            .recommend(id, k, self.config.second_degree_fallback)
    }

    /// Recommends up to `k` books for a reader who liked every seed.
    ///
    /// Candidates score the sum of their edge weights to the seeds. Seeds are
    /// never recommended and unknown seeds are ignored.
    ///
    /// # Errors
    ///
    /// Returns `GraphDisabled` if books have no graph nodes.
    pub fn recommend_for(&self, seeds: &[BookId], k: usize) -> CoreResult<Vec<Recommendation>> {
        self.stats.record_recommendation();
        let state = self.state.read();
        state.require_graph()?;
        Ok(state.graph().recommend_for(seeds, k))
    }

    /// Returns every book in ascending id order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.state.read().store().iter().cloned().collect()
    }

    /// Returns every edge as `(a, b, weight)` with `a < b`, sorted.
    pub fn links(&self) -> Vec<(BookId, BookId, f64)> {
        self.state.read().graph().edges()
    }

    /// Checks every structure and their agreement with the store.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first failed check.
    pub fn verify(&self) -> CoreResult<()> {
        let result = self.state.read().verify();
        if let Err(err) = &result {
            error!(error = %err, "catalog verification failed");
        }
        result
    }

    /// Runs a mutation under the write lock and counts rejections.
    fn mutate<T, F>(&self, op: F) -> CoreResult<T>
    where
        F: FnOnce(&mut CatalogState) -> CoreResult<T>,
    {
        let mut state = self.state.write();
        let result = op(&mut *state);
        if let Err(err) = &result {
            self.stats.record_rejected();
            if err.is_internal() {
                error!(error = %err, "internal error during mutation");
            } else {
                debug!(error = %err, "mutation rejected");
            }
        }
        result
    }
}

impl Default for Library {
    fn default() -> Self {
        let config = EngineConfig::default();
        let stats = Arc::new(EngineStats::new());
        let state = CatalogState::new(config.clone(), Arc::clone(&stats));
        Self {
            config,
            state: RwLock::new(state),
            stats,
        }
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("ordering", &self.config.ordering)
            .field("books", &self.len())
            .finish_non_exhaustive()
    }
}

fn canonical(key: OrderKey) -> OrderKey {
    match key {
        OrderKey::Text(text) => OrderKey::Text(normalize(&text)),
        id => id,
    }
}

fn entry_of(state: &CatalogState, id: BookId) -> CoreResult<CatalogEntry> {
    state
        .store()
        .get(id)
        .cloned()
        .ok_or_else(|| CoreError::invariant(format!("{id} indexed but not stored")))
}

fn entries_of(state: &CatalogState, ids: BTreeSet<BookId>) -> Vec<CatalogEntry> {
    ids.into_iter()
        .filter_map(|id| state.store().get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkPolicy;
    use crate::types::OrderingField;

    fn library() -> Library {
        Library::default()
    }

    fn titles(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn range_scan_by_id() {
        let library = Library::new(EngineConfig::new().ordering(OrderingField::Id)).unwrap();
        for id in [5u64, 3, 8, 1, 4] {
            library
                .add_book(CatalogEntry::new(format!("Book {id}"), "x").with_id(id))
                .unwrap();
        }

        let ids: Vec<u64> = library
            .range(1u64, 8u64)
            .iter()
            .map(|e| e.id.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 3, 4, 5, 8]);
    }

    #[test]
    fn prefix_search_finds_both_clean_books() {
        let library = library();
        library
            .add_book(CatalogEntry::new("Clean Code", "Robert Martin"))
            .unwrap();
        library
            .add_book(CatalogEntry::new("Clean Architecture", "Robert Martin"))
            .unwrap();

        let found = library.search_field(&SearchField::Title, "Clean").unwrap();
        assert_eq!(titles(&found), vec!["Clean Code", "Clean Architecture"]);
        assert!(library
            .search_field(&SearchField::Title, "Cleanz")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn recommend_ranks_by_weight_then_id() {
        let library = library();
        let a = library.add_book(CatalogEntry::new("A", "x")).unwrap();
        let b = library.add_book(CatalogEntry::new("B", "x")).unwrap();
        let c = library.add_book(CatalogEntry::new("C", "x")).unwrap();
        let d = library.add_book(CatalogEntry::new("D", "x")).unwrap();
        library.link(a, b, 0.9).unwrap();
        library.link(a, c, 0.5).unwrap();
        library.link(a, d, 0.5).unwrap();

        let ids: Vec<BookId> = library
            .recommend(a, 2)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![b, c]);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let library = library();
        library.add_book(CatalogEntry::new("Dune", "Herbert")).unwrap();
        let before = library.stats();

        let err = library.remove_book(BookId::new(42)).unwrap_err();
        assert_eq!(err, CoreError::BookNotFound { id: BookId::new(42) });
        assert_eq!(library.len(), 1);
        assert_eq!(library.stats().rejected, before.rejected + 1);
        library.verify().unwrap();
    }

    #[test]
    fn duplicate_key_keeps_size() {
        let library = library();
        library.add_book(CatalogEntry::new("Dune", "Herbert")).unwrap();

        let err = library
            .add_book(CatalogEntry::new("Dune", "Someone"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DuplicateKey);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn lookup_normalizes_query() {
        let library = library();
        let id = library
            .add_book(CatalogEntry::new("Café Society", "Author"))
            .unwrap();

        assert_eq!(library.lookup("CAFE  society").unwrap().id, id);
        assert!(matches!(
            library.lookup("missing"),
            Err(CoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn search_unions_fields() {
        let library = library();
        let a = library.add_book(CatalogEntry::new("Martian", "Weir")).unwrap();
        let b = library
            .add_book(CatalogEntry::new("Refactoring", "Martin Fowler"))
            .unwrap();
        library
            .add_book(CatalogEntry::new("Clean Code", "Robert Martin"))
            .unwrap();

        let ids: Vec<BookId> = library.search("mart").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(library.search("").len(), 3);
    }

    #[test]
    fn unindexed_field_is_rejected() {
        let library = library();
        let err = library
            .search_field(&SearchField::field("isbn"), "978")
            .unwrap_err();
        assert!(matches!(err, CoreError::FieldNotIndexed { .. }));
    }

    #[test]
    fn exact_ignores_word_tokens() {
        let library = Library::new(EngineConfig::new().index_word_tokens(true)).unwrap();
        let id = library
            .add_book(CatalogEntry::new("Clean Code", "Robert Martin"))
            .unwrap();

        // The word still prefix-matches.
        let words = library.search_field(&SearchField::Title, "code").unwrap();
        assert_eq!(titles(&words), vec!["Clean Code"]);
        assert!(library.exact(&SearchField::Title, "code").unwrap().is_empty());
        assert!(library.exact(&SearchField::Author, "martin").unwrap().is_empty());

        let found = library.exact(&SearchField::Title, "CLEAN  code").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[test]
    fn autocomplete_is_lexicographic() {
        let library = library();
        for title in ["Dune Messiah", "Dune", "Dracula", "Children of Dune"] {
            library.add_book(CatalogEntry::new(title, "x")).unwrap();
        }

        let suggestions = library
            .autocomplete(&SearchField::Title, "d", 10)
            .unwrap();
        assert_eq!(suggestions, vec!["dracula", "dune", "dune messiah"]);
        assert_eq!(
            library.autocomplete(&SearchField::Title, "d", 1).unwrap(),
            vec!["dracula"]
        );
    }

    #[test]
    fn recommend_unknown_book() {
        let library = library();
        assert_eq!(
            library.recommend(BookId::new(7), 3),
            Err(CoreError::BookNotFound { id: BookId::new(7) })
        );
    }

    #[test]
    fn recommend_falls_back_to_second_degree() {
        let library = library();
        let a = library.add_book(CatalogEntry::new("A", "x")).unwrap();
        let b = library.add_book(CatalogEntry::new("B", "x")).unwrap();
        let c = library.add_book(CatalogEntry::new("C", "x")).unwrap();
        library.link(a, b, 0.8).unwrap();
        library.link(b, c, 0.5).unwrap();

        let recs = library.recommend(a, 3).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!((recs[0].id, recs[0].degree), (b, 1));
        assert_eq!((recs[1].id, recs[1].degree), (c, 2));
        assert!((recs[1].score - 0.4).abs() < 1e-12);

        let strict = Library::new(EngineConfig::new().second_degree_fallback(false)).unwrap();
        let a = strict.add_book(CatalogEntry::new("A", "x")).unwrap();
        let b = strict.add_book(CatalogEntry::new("B", "x")).unwrap();
        let c = strict.add_book(CatalogEntry::new("C", "x")).unwrap();
        strict.link(a, b, 0.8).unwrap();
        strict.link(b, c, 0.5).unwrap();
        assert_eq!(strict.recommend(a, 3).unwrap().len(), 1);
    }

    #[test]
    fn personalized_recommendations_sum_seeds() {
        let library = library();
        let ids: Vec<BookId> = (1..=4)
            .map(|n| {
                library
                    .add_book(CatalogEntry::new(format!("Book {n}"), "x"))
                    .unwrap()
            })
            .collect();
        library.link(ids[0], ids[2], 0.4).unwrap();
        library.link(ids[1], ids[2], 0.4).unwrap();
        library.link(ids[1], ids[3], 0.7).unwrap();

        let recs = library
            .recommend_for(&[ids[0], ids[1], BookId::new(99)], 5)
            .unwrap();
        let ranked: Vec<BookId> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ranked, vec![ids[2], ids[3]]);
        assert!((recs[0].score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn update_then_undo() {
        let library = library();
        let id = library
            .add_book(CatalogEntry::new("Emma", "Jane Austen"))
            .unwrap();

        library
            .update_book(id, &EntryPatch::new().title("Emma: A Novel"))
            .unwrap();
        assert_eq!(library.lookup("emma: a novel").unwrap().id, id);

        let undone = library.undo().unwrap();
        assert!(matches!(undone, Mutation::Updated { .. }));
        assert_eq!(library.lookup("emma").unwrap().id, id);
        assert_eq!(library.stats().undos, 1);
    }

    #[test]
    fn rebuild_round_trip() {
        let config = EngineConfig::new().link_policy(LinkPolicy::new().same_author(0.5));
        let library = Library::new(config.clone()).unwrap();
        library.add_book(CatalogEntry::new("Emma", "Jane Austen")).unwrap();
        library
            .add_book(CatalogEntry::new("Persuasion", "Jane Austen"))
            .unwrap();
        let dune = library.add_book(CatalogEntry::new("Dune", "Herbert")).unwrap();
        library.link(dune, BookId::new(1), 0.2).unwrap();

        let restored = Library::new(config).unwrap();
        restored
            .rebuild_with_links(library.entries(), library.links())
            .unwrap();

        assert_eq!(restored.entries(), library.entries());
        assert_eq!(restored.links(), library.links());
        assert_eq!(restored.search("e").len(), library.search("e").len());
        assert_eq!(restored.undo(), Err(CoreError::NothingToUndo));
        restored.verify().unwrap();
    }

    #[test]
    fn failed_rebuild_keeps_catalog() {
        let library = library();
        library.add_book(CatalogEntry::new("Dune", "Herbert")).unwrap();

        let result = library.rebuild_from(vec![
            CatalogEntry::new("Emma", "Austen"),
            CatalogEntry::new("EMMA", "Austen"),
        ]);
        assert!(matches!(result, Err(CoreError::DuplicateKey { .. })));
        assert_eq!(titles(&library.entries()), vec!["Dune"]);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig::new()
            .register_graph_nodes(false)
            .link_policy(LinkPolicy::new().same_author(1.0));
        assert!(matches!(
            Library::new(config),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn library_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Library>();
    }
}

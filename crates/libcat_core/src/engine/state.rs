//! The primary store plus every structure derived from it.
//!
//! Each mutation validates first, then applies its steps through a
//! [`Journal`]. Validation rejects everything a caller can get wrong, so
//! a failure during apply means a defect; the journal is then unwound and
//! the state is left as it was before the call.

use super::journal::{Journal, Step};
use super::undo::{Mutation, UndoLog};
use crate::catalog::{CatalogEntry, EntryPatch, PrimaryStore};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::graph::RecommendationGraph;
use crate::index::normalize::{normalize, words};
use crate::index::{BalancedIndex, PrefixIndex};
use crate::stats::EngineStats;
use crate::types::{BookId, OrderKey, OrderingField, SearchField};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Normalized `(field, text)` pairs an entry contributes to prefix indexes.
type IndexedTexts = BTreeSet<(SearchField, String)>;

#[derive(Debug, Clone)]
pub(crate) struct CatalogState {
    config: EngineConfig,
    store: PrimaryStore,
    ordered: BalancedIndex<OrderKey>,
    prefixes: BTreeMap<SearchField, PrefixIndex>,
    graph: RecommendationGraph,
    undo: UndoLog,
    stats: Arc<EngineStats>,
}

impl CatalogState {
    pub fn new(config: EngineConfig, stats: Arc<EngineStats>) -> Self {
        let prefixes = config
            .search_fields
            .iter()
            .map(|field| (field.clone(), PrefixIndex::new()))
            .collect();
        let undo = UndoLog::new(config.undo_depth);
        Self {
            config,
            store: PrimaryStore::default(),
            ordered: BalancedIndex::new(),
            prefixes,
            graph: RecommendationGraph::new(),
            undo,
            stats,
        }
    }

    pub fn store(&self) -> &PrimaryStore {
        &self.store
    }

    pub fn ordered(&self) -> &BalancedIndex<OrderKey> {
        &self.ordered
    }

    pub fn graph(&self) -> &RecommendationGraph {
        &self.graph
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&SearchField, &PrefixIndex)> {
        self.prefixes.iter()
    }

    pub fn prefix(&self, field: &SearchField) -> CoreResult<&PrefixIndex> {
        self.prefixes
            .get(field)
            .ok_or_else(|| CoreError::FieldNotIndexed {
                field: field.to_string(),
            })
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Fails with `GraphDisabled` unless books get graph nodes.
    pub fn require_graph(&self) -> CoreResult<()> {
        if self.config.register_graph_nodes {
            Ok(())
        } else {
            Err(CoreError::GraphDisabled)
        }
    }

    // === Mutations ===

    /// Adds an entry and links it per the configured policy.
    pub fn add(&mut self, entry: CatalogEntry) -> CoreResult<BookId> {
        let id = self.insert_entry(entry, None)?;
        self.undo.push(Mutation::Added { id });
        Ok(id)
    }

    /// Removes a book, returning its entry.
    pub fn remove(&mut self, id: BookId) -> CoreResult<CatalogEntry> {
        let (entry, edges) = self.remove_entry(id)?;
        self.undo.push(Mutation::Removed {
            entry: entry.clone(),
            edges,
        });
        Ok(entry)
    }

    /// Applies a patch, returning the updated entry.
    pub fn update(&mut self, id: BookId, patch: &EntryPatch) -> CoreResult<CatalogEntry> {
        let before = self
            .store
            .get(id)
            .cloned()
            .ok_or(CoreError::BookNotFound { id })?;
        let after = patch.apply(&before);
        self.replace_entry(&before, after.clone())?;
        self.undo.push(Mutation::Updated { before });
        Ok(after)
    }

    /// Creates or re-weights an edge, returning the previous weight.
    pub fn link(&mut self, a: BookId, b: BookId, weight: f64) -> CoreResult<Option<f64>> {
        self.require_graph()?;
        let previous = self.graph.add_edge(a, b, weight)?;
        self.undo.push(Mutation::Linked { a, b, previous });
        debug!(%a, %b, weight, "books linked");
        Ok(previous)
    }

    /// Removes an edge, returning its weight.
    pub fn unlink(&mut self, a: BookId, b: BookId) -> CoreResult<f64> {
        self.require_graph()?;
        let weight = self.graph.remove_edge(a, b)?;
        self.undo.push(Mutation::Unlinked { a, b, weight });
        debug!(%a, %b, "books unlinked");
        Ok(weight)
    }

    /// Reverts the most recent mutation still in the undo log.
    pub fn undo(&mut self) -> CoreResult<Mutation> {
        let mutation = self.undo.pop().ok_or(CoreError::NothingToUndo)?;
        if let Err(err) = self.revert(&mutation) {
            self.undo.push(mutation);
            return Err(err);
        }
        debug!(mutation = mutation.name(), "mutation undone");
        Ok(mutation)
    }

    /// Builds a fresh state as if every entry had been added in order.
    ///
    /// `self` is not touched; the caller swaps the result in.
    pub fn rebuilt(
        &self,
        entries: impl IntoIterator<Item = CatalogEntry>,
        links: impl IntoIterator<Item = (BookId, BookId, f64)>,
    ) -> CoreResult<Self> {
        let mut fresh = Self::new(self.config.clone(), Arc::clone(&self.stats));
        for entry in entries {
            fresh.insert_entry(entry, None)?;
        }
        for (a, b, weight) in links {
            fresh.require_graph()?;
            fresh.graph.add_edge(a, b, weight)?;
        }
        debug!(
            books = fresh.store.len(),
            edges = fresh.graph.edge_count(),
            "catalog rebuilt"
        );
        Ok(fresh)
    }

    fn revert(&mut self, mutation: &Mutation) -> CoreResult<()> {
        match mutation {
            Mutation::Added { id } => self.remove_entry(*id).map(drop),
            Mutation::Removed { entry, edges } => self
                .insert_entry(entry.clone(), Some(edges.clone()))
                .map(drop),
            Mutation::Updated { before } => {
                let current = self
                    .store
                    .get(before.id)
                    .cloned()
                    .ok_or(CoreError::BookNotFound { id: before.id })?;
                self.replace_entry(&current, before.clone())
            }
            Mutation::Linked { a, b, previous } => match previous {
                Some(weight) => self.graph.add_edge(*a, *b, *weight).map(drop),
                None => self.graph.remove_edge(*a, *b).map(drop),
            },
            Mutation::Unlinked { a, b, weight } => self.graph.add_edge(*a, *b, *weight).map(drop),
        }
    }

    // === Journaled primitives ===

    /// Inserts an entry into every structure.
    ///
    /// `links` of `None` applies the link policy; `Some` restores exactly
    /// the given edges (used by undo).
    fn insert_entry(
        &mut self,
        mut entry: CatalogEntry,
        links: Option<Vec<(BookId, f64)>>,
    ) -> CoreResult<BookId> {
        entry.validate()?;
        entry.id = self.store.reserve_id(entry.id)?;
        let key = self.order_key(&entry)?;
        if self.ordered.contains_key(&key) {
            return Err(CoreError::duplicate_key(&key));
        }
        let links = match links {
            Some(links) => links,
            None => self.auto_links(&entry),
        };
        if !links.is_empty() {
            self.require_graph()?;
        }

        let id = entry.id;
        let mut journal = Journal::default();
        let result = self.apply_insert(entry, key, &links, &mut journal);
        self.settle(result, journal)?;
        debug!(%id, links = links.len(), "book added");
        Ok(id)
    }

    fn apply_insert(
        &mut self,
        entry: CatalogEntry,
        key: OrderKey,
        links: &[(BookId, f64)],
        journal: &mut Journal,
    ) -> CoreResult<()> {
        let id = entry.id;
        let texts = self.indexed_texts(&entry);

        let next_id = self.store.next_id();
        self.store.insert(entry)?;
        journal.record(Step::Stored { id, next_id });

        self.ordered.insert(key.clone(), id)?;
        journal.record(Step::Ordered(key));

        for (field, text) in texts {
            if self.prefix_mut(&field)?.insert(&text, id) {
                journal.record(Step::Indexed(field, text, id));
            }
        }

        if self.config.register_graph_nodes {
            if self.graph.add_node(id) {
                journal.record(Step::Noded(id));
            }
            for &(other, weight) in links {
                let previous = self.graph.add_edge(id, other, weight)?;
                journal.record(Step::Linked {
                    a: id,
                    b: other,
                    previous,
                });
            }
        }
        Ok(())
    }

    fn remove_entry(&mut self, id: BookId) -> CoreResult<(CatalogEntry, Vec<(BookId, f64)>)> {
        let entry = self
            .store
            .get(id)
            .cloned()
            .ok_or(CoreError::BookNotFound { id })?;
        let key = self.order_key(&entry)?;

        let mut journal = Journal::default();
        let result = self.apply_remove(&entry, key, &mut journal);
        let edges = self.settle(result, journal)?;
        debug!(%id, edges = edges.len(), "book removed");
        Ok((entry, edges))
    }

    fn apply_remove(
        &mut self,
        entry: &CatalogEntry,
        key: OrderKey,
        journal: &mut Journal,
    ) -> CoreResult<Vec<(BookId, f64)>> {
        let id = entry.id;

        let mut edges = Vec::new();
        if self.graph.contains(id) {
            edges = self.graph.remove_node(id)?;
            journal.record(Step::Unnoded(id, edges.clone()));
        }

        for (field, text) in self.indexed_texts(entry) {
            if self.prefix_mut(&field)?.remove(&text, id) {
                journal.record(Step::Unindexed(field, text, id));
            }
        }

        let found = self.ordered.remove(&key)?;
        journal.record(Step::Unordered(key, found));
        if found != id {
            return Err(CoreError::invariant(format!(
                "ordering key of {id} points at {found}"
            )));
        }

        let removed = self.store.remove(id)?;
        journal.record(Step::Unstored(removed));
        Ok(edges)
    }

    fn replace_entry(&mut self, before: &CatalogEntry, after: CatalogEntry) -> CoreResult<()> {
        after.validate()?;
        let old_key = self.order_key(before)?;
        let new_key = self.order_key(&after)?;
        if new_key != old_key && self.ordered.contains_key(&new_key) {
            return Err(CoreError::duplicate_key(&new_key));
        }

        let mut journal = Journal::default();
        let result = self.apply_replace(before, after, old_key, new_key, &mut journal);
        self.settle(result, journal)?;
        debug!(id = %before.id, "book updated");
        Ok(())
    }

    fn apply_replace(
        &mut self,
        before: &CatalogEntry,
        after: CatalogEntry,
        old_key: OrderKey,
        new_key: OrderKey,
        journal: &mut Journal,
    ) -> CoreResult<()> {
        let id = before.id;
        let old_texts = self.indexed_texts(before);
        let new_texts = self.indexed_texts(&after);

        for (field, text) in old_texts.difference(&new_texts) {
            if self.prefix_mut(field)?.remove(text, id) {
                journal.record(Step::Unindexed(field.clone(), text.clone(), id));
            }
        }

        if new_key != old_key {
            let found = self.ordered.remove(&old_key)?;
            journal.record(Step::Unordered(old_key, found));
            self.ordered.insert(new_key.clone(), id)?;
            journal.record(Step::Ordered(new_key));
        }

        for (field, text) in new_texts.difference(&old_texts) {
            if self.prefix_mut(field)?.insert(text, id) {
                journal.record(Step::Indexed(field.clone(), text.clone(), id));
            }
        }

        let previous = self.store.replace(after)?;
        journal.record(Step::Replaced(previous));
        Ok(())
    }

    /// Passes `result` through, unwinding the journal on error.
    fn settle<T>(&mut self, result: CoreResult<T>, journal: Journal) -> CoreResult<T> {
        if let Err(err) = &result {
            warn!(error = %err, steps = journal.len(), "rolling back partial mutation");
            self.stats.record_rollback();
            for step in journal.unwind() {
                if let Err(step_err) = self.compensate(step) {
                    error!(error = %step_err, "rollback step failed");
                }
            }
        }
        result
    }

    fn compensate(&mut self, step: Step) -> CoreResult<()> {
        match step {
            Step::Stored { id, next_id } => {
                self.store.unstore(id, next_id);
                Ok(())
            }
            Step::Unstored(entry) => self.store.insert(entry),
            Step::Replaced(previous) => self.store.replace(previous).map(drop),
            Step::Ordered(key) => self.ordered.remove(&key).map(drop),
            Step::Unordered(key, id) => self.ordered.insert(key, id),
            Step::Indexed(field, text, id) => {
                self.prefix_mut(&field)?.remove(&text, id);
                Ok(())
            }
            Step::Unindexed(field, text, id) => {
                self.prefix_mut(&field)?.insert(&text, id);
                Ok(())
            }
            Step::Noded(id) => self.graph.remove_node(id).map(drop),
            Step::Unnoded(id, edges) => {
                self.graph.add_node(id);
                for (other, weight) in edges {
                    self.graph.add_edge(id, other, weight)?;
                }
                Ok(())
            }
            Step::Linked { a, b, previous } => match previous {
                Some(weight) => self.graph.add_edge(a, b, weight).map(drop),
                None => self.graph.remove_edge(a, b).map(drop),
            },
        }
    }

    // === Derivation ===

    /// Ordering key for an entry whose id is already resolved.
    pub fn order_key(&self, entry: &CatalogEntry) -> CoreResult<OrderKey> {
        let (name, text) = match &self.config.ordering {
            OrderingField::Id => return Ok(OrderKey::Id(entry.id.as_u64())),
            OrderingField::Title => ("title", Some(entry.title.as_str())),
            OrderingField::Author => ("author", Some(entry.author.as_str())),
            OrderingField::Field(name) => (name.as_str(), entry.field(name)),
        };
        let key = text.map(normalize).unwrap_or_default();
        if key.is_empty() {
            return Err(CoreError::invalid_entry(format!(
                "ordering field `{name}` is missing or blank"
            )));
        }
        Ok(OrderKey::Text(key))
    }

    fn indexed_texts(&self, entry: &CatalogEntry) -> IndexedTexts {
        let mut texts = IndexedTexts::new();
        for field in &self.config.search_fields {
            let Some(raw) = entry.text(field) else {
                continue;
            };
            let whole = normalize(raw);
            if whole.is_empty() {
                continue;
            }
            if self.config.index_word_tokens {
                texts.extend(words(&whole).into_iter().map(|word| (field.clone(), word)));
            }
            texts.insert((field.clone(), whole));
        }
        texts
    }

    fn prefix_mut(&mut self, field: &SearchField) -> CoreResult<&mut PrefixIndex> {
        self.prefixes
            .get_mut(field)
            .ok_or_else(|| CoreError::invariant(format!("no prefix index for `{field}`")))
    }

    /// Edges the link policy creates for a new entry, weights summed per peer.
    fn auto_links(&self, entry: &CatalogEntry) -> Vec<(BookId, f64)> {
        let policy = &self.config.link_policy;
        if !self.config.register_graph_nodes || !policy.is_enabled() {
            return Vec::new();
        }

        let rules = policy
            .same_author
            .map(|weight| (SearchField::Author, weight))
            .into_iter()
            .chain(
                policy
                    .same_field
                    .iter()
                    .map(|(name, weight)| (SearchField::field(name.clone()), *weight)),
            );

        let mut weights: BTreeMap<BookId, f64> = BTreeMap::new();
        for (field, weight) in rules {
            let Some(value) = entry.text(&field) else {
                continue;
            };
            for peer in self.peers(&field, value) {
                if peer != entry.id {
                    *weights.entry(peer).or_insert(0.0) += weight;
                }
            }
        }
        weights.into_iter().collect()
    }

    /// Stored books whose `field` normalizes to the same text as `value`.
    fn peers(&self, field: &SearchField, value: &str) -> Vec<BookId> {
        let target = normalize(value);
        if target.is_empty() {
            return Vec::new();
        }
        let same = |id: &BookId| {
            self.store
                .get(*id)
                .and_then(|entry| entry.text(field))
                .is_some_and(|text| normalize(text) == target)
        };

        // Word tokens share the trie, so exact matches are re-checked.
        match self.prefixes.get(field) {
            Some(index) => index.exact_match(&target).into_iter().filter(same).collect(),
            None => self.store.iter().map(|entry| entry.id).filter(same).collect(),
        }
    }

    // === Verification ===

    /// Checks every structure and their agreement with the store.
    pub fn verify(&self) -> CoreResult<()> {
        self.ordered.check_invariants()?;
        for index in self.prefixes.values() {
            index.check_invariants()?;
        }
        self.graph.check_invariants()?;

        if self.ordered.len() != self.store.len() {
            return Err(CoreError::invariant(format!(
                "balanced index holds {} keys for {} books",
                self.ordered.len(),
                self.store.len()
            )));
        }

        let mut expected: BTreeMap<SearchField, usize> = BTreeMap::new();
        for entry in self.store.iter() {
            let key = self.order_key(entry)?;
            if self.ordered.get(&key) != Some(entry.id) {
                return Err(CoreError::invariant(format!(
                    "{} is not reachable through key {key}",
                    entry.id
                )));
            }

            for (field, text) in self.indexed_texts(entry) {
                if !self.prefix(&field)?.contains(&text, entry.id) {
                    return Err(CoreError::invariant(format!(
                        "{} missing from `{field}` prefix index under {text:?}",
                        entry.id
                    )));
                }
                *expected.entry(field).or_insert(0) += 1;
            }

            if self.config.register_graph_nodes && !self.graph.contains(entry.id) {
                return Err(CoreError::invariant(format!(
                    "{} has no graph node",
                    entry.id
                )));
            }
        }

        for (field, index) in &self.prefixes {
            let want = expected.get(field).copied().unwrap_or(0);
            if index.len() != want {
                return Err(CoreError::invariant(format!(
                    "`{field}` prefix index holds {} pairs, expected {want}",
                    index.len()
                )));
            }
        }

        let want_nodes = if self.config.register_graph_nodes {
            self.store.len()
        } else {
            0
        };
        if self.graph.node_count() != want_nodes {
            return Err(CoreError::invariant(format!(
                "graph holds {} nodes, expected {want_nodes}",
                self.graph.node_count()
            )));
        }
        Ok(())
    }
}

//! Primary store of catalog entries, keyed by id.

use crate::catalog::CatalogEntry;
use crate::error::{CoreError, CoreResult};
use crate::types::BookId;
use std::collections::BTreeMap;

/// Owns every entry. Indexes refer back to it by [`BookId`].
///
/// Ids handed out by [`reserve_id`](Self::reserve_id) only grow, so a
/// removed book's id is not reused for a new one.
#[derive(Debug, Clone)]
pub(crate) struct PrimaryStore {
    entries: BTreeMap<BookId, CatalogEntry>,
    next_id: BookId,
}

impl Default for PrimaryStore {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: BookId::new(1),
        }
    }
}

impl PrimaryStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: BookId) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn next_id(&self) -> BookId {
        self.next_id
    }

    /// Resolves the id a new entry will get without changing the store.
    ///
    /// The largest id is never handed out, since the counter could not
    /// move past it.
    pub fn reserve_id(&self, requested: BookId) -> CoreResult<BookId> {
        let id = if requested.is_unassigned() {
            self.next_id
        } else {
            requested
        };
        if id.next().is_none() {
            return Err(CoreError::invalid_entry(format!("id {id} is out of range")));
        }
        if self.entries.contains_key(&id) {
            return Err(CoreError::DuplicateId { id });
        }
        Ok(id)
    }

    /// Stores an entry whose id was resolved by `reserve_id`.
    pub fn insert(&mut self, entry: CatalogEntry) -> CoreResult<()> {
        let id = entry.id;
        if id.is_unassigned() {
            return Err(CoreError::invariant("storing an entry without an id"));
        }
        if self.entries.contains_key(&id) {
            return Err(CoreError::DuplicateId { id });
        }
        let after = id
            .next()
            .ok_or_else(|| CoreError::invalid_entry(format!("id {id} is out of range")))?;
        if id >= self.next_id {
            self.next_id = after;
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn remove(&mut self, id: BookId) -> CoreResult<CatalogEntry> {
        self.entries
            .remove(&id)
            .ok_or(CoreError::BookNotFound { id })
    }

    /// Undoes an `insert`, restoring the id counter as it was before.
    pub fn unstore(&mut self, id: BookId, next_id: BookId) {
        self.entries.remove(&id);
        self.next_id = next_id;
    }

    /// Swaps in a new version of an existing entry, returning the old one.
    pub fn replace(&mut self, entry: CatalogEntry) -> CoreResult<CatalogEntry> {
        match self.entries.get_mut(&entry.id) {
            Some(slot) => Ok(std::mem::replace(slot, entry)),
            None => Err(CoreError::BookNotFound { id: entry.id }),
        }
    }
}

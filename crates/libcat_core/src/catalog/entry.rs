//! Catalog entry record and partial updates.

use crate::error::{CoreError, CoreResult};
use crate::types::{BookId, SearchField};
use std::collections::BTreeMap;

/// A book record.
///
/// `fields` holds searchable or orderable attributes such as `category`
/// or `isbn`. `metadata` is carried along untouched and never indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Assigned by the engine when left as [`BookId::UNASSIGNED`].
    pub id: BookId,
    /// Title. Must not be blank.
    pub title: String,
    /// Author.
    pub author: String,
    /// Named attributes.
    pub fields: BTreeMap<String, String>,
    /// Opaque metadata.
    pub metadata: BTreeMap<String, String>,
}

impl CatalogEntry {
    /// Creates an entry with an unassigned id.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: BookId::UNASSIGNED,
            title: title.into(),
            author: author.into(),
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = BookId::new(id);
        self
    }

    /// Sets a named field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a metadata value.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a named field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the raw text of a searchable field.
    pub fn text(&self, field: &SearchField) -> Option<&str> {
        match field {
            SearchField::Title => Some(&self.title),
            SearchField::Author => Some(&self.author),
            SearchField::Field(name) => self.field(name),
        }
    }

    /// Rejects entries that can never be indexed.
    pub(crate) fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::invalid_entry("title must not be blank"));
        }
        Ok(())
    }
}

/// Partial update applied by [`Library::update_book`](crate::Library::update_book).
///
/// Unset parts keep their current value. A field set to `None` is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// Field changes.
    pub fields: BTreeMap<String, Option<String>>,
    /// Metadata changes.
    pub metadata: BTreeMap<String, Option<String>>,
}

impl EntryPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets a field.
    #[must_use]
    pub fn set_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), Some(value.into()));
        self
    }

    /// Removes a field.
    #[must_use]
    pub fn remove_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    /// Sets a metadata value.
    #[must_use]
    pub fn set_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), Some(value.into()));
        self
    }

    /// Removes a metadata value.
    #[must_use]
    pub fn remove_metadata(mut self, key: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), None);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.fields.is_empty()
            && self.metadata.is_empty()
    }

    /// Returns a copy of `entry` with the patch applied. The id is kept.
    pub fn apply(&self, entry: &CatalogEntry) -> CatalogEntry {
        let mut next = entry.clone();
        if let Some(title) = &self.title {
            next.title.clone_from(title);
        }
        if let Some(author) = &self.author {
            next.author.clone_from(author);
        }
        merge(&mut next.fields, &self.fields);
        merge(&mut next.metadata, &self.metadata);
        next
    }
}

fn merge(target: &mut BTreeMap<String, String>, changes: &BTreeMap<String, Option<String>>) {
    for (key, change) in changes {
        match change {
            Some(value) => {
                target.insert(key.clone(), value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}

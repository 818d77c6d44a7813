//! JSON catalog file: the persisted form of a [`Library`].
//!
//! ```json
//! {
//!   "books": [{"id": 1, "title": "Dune", "author": "Frank Herbert",
//!              "fields": {"category": "SF"}}],
//!   "links": [{"a": 1, "b": 2, "weight": 0.8}]
//! }
//! ```
//!
//! Books are written in ascending id order and links with `a < b`, so saving
//! the same catalog twice produces identical files.

use crate::error::{CliError, CliResult};
use libcat_core::{BookId, CatalogEntry, Library};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A book as stored on disk and exchanged over the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Book id; 0 or missing asks the engine to assign one.
    #[serde(default)]
    pub id: u64,
    /// Title.
    pub title: String,
    /// Author.
    #[serde(default)]
    pub author: String,
    /// Named fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Opaque metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl From<BookRecord> for CatalogEntry {
    fn from(record: BookRecord) -> Self {
        CatalogEntry {
            id: BookId::new(record.id),
            title: record.title,
            author: record.author,
            fields: record.fields,
            metadata: record.metadata,
        }
    }
}

impl From<&CatalogEntry> for BookRecord {
    fn from(entry: &CatalogEntry) -> Self {
        BookRecord {
            id: entry.id.as_u64(),
            title: entry.title.clone(),
            author: entry.author.clone(),
            fields: entry.fields.clone(),
            metadata: entry.metadata.clone(),
        }
    }
}

/// An edge as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// One endpoint.
    pub a: u64,
    /// The other endpoint.
    pub b: u64,
    /// Similarity weight.
    pub weight: f64,
}

/// Whole-catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Every book.
    #[serde(default)]
    pub books: Vec<BookRecord>,
    /// Every edge.
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl CatalogFile {
    /// Reads a catalog file. A missing file is an empty catalog.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "catalog file missing, starting empty");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| CliError::File {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the catalog through a sibling temp file, then renames it over
    /// `path`, so a crash never leaves a truncated catalog behind.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| CliError::File {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        info!(path = %path.display(), books = self.books.len(), "catalog saved");
        Ok(())
    }

    /// Snapshots a library.
    pub fn from_library(library: &Library) -> Self {
        Self {
            books: library.entries().iter().map(BookRecord::from).collect(),
            links: library
                .links()
                .into_iter()
                .map(|(a, b, weight)| LinkRecord {
                    a: a.as_u64(),
                    b: b.as_u64(),
                    weight,
                })
                .collect(),
        }
    }

    /// Replaces the library's contents with this catalog.
    pub fn restore(self, library: &Library) -> CliResult<()> {
        let books = self.books.len();
        let entries = self.books.into_iter().map(CatalogEntry::from);
        let links = self
            .links
            .into_iter()
            .map(|link| (BookId::new(link.a), BookId::new(link.b), link.weight));
        library.rebuild_with_links(entries, links)?;
        info!(books, "catalog loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> CatalogFile {
        serde_json::from_str(
            r#"{
                "books": [
                    {"id": 1, "title": "Dune", "author": "Frank Herbert",
                     "fields": {"category": "SF"}},
                    {"id": 2, "title": "Solaris", "author": "Stanislaw Lem"},
                    {"title": "Emma"}
                ],
                "links": [{"a": 1, "b": 2, "weight": 0.8}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn missing_fields_default() {
        let file = sample();
        assert_eq!(file.books[2].id, 0);
        assert_eq!(file.books[2].author, "");
        assert!(file.books[1].fields.is_empty());
    }

    #[test]
    fn restore_then_snapshot() {
        let library = Library::default();
        sample().restore(&library).unwrap();

        let snapshot = CatalogFile::from_library(&library);
        assert_eq!(snapshot.books.len(), 3);
        assert_eq!(snapshot.books[2].id, 3);
        assert_eq!(
            snapshot.links,
            vec![LinkRecord {
                a: 1,
                b: 2,
                weight: 0.8
            }]
        );
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        let file = sample();
        file.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(CatalogFile::load(&path).unwrap(), file);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let file = CatalogFile::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(file, CatalogFile::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"books\": [").unwrap();

        let err = CatalogFile::load(&path).unwrap_err();
        assert!(matches!(err, CliError::Format { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}

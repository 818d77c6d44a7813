//! # libcat Core
//!
//! In-memory catalog engine for a library.
//!
//! This crate provides:
//! - [`BalancedIndex`](index::BalancedIndex): AVL tree over the ordering field
//!   for ordered lookups and range scans
//! - [`PrefixIndex`](index::PrefixIndex): trie over normalized text for prefix
//!   search and autocomplete
//! - [`RecommendationGraph`]: weighted undirected graph for related-book
//!   recommendations
//! - [`Library`]: the engine keeping all three consistent with the primary
//!   store, with atomic mutations, undo and cold-start rebuild
//!
//! ## Example
//!
//! ```rust
//! use libcat_core::{CatalogEntry, EngineConfig, Library, LinkPolicy, SearchField};
//!
//! let config = EngineConfig::new()
//!     .search_field(SearchField::field("category"))
//!     .link_policy(LinkPolicy::new().same_field("category", 0.5));
//! let library = Library::new(config).unwrap();
//!
//! let dune = library
//!     .add_book(CatalogEntry::new("Dune", "Frank Herbert").with_field("category", "SF"))
//!     .unwrap();
//! let solaris = library
//!     .add_book(CatalogEntry::new("Solaris", "Stanisław Lem").with_field("category", "sf"))
//!     .unwrap();
//!
//! assert_eq!(library.lookup("dune").unwrap().id, dune);
//! assert_eq!(library.recommend(dune, 3).unwrap()[0].id, solaris);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod engine;
mod error;
pub mod graph;
pub mod index;
mod stats;
mod types;

pub use catalog::{CatalogEntry, EntryPatch};
pub use config::{EngineConfig, LinkPolicy};
pub use engine::{Library, Mutation};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use graph::{Recommendation, RecommendationGraph};
pub use stats::{EngineStats, StatsSnapshot};
pub use types::{BookId, OrderKey, OrderingField, SearchField};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Property-based test generators using proptest.
//!
//! Titles are lowercase ASCII words joined by single spaces, so they are
//! already in normalized form and a reference model can compare them
//! directly. Authors and categories come from small pools so that
//! auto-linking and shared prefixes actually happen.

use libcat_core::{BookId, CatalogEntry, CoreResult, EntryPatch, Library};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use std::collections::BTreeMap;

/// Authors drawn by [`author_strategy`].
pub const AUTHORS: &[&str] = &[
    "Jane Austen",
    "Stanisław Lem",
    "Ursula K. Le Guin",
    "Frank Herbert",
    "Robert Martin",
];

/// Categories drawn by [`category_strategy`].
pub const CATEGORIES: &[&str] = &["Classics", "Fantasy", "Programming", "Science Fiction"];

/// Strategy for normalized titles of one to three words.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-e]{1,6}( [a-e]{1,6}){0,2}").expect("Invalid regex")
}

/// Strategy for an author from [`AUTHORS`].
pub fn author_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(AUTHORS).prop_map(str::to_string)
}

/// Strategy for a category from [`CATEGORIES`].
pub fn category_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(CATEGORIES).prop_map(str::to_string)
}

/// Strategy for an unsaved entry with a `category` field.
pub fn entry_strategy() -> impl Strategy<Value = CatalogEntry> {
    (title_strategy(), author_strategy(), category_strategy()).prop_map(
        |(title, author, category)| {
            CatalogEntry::new(title, author).with_field("category", category)
        },
    )
}

/// Strategy for a catalog whose titles are pairwise distinct.
pub fn catalog_strategy(
    min_books: usize,
    max_books: usize,
) -> impl Strategy<Value = Vec<CatalogEntry>> {
    prop::collection::btree_map(
        title_strategy(),
        (author_strategy(), category_strategy()),
        min_books..max_books,
    )
    .prop_map(|books: BTreeMap<String, (String, String)>| {
        books
            .into_iter()
            .map(|(title, (author, category))| {
                CatalogEntry::new(title, author).with_field("category", category)
            })
            .collect()
    })
}

/// Strategy for edge weights, occasionally invalid.
pub fn weight_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => 0.05f64..1.0,
        1 => Just(0.0),
        1 => Just(-0.5),
    ]
}

/// A catalog mutation with books addressed by slot.
///
/// A slot picks the `slot % len`-th book in id order at the time the
/// operation runs, so any sequence of operations stays meaningful however
/// many books earlier operations left behind. On an empty catalog a slot
/// resolves to an id that does not exist.
#[derive(Debug, Clone)]
pub enum CatalogOp {
    /// Add a book
    Add {
        /// The new entry
        entry: CatalogEntry,
    },
    /// Remove a book
    Remove {
        /// Book slot
        slot: usize,
    },
    /// Retitle and/or recategorize a book
    Update {
        /// Book slot
        slot: usize,
        /// New title
        title: Option<String>,
        /// New category
        category: Option<String>,
    },
    /// Link two books
    Link {
        /// First book slot
        a: usize,
        /// Second book slot
        b: usize,
        /// Edge weight
        weight: f64,
    },
    /// Unlink two books
    Unlink {
        /// First book slot
        a: usize,
        /// Second book slot
        b: usize,
    },
    /// Undo the latest mutation
    Undo,
}

impl CatalogOp {
    /// Runs the operation against `library`.
    ///
    /// # Errors
    ///
    /// Whatever the underlying engine call returns. Rejections are expected
    /// in generated sequences (duplicate titles, self-loops, bad weights).
    pub fn apply(&self, library: &Library) -> CoreResult<()> {
        match self {
            CatalogOp::Add { entry } => library.add_book(entry.clone()).map(drop),
            CatalogOp::Remove { slot } => library.remove_book(resolve(library, *slot)).map(drop),
            CatalogOp::Update {
                slot,
                title,
                category,
            } => {
                let mut patch = EntryPatch::new();
                if let Some(title) = title {
                    patch = patch.title(title.clone());
                }
                if let Some(category) = category {
                    patch = patch.set_field("category", category.clone());
                }
                library.update_book(resolve(library, *slot), &patch).map(drop)
            }
            CatalogOp::Link { a, b, weight } => library
                .link(resolve(library, *a), resolve(library, *b), *weight)
                .map(drop),
            CatalogOp::Unlink { a, b } => library
                .unlink(resolve(library, *a), resolve(library, *b))
                .map(drop),
            CatalogOp::Undo => library.undo().map(drop),
        }
    }
}

/// Maps a slot onto a book id in `library`.
pub fn resolve(library: &Library, slot: usize) -> BookId {
    let entries = library.entries();
    if entries.is_empty() {
        return BookId::new(slot as u64 + 1);
    }
    entries[slot % entries.len()].id
}

/// Strategy for a single catalog operation, weighted towards additions.
pub fn catalog_op_strategy() -> impl Strategy<Value = CatalogOp> {
    let slot = 0usize..64;
    prop_oneof![
        4 => entry_strategy().prop_map(|entry| CatalogOp::Add { entry }),
        2 => slot.clone().prop_map(|slot| CatalogOp::Remove { slot }),
        2 => (
            slot.clone(),
            prop::option::of(title_strategy()),
            prop::option::of(category_strategy()),
        )
            .prop_map(|(slot, title, category)| CatalogOp::Update {
                slot,
                title,
                category,
            }),
        3 => (slot.clone(), slot.clone(), weight_strategy())
            .prop_map(|(a, b, weight)| CatalogOp::Link { a, b, weight }),
        1 => (slot.clone(), slot).prop_map(|(a, b)| CatalogOp::Unlink { a, b }),
        1 => Just(CatalogOp::Undo),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<CatalogOp>> {
    prop::collection::vec(catalog_op_strategy(), min_ops..max_ops)
}

/// Proptest configuration for quick runs.
#[must_use]
pub fn quick_config() -> ProptestConfig {
    ProptestConfig {
        cases: 32,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    }
}

/// Proptest configuration for the main property suites.
#[must_use]
pub fn thorough_config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    }
}

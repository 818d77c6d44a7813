//! Test fixtures and library helpers.
//!
//! Provides convenience functions for setting up libraries and common test
//! scenarios.

use libcat_core::{BookId, CatalogEntry, EngineConfig, Library, LinkPolicy, SearchField};

/// A small catalog of real books, unsaved (ids are assigned on insert).
///
/// Titles are distinct, two authors appear twice and every book carries a
/// `category` and an `isbn` field.
pub fn sample_catalog() -> Vec<CatalogEntry> {
    [
        ("Clean Code", "Robert Martin", "Programming", "9780132350884"),
        ("Clean Architecture", "Robert Martin", "Programming", "9780134494166"),
        ("Refactoring", "Martin Fowler", "Programming", "9780134757599"),
        ("Dune", "Frank Herbert", "Science Fiction", "9780441172719"),
        ("Solaris", "Stanisław Lem", "Science Fiction", "9780156027601"),
        ("The Left Hand of Darkness", "Ursula K. Le Guin", "Science Fiction", "9780441478125"),
        ("A Wizard of Earthsea", "Ursula K. Le Guin", "Fantasy", "9780547773742"),
        ("Emma", "Jane Austen", "Classics", "9780141439587"),
    ]
    .into_iter()
    .map(|(title, author, category, isbn)| {
        CatalogEntry::new(title, author)
            .with_field("category", category)
            .with_field("isbn", isbn)
    })
    .collect()
}

/// Configuration that indexes categories and links books by author and
/// category.
pub fn linked_config() -> EngineConfig {
    EngineConfig::new()
        .search_field(SearchField::field("category"))
        .link_policy(
            LinkPolicy::new()
                .same_author(0.8)
                .same_field("category", 0.3),
        )
}

/// A default library holding [`sample_catalog`].
pub fn sample_library() -> Library {
    library_with(EngineConfig::default(), sample_catalog())
}

/// A [`linked_config`] library holding [`sample_catalog`].
pub fn linked_library() -> Library {
    library_with(linked_config(), sample_catalog())
}

/// A default library holding `count` generated books titled `book 0000`,
/// `book 0001`, and so on, so ids and title order agree.
pub fn populated_library(count: usize) -> Library {
    let books = (0..count).map(|i| CatalogEntry::new(format!("book {i:04}"), "Anonymous"));
    library_with(EngineConfig::default(), books)
}

/// Builds a library from `config` and adds `entries` in order.
///
/// # Panics
///
/// Panics if the config is invalid or an entry is rejected.
pub fn library_with(
    config: EngineConfig,
    entries: impl IntoIterator<Item = CatalogEntry>,
) -> Library {
    let library = Library::new(config).expect("Invalid fixture config");
    for entry in entries {
        library.add_book(entry).expect("Fixture entry rejected");
    }
    library
}

/// Runs a test with a fresh sample library.
///
/// # Example
///
/// ```rust
/// use libcat_testkit::with_sample_library;
///
/// with_sample_library(|library| {
///     assert_eq!(library.search("clean").len(), 2);
/// });
/// ```
pub fn with_sample_library<F, R>(f: F) -> R
where
    F: FnOnce(&Library) -> R,
{
    let library = sample_library();
    f(&library)
}

/// Returns the ids of `library` in ascending order.
pub fn ids(library: &Library) -> Vec<BookId> {
    library.entries().into_iter().map(|entry| entry.id).collect()
}

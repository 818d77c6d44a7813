//! Benchmark utilities.

use libcat_core::{BookId, CatalogEntry, EngineConfig, Library, LinkPolicy, SearchField};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const SYLLABLES: &[&str] = &[
    "ka", "lo", "mi", "ra", "ten", "sho", "vel", "dor", "an", "is", "quo", "ber",
];

const CATEGORIES: &[&str] = &["fiction", "history", "poetry", "science", "travel"];

/// Seeded generator so runs are comparable.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x11b_ca7)
}

/// Generate a random word of two to four syllables.
pub fn random_word(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(2..=4);
    (0..len)
        .filter_map(|_| SYLLABLES.choose(rng).copied())
        .collect()
}

/// Generate `count` books with distinct titles.
///
/// The position is appended to every title, so titles never collide.
/// Authors come from a pool of `count / 8` names, so each author has about
/// eight books for the link policy to match.
pub fn generate_books(count: usize, rng: &mut impl Rng) -> Vec<CatalogEntry> {
    let authors: Vec<String> = (0..(count / 8).max(1))
        .map(|_| format!("{} {}", random_word(rng), random_word(rng)))
        .collect();

    (0..count)
        .map(|i| {
            let title = format!("{} {} {i}", random_word(rng), random_word(rng));
            let author = authors[rng.gen_range(0..authors.len())].clone();
            let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            CatalogEntry::new(title, author).with_field("category", category)
        })
        .collect()
}

/// Configuration with a category index and same-author auto-links.
///
/// Categories are indexed but not linked on; with five categories that would
/// make the graph nearly complete.
pub fn linked_config() -> EngineConfig {
    EngineConfig::new()
        .search_field(SearchField::field("category"))
        .link_policy(LinkPolicy::new().same_author(0.7))
}

/// A library holding `count` generated books.
pub fn library(config: EngineConfig, count: usize) -> Library {
    let library = Library::new(config).unwrap();
    library.rebuild_from(generate_books(count, &mut rng())).unwrap();
    library
}

/// Random ids of books in a library of `count` books.
pub fn random_ids(count: usize, samples: usize, rng: &mut impl Rng) -> Vec<BookId> {
    (0..samples)
        .map(|_| BookId::new(rng.gen_range(1..=count as u64)))
        .collect()
}

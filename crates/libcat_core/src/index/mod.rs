//! Index structures for catalog access paths.
//!
//! Indexes hold keys and book ids only; the entries themselves live in the
//! engine's primary store. Indexes are:
//! - Maintained by the engine, never mutated directly by callers
//! - Fully derivable from the stored entries
//!
//! # Index Types
//!
//! - [`BalancedIndex`]: ordered lookups and range scans (AVL tree)
//! - [`PrefixIndex`]: prefix search and autocomplete (trie)
//!
//! Both go through [`normalize`](normalize::normalize) for text keys.

mod balanced;
pub mod normalize;
mod prefix;

pub use balanced::{BalancedIndex, RangeScan};
pub use prefix::PrefixIndex;

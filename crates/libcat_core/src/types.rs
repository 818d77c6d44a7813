//! Core type definitions for libcat.

use crate::index::normalize::normalize;
use std::fmt;

/// Unique identifier for a catalog entry.
///
/// Book IDs are:
/// - Unique within a catalog
/// - Immutable once assigned
/// - Ordered numerically (used as the deterministic tie-break order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookId(pub u64);

impl BookId {
    /// Placeholder asking the engine to assign the next free id.
    pub const UNASSIGNED: BookId = BookId(0);

    /// Creates a new book ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true if this is the unassigned placeholder.
    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        self.0 == 0
    }

    /// Returns the next book ID, or `None` for the largest one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book:{}", self.0)
    }
}

impl From<u64> for BookId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Key stored in the balanced index.
///
/// Text keys hold the normalized form of the ordering field, so two titles
/// that differ only by case or accents collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderKey {
    /// Numeric key (ordering by book id).
    Id(u64),
    /// Normalized text key.
    Text(String),
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::Id(id) => write!(f, "{id}"),
            OrderKey::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl From<u64> for OrderKey {
    fn from(id: u64) -> Self {
        OrderKey::Id(id)
    }
}

impl From<BookId> for OrderKey {
    fn from(id: BookId) -> Self {
        OrderKey::Id(id.0)
    }
}

impl From<&str> for OrderKey {
    /// Builds a text key from raw input, normalizing it.
    fn from(text: &str) -> Self {
        OrderKey::Text(normalize(text))
    }
}

impl From<String> for OrderKey {
    fn from(text: String) -> Self {
        OrderKey::from(text.as_str())
    }
}

/// Field used to order entries in the balanced index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderingField {
    /// Order by book id.
    Id,
    /// Order by title.
    Title,
    /// Order by author.
    Author,
    /// Order by a named field (e.g. `call_number`).
    Field(String),
}

impl OrderingField {
    /// Parses `id`, `title`, `author` or `field:<name>`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(OrderingField::Id),
            "title" => Some(OrderingField::Title),
            "author" => Some(OrderingField::Author),
            other => other
                .strip_prefix("field:")
                .filter(|name| !name.is_empty())
                .map(|name| OrderingField::Field(name.to_string())),
        }
    }
}

impl fmt::Display for OrderingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingField::Id => f.write_str("id"),
            OrderingField::Title => f.write_str("title"),
            OrderingField::Author => f.write_str("author"),
            OrderingField::Field(name) => write!(f, "field:{name}"),
        }
    }
}

/// Text field covered by a prefix index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchField {
    /// The title.
    Title,
    /// The author.
    Author,
    /// A named field (e.g. `category`, `isbn`).
    Field(String),
}

impl SearchField {
    /// Parses `title`, `author` or any other name as a named field.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "title" => SearchField::Title,
            "author" => SearchField::Author,
            other => SearchField::Field(other.to_string()),
        }
    }

    /// Convenience constructor for a named field.
    pub fn field(name: impl Into<String>) -> Self {
        SearchField::Field(name.into())
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchField::Title => f.write_str("title"),
            SearchField::Author => f.write_str("author"),
            SearchField::Field(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_id_ordering() {
        assert!(BookId::new(1) < BookId::new(2));
        assert_eq!(BookId::new(5).next(), Some(BookId::new(6)));
        assert_eq!(BookId::new(u64::MAX).next(), None);
    }

    #[test]
    fn unassigned_placeholder() {
        assert!(BookId::UNASSIGNED.is_unassigned());
        assert!(!BookId::new(3).is_unassigned());
    }

    #[test]
    fn book_id_display() {
        assert_eq!(format!("{}", BookId::new(42)), "book:42");
    }

    #[test]
    fn order_key_variants_sort_within_kind() {
        assert!(OrderKey::Id(3) < OrderKey::Id(10));
        assert!(OrderKey::Text("abc".into()) < OrderKey::Text("abd".into()));
    }

    #[test]
    fn text_keys_are_normalized() {
        assert_eq!(OrderKey::from("  Clean   CODE "), OrderKey::Text("clean code".into()));
        assert_eq!(OrderKey::from("Café"), OrderKey::from("cafe"));
    }

    #[test]
    fn ordering_field_parse() {
        assert_eq!(OrderingField::parse("id"), Some(OrderingField::Id));
        assert_eq!(OrderingField::parse("title"), Some(OrderingField::Title));
        assert_eq!(
            OrderingField::parse("field:call_number"),
            Some(OrderingField::Field("call_number".into()))
        );
        assert_eq!(OrderingField::parse("field:"), None);
        assert_eq!(OrderingField::parse("shelf"), None);
    }

    #[test]
    fn search_field_parse_roundtrips_display() {
        for name in ["title", "author", "category"] {
            assert_eq!(SearchField::parse(name).to_string(), name);
        }
    }
}

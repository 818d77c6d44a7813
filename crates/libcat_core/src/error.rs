//! Error types for libcat core.

use crate::types::BookId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
///
/// External request layers map these onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A key, id or edge is absent.
    NotFound,
    /// An ordering key or id collides with an existing entry.
    DuplicateKey,
    /// A non-positive or non-finite edge weight.
    InvalidWeight,
    /// Malformed input (entry, config, self-loop, empty undo log).
    InvalidInput,
    /// An internal consistency check failed. Signals an engine defect.
    Internal,
}

/// Errors that can occur in libcat core operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Book not present in the catalog.
    #[error("book not found: {id}")]
    BookNotFound {
        /// The id that was not found.
        id: BookId,
    },

    /// Ordering key not present in the balanced index.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// Rendered key.
        key: String,
    },

    /// Node not present in the recommendation graph.
    #[error("graph node not found: {id}")]
    NodeNotFound {
        /// The missing node.
        id: BookId,
    },

    /// Edge not present in the recommendation graph.
    #[error("edge not found: {from} -- {to}")]
    EdgeNotFound {
        /// One endpoint.
        from: BookId,
        /// The other endpoint.
        to: BookId,
    },

    /// Ordering key collides with an existing entry.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// Rendered key.
        key: String,
    },

    /// Book id collides with an existing entry.
    #[error("duplicate book id: {id}")]
    DuplicateId {
        /// The colliding id.
        id: BookId,
    },

    /// Edge weight is not a finite positive number.
    #[error("invalid edge weight: {weight}")]
    InvalidWeight {
        /// The rejected weight.
        weight: f64,
    },

    /// Edge from a node to itself.
    #[error("self-loop on {id} is not allowed")]
    SelfLoop {
        /// The node.
        id: BookId,
    },

    /// Entry is malformed (blank title, missing ordering field).
    #[error("invalid entry: {message}")]
    InvalidEntry {
        /// Description of the problem.
        message: String,
    },

    /// Engine configuration is inconsistent.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Search on a field that has no prefix index.
    #[error("field is not indexed: {field}")]
    FieldNotIndexed {
        /// The requested field.
        field: String,
    },

    /// Graph operation attempted with graph registration disabled.
    #[error("recommendation graph is disabled")]
    GraphDisabled,

    /// Undo requested with an empty undo log.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Internal structure check failed.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },
}

impl CoreError {
    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl std::fmt::Display) -> Self {
        Self::KeyNotFound {
            key: key.to_string(),
        }
    }

    /// Creates a duplicate-key error.
    pub fn duplicate_key(key: impl std::fmt::Display) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }

    /// Creates an invalid entry error.
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookNotFound { .. }
            | Self::KeyNotFound { .. }
            | Self::NodeNotFound { .. }
            | Self::EdgeNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateKey { .. } | Self::DuplicateId { .. } => ErrorKind::DuplicateKey,
            Self::InvalidWeight { .. } => ErrorKind::InvalidWeight,
            Self::SelfLoop { .. }
            | Self::InvalidEntry { .. }
            | Self::InvalidConfig { .. }
            | Self::FieldNotIndexed { .. }
            | Self::GraphDisabled
            | Self::NothingToUndo => ErrorKind::InvalidInput,
            Self::InvariantViolation { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true for errors that indicate an engine defect.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            CoreError::BookNotFound { id: BookId::new(1) }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::DuplicateId { id: BookId::new(1) }.kind(),
            ErrorKind::DuplicateKey
        );
        assert_eq!(
            CoreError::InvalidWeight { weight: -1.0 }.kind(),
            ErrorKind::InvalidWeight
        );
        assert_eq!(CoreError::NothingToUndo.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn only_invariant_violation_is_internal() {
        assert!(CoreError::invariant("height mismatch").is_internal());
        assert!(!CoreError::duplicate_key("x").is_internal());
        assert!(!CoreError::key_not_found("x").is_internal());
    }

    #[test]
    fn display_messages() {
        let err = CoreError::EdgeNotFound {
            from: BookId::new(1),
            to: BookId::new(2),
        };
        assert_eq!(err.to_string(), "edge not found: book:1 -- book:2");
        assert_eq!(
            CoreError::duplicate_key("\"clean code\"").to_string(),
            "duplicate key: \"clean code\""
        );
    }
}

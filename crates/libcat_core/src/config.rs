//! Engine configuration.

use crate::error::{CoreError, CoreResult};
use crate::types::{OrderingField, SearchField};

/// Weights used to link a newly added book to books it shares values with.
///
/// When several rules match the same pair, their weights are summed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPolicy {
    /// Weight for books by the same author (normalized comparison).
    pub same_author: Option<f64>,
    /// Weight per named field (e.g. `category`) for books sharing its value.
    pub same_field: Vec<(String, f64)>,
}

impl LinkPolicy {
    /// Creates a policy that links nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links books by the same author.
    #[must_use]
    pub fn same_author(mut self, weight: f64) -> Self {
        self.same_author = Some(weight);
        self
    }

    /// Links books sharing the value of `field`.
    #[must_use]
    pub fn same_field(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.same_field.push((field.into(), weight));
        self
    }

    /// Returns true if any rule is set.
    pub fn is_enabled(&self) -> bool {
        self.same_author.is_some() || !self.same_field.is_empty()
    }

    fn validate(&self) -> CoreResult<()> {
        let weights = self
            .same_author
            .iter()
            .copied()
            .chain(self.same_field.iter().map(|(_, w)| *w));
        for weight in weights {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(CoreError::invalid_config(format!(
                    "link weight {weight} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for a [`Library`](crate::Library).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Field that keys the balanced index.
    pub ordering: OrderingField,

    /// Fields that get a prefix index.
    pub search_fields: Vec<SearchField>,

    /// Whether each word of a field is indexed on its own as well.
    pub index_word_tokens: bool,

    /// Whether every book gets a recommendation graph node.
    pub register_graph_nodes: bool,

    /// Automatic linking of related books on insertion.
    pub link_policy: LinkPolicy,

    /// Whether `recommend` falls back to second-degree neighbors.
    pub second_degree_fallback: bool,

    /// Number of undo records kept (0 disables undo).
    pub undo_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingField::Title,
            search_fields: vec![SearchField::Title, SearchField::Author],
            index_word_tokens: false,
            register_graph_nodes: true,
            link_policy: LinkPolicy::default(),
            second_degree_fallback: true,
            undo_depth: 16,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordering field.
    #[must_use]
    pub fn ordering(mut self, field: OrderingField) -> Self {
        self.ordering = field;
        self
    }

    /// Replaces the searchable fields.
    #[must_use]
    pub fn search_fields(mut self, fields: impl IntoIterator<Item = SearchField>) -> Self {
        self.search_fields = fields.into_iter().collect();
        self
    }

    /// Adds a searchable field.
    #[must_use]
    pub fn search_field(mut self, field: SearchField) -> Self {
        if !self.search_fields.contains(&field) {
            self.search_fields.push(field);
        }
        self
    }

    /// Sets word-level prefix indexing.
    #[must_use]
    pub const fn index_word_tokens(mut self, value: bool) -> Self {
        self.index_word_tokens = value;
        self
    }

    /// Sets whether books get graph nodes.
    #[must_use]
    pub const fn register_graph_nodes(mut self, value: bool) -> Self {
        self.register_graph_nodes = value;
        self
    }

    /// Sets the auto-link policy.
    #[must_use]
    pub fn link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    /// Sets second-degree fallback for recommendations.
    #[must_use]
    pub const fn second_degree_fallback(mut self, value: bool) -> Self {
        self.second_degree_fallback = value;
        self
    }

    /// Sets the undo depth.
    #[must_use]
    pub const fn undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth;
        self
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a link weight is not positive, a field
    /// name is blank, or linking is requested without graph nodes.
    pub fn validate(&self) -> CoreResult<()> {
        self.link_policy.validate()?;

        if self.link_policy.is_enabled() && !self.register_graph_nodes {
            return Err(CoreError::invalid_config(
                "link policy requires register_graph_nodes",
            ));
        }

        let blank_field = self
            .search_fields
            .iter()
            .any(|f| matches!(f, SearchField::Field(name) if name.trim().is_empty()))
            || matches!(&self.ordering, OrderingField::Field(name) if name.trim().is_empty());
        if blank_field {
            return Err(CoreError::invalid_config("field names must not be blank"));
        }
        Ok(())
    }
}

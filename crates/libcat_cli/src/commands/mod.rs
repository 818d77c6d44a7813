//! CLI command implementations.

pub mod export;
pub mod inspect;
pub mod lookup;
pub mod recommend;
pub mod search;
pub mod serve;

use crate::catalog_file::CatalogFile;
use crate::error::{CliError, CliResult};
use clap::Args;
use libcat_core::{EngineConfig, Library, LinkPolicy, OrderingField, SearchField};
use std::path::{Path, PathBuf};

/// Options shared by every command: where the catalog lives and how the
/// engine is configured.
#[derive(Args, Debug, Clone)]
pub struct CatalogOptions {
    /// Path to the catalog JSON file
    #[arg(global = true, short, long)]
    pub catalog: Option<PathBuf>,

    /// Ordering field: id, title, author or field:<name>
    #[arg(global = true, long, default_value = "title", value_parser = parse_ordering)]
    pub order_by: OrderingField,

    /// Extra searchable field (repeatable)
    #[arg(global = true, long = "search-field")]
    pub search_fields: Vec<String>,

    /// Also index each word so prefixes match inside titles
    #[arg(global = true, long)]
    pub word_tokens: bool,

    /// Auto-link books by the same author with this weight
    #[arg(global = true, long)]
    pub link_author: Option<f64>,

    /// Auto-link books sharing a field value, as <name>=<weight> (repeatable)
    #[arg(global = true, long, value_parser = parse_field_weight)]
    pub link_field: Vec<(String, f64)>,
}

impl CatalogOptions {
    /// Builds the engine configuration.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new()
            .ordering(self.order_by.clone())
            .index_word_tokens(self.word_tokens);
        for name in &self.search_fields {
            config = config.search_field(SearchField::parse(name));
        }

        let mut policy = LinkPolicy::new();
        if let Some(weight) = self.link_author {
            policy = policy.same_author(weight);
        }
        for (name, weight) in &self.link_field {
            policy = policy.same_field(name.clone(), *weight);
        }
        config.link_policy(policy)
    }

    /// Creates a library and loads the catalog file, if one is given.
    pub fn open(&self) -> CliResult<Library> {
        let library = Library::new(self.engine_config())?;
        if let Some(path) = &self.catalog {
            CatalogFile::load(path)?.restore(&library)?;
        }
        Ok(library)
    }

    /// The catalog path, for commands that cannot work without one.
    pub fn require_catalog(&self, command: &str) -> CliResult<&Path> {
        self.catalog
            .as_deref()
            .ok_or_else(|| CliError::Usage(format!("--catalog is required for {command}")))
    }
}

fn parse_ordering(value: &str) -> Result<OrderingField, String> {
    OrderingField::parse(value)
        .ok_or_else(|| format!("expected id, title, author or field:<name>, got `{value}`"))
}

fn parse_field_weight(value: &str) -> Result<(String, f64), String> {
    let (name, weight) = value
        .split_once('=')
        .ok_or_else(|| format!("expected <name>=<weight>, got `{value}`"))?;
    let weight: f64 = weight
        .parse()
        .map_err(|_| format!("invalid weight `{weight}`"))?;
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok((name.to_string(), weight))
}

/// Output format for one-shot commands.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

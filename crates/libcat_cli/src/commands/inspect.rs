//! Inspect command implementation.

use crate::commands::{CatalogOptions, Format};
use crate::error::CliResult;
use libcat_core::{Library, StatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Catalog inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Catalog path, if any.
    pub path: Option<String>,
    /// Ordering field.
    pub ordering: String,
    /// Number of books.
    pub books: u64,
    /// Height of the balanced index.
    pub index_height: u64,
    /// (text, id) pairs across prefix indexes.
    pub prefix_entries: u64,
    /// Recommendation graph nodes.
    pub graph_nodes: u64,
    /// Recommendation graph edges.
    pub graph_edges: u64,
    /// Books per value of a field (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<BTreeMap<String, usize>>,
    /// `None` when every structure checks out, else the first problem.
    pub problem: Option<String>,
}

impl InspectResult {
    fn collect(library: &Library, path: Option<String>, histogram_field: Option<&str>) -> Self {
        let StatsSnapshot {
            books,
            index_height,
            prefix_entries,
            graph_nodes,
            graph_edges,
            ..
        } = library.stats();

        Self {
            path,
            ordering: library.config().ordering.to_string(),
            books,
            index_height,
            prefix_entries,
            graph_nodes,
            graph_edges,
            histogram: histogram_field.map(|field| histogram(library, field)),
            problem: library.verify().err().map(|err| err.to_string()),
        }
    }
}

/// Runs the inspect command.
///
/// Returns `Ok(false)` when verification found a problem, so the caller can
/// exit non-zero.
pub fn run(options: &CatalogOptions, field: Option<&str>, format: Format) -> CliResult<bool> {
    let library = options.open()?;
    let path = options.catalog.as_ref().map(|p| p.display().to_string());
    let result = InspectResult::collect(&library, path, field);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(result.problem.is_none())
}

fn histogram(library: &Library, field: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in library.entries() {
        let value = match field {
            "author" => Some(entry.author),
            other => entry.fields.get(other).cloned(),
        };
        *counts
            .entry(value.unwrap_or_else(|| "(none)".to_string()))
            .or_insert(0) += 1;
    }
    counts
}

fn print_text_output(result: &InspectResult) {
    println!("libcat Catalog Inspection");
    println!("=========================");
    println!();
    if let Some(path) = &result.path {
        println!("Path: {path}");
        println!();
    }
    println!("Catalog:");
    println!("  Books:          {}", result.books);
    println!("  Ordered by:     {}", result.ordering);
    println!();
    println!("Indexes:");
    println!("  Tree height:    {}", result.index_height);
    println!("  Prefix entries: {}", result.prefix_entries);
    println!();
    println!("Graph:");
    println!("  Nodes:          {}", result.graph_nodes);
    println!("  Edges:          {}", result.graph_edges);

    if let Some(histogram) = &result.histogram {
        println!();
        println!("Distribution:");
        for (value, count) in histogram {
            println!("  {value}: {count}");
        }
    }

    println!();
    match &result.problem {
        None => println!("Verification: OK"),
        Some(problem) => println!("Verification: FAILED ({problem})"),
    }
}

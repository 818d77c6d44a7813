//! Lookup command: find books by ordering key or key range.

use crate::commands::search::print_entries;
use crate::commands::{CatalogOptions, Format};
use crate::error::CliResult;
use libcat_core::{OrderKey, OrderingField};

/// Runs the lookup command. With `to`, prints every book in `[key, to]`.
pub fn run(options: &CatalogOptions, key: &str, to: Option<&str>, format: Format) -> CliResult<()> {
    let library = options.open()?;
    let key = parse_key(&options.order_by, key);

    let entries = match to {
        Some(high) => library.range(key, parse_key(&options.order_by, high)),
        None => vec![library.lookup(key)?],
    };
    print_entries(&entries, format)
}

/// Reads a key for the configured ordering: numeric for id ordering.
fn parse_key(ordering: &OrderingField, raw: &str) -> OrderKey {
    match (ordering, raw.trim().parse::<u64>()) {
        (OrderingField::Id, Ok(id)) => OrderKey::Id(id),
        _ => OrderKey::from(raw),
    }
}

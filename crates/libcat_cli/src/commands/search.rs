//! Search command: prefix search or autocomplete over the catalog.

use crate::catalog_file::BookRecord;
use crate::commands::{CatalogOptions, Format};
use crate::error::CliResult;
use libcat_core::{CatalogEntry, SearchField};

/// Runs the search command.
pub fn run(
    options: &CatalogOptions,
    query: &str,
    field: Option<&str>,
    complete: Option<usize>,
    format: Format,
) -> CliResult<()> {
    let library = options.open()?;

    if let Some(limit) = complete {
        let field = SearchField::parse(field.unwrap_or("title"));
        let suggestions = library.autocomplete(&field, query, limit)?;
        match format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&suggestions)?),
            Format::Text => {
                for suggestion in suggestions {
                    println!("{suggestion}");
                }
            }
        }
        return Ok(());
    }

    let entries = match field {
        Some(name) => library.search_field(&SearchField::parse(name), query)?,
        None => library.search(query),
    };
    print_entries(&entries, format)
}

/// Prints entries as a table or a JSON array.
pub fn print_entries(entries: &[CatalogEntry], format: Format) -> CliResult<()> {
    match format {
        Format::Json => {
            let records: Vec<BookRecord> = entries.iter().map(BookRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Format::Text => {
            if entries.is_empty() {
                println!("No books found.");
            }
            for entry in entries {
                println!("{:>6}  {}  ({})", entry.id.as_u64(), entry.title, entry.author);
            }
        }
    }
    Ok(())
}

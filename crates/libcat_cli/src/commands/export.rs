//! Export command: write the normalized catalog back out.
//!
//! Loading and re-exporting assigns ids to books that had none, applies the
//! link policy and drops nothing else, so the output is a canonical copy.

use crate::catalog_file::CatalogFile;
use crate::commands::CatalogOptions;
use crate::error::CliResult;
use std::path::Path;

/// Runs the export command. Without `output`, prints to stdout.
pub fn run(options: &CatalogOptions, output: Option<&Path>) -> CliResult<()> {
    options.require_catalog("export")?;
    let library = options.open()?;
    let file = CatalogFile::from_library(&library);

    match output {
        Some(path) => file.save(path)?,
        None => println!("{}", serde_json::to_string_pretty(&file)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcat_core::OrderingField;
    use std::fs;

    #[test]
    fn export_assigns_ids_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        fs::write(
            &input,
            r#"{"books": [
                {"title": "Emma", "author": "Jane Austen"},
                {"title": "Persuasion", "author": "jane austen"}
            ]}"#,
        )
        .unwrap();

        let options = CatalogOptions {
            catalog: Some(input),
            order_by: OrderingField::Title,
            search_fields: Vec::new(),
            word_tokens: false,
            link_author: Some(0.5),
            link_field: Vec::new(),
        };
        run(&options, Some(&output)).unwrap();

        let exported = CatalogFile::load(&output).unwrap();
        let ids: Vec<u64> = exported.books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(exported.links.len(), 1);
        assert_eq!(exported.links[0].weight, 0.5);
    }
}

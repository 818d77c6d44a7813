//! Recommend command.

use crate::commands::{CatalogOptions, Format};
use crate::error::{CliError, CliResult};
use libcat_core::{BookId, Library, Recommendation};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Row {
    id: u64,
    title: Option<String>,
    score: f64,
    degree: u8,
}

/// Runs the recommend command.
///
/// One id asks for books related to it; several ids ask for books related
/// to all of them (personalized recommendations).
pub fn run(options: &CatalogOptions, ids: &[u64], limit: usize, format: Format) -> CliResult<()> {
    let library = options.open()?;
    let recs = recommend(&library, ids, limit)?;

    let rows: Vec<Row> = recs
        .iter()
        .map(|rec| Row {
            id: rec.id.as_u64(),
            title: library.get(rec.id).map(|entry| entry.title),
            score: rec.score,
            degree: rec.degree,
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Text => {
            if rows.is_empty() {
                println!("No recommendations.");
            }
            for row in rows {
                println!(
                    "{:>6}  {:<40}  {:.3}  (degree {})",
                    row.id,
                    row.title.unwrap_or_default(),
                    row.score,
                    row.degree
                );
            }
        }
    }
    Ok(())
}

fn recommend(library: &Library, ids: &[u64], limit: usize) -> CliResult<Vec<Recommendation>> {
    match ids {
        [] => Err(CliError::Usage("at least one book id is required".into())),
        [id] => Ok(library.recommend(BookId::new(*id), limit)?),
        seeds => {
            let seeds: Vec<BookId> = seeds.iter().copied().map(BookId::new).collect();
            Ok(library.recommend_for(&seeds, limit)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcat_core::CatalogEntry;

    #[test]
    fn single_and_multiple_seeds() {
        let library = Library::default();
        let ids: Vec<BookId> = ["A", "B", "C"]
            .iter()
            .map(|t| library.add_book(CatalogEntry::new(*t, "x")).unwrap())
            .collect();
        library.link(ids[0], ids[1], 0.5).unwrap();
        library.link(ids[1], ids[2], 0.5).unwrap();

        let single = recommend(&library, &[ids[0].as_u64()], 1).unwrap();
        assert_eq!(single[0].id, ids[1]);

        let seeds = [ids[0].as_u64(), ids[2].as_u64()];
        let multi = recommend(&library, &seeds, 5).unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].id, ids[1]);
        assert!((multi[0].score - 1.0).abs() < 1e-12);

        assert!(matches!(
            recommend(&library, &[], 5),
            Err(CliError::Usage(_))
        ));
    }
}

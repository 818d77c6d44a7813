//! Line-delimited JSON request/response protocol.
//!
//! Each request is one JSON object with an `action` tag; each response is
//! one JSON object `{"success", "message"?, "error"?, "data"?}`. Engine
//! defects are tagged `"error": "internal"` so callers can tell them apart
//! from bad input.

use crate::catalog_file::BookRecord;
use libcat_core::{
    BookId, CatalogEntry, CoreError, EntryPatch, ErrorKind, Library, Mutation, OrderKey,
    Recommendation, SearchField,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn default_limit() -> usize {
    5
}

fn default_recommendation_limit() -> usize {
    6
}

fn default_field() -> String {
    "title".to_string()
}

/// An ordering key: a number for id ordering, text otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyParam {
    /// Numeric key.
    Id(u64),
    /// Text key, normalized by the engine.
    Text(String),
}

impl From<KeyParam> for OrderKey {
    fn from(key: KeyParam) -> Self {
        match key {
            KeyParam::Id(id) => OrderKey::Id(id),
            KeyParam::Text(text) => OrderKey::from(text),
        }
    }
}

/// A client request.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Add a book.
    AddBook {
        /// The book to add.
        book: BookRecord,
    },
    /// Remove a book.
    RemoveBook {
        /// Book id.
        id: u64,
    },
    /// Patch a book. Fields or metadata set to `null` are removed.
    UpdateBook {
        /// Book id.
        id: u64,
        /// New title.
        #[serde(default)]
        title: Option<String>,
        /// New author.
        #[serde(default)]
        author: Option<String>,
        /// Field changes.
        #[serde(default)]
        fields: BTreeMap<String, Option<String>>,
        /// Metadata changes.
        #[serde(default)]
        metadata: BTreeMap<String, Option<String>>,
    },
    /// Fetch a book by id.
    Get {
        /// Book id.
        id: u64,
    },
    /// Fetch a book by ordering key.
    Lookup {
        /// The key.
        key: KeyParam,
    },
    /// Books with ordering keys in `[low, high]`.
    Range {
        /// Lower bound.
        low: KeyParam,
        /// Upper bound.
        high: KeyParam,
    },
    /// Prefix search, across all search fields or one.
    Search {
        /// The prefix.
        query: String,
        /// Restrict to this field.
        #[serde(default, alias = "type")]
        field: Option<String>,
    },
    /// Suggest completions for a prefix.
    Autocomplete {
        /// The prefix.
        prefix: String,
        /// Field to complete.
        #[serde(default = "default_field")]
        field: String,
        /// Maximum suggestions.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Books related to one book.
    Recommendations {
        /// Book id.
        id: u64,
        /// Maximum results.
        #[serde(default = "default_recommendation_limit")]
        limit: usize,
    },
    /// Books related to a set of recently viewed books.
    PersonalizedRecommendations {
        /// Seed book ids.
        seeds: Vec<u64>,
        /// Maximum results.
        #[serde(default = "default_recommendation_limit")]
        limit: usize,
    },
    /// Create or re-weight an edge.
    Link {
        /// One book.
        a: u64,
        /// The other book.
        b: u64,
        /// Similarity weight.
        weight: f64,
    },
    /// Remove an edge.
    Unlink {
        /// One book.
        a: u64,
        /// The other book.
        b: u64,
    },
    /// Revert the last mutation.
    Undo,
    /// Engine statistics.
    Stats,
}

impl Request {
    /// Returns true for requests that change the catalog.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::AddBook { .. }
                | Request::RemoveBook { .. }
                | Request::UpdateBook { .. }
                | Request::Link { .. }
                | Request::Unlink { .. }
                | Request::Undo
        )
    }
}

/// A response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error class on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    /// A successful response.
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data,
        }
    }

    /// A response for an engine error.
    pub fn from_error(err: &CoreError) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            error: Some(error_tag(err.kind())),
            data: None,
        }
    }

    /// A response for a line that is not a valid request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: Some("bad_request"),
            data: None,
        }
    }
}

fn error_tag(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::DuplicateKey => "duplicate_key",
        ErrorKind::InvalidWeight => "invalid_weight",
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::Internal => "internal",
    }
}

/// Parses one request line and executes it.
pub fn handle_line(library: &Library, line: &str) -> Response {
    match parse_line(line) {
        Ok(request) => handle(library, request),
        Err(rejected) => rejected,
    }
}

/// Parses one request line, or returns the response rejecting it.
pub fn parse_line(line: &str) -> Result<Request, Response> {
    serde_json::from_str::<Request>(line)
        .map_err(|err| Response::bad_request(format!("invalid request: {err}")))
}

/// Executes a request.
pub fn handle(library: &Library, request: Request) -> Response {
    match execute(library, request) {
        Ok((message, data)) => Response::ok(message, data),
        Err(err) => Response::from_error(&err),
    }
}

type Outcome = Result<(String, Option<Value>), CoreError>;

fn execute(library: &Library, request: Request) -> Outcome {
    match request {
        Request::AddBook { book } => {
            let id = library.add_book(CatalogEntry::from(book))?;
            Ok((format!("added {id}"), Some(json!({ "id": id.as_u64() }))))
        }
        Request::RemoveBook { id } => {
            let entry = library.remove_book(BookId::new(id))?;
            Ok((format!("removed {}", entry.id), Some(book_json(&entry))))
        }
        Request::UpdateBook {
            id,
            title,
            author,
            fields,
            metadata,
        } => {
            let patch = EntryPatch {
                title,
                author,
                fields,
                metadata,
            };
            let entry = library.update_book(BookId::new(id), &patch)?;
            Ok((format!("updated {}", entry.id), Some(book_json(&entry))))
        }
        Request::Get { id } => {
            let id = BookId::new(id);
            let entry = library.get(id).ok_or(CoreError::BookNotFound { id })?;
            Ok(("found".into(), Some(book_json(&entry))))
        }
        Request::Lookup { key } => {
            let entry = library.lookup(key)?;
            Ok(("found".into(), Some(book_json(&entry))))
        }
        Request::Range { low, high } => {
            let entries = library.range(low, high);
            Ok(listed(&entries))
        }
        Request::Search { query, field } => {
            let entries = match field {
                Some(name) => library.search_field(&SearchField::parse(&name), &query)?,
                None => library.search(&query),
            };
            Ok(listed(&entries))
        }
        Request::Autocomplete {
            prefix,
            field,
            limit,
        } => {
            let suggestions = library.autocomplete(&SearchField::parse(&field), &prefix, limit)?;
            Ok((
                format!("{} suggestions", suggestions.len()),
                Some(json!(suggestions)),
            ))
        }
        Request::Recommendations { id, limit } => {
            let recs = library.recommend(BookId::new(id), limit)?;
            Ok(recommended(library, &recs))
        }
        Request::PersonalizedRecommendations { seeds, limit } => {
            let seeds: Vec<BookId> = seeds.into_iter().map(BookId::new).collect();
            let recs = library.recommend_for(&seeds, limit)?;
            Ok(recommended(library, &recs))
        }
        Request::Link { a, b, weight } => {
            let previous = library.link(BookId::new(a), BookId::new(b), weight)?;
            Ok((
                "linked".into(),
                Some(json!({ "a": a, "b": b, "weight": weight, "previous": previous })),
            ))
        }
        Request::Unlink { a, b } => {
            let weight = library.unlink(BookId::new(a), BookId::new(b))?;
            Ok((
                "unlinked".into(),
                Some(json!({ "a": a, "b": b, "weight": weight })),
            ))
        }
        Request::Undo => {
            let mutation = library.undo()?;
            Ok((format!("undid {}", mutation.name()), Some(mutation_json(&mutation))))
        }
        Request::Stats => {
            let s = library.stats();
            Ok((
                "stats".into(),
                Some(json!({
                    "books": s.books,
                    "index_height": s.index_height,
                    "prefix_entries": s.prefix_entries,
                    "graph_nodes": s.graph_nodes,
                    "graph_edges": s.graph_edges,
                    "undo_depth": s.undo_depth,
                    "added": s.added,
                    "removed": s.removed,
                    "updated": s.updated,
                    "rejected": s.rejected,
                    "rollbacks": s.rollbacks,
                    "undos": s.undos,
                    "lookups": s.lookups,
                    "searches": s.searches,
                    "recommendations": s.recommendations,
                })),
            ))
        }
    }
}

fn book_json(entry: &CatalogEntry) -> Value {
    json!(BookRecord::from(entry))
}

fn listed(entries: &[CatalogEntry]) -> (String, Option<Value>) {
    let books: Vec<Value> = entries.iter().map(book_json).collect();
    (format!("{} books", books.len()), Some(Value::Array(books)))
}

fn recommended(library: &Library, recs: &[Recommendation]) -> (String, Option<Value>) {
    let items: Vec<Value> = recs
        .iter()
        .map(|rec| {
            let title = library.get(rec.id).map(|entry| entry.title);
            json!({
                "id": rec.id.as_u64(),
                "title": title,
                "score": rec.score,
                "degree": rec.degree,
            })
        })
        .collect();
    (
        format!("{} recommendations", items.len()),
        Some(Value::Array(items)),
    )
}

fn mutation_json(mutation: &Mutation) -> Value {
    match mutation {
        Mutation::Added { id } => json!({ "action": "add_book", "id": id.as_u64() }),
        Mutation::Removed { entry, edges } => json!({
            "action": "remove_book",
            "id": entry.id.as_u64(),
            "edges": edges.len(),
        }),
        Mutation::Updated { before } => json!({ "action": "update_book", "id": before.id.as_u64() }),
        Mutation::Linked { a, b, .. } => json!({ "action": "link", "a": a.as_u64(), "b": b.as_u64() }),
        Mutation::Unlinked { a, b, .. } => {
            json!({ "action": "unlink", "a": a.as_u64(), "b": b.as_u64() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(library: &Library, line: &str) -> Response {
        handle_line(library, line)
    }

    fn add(library: &Library, title: &str, author: &str) -> u64 {
        let line = json!({
            "action": "add_book",
            "book": { "title": title, "author": author }
        })
        .to_string();
        let response = run(library, &line);
        assert!(response.success, "{response:?}");
        response.data.unwrap()["id"].as_u64().unwrap()
    }

    #[test]
    fn add_get_and_search() {
        let library = Library::default();
        let id = add(&library, "Clean Code", "Robert Martin");
        add(&library, "Clean Architecture", "Robert Martin");

        let got = run(&library, &format!(r#"{{"action":"get","id":{id}}}"#));
        assert_eq!(got.data.unwrap()["title"], "Clean Code");

        let found = run(&library, r#"{"action":"search","query":"clean","type":"title"}"#);
        assert_eq!(found.data.unwrap().as_array().unwrap().len(), 2);

        let none = run(&library, r#"{"action":"search","query":"cleanz"}"#);
        assert!(none.success);
        assert_eq!(none.data.unwrap(), json!([]));
    }

    #[test]
    fn errors_are_tagged() {
        let library = Library::default();
        add(&library, "Dune", "Herbert");

        let dup = run(
            &library,
            r#"{"action":"add_book","book":{"title":"DUNE","author":"x"}}"#,
        );
        assert!(!dup.success);
        assert_eq!(dup.error, Some("duplicate_key"));

        let missing = run(&library, r#"{"action":"remove_book","id":99}"#);
        assert_eq!(missing.error, Some("not_found"));

        let weight = run(&library, r#"{"action":"link","a":1,"b":1,"weight":-2}"#);
        assert_eq!(weight.error, Some("invalid_weight"));

        let garbage = run(&library, "not json");
        assert_eq!(garbage.error, Some("bad_request"));

        let unknown = run(&library, r#"{"action":"issue","isbn":"1"}"#);
        assert_eq!(unknown.error, Some("bad_request"));
    }

    #[test]
    fn recommendations_include_titles() {
        let library = Library::default();
        let a = add(&library, "A", "x");
        let b = add(&library, "B", "x");
        let c = add(&library, "C", "x");
        run(&library, &format!(r#"{{"action":"link","a":{a},"b":{b},"weight":0.9}}"#));
        run(&library, &format!(r#"{{"action":"link","a":{a},"b":{c},"weight":0.5}}"#));

        let recs = run(
            &library,
            &format!(r#"{{"action":"recommendations","id":{a},"limit":1}}"#),
        );
        assert_eq!(
            recs.data.unwrap(),
            json!([{ "id": b, "title": "B", "score": 0.9, "degree": 1 }])
        );

        let personal = run(
            &library,
            &format!(r#"{{"action":"personalized_recommendations","seeds":[{b},{c}]}}"#),
        );
        let items = personal.data.unwrap();
        assert_eq!(items[0]["id"], a);
    }

    #[test]
    fn update_lookup_and_undo() {
        let library = Library::default();
        let id = add(&library, "Emma", "Jane Austen");

        let updated = run(
            &library,
            &format!(r#"{{"action":"update_book","id":{id},"title":"Persuasion","fields":{{"category":"Classic"}}}}"#),
        );
        assert!(updated.success);

        let found = run(&library, r#"{"action":"lookup","key":"persuasion"}"#);
        assert_eq!(found.data.unwrap()["fields"]["category"], "Classic");

        let undo = run(&library, r#"{"action":"undo"}"#);
        assert_eq!(undo.message.as_deref(), Some("undid update"));
        let found = run(&library, r#"{"action":"lookup","key":"EMMA"}"#);
        assert!(found.success);
    }

    #[test]
    fn autocomplete_and_range() {
        let library = Library::default();
        for title in ["Dune", "Dracula", "Emma"] {
            add(&library, title, "x");
        }

        let suggestions = run(&library, r#"{"action":"autocomplete","prefix":"d"}"#);
        assert_eq!(suggestions.data.unwrap(), json!(["dracula", "dune"]));

        let range = run(&library, r#"{"action":"range","low":"d","high":"e"}"#);
        let titles: Vec<Value> = range
            .data
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|book| book["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("Dracula"), json!("Dune")]);
    }

    #[test]
    fn response_omits_empty_parts() {
        let text = serde_json::to_string(&Response::ok("done", None)).unwrap();
        assert_eq!(text, r#"{"success":true,"message":"done"}"#);
    }

    #[test]
    fn mutations_are_flagged() {
        let undo: Request = serde_json::from_str(r#"{"action":"undo"}"#).unwrap();
        let stats: Request = serde_json::from_str(r#"{"action":"stats"}"#).unwrap();
        assert!(undo.is_mutation());
        assert!(!stats.is_mutation());
    }

    #[test]
    fn recommendation_limits_default_to_six() {
        let recs = parse_line(r#"{"action":"recommendations","id":1}"#).unwrap();
        assert!(matches!(recs, Request::Recommendations { limit: 6, .. }));
        let personal =
            parse_line(r#"{"action":"personalized_recommendations","seeds":[1]}"#).unwrap();
        assert!(matches!(
            personal,
            Request::PersonalizedRecommendations { limit: 6, .. }
        ));
        let suggest = parse_line(r#"{"action":"autocomplete","prefix":"d"}"#).unwrap();
        assert!(matches!(suggest, Request::Autocomplete { limit: 5, .. }));

        let library = Library::default();
        let hub = add(&library, "Hub", "x");
        for n in 0..8 {
            let other = add(&library, &format!("Spoke {n}"), "x");
            run(
                &library,
                &format!(r#"{{"action":"link","a":{hub},"b":{other},"weight":0.5}}"#),
            );
        }
        let found = run(&library, &format!(r#"{{"action":"recommendations","id":{hub}}}"#));
        assert_eq!(found.data.unwrap().as_array().unwrap().len(), 6);
    }

    #[test]
    fn malformed_lines_are_rejected_before_running() {
        let rejected = parse_line(r#"{"action":"add_book"}"#).unwrap_err();
        assert!(!rejected.success);
        assert_eq!(rejected.error, Some("bad_request"));
    }
}

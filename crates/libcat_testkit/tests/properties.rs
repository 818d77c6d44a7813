//! Property tests for the indexes and the engine.

use libcat_core::index::{BalancedIndex, PrefixIndex};
use libcat_core::{BookId, CatalogEntry, CoreError, Library, SearchField};
use libcat_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(u16),
    Remove(u16),
}

fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        3 => (0u16..200).prop_map(TreeOp::Insert),
        2 => (0u16..200).prop_map(TreeOp::Remove),
    ]
}

/// Observable answers of a library, used to compare two libraries.
fn answers(library: &Library, probes: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for probe in probes {
        let hits: Vec<u64> = library.search(probe).iter().map(|e| e.id.as_u64()).collect();
        out.push(format!("search {probe:?} {hits:?}"));
        out.push(format!("lookup {probe:?} {:?}", library.lookup(probe.as_str()).ok()));
    }
    for entry in library.entries() {
        let recs = library.recommend(entry.id, 3).unwrap();
        let recs: Vec<(u64, u8)> = recs.iter().map(|r| (r.id.as_u64(), r.degree)).collect();
        out.push(format!("recommend {} {recs:?}", entry.id));
    }
    out.push(format!("links {:?}", library.links()));
    out
}

proptest! {
    #![proptest_config(thorough_config())]

    #[test]
    fn balanced_index_stays_balanced_and_ordered(ops in prop::collection::vec(tree_op_strategy(), 1..200)) {
        let mut index: BalancedIndex<u64> = BalancedIndex::new();
        let mut model: BTreeMap<u64, BookId> = BTreeMap::new();

        for (n, op) in ops.iter().enumerate() {
            match *op {
                TreeOp::Insert(key) => {
                    let key = u64::from(key);
                    let id = BookId::new(n as u64 + 1);
                    let result = index.insert(key, id);
                    if model.contains_key(&key) {
                        let is_duplicate = matches!(result, Err(CoreError::DuplicateKey { .. }));
                        prop_assert!(is_duplicate);
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(key, id);
                    }
                }
                TreeOp::Remove(key) => {
                    let key = u64::from(key);
                    match model.remove(&key) {
                        Some(id) => {
                            prop_assert_eq!(index.remove(&key).unwrap(), id);
                        }
                        None => {
                            prop_assert!(index.remove(&key).is_err());
                        }
                    }
                }
            }
            prop_assert!(index.check_invariants().is_ok());
            prop_assert_eq!(index.len(), model.len());
        }

        let scanned: Vec<(u64, BookId)> = index.iter().map(|(k, id)| (*k, id)).collect();
        let expected: Vec<(u64, BookId)> = model.iter().map(|(k, id)| (*k, *id)).collect();
        prop_assert_eq!(scanned, expected);
    }

    #[test]
    fn range_scan_matches_reference(
        keys in prop::collection::btree_set(0u64..500, 0..100),
        low in 0u64..500,
        span in 0u64..200,
    ) {
        let mut index = BalancedIndex::new();
        for (n, key) in keys.iter().enumerate() {
            index.insert(*key, BookId::new(n as u64 + 1)).unwrap();
        }
        let high = low + span;

        let scanned: Vec<u64> = index.range_scan(&low, &high).map(|(k, _)| *k).collect();
        let expected: Vec<u64> = keys.range(low..=high).copied().collect();
        prop_assert_eq!(scanned, expected);
    }

    #[test]
    fn prefix_search_is_exact(
        texts in prop::collection::vec(title_strategy(), 1..40),
        probe in "[a-e]{0,4}",
    ) {
        let mut index = PrefixIndex::new();
        for (n, text) in texts.iter().enumerate() {
            index.insert(text, BookId::new(n as u64 + 1));
        }
        prop_assert!(index.check_invariants().is_ok());

        let found = index.prefix_search(&probe);
        let expected: BTreeSet<BookId> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| text.starts_with(probe.as_str()))
            .map(|(n, _)| BookId::new(n as u64 + 1))
            .collect();
        prop_assert_eq!(found, expected);

        // Every prefix of every text finds it.
        for (n, text) in texts.iter().enumerate() {
            let id = BookId::new(n as u64 + 1);
            for end in (1..=text.len()).filter(|&end| text.is_char_boundary(end)) {
                prop_assert!(index.prefix_search(&text[..end]).contains(&id));
            }
        }
    }

    #[test]
    fn prefix_removal_prunes(texts in prop::collection::vec(title_strategy(), 1..30)) {
        let mut index = PrefixIndex::new();
        for (n, text) in texts.iter().enumerate() {
            index.insert(text, BookId::new(n as u64 + 1));
        }
        for (n, text) in texts.iter().enumerate() {
            prop_assert!(index.remove(text, BookId::new(n as u64 + 1)));
            prop_assert!(index.check_invariants().is_ok());
        }
        prop_assert!(index.is_empty());
        prop_assert_eq!(index.node_count(), 1);
    }

    #[test]
    fn engine_invariants_hold_under_any_sequence(ops in operation_sequence_strategy(1, 60)) {
        let library = Library::new(linked_config()).unwrap();
        for op in &ops {
            let _ = op.apply(&library);
            prop_assert!(library.verify().is_ok());
        }
        prop_assert_eq!(library.counters().rollbacks(), 0);
    }

    #[test]
    fn rejected_mutations_change_nothing(
        books in catalog_strategy(1, 15),
        ops in operation_sequence_strategy(1, 40),
    ) {
        let library = library_with(linked_config(), books);
        for op in &ops {
            let before = (library.entries(), library.links(), library.stats().undo_depth);
            if op.apply(&library).is_err() {
                let after = (library.entries(), library.links(), library.stats().undo_depth);
                prop_assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn recommendations_are_deterministic(ops in operation_sequence_strategy(1, 60)) {
        let library = Library::default();
        for op in &ops {
            let _ = op.apply(&library);
        }
        for entry in library.entries() {
            let first = library.recommend(entry.id, 4).unwrap();
            let second = library.recommend(entry.id, 4).unwrap();
            prop_assert_eq!(&first, &second);
            // Direct neighbors come first, by descending score.
            for pair in first.windows(2) {
                if pair[0].degree == pair[1].degree {
                    prop_assert!(
                        pair[0].score > pair[1].score
                            || (pair[0].score == pair[1].score && pair[0].id < pair[1].id)
                    );
                } else {
                    prop_assert!(pair[0].degree < pair[1].degree);
                }
            }
        }
    }

    #[test]
    fn rebuild_answers_like_live_structures(
        books in catalog_strategy(0, 25),
        probes in prop::collection::vec("[a-e]{1,3}", 1..6),
    ) {
        let live = library_with(linked_config(), books);
        let rebuilt = Library::new(linked_config()).unwrap();
        rebuilt.rebuild_from(live.entries()).unwrap();

        prop_assert!(rebuilt.verify().is_ok());
        prop_assert_eq!(answers(&live, &probes), answers(&rebuilt, &probes));

        // Rebuilding again is idempotent.
        rebuilt.rebuild_from(live.entries()).unwrap();
        prop_assert_eq!(answers(&live, &probes), answers(&rebuilt, &probes));
    }

    #[test]
    fn undo_restores_previous_state(
        books in catalog_strategy(1, 10),
        ops in operation_sequence_strategy(1, 20),
    ) {
        let library = library_with(linked_config(), books);
        let mut history = Vec::new();
        for op in &ops {
            let before = (library.entries(), library.links());
            match (op.apply(&library), op) {
                (Ok(()), CatalogOp::Undo) => {
                    history.pop();
                }
                (Ok(()), _) => history.push(before),
                (Err(_), _) => {}
            }
        }
        // The log is bounded; only its tail of the history can be unwound.
        let depth = library.stats().undo_depth as usize;
        for before in history.into_iter().rev().take(depth) {
            library.undo().unwrap();
            prop_assert_eq!((library.entries(), library.links()), before);
        }
    }
}

#[test]
fn queries_normalize_like_inserts() {
    let library = Library::default();
    let id = library
        .add_book(CatalogEntry::new("Über  Café", "Émile Zola"))
        .unwrap();

    assert_eq!(library.search("uber ca")[0].id, id);
    assert_eq!(library.search("ÜBER")[0].id, id);
    assert_eq!(library.search("emile")[0].id, id);
    assert_eq!(library.lookup("uber cafe").unwrap().id, id);
    assert_eq!(
        library.exact(&SearchField::Author, "EMILE ZOLA").unwrap()[0].id,
        id
    );
}

#[test]
fn precomposed_and_decomposed_titles_meet() {
    let library = Library::default();
    // U+1EC5 precomposed in the stored title
    let id = library
        .add_book(CatalogEntry::new("Truy\u{1EC7}n Ki\u{1EC1}u", "Nguy\u{1EC5}n Du"))
        .unwrap();

    assert_eq!(library.search("Nguye\u{302}\u{303}n")[0].id, id);
    assert_eq!(library.search("nguyen")[0].id, id);
    assert_eq!(library.search("TRUYÊN")[0].id, id);
    assert_eq!(
        library.lookup("Truye\u{323}\u{302}n Kie\u{302}\u{300}u").unwrap().id,
        id
    );
}

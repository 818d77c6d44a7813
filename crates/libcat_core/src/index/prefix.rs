//! Prefix index (trie) over normalized text.

use crate::error::{CoreError, CoreResult};
use crate::index::normalize::normalize;
use crate::types::BookId;
use std::collections::{BTreeMap, BTreeSet};

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// Children keyed by the next character, in order.
    children: BTreeMap<char, usize>,
    /// Books whose indexed text ends at this node.
    ids: BTreeSet<BookId>,
}

impl TrieNode {
    fn is_dead(&self) -> bool {
        self.ids.is_empty() && self.children.is_empty()
    }
}

/// Trie mapping normalized strings to the books that carry them.
///
/// `PrefixIndex` provides:
/// - Prefix queries (autocomplete) and exact matches
/// - Shared terminals: several books may index the same string
/// - Pruning: removing the last id of a string frees the nodes that no
///   other string needs
///
/// Nodes are stored in an arena; freed slots are kept on a free list and
/// reused by later insertions.
///
/// # Example
///
/// ```rust
/// use libcat_core::index::PrefixIndex;
/// use libcat_core::BookId;
///
/// let mut index = PrefixIndex::new();
/// index.insert("Clean Code", BookId::new(1));
/// index.insert("Clean Architecture", BookId::new(2));
///
/// assert_eq!(index.prefix_search("clean").len(), 2);
/// assert!(index.prefix_search("Cleanz").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PrefixIndex {
    nodes: Vec<TrieNode>,
    free: Vec<usize>,
    /// Number of (text, id) pairs.
    pairs: usize,
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            free: Vec::new(),
            pairs: 0,
        }
    }
}

impl PrefixIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of indexed (text, id) pairs.
    pub fn len(&self) -> usize {
        self.pairs
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Returns the number of live trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Indexes `text` for `id`.
    ///
    /// Returns `false` if the pair was already present or the text is blank
    /// after normalization.
    pub fn insert(&mut self, text: &str, id: BookId) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }

        let mut cursor = ROOT;
        for c in normalized.chars() {
            cursor = match self.nodes[cursor].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.alloc();
                    self.nodes[cursor].children.insert(c, next);
                    next
                }
            };
        }

        let added = self.nodes[cursor].ids.insert(id);
        if added {
            self.pairs += 1;
        }
        added
    }

    /// Removes `id` from `text`'s terminal.
    ///
    /// Returns `false` if the pair was not indexed. Nodes left without ids
    /// or children are pruned back up the path.
    pub fn remove(&mut self, text: &str, id: BookId) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }

        let mut path = Vec::with_capacity(normalized.len());
        let mut cursor = ROOT;
        for c in normalized.chars() {
            let Some(&next) = self.nodes[cursor].children.get(&c) else {
                return false;
            };
            path.push((cursor, c));
            cursor = next;
        }

        if !self.nodes[cursor].ids.remove(&id) {
            return false;
        }
        self.pairs -= 1;

        while let Some((parent, c)) = path.pop() {
            if !self.nodes[cursor].is_dead() {
                break;
            }
            self.nodes[parent].children.remove(&c);
            self.release(cursor);
            cursor = parent;
        }
        true
    }

    /// Returns true if `text` is indexed for `id`.
    pub fn contains(&self, text: &str, id: BookId) -> bool {
        self.locate(&normalize(text))
            .is_some_and(|n| self.nodes[n].ids.contains(&id))
    }

    /// Returns the books whose indexed text equals `text` after normalization.
    pub fn exact_match(&self, text: &str) -> BTreeSet<BookId> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return BTreeSet::new();
        }
        self.locate(&normalized)
            .map(|n| self.nodes[n].ids.clone())
            .unwrap_or_default()
    }

    /// Returns the books whose indexed text starts with `prefix`.
    ///
    /// An empty prefix returns every indexed book; no match is an empty set.
    pub fn prefix_search(&self, prefix: &str) -> BTreeSet<BookId> {
        let mut found = BTreeSet::new();
        let Some(start) = self.locate(&normalize(prefix)) else {
            return found;
        };

        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            found.extend(node.ids.iter().copied());
            stack.extend(node.children.values().copied());
        }
        found
    }

    /// Returns up to `limit` indexed strings starting with `prefix`, in
    /// lexicographic order of their normalized form.
    pub fn complete(&self, prefix: &str, limit: usize) -> Vec<String> {
        let mut suggestions = Vec::new();
        if limit == 0 {
            return suggestions;
        }
        let normalized = normalize(prefix);
        let Some(start) = self.locate(&normalized) else {
            return suggestions;
        };

        let mut stack = vec![(start, normalized)];
        while let Some((n, text)) = stack.pop() {
            let node = &self.nodes[n];
            for (&c, &child) in node.children.iter().rev() {
                let mut extended = text.clone();
                extended.push(c);
                stack.push((child, extended));
            }
            if !node.ids.is_empty() {
                suggestions.push(text);
                if suggestions.len() == limit {
                    break;
                }
            }
        }
        suggestions
    }

    /// Verifies pruning, reachability and the pair count.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first failed check.
    pub fn check_invariants(&self) -> CoreResult<()> {
        let live = self.node_count();
        let mut reachable = 0usize;
        let mut pairs = 0usize;
        let mut stack = vec![ROOT];

        while let Some(n) = stack.pop() {
            reachable += 1;
            if reachable > live {
                return Err(CoreError::invariant("trie node reachable twice"));
            }
            let node = &self.nodes[n];
            if n != ROOT && node.is_dead() {
                return Err(CoreError::invariant(format!("unpruned trie node {n}")));
            }
            pairs += node.ids.len();
            stack.extend(node.children.values().copied());
        }

        if reachable != live {
            return Err(CoreError::invariant(format!(
                "{reachable} of {live} trie nodes reachable"
            )));
        }
        if pairs != self.pairs {
            return Err(CoreError::invariant(format!(
                "trie holds {pairs} pairs, counter says {}",
                self.pairs
            )));
        }
        Ok(())
    }

    fn locate(&self, normalized: &str) -> Option<usize> {
        normalized
            .chars()
            .try_fold(ROOT, |n, c| self.nodes[n].children.get(&c).copied())
    }

    fn alloc(&mut self) -> usize {
        match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.nodes.push(TrieNode::default());
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) {
        self.nodes[slot] = TrieNode::default();
        self.free.push(slot);
    }
}

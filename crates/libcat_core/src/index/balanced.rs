//! Height-balanced ordered index.

use crate::error::{CoreError, CoreResult};
use crate::types::BookId;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Arena slot of a node.
type NodeRef = usize;

#[derive(Debug, Clone)]
struct Node<K> {
    key: K,
    id: BookId,
    left: Option<NodeRef>,
    right: Option<NodeRef>,
    /// Height of the subtree rooted here (leaf = 1).
    height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Ordered key → book id index backed by an AVL tree.
///
/// `BalancedIndex` supports:
/// - O(log n) insert, remove and lookup
/// - Lazy in-order range scans
/// - Unique keys (a second insert of the same key is rejected)
///
/// Nodes live in a dense arena (`Vec`) and reference each other by slot.
/// Removing a node moves the last slot into the freed one, so the arena never
/// holds holes. All descents and rebalancing walk an explicit path instead of
/// recursing.
///
/// # Example
///
/// ```rust
/// use libcat_core::index::BalancedIndex;
/// use libcat_core::BookId;
///
/// let mut index = BalancedIndex::new();
/// for key in [5u64, 3, 8, 1, 4] {
///     index.insert(key, BookId::new(key)).unwrap();
/// }
///
/// let keys: Vec<u64> = index.range_scan(&1, &8).map(|(k, _)| *k).collect();
/// assert_eq!(keys, vec![1, 3, 4, 5, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct BalancedIndex<K> {
    nodes: Vec<Node<K>>,
    root: Option<NodeRef>,
}

impl<K> Default for BalancedIndex<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<K: Ord + Clone + fmt::Display> BalancedIndex<K> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the height of the tree (0 when empty).
    pub fn height(&self) -> u32 {
        self.height_of(self.root)
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Inserts a key.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the key is already present; the index is
    /// left unchanged.
    pub fn insert(&mut self, key: K, id: BookId) -> CoreResult<()> {
        let mut path = Vec::new();
        let mut cursor = self.root;

        while let Some(n) = cursor {
            let side = match key.cmp(&self.nodes[n].key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Err(CoreError::duplicate_key(&key)),
            };
            path.push((n, side));
            cursor = self.child(n, side);
        }

        let slot = self.nodes.len();
        self.nodes.push(Node {
            key,
            id,
            left: None,
            right: None,
            height: 1,
        });
        self.attach(&path, Some(slot));
        self.retrace(&path);
        Ok(())
    }

    /// Removes a key and returns the id it mapped to.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    pub fn remove(&mut self, key: &K) -> CoreResult<BookId> {
        let mut path = Vec::new();
        let mut cursor = self.root;

        let target = loop {
            let Some(n) = cursor else {
                return Err(CoreError::key_not_found(key));
            };
            let side = match key.cmp(&self.nodes[n].key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => break n,
            };
            path.push((n, side));
            cursor = self.child(n, side);
        };

        // With two children, the in-order successor takes the target's place
        // and the successor's slot is the one that gets unlinked.
        let victim = match (self.nodes[target].left, self.nodes[target].right) {
            (Some(_), Some(right)) => {
                path.push((target, Side::Right));
                let mut successor = right;
                while let Some(left) = self.nodes[successor].left {
                    path.push((successor, Side::Left));
                    successor = left;
                }
                self.swap_payload(target, successor);
                successor
            }
            _ => target,
        };

        let replacement = self.nodes[victim].left.or(self.nodes[victim].right);
        self.attach(&path, replacement);
        self.retrace(&path);

        Ok(self.release(victim).id)
    }

    /// Returns the id for a key.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    pub fn find(&self, key: &K) -> CoreResult<BookId> {
        self.get(key).ok_or_else(|| CoreError::key_not_found(key))
    }

    /// Returns the id for a key, if present.
    pub fn get(&self, key: &K) -> Option<BookId> {
        let mut cursor = self.root;
        while let Some(n) = cursor {
            let node = &self.nodes[n];
            cursor = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(node.id),
            };
        }
        None
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Returns the smallest entry.
    pub fn first(&self) -> Option<(&K, BookId)> {
        let mut cursor = self.root?;
        while let Some(left) = self.nodes[cursor].left {
            cursor = left;
        }
        let node = &self.nodes[cursor];
        Some((&node.key, node.id))
    }

    /// Returns the largest entry.
    pub fn last(&self) -> Option<(&K, BookId)> {
        let mut cursor = self.root?;
        while let Some(right) = self.nodes[cursor].right {
            cursor = right;
        }
        let node = &self.nodes[cursor];
        Some((&node.key, node.id))
    }

    /// Scans entries with `low <= key <= high` in ascending order.
    ///
    /// Yields nothing when `low > high`.
    pub fn range_scan(&self, low: &K, high: &K) -> RangeScan<'_, K> {
        self.range((Bound::Included(low.clone()), Bound::Included(high.clone())))
    }

    /// Scans entries whose key falls in `range`, in ascending order.
    pub fn range<R>(&self, range: R) -> RangeScan<'_, K>
    where
        R: RangeBounds<K>,
    {
        RangeScan::new(self, range.start_bound().cloned(), range.end_bound().cloned())
    }

    /// Scans every entry in ascending order.
    pub fn iter(&self) -> RangeScan<'_, K> {
        self.range(..)
    }

    /// Verifies ordering, stored heights and the balance invariant.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first failed check.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if self.root.is_none() != self.nodes.is_empty() {
            return Err(CoreError::invariant("root presence disagrees with node count"));
        }

        let mut reachable = 0usize;
        let mut stack: Vec<NodeRef> = self.root.into_iter().collect();
        while let Some(n) = stack.pop() {
            reachable += 1;
            if reachable > self.nodes.len() {
                return Err(CoreError::invariant("cycle or shared child in balanced index"));
            }
            let node = &self.nodes[n];
            let left = self.height_of(node.left);
            let right = self.height_of(node.right);
            if node.height != 1 + left.max(right) {
                return Err(CoreError::invariant(format!(
                    "stale height {} at key {}",
                    node.height, node.key
                )));
            }
            if left.abs_diff(right) > 1 {
                return Err(CoreError::invariant(format!(
                    "unbalanced node at key {} ({left} vs {right})",
                    node.key
                )));
            }
            stack.extend(node.left);
            stack.extend(node.right);
        }
        if reachable != self.nodes.len() {
            return Err(CoreError::invariant(format!(
                "{} of {} nodes reachable",
                reachable,
                self.nodes.len()
            )));
        }

        let mut previous: Option<&K> = None;
        for (key, _) in self.iter() {
            if previous.is_some_and(|prev| prev >= key) {
                return Err(CoreError::invariant(format!("keys out of order at {key}")));
            }
            previous = Some(key);
        }
        Ok(())
    }

    fn height_of(&self, node: Option<NodeRef>) -> u32 {
        node.map_or(0, |n| self.nodes[n].height)
    }

    fn child(&self, n: NodeRef, side: Side) -> Option<NodeRef> {
        match side {
            Side::Left => self.nodes[n].left,
            Side::Right => self.nodes[n].right,
        }
    }

    fn set_child(&mut self, n: NodeRef, side: Side, child: Option<NodeRef>) {
        match side {
            Side::Left => self.nodes[n].left = child,
            Side::Right => self.nodes[n].right = child,
        }
    }

    /// Links `child` where the last step of `path` points (or at the root).
    fn attach(&mut self, path: &[(NodeRef, Side)], child: Option<NodeRef>) {
        match path.last() {
            None => self.root = child,
            Some(&(parent, side)) => self.set_child(parent, side, child),
        }
    }

    fn update_height(&mut self, n: NodeRef) {
        let node = &self.nodes[n];
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.nodes[n].height = height;
    }

    fn balance_factor(&self, n: NodeRef) -> i64 {
        let node = &self.nodes[n];
        i64::from(self.height_of(node.left)) - i64::from(self.height_of(node.right))
    }

    fn rotate_right(&mut self, y: NodeRef) -> NodeRef {
        let Some(x) = self.nodes[y].left else {
            return y;
        };
        self.nodes[y].left = self.nodes[x].right;
        self.nodes[x].right = Some(y);
        self.update_height(y);
        self.update_height(x);
        x
    }

    fn rotate_left(&mut self, x: NodeRef) -> NodeRef {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        self.nodes[x].right = self.nodes[y].left;
        self.nodes[y].left = Some(x);
        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Restores balance at `n` and returns the new subtree root.
    fn rebalance(&mut self, n: NodeRef) -> NodeRef {
        self.update_height(n);
        let factor = self.balance_factor(n);

        if factor > 1 {
            // Left-right: straighten the left child first.
            if let Some(left) = self.nodes[n].left {
                if self.balance_factor(left) < 0 {
                    let rotated = self.rotate_left(left);
                    self.nodes[n].left = Some(rotated);
                }
            }
            return self.rotate_right(n);
        }

        if factor < -1 {
            // Right-left: straighten the right child first.
            if let Some(right) = self.nodes[n].right {
                if self.balance_factor(right) > 0 {
                    let rotated = self.rotate_right(right);
                    self.nodes[n].right = Some(rotated);
                }
            }
            return self.rotate_left(n);
        }

        n
    }

    /// Rebalances every node on `path`, bottom-up, relinking rotated subtrees.
    fn retrace(&mut self, path: &[(NodeRef, Side)]) {
        for depth in (0..path.len()).rev() {
            let subtree = self.rebalance(path[depth].0);
            self.attach(&path[..depth], Some(subtree));
        }
    }

    fn swap_payload(&mut self, a: NodeRef, b: NodeRef) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        let (x, y) = (&mut head[lo], &mut tail[0]);
        std::mem::swap(&mut x.key, &mut y.key);
        std::mem::swap(&mut x.id, &mut y.id);
    }

    /// Frees a detached slot, moving the last node into it.
    fn release(&mut self, slot: NodeRef) -> Node<K> {
        let last = self.nodes.len() - 1;
        if slot != last {
            self.redirect(last, slot);
        }
        self.nodes.swap_remove(slot)
    }

    /// Re-points the single link that references `from` so it references `to`.
    fn redirect(&mut self, from: NodeRef, to: NodeRef) {
        if self.root == Some(from) {
            self.root = Some(to);
            return;
        }
        let mut cursor = self.root;
        while let Some(n) = cursor {
            let side = if self.nodes[from].key < self.nodes[n].key {
                Side::Left
            } else {
                Side::Right
            };
            let child = self.child(n, side);
            if child == Some(from) {
                self.set_child(n, side, Some(to));
                return;
            }
            cursor = child;
        }
    }
}

/// Lazy in-order scan over a key range of a [`BalancedIndex`].
///
/// The scan holds an explicit stack of pending ancestors, so it never
/// recurses. It is finite, can be cloned to fork a position, and can be
/// restarted with [`RangeScan::rewind`].
#[derive(Debug, Clone)]
pub struct RangeScan<'a, K> {
    index: &'a BalancedIndex<K>,
    stack: Vec<NodeRef>,
    lower: Bound<K>,
    upper: Bound<K>,
}

impl<'a, K: Ord + Clone + fmt::Display> RangeScan<'a, K> {
    fn new(index: &'a BalancedIndex<K>, lower: Bound<K>, upper: Bound<K>) -> Self {
        let mut scan = Self {
            index,
            stack: Vec::new(),
            lower,
            upper,
        };
        scan.rewind();
        scan
    }

    /// Restarts the scan from the lower bound.
    pub fn rewind(&mut self) {
        self.stack.clear();
        let mut cursor = self.index.root;
        while let Some(n) = cursor {
            let node = &self.index.nodes[n];
            let above_lower = match &self.lower {
                Bound::Included(low) => node.key >= *low,
                Bound::Excluded(low) => node.key > *low,
                Bound::Unbounded => true,
            };
            if above_lower {
                self.stack.push(n);
                cursor = node.left;
            } else {
                cursor = node.right;
            }
        }
    }
}

impl<'a, K: Ord> Iterator for RangeScan<'a, K> {
    type Item = (&'a K, BookId);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let nodes = &self.index.nodes;
        let node = &nodes[n];

        let below_upper = match &self.upper {
            Bound::Included(high) => node.key <= *high,
            Bound::Excluded(high) => node.key < *high,
            Bound::Unbounded => true,
        };
        if !below_upper {
            self.stack.clear();
            return None;
        }

        let mut cursor = node.right;
        while let Some(c) = cursor {
            self.stack.push(c);
            cursor = nodes[c].left;
        }
        Some((&node.key, node.id))
    }
}

//! Recommendation graph over catalog entries.
//!
//! Books are nodes; an undirected edge carries a positive similarity weight.
//! Recommendations rank neighbors by weight and, when a book has too few
//! direct neighbors, extend into neighbors-of-neighbors with a fixed depth
//! cap so the cost stays bounded on dense graphs.

use crate::error::{CoreError, CoreResult};
use crate::types::BookId;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Maximum number of hops explored by extended recommendations.
pub const MAX_DEPTH: u8 = 2;

/// A recommended book.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// The recommended book.
    pub id: BookId,
    /// Edge weight (direct) or best path weight product (extended), or the
    /// summed weight from all seeds for personalized recommendations.
    pub score: f64,
    /// Hops from the origin: 1 for direct neighbors, 2 for second-degree.
    pub degree: u8,
}

/// Undirected weighted graph keyed by book id.
///
/// Invariants:
/// - No self-loops
/// - At most one edge per unordered pair
/// - Every weight is finite and > 0
#[derive(Debug, Clone, Default)]
pub struct RecommendationGraph {
    graph: StableUnGraph<BookId, f64>,
    nodes: HashMap<BookId, NodeIndex>,
}

impl RecommendationGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if `id` is a node.
    pub fn contains(&self, id: BookId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Removes every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
    }

    /// Adds a node. Returns `false` if it already existed.
    pub fn add_node(&mut self, id: BookId) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        let index = self.graph.add_node(id);
        self.nodes.insert(id, index);
        true
    }

    /// Removes a node and every incident edge.
    ///
    /// Returns the removed edges as `(neighbor, weight)`, sorted by neighbor.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is not a node.
    pub fn remove_node(&mut self, id: BookId) -> CoreResult<Vec<(BookId, f64)>> {
        let index = self.index_of(id)?;
        let mut edges: Vec<(BookId, f64)> = self
            .incident(index)
            .map(|(other, weight)| (self.graph[other], weight))
            .collect();
        edges.sort_by_key(|&(other, _)| other);

        self.graph.remove_node(index);
        self.nodes.remove(&id);
        Ok(edges)
    }

    /// Adds or updates the edge `a -- b` (last write wins).
    ///
    /// Returns the previous weight if the edge already existed.
    ///
    /// # Errors
    ///
    /// - `InvalidWeight` unless `weight` is finite and > 0
    /// - `SelfLoop` if `a == b`
    /// - `NodeNotFound` if either endpoint is missing
    pub fn add_edge(&mut self, a: BookId, b: BookId, weight: f64) -> CoreResult<Option<f64>> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(CoreError::InvalidWeight { weight });
        }
        if a == b {
            return Err(CoreError::SelfLoop { id: a });
        }
        let (ia, ib) = (self.index_of(a)?, self.index_of(b)?);

        match self.graph.find_edge(ia, ib) {
            Some(edge) => Ok(self
                .graph
                .edge_weight_mut(edge)
                .map(|slot| std::mem::replace(slot, weight))),
            None => {
                self.graph.add_edge(ia, ib, weight);
                Ok(None)
            }
        }
    }

    /// Removes the edge `a -- b` and returns its weight.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for an unknown endpoint, `EdgeNotFound` if the nodes
    /// are not linked.
    pub fn remove_edge(&mut self, a: BookId, b: BookId) -> CoreResult<f64> {
        let (ia, ib) = (self.index_of(a)?, self.index_of(b)?);
        self.graph
            .find_edge(ia, ib)
            .and_then(|edge| self.graph.remove_edge(edge))
            .ok_or(CoreError::EdgeNotFound { from: a, to: b })
    }

    /// Returns the weight of `a -- b`, if linked.
    pub fn edge_weight(&self, a: BookId, b: BookId) -> Option<f64> {
        let (ia, ib) = (*self.nodes.get(&a)?, *self.nodes.get(&b)?);
        let edge = self.graph.find_edge(ia, ib)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Returns the number of neighbors of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is not a node.
    pub fn degree(&self, id: BookId) -> CoreResult<usize> {
        Ok(self.incident(self.index_of(id)?).count())
    }

    /// Returns every neighbor of `id`, ranked by descending weight then
    /// ascending id.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is not a node.
    pub fn neighbors(&self, id: BookId) -> CoreResult<Vec<Recommendation>> {
        let origin = self.index_of(id)?;
        let mut ranked: Vec<Recommendation> = self
            .incident(origin)
            .map(|(other, weight)| Recommendation {
                id: self.graph[other],
                score: weight,
                degree: 1,
            })
            .collect();
        rank(&mut ranked);
        Ok(ranked)
    }

    /// Returns up to `k` books related to `id`.
    ///
    /// Direct neighbors come first, by descending weight then ascending id.
    /// When there are fewer than `k` of them and `extend` is set, the list is
    /// topped up with second-degree books (see [`Self::second_degree`]).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is not a node.
    pub fn recommend(&self, id: BookId, k: usize, extend: bool) -> CoreResult<Vec<Recommendation>> {
        let mut ranked = self.neighbors(id)?;
        if ranked.len() >= k || !extend {
            ranked.truncate(k);
            return Ok(ranked);
        }

        let wanted = k - ranked.len();
        let mut extended = self.second_degree(id)?;
        extended.truncate(wanted);
        ranked.extend(extended);
        Ok(ranked)
    }

    /// Returns books exactly two hops from `id`.
    ///
    /// The origin and its direct neighbors are excluded. A path scores the
    /// product of its edge weights; a book reachable through several
    /// neighbors keeps its best path score.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is not a node.
    pub fn second_degree(&self, id: BookId) -> CoreResult<Vec<Recommendation>> {
        let origin = self.index_of(id)?;
        let mut settled: HashSet<NodeIndex> = HashSet::from([origin]);
        let mut frontier: Vec<(NodeIndex, f64)> = vec![(origin, 1.0)];
        let mut found = Vec::new();

        for depth in 1..=MAX_DEPTH {
            let mut next: HashMap<NodeIndex, f64> = HashMap::new();
            for &(node, score) in &frontier {
                for (other, weight) in self.incident(node) {
                    if settled.contains(&other) {
                        continue;
                    }
                    let candidate = score * weight;
                    next.entry(other)
                        .and_modify(|best| *best = best.max(candidate))
                        .or_insert(candidate);
                }
            }
            settled.extend(next.keys().copied());

            if depth > 1 {
                found.extend(next.iter().map(|(&node, &score)| Recommendation {
                    id: self.graph[node],
                    score,
                    degree: depth,
                }));
            }
            frontier = next.into_iter().collect();
        }

        rank(&mut found);
        Ok(found)
    }

    /// Returns up to `k` books related to a set of seed books.
    ///
    /// A candidate scores the sum of its edge weights to every seed. Seeds are
    /// never recommended; seeds that are not nodes are skipped.
    pub fn recommend_for(&self, seeds: &[BookId], k: usize) -> Vec<Recommendation> {
        // Seeds are summed in id order so equal inputs give bit-equal scores.
        let seed_set: BTreeSet<BookId> = seeds.iter().copied().collect();
        let mut scores: BTreeMap<BookId, f64> = BTreeMap::new();

        for seed in &seed_set {
            let Some(&index) = self.nodes.get(seed) else {
                continue;
            };
            for (other, weight) in self.incident(index) {
                let candidate = self.graph[other];
                if !seed_set.contains(&candidate) {
                    *scores.entry(candidate).or_insert(0.0) += weight;
                }
            }
        }

        let mut ranked: Vec<Recommendation> = scores
            .into_iter()
            .map(|(id, score)| Recommendation {
                id,
                score,
                degree: 1,
            })
            .collect();
        rank(&mut ranked);
        ranked.truncate(k);
        ranked
    }

    /// Returns every edge as `(a, b, weight)` with `a < b`, sorted.
    pub fn edges(&self) -> Vec<(BookId, BookId, f64)> {
        let mut edges: Vec<(BookId, BookId, f64)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (ia, ib) = self.graph.edge_endpoints(edge)?;
                let (a, b) = (self.graph[ia], self.graph[ib]);
                Some((a.min(b), a.max(b), self.graph[edge]))
            })
            .collect();
        edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        edges
    }

    /// Verifies node bookkeeping and the edge invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first failed check.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if self.nodes.len() != self.graph.node_count() {
            return Err(CoreError::invariant(format!(
                "{} mapped ids for {} graph nodes",
                self.nodes.len(),
                self.graph.node_count()
            )));
        }
        for (&id, &index) in &self.nodes {
            if self.graph.node_weight(index) != Some(&id) {
                return Err(CoreError::invariant(format!("stale node mapping for {id}")));
            }
        }

        let mut pairs = HashSet::new();
        for edge in self.graph.edge_indices() {
            let Some((ia, ib)) = self.graph.edge_endpoints(edge) else {
                return Err(CoreError::invariant("edge without endpoints"));
            };
            let (a, b) = (self.graph[ia], self.graph[ib]);
            if a == b {
                return Err(CoreError::invariant(format!("self-loop on {a}")));
            }
            let weight = self.graph[edge];
            if !(weight.is_finite() && weight > 0.0) {
                return Err(CoreError::invariant(format!("weight {weight} on {a} -- {b}")));
            }
            if !pairs.insert((a.min(b), a.max(b))) {
                return Err(CoreError::invariant(format!("parallel edge {a} -- {b}")));
            }
        }
        Ok(())
    }

    fn index_of(&self, id: BookId) -> CoreResult<NodeIndex> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Neighbors of `node` with the connecting edge weight.
    fn incident(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, f64)> + '_ {
        self.graph.edges(node).map(move |edge| {
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            (other, *edge.weight())
        })
    }
}

/// Sorts by descending score, then ascending id.
fn rank(list: &mut [Recommendation]) {
    list.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
}

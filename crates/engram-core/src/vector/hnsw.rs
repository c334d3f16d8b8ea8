//! HNSW Graph Index
//!
//! Hierarchical navigable small world graph for approximate k-NN:
//! - geometric layer assignment with parameter `1/ln(M)`
//! - ef-bounded best-first search per layer
//! - diversity-aware neighbor selection with degree pruning
//! - tombstoned removal with entry-point re-election
//!
//! Structural mutations take the write lock; searches share the read lock,
//! so lookups observe a consistent graph while inserts queue behind it.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

use rand::Rng;
use serde::Serialize;

use super::metric::DistanceMetric;
use super::quantization::{Quantization, StoredVector};
use crate::events::{EventBus, MemoryEvent};

/// Hard ceiling on sampled layers, to bound graph height under any RNG.
const MAX_LAYER: usize = 32;

// ============================================================================
// ERRORS
// ============================================================================

/// Vector index error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum VectorIndexError {
    /// Vector length does not match the index dimensionality
    #[error("dimension mismatch: index expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// The index reached `max_elements`
    #[error("index is full ({capacity} elements)")]
    IndexFull { capacity: usize },
}

/// Vector index result type
pub type Result<T> = std::result::Result<T, VectorIndexError>;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for [`HnswIndex`]
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Fixed vector dimensionality
    pub dimensions: usize,
    /// Max graph degree per layer
    pub m: usize,
    /// Search breadth during insertion
    pub ef_construction: usize,
    /// Default runtime search breadth
    pub ef_search: usize,
    /// Capacity ceiling
    pub max_elements: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Vector compression scheme
    pub quantization: Quantization,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimensions: 384,
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            max_elements: 100_000,
            metric: DistanceMetric::Cosine,
            quantization: Quantization::None,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexStats {
    /// Live (non-tombstoned) vectors
    pub vector_count: usize,
    /// Estimated bytes held by vectors and adjacency lists
    pub memory_usage: usize,
    /// Mean search latency in milliseconds
    pub avg_search_time_ms: f64,
    /// Stored-bits compression ratio of the active quantizer
    pub compression_ratio: f32,
}

// ============================================================================
// GRAPH INTERNALS
// ============================================================================

struct Node {
    id: String,
    vector: StoredVector,
    /// Adjacency per layer; `neighbors.len() - 1` is the node's top layer.
    neighbors: Vec<Vec<usize>>,
    deleted: bool,
}

struct Graph {
    nodes: Vec<Node>,
    id_map: HashMap<String, usize>,
    entry_point: Option<usize>,
    top_layer: usize,
}

impl Graph {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            id_map: HashMap::new(),
            entry_point: None,
            top_layer: 0,
        }
    }

    fn live_count(&self) -> usize {
        self.id_map.len()
    }
}

/// Heap element ordered by distance, ties broken on index for determinism.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    dist: f32,
    idx: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.idx.cmp(&other.idx))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search of one layer.
///
/// Tombstoned nodes are traversed (so the graph stays navigable) but never
/// returned. Results ascend by distance.
fn search_layer(
    graph: &Graph,
    metric: DistanceMetric,
    query: &[f32],
    entries: &[usize],
    ef: usize,
    layer: usize,
) -> Vec<(f32, usize)> {
    let mut visited: HashSet<usize> = HashSet::new();
    // Min-heap of nodes to expand
    let mut candidates: BinaryHeap<std::cmp::Reverse<Candidate>> = BinaryHeap::new();
    // Max-heap of the best `ef` results seen so far
    let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

    for &ep in entries {
        if !visited.insert(ep) {
            continue;
        }
        let node = &graph.nodes[ep];
        let dist = node.vector.distance_to_query(metric, query);
        candidates.push(std::cmp::Reverse(Candidate { dist, idx: ep }));
        if !node.deleted {
            results.push(Candidate { dist, idx: ep });
        }
    }

    while let Some(std::cmp::Reverse(current)) = candidates.pop() {
        let worst = results.peek().map(|c| c.dist).unwrap_or(f32::INFINITY);
        if results.len() >= ef && current.dist > worst {
            break;
        }

        let Some(links) = graph.nodes[current.idx].neighbors.get(layer) else {
            continue;
        };
        for &nb in links {
            if !visited.insert(nb) {
                continue;
            }
            let node = &graph.nodes[nb];
            let dist = node.vector.distance_to_query(metric, query);
            let worst = results.peek().map(|c| c.dist).unwrap_or(f32::INFINITY);
            if results.len() < ef || dist < worst {
                candidates.push(std::cmp::Reverse(Candidate { dist, idx: nb }));
                if !node.deleted {
                    results.push(Candidate { dist, idx: nb });
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
    }

    let mut out: Vec<(f32, usize)> = results.into_iter().map(|c| (c.dist, c.idx)).collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    out
}

/// Diversity-aware neighbor selection (keep a candidate only while it is
/// closer to the query than to every already-kept neighbor); skipped
/// candidates backfill remaining slots.
fn select_neighbors(
    graph: &Graph,
    metric: DistanceMetric,
    candidates: &[(f32, usize)],
    m: usize,
) -> Vec<usize> {
    let mut selected: Vec<(f32, usize)> = Vec::with_capacity(m);
    let mut skipped: Vec<usize> = Vec::new();

    for &(dist, idx) in candidates {
        if selected.len() >= m {
            break;
        }
        let diverse = selected.iter().all(|&(_, kept)| {
            graph.nodes[idx]
                .vector
                .distance_to(metric, &graph.nodes[kept].vector)
                > dist
        });
        if diverse {
            selected.push((dist, idx));
        } else {
            skipped.push(idx);
        }
    }

    let mut out: Vec<usize> = selected.into_iter().map(|(_, idx)| idx).collect();
    for idx in skipped {
        if out.len() >= m {
            break;
        }
        out.push(idx);
    }
    out
}

// ============================================================================
// HNSW INDEX
// ============================================================================

/// Approximate nearest-neighbor index over (id, vector) pairs.
pub struct HnswIndex {
    config: HnswConfig,
    graph: RwLock<Graph>,
    /// `1 / ln(M)` — parameter of the geometric layer distribution
    level_mult: f64,
    searches: AtomicU64,
    search_nanos: AtomicU64,
    events: OnceLock<EventBus>,
}

impl HnswIndex {
    pub fn new(config: HnswConfig) -> Self {
        let level_mult = 1.0 / (config.m.max(2) as f64).ln();
        Self {
            config,
            graph: RwLock::new(Graph::new()),
            level_mult,
            searches: AtomicU64::new(0),
            search_nanos: AtomicU64::new(0),
            events: OnceLock::new(),
        }
    }

    /// Attach an event bus; only the first attachment wins.
    pub fn attach_events(&self, bus: EventBus) {
        let _ = self.events.set(bus);
    }

    fn emit(&self, event: MemoryEvent) {
        if let Some(bus) = self.events.get() {
            bus.emit(event);
        }
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn read_graph(&self) -> std::sync::RwLockReadGuard<'_, Graph> {
        match self.graph.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_graph(&self) -> std::sync::RwLockWriteGuard<'_, Graph> {
        match self.graph.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Live vector count.
    pub fn len(&self) -> usize {
        self.read_graph().live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read_graph().id_map.contains_key(id)
    }

    fn sample_level(&self) -> usize {
        let unit: f64 = rand::rng().random::<f64>().max(1e-12);
        (((-unit.ln()) * self.level_mult) as usize).min(MAX_LAYER)
    }

    /// Insert a vector. Re-inserting an existing id replaces its vector.
    pub fn add_point(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimensions {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.config.dimensions,
                got: vector.len(),
            });
        }

        {
            let mut graph = self.write_graph();

            // Replace: tombstone the old node first.
            if graph.id_map.contains_key(id) {
                Self::tombstone(&mut graph, id);
            }

            if graph.live_count() >= self.config.max_elements {
                return Err(VectorIndexError::IndexFull {
                    capacity: self.config.max_elements,
                });
            }

            let stored = self.config.quantization.encode(vector);
            let level = self.sample_level();
            let idx = graph.nodes.len();
            graph.nodes.push(Node {
                id: id.to_string(),
                vector: stored,
                neighbors: vec![Vec::new(); level + 1],
                deleted: false,
            });
            graph.id_map.insert(id.to_string(), idx);

            match graph.entry_point {
                None => {
                    graph.entry_point = Some(idx);
                    graph.top_layer = level;
                }
                Some(entry) => {
                    self.link_new_node(&mut graph, idx, vector, level, entry);
                    if level > graph.top_layer {
                        graph.entry_point = Some(idx);
                        graph.top_layer = level;
                    }
                }
            }
        }

        self.emit(MemoryEvent::PointAdded { id: id.to_string() });
        Ok(())
    }

    fn link_new_node(
        &self,
        graph: &mut Graph,
        idx: usize,
        vector: &[f32],
        level: usize,
        entry: usize,
    ) {
        let metric = self.config.metric;
        let top = graph.top_layer;

        // Greedy descent through layers above the node's level.
        let mut ep = entry;
        let mut lc = top;
        while lc > level {
            if let Some(&(_, best)) = search_layer(graph, metric, vector, &[ep], 1, lc).first() {
                ep = best;
            }
            lc -= 1;
        }

        // Link from min(level, top) down to 0.
        let mut eps: Vec<usize> = vec![ep];
        for lc in (0..=level.min(top)).rev() {
            let cands = search_layer(
                graph,
                metric,
                vector,
                &eps,
                self.config.ef_construction,
                lc,
            );
            let selected = select_neighbors(graph, metric, &cands, self.config.m);

            graph.nodes[idx].neighbors[lc] = selected.clone();
            for nb in selected {
                graph.nodes[nb].neighbors[lc].push(idx);
                if graph.nodes[nb].neighbors[lc].len() > self.config.m {
                    let mut nb_cands: Vec<(f32, usize)> = graph.nodes[nb].neighbors[lc]
                        .clone()
                        .into_iter()
                        .map(|other| {
                            let dist = graph.nodes[nb]
                                .vector
                                .distance_to(metric, &graph.nodes[other].vector);
                            (dist, other)
                        })
                        .collect();
                    nb_cands.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    graph.nodes[nb].neighbors[lc] =
                        select_neighbors(graph, metric, &nb_cands, self.config.m);
                }
            }

            if !cands.is_empty() {
                eps = cands.iter().map(|&(_, i)| i).collect();
            }
        }
    }

    fn tombstone(graph: &mut Graph, id: &str) -> bool {
        let Some(idx) = graph.id_map.remove(id) else {
            return false;
        };
        graph.nodes[idx].deleted = true;

        if graph.entry_point == Some(idx) {
            // Elect the highest-layer remaining node.
            let replacement = graph
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| !n.deleted)
                .max_by_key(|(_, n)| n.neighbors.len());
            match replacement {
                Some((new_entry, node)) => {
                    graph.entry_point = Some(new_entry);
                    graph.top_layer = node.neighbors.len().saturating_sub(1);
                }
                None => {
                    graph.entry_point = None;
                    graph.top_layer = 0;
                }
            }
        }
        true
    }

    /// Tombstone a point. Returns whether a node was removed.
    pub fn remove_point(&self, id: &str) -> bool {
        let removed = Self::tombstone(&mut self.write_graph(), id);
        if removed {
            self.emit(MemoryEvent::PointRemoved { id: id.to_string() });
        }
        removed
    }

    /// k-NN search. Results ascend by distance; never more than the live
    /// vector count.
    pub fn search(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<(String, f32)>> {
        self.search_inner(query, k, ef, |_| true)
    }

    /// k-NN search with a post-filter applied during result extraction.
    ///
    /// The filter may shrink the result below `k`; extraction breadth is
    /// widened to compensate.
    pub fn search_with_filters<F>(&self, query: &[f32], k: usize, filter: F) -> Result<Vec<(String, f32)>>
    where
        F: Fn(&str) -> bool,
    {
        let ef = (k * 4).max(self.config.ef_search);
        self.search_inner(query, k, Some(ef), filter)
    }

    fn search_inner<F>(
        &self,
        query: &[f32],
        k: usize,
        ef: Option<usize>,
        filter: F,
    ) -> Result<Vec<(String, f32)>>
    where
        F: Fn(&str) -> bool,
    {
        if query.len() != self.config.dimensions {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.config.dimensions,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(vec![]);
        }

        let started = Instant::now();
        let graph = self.read_graph();
        let Some(entry) = graph.entry_point else {
            return Ok(vec![]);
        };

        let metric = self.config.metric;
        let mut ep = entry;
        for lc in (1..=graph.top_layer).rev() {
            if let Some(&(_, best)) = search_layer(&graph, metric, query, &[ep], 1, lc).first() {
                ep = best;
            }
        }

        let ef_eff = ef.unwrap_or(self.config.ef_search).max(k);
        let candidates = search_layer(&graph, metric, query, &[ep], ef_eff, 0);

        let results: Vec<(String, f32)> = candidates
            .into_iter()
            .filter(|&(_, idx)| filter(&graph.nodes[idx].id))
            .take(k)
            .map(|(dist, idx)| (graph.nodes[idx].id.clone(), dist))
            .collect();
        drop(graph);

        self.searches.fetch_add(1, Ordering::Relaxed);
        self.search_nanos
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);

        Ok(results)
    }

    /// Clear and re-insert. Emits `index:rebuilt` with the build time.
    pub fn rebuild(&self, entries: &[(String, Vec<f32>)]) -> Result<usize> {
        let started = Instant::now();
        self.clear();
        for (id, vector) in entries {
            self.add_point(id, vector)?;
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(count = entries.len(), elapsed_ms, "vector index rebuilt");
        self.emit(MemoryEvent::IndexRebuilt {
            count: entries.len(),
            elapsed_ms,
        });
        Ok(entries.len())
    }

    /// Drop all graph state and reset statistics.
    pub fn clear(&self) {
        *self.write_graph() = Graph::new();
        self.searches.store(0, Ordering::Relaxed);
        self.search_nanos.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> VectorIndexStats {
        let graph = self.read_graph();
        let memory_usage: usize = graph
            .nodes
            .iter()
            .map(|n| {
                n.vector.size_bytes()
                    + n.id.len()
                    + n.neighbors
                        .iter()
                        .map(|l| l.len() * std::mem::size_of::<usize>())
                        .sum::<usize>()
            })
            .sum();
        let vector_count = graph.live_count();
        drop(graph);

        let searches = self.searches.load(Ordering::Relaxed);
        let nanos = self.search_nanos.load(Ordering::Relaxed);
        VectorIndexStats {
            vector_count,
            memory_usage,
            avg_search_time_ms: if searches == 0 {
                0.0
            } else {
                nanos as f64 / searches as f64 / 1e6
            },
            compression_ratio: self.config.quantization.compression_ratio(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

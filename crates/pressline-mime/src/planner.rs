// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The shortest-cost chain planner (§4.2, component B): single-source
// Dijkstra over the filter graph with a deterministic tie-break (fewer edges,
// then lexicographic program-name comparison). No graph crate is pulled in —
// the corpus never reaches for one, so this is a direct `BinaryHeap` over
// `pressline_core` types.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use pressline_core::{Chain, ContentType, FilterEdge};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PathKey {
    cost: u64,
    edge_count: u32,
    program_concat: String,
}

struct NodeState {
    key: PathKey,
    prev: Option<(ContentType, FilterEdge)>,
}

struct HeapItem {
    key: PathKey,
    node: ContentType,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapItem {}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// A shortest-cost chain planner over a filter-edge slice. Stateless except
/// for an invocation counter used to observe sink-pattern-cache reuse (§4.3,
/// testable property 3 / scenario S4).
#[derive(Default)]
pub struct ChainPlanner {
    invocations: AtomicU64,
}

impl ChainPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(AtomicOrdering::Relaxed)
    }

    /// Minimum-cost chain from `src` to `dst`, or `None` if unreachable
    /// (§4.2: "no path" is a normal outcome, not an error).
    pub fn plan(
        &self,
        edges: &[FilterEdge],
        src: &ContentType,
        dst: &ContentType,
        job_size_hint: u64,
    ) -> Option<Chain> {
        self.invocations.fetch_add(1, AtomicOrdering::Relaxed);
        if src == dst {
            return Some(Chain { edges: Vec::new() });
        }
        let states = Self::dijkstra(edges, src, job_size_hint);
        states.get(dst)?;
        Some(Self::reconstruct(&states, dst))
    }

    /// The full set `{ src : path(src, dst) exists }` for a sink type
    /// (§4.2), used to populate `Printer::supported_source_types`. Counted
    /// as one planner invocation the same as `plan`, so a cache hit in the
    /// sink-pattern cache is observable as zero additional invocations.
    ///
    /// `sink` itself is excluded even though `plan(sink, sink, 0)` trivially
    /// succeeds with an empty chain: a printer never receives a document
    /// already typed as its own sink, so that identity path isn't a
    /// supported *source* type in the sense this set is used for.
    pub fn supported_source_types(&self, edges: &[FilterEdge], sink: &ContentType) -> Vec<ContentType> {
        self.invocations.fetch_add(1, AtomicOrdering::Relaxed);
        let mut reachable: HashSet<ContentType> = HashSet::new();
        let mut visited: HashSet<ContentType> = HashSet::new();
        let mut stack = vec![sink.clone()];
        visited.insert(sink.clone());
        while let Some(node) = stack.pop() {
            for e in edges.iter().filter(|e| e.dst == node) {
                if visited.insert(e.src.clone()) {
                    reachable.insert(e.src.clone());
                    stack.push(e.src.clone());
                }
            }
        }
        let mut out: Vec<ContentType> = reachable.into_iter().collect();
        out.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        out
    }

    fn dijkstra(edges: &[FilterEdge], src: &ContentType, job_size_hint: u64) -> HashMap<ContentType, NodeState> {
        let mut best: HashMap<ContentType, NodeState> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<HeapItem>> = BinaryHeap::new();

        let start_key = PathKey {
            cost: 0,
            edge_count: 0,
            program_concat: String::new(),
        };
        best.insert(
            src.clone(),
            NodeState {
                key: start_key.clone(),
                prev: None,
            },
        );
        heap.push(Reverse(HeapItem {
            key: start_key,
            node: src.clone(),
        }));

        while let Some(Reverse(HeapItem { key, node })) = heap.pop() {
            match best.get(&node) {
                Some(cur) if cur.key != key => continue, // stale heap entry
                _ => {}
            }
            for e in edges.iter().filter(|e| e.src == node) {
                // Edges with max_input_size in (0, job_size_hint) are skipped.
                if e.max_input_size != 0 && e.max_input_size < job_size_hint {
                    continue;
                }
                let new_cost = key.cost + u64::from(e.cost);
                let new_edge_count = key.edge_count + 1;
                let mut new_concat = key.program_concat.clone();
                new_concat.push_str(&e.program);
                let new_key = PathKey {
                    cost: new_cost,
                    edge_count: new_edge_count,
                    program_concat: new_concat,
                };
                let better = match best.get(&e.dst) {
                    None => true,
                    Some(existing) => new_key < existing.key,
                };
                if better {
                    best.insert(
                        e.dst.clone(),
                        NodeState {
                            key: new_key.clone(),
                            prev: Some((node.clone(), e.clone())),
                        },
                    );
                    heap.push(Reverse(HeapItem {
                        key: new_key,
                        node: e.dst.clone(),
                    }));
                }
            }
        }
        best
    }

    fn reconstruct(best: &HashMap<ContentType, NodeState>, dst: &ContentType) -> Chain {
        let mut edges = Vec::new();
        let mut cur = dst.clone();
        while let Some(state) = best.get(&cur) {
            match &state.prev {
                Some((prev_node, edge)) => {
                    edges.push(edge.clone());
                    cur = prev_node.clone();
                }
                None => break,
            }
        }
        edges.reverse();
        Chain { edges }
    }
}

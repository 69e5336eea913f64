//! Host-side BFS traversal
//!
//! Based on Ligra (Shun & Blelloch, `PPoPP` 2013) frontier-based traversal patterns.
//!
//! These run on the host, one graph at a time. The device kernels are checked
//! against them, and the driver uses [`max_level_width`] to reject graphs whose
//! frontier would not fit in one workgroup.

use crate::storage::{CsrHostData, NodeId, UNVISITED};
use anyhow::{bail, Result};
use std::collections::VecDeque;

/// Distances and parents of one BFS traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BfsTree {
    /// Distance from source per node (`UNVISITED` if unreachable)
    pub distances: Vec<u32>,

    /// Parent per node (`UNVISITED` if unreachable, source for itself)
    pub parents: Vec<u32>,
}

impl BfsTree {
    /// Number of nodes reached (source included)
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.distances.iter().filter(|&&d| d != UNVISITED).count()
    }
}

/// Breadth-First Search from source node
///
/// Standard queue-based BFS; parents record the first discovering node, so
/// they follow adjacency order.
///
/// # Panics
///
/// Panics if `source` is outside the graph.
///
/// # Example
///
/// ```
/// use trueno_multibfs::{bfs_reference, CsrHostData, NodeId, UNVISITED};
///
/// let graph = CsrHostData::from_edge_list(3, &[(NodeId(0), NodeId(1))]).unwrap();
/// let tree = bfs_reference(&graph, NodeId(0));
/// assert_eq!(tree.distances, vec![0, 1, UNVISITED]);
/// assert_eq!(tree.parents, vec![0, 0, UNVISITED]);
/// ```
#[must_use]
pub fn bfs_reference(graph: &CsrHostData, source: NodeId) -> BfsTree {
    let n = graph.num_nodes();
    let mut distances = vec![UNVISITED; n];
    let mut parents = vec![UNVISITED; n];
    let mut queue = VecDeque::new();

    distances[source.0 as usize] = 0;
    parents[source.0 as usize] = source.0;
    queue.push_back(source.0);

    while let Some(current) = queue.pop_front() {
        let next = distances[current as usize] + 1;
        for &neighbor in graph.neighbors(NodeId(current)) {
            if distances[neighbor as usize] == UNVISITED {
                distances[neighbor as usize] = next;
                parents[neighbor as usize] = current;
                queue.push_back(neighbor);
            }
        }
    }

    BfsTree { distances, parents }
}

/// Number of nodes discovered on each BFS level (index = distance)
///
/// Level 0 is the source alone.
#[must_use]
pub fn level_widths(graph: &CsrHostData, source: NodeId) -> Vec<usize> {
    let tree = bfs_reference(graph, source);
    let mut widths = Vec::new();
    for &d in &tree.distances {
        if d == UNVISITED {
            continue;
        }
        let level = d as usize;
        if widths.len() <= level {
            widths.resize(level + 1, 0);
        }
        widths[level] += 1;
    }
    widths
}

/// Widest BFS level as `(level, width)`
///
/// This is the largest frontier the device kernel must hold at once.
#[must_use]
pub fn max_level_width(graph: &CsrHostData, source: NodeId) -> (usize, usize) {
    level_widths(graph, source)
        .into_iter()
        .enumerate()
        .max_by_key(|&(level, width)| (width, std::cmp::Reverse(level)))
        .unwrap_or((0, 0))
}

/// Check that `distances`/`parents` form a valid BFS tree of `graph`
///
/// Distances must match a reference BFS exactly. Parents may differ from the
/// reference (concurrent discovery picks any predecessor) but must be a
/// neighbor-in-edge one level closer to the source.
///
/// # Errors
///
/// Returns error describing the first violation found.
pub fn verify_bfs_tree(
    graph: &CsrHostData,
    source: NodeId,
    distances: &[u32],
    parents: &[u32],
) -> Result<()> {
    let n = graph.num_nodes();
    if distances.len() != n || parents.len() != n {
        bail!(
            "result length mismatch: {} distances, {} parents, {n} nodes",
            distances.len(),
            parents.len()
        );
    }

    let expected = bfs_reference(graph, source);

    for node in 0..n {
        let d = distances[node];
        if d != expected.distances[node] {
            bail!(
                "node {node}: distance {d}, expected {}",
                expected.distances[node]
            );
        }

        let p = parents[node];
        if d == UNVISITED {
            if p != UNVISITED {
                bail!("node {node}: unreachable but has parent {p}");
            }
            continue;
        }
        if node == source.0 as usize {
            if p != source.0 {
                bail!("source {node}: parent {p}, expected itself");
            }
            continue;
        }
        if p as usize >= n {
            bail!("node {node}: parent {p} out of range");
        }
        if distances[p as usize] != d - 1 {
            bail!(
                "node {node}: parent {p} at distance {}, expected {}",
                distances[p as usize],
                d - 1
            );
        }
        if !graph
            .neighbors(NodeId(p))
            .iter()
            .any(|&target| target as usize == node)
        {
            bail!("node {node}: parent {p} has no edge to it");
        }
    }

    Ok(())
}

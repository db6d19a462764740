use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::attribute::AttrValue;
use crate::graph::Graph;
use crate::types::NodeId;

/// Walk one connected component with BFS, collecting every member.
fn bfs_component(graph: &Graph, start: &str, visited: &mut BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    let mut component = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());
    visited.insert(start.to_string());

    while let Some(node) = queue.pop_front() {
        for neighbor in graph.neighbors(&node) {
            if !visited.contains(neighbor) {
                visited.insert(neighbor.to_string());
                queue.push_back(neighbor.to_string());
            }
        }
        component.insert(node);
    }
    component
}

/// Shortest-path distances from `start` over unweighted edges.
pub(crate) fn bfs_distances(graph: &Graph, start: &str) -> BTreeMap<NodeId, u64> {
    let mut distances = BTreeMap::new();
    let mut queue = VecDeque::new();
    distances.insert(start.to_string(), 0u64);
    queue.push_back(start.to_string());

    while let Some(node) = queue.pop_front() {
        let current = distances[&node];
        for neighbor in graph.neighbors(&node) {
            if !distances.contains_key(neighbor) {
                distances.insert(neighbor.to_string(), current + 1);
                queue.push_back(neighbor.to_string());
            }
        }
    }
    distances
}

/// The partition of the node set into connected components, ordered by each
/// component's smallest member.
pub fn component_sets(graph: &Graph) -> Vec<BTreeSet<NodeId>> {
    let mut visited = BTreeSet::new();
    let mut components = Vec::new();
    for node in graph.nodes() {
        if !visited.contains(node) {
            components.push(bfs_component(graph, node, &mut visited));
        }
    }
    components
}

/// Label every node with its `component_id` and return the component count.
/// Stale labels from earlier runs are overwritten.
pub fn connected_components(graph: &mut Graph) -> usize {
    let components = component_sets(graph);
    for (id, component) in components.iter().enumerate() {
        for node in component {
            graph.set_node_attr(node, "component_id", AttrValue::Int(id as i64));
        }
    }
    components.len()
}

/// True iff the graph contains no cycle. A forest has exactly
/// `nodes - components` edges; anything more closes a cycle.
pub fn is_forest(graph: &Graph) -> bool {
    let components = component_sets(graph).len();
    graph.edge_count() <= graph.node_count() - components
}

/// Degree-zero nodes, lazily, in ascending id order.
pub fn isolated_nodes(graph: &Graph) -> impl Iterator<Item = &str> {
    graph.nodes().filter(|node| graph.degree(node) == 0)
}

/// Edge density: 2E / (N * (N - 1)), and 0.0 for the empty or singleton
/// graph so no division by zero can occur.
pub fn density(graph: &Graph) -> f64 {
    let n = graph.node_count();
    if n < 2 {
        return 0.0;
    }
    (2 * graph.edge_count()) as f64 / (n * (n - 1)) as f64
}

/// Mean shortest-path distance over all ordered pairs of distinct nodes.
/// Defined only for connected graphs; `None` signals "disconnected" and
/// callers must branch on it instead of reading a placeholder number.
pub fn average_shortest_path(graph: &Graph) -> Option<f64> {
    let n = graph.node_count();
    if n < 2 {
        return Some(0.0);
    }
    let mut total = 0u64;
    for node in graph.nodes() {
        let distances = bfs_distances(graph, node);
        if distances.len() < n {
            return None;
        }
        total += distances.values().sum::<u64>();
    }
    Some(total as f64 / (n * (n - 1)) as f64)
}

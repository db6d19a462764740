use std::collections::{BTreeMap, VecDeque};

use log::{info, warn};

use crate::attribute::AttrValue;
use crate::graph::Graph;
use crate::types::NodeId;

/// Per-start-node result of a multi-source traversal. The index is the
/// position of the start node in the original request, counting skipped
/// entries, so attribute suffixes stay aligned with the caller's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BfsOutcome {
    Completed {
        start: NodeId,
        index: usize,
        reached: usize,
    },
    SkippedMissing {
        start: NodeId,
        index: usize,
    },
}

pub fn distance_key(index: usize) -> String {
    format!("distance_{}", index)
}

pub fn parent_key(index: usize) -> String {
    format!("parent_{}", index)
}

/// Run a FIFO breadth-first search from each requested start node and store
/// shortest-path attributes (`distance_{i}`, `parent_{i}`) on every reached
/// node. Unreached nodes get no attribute: an absent key is the sentinel for
/// "unreachable", and the start node itself carries no parent.
///
/// Neighbors expand in ascending id order, so shortest-path ties always break
/// toward the smaller parent id.
pub fn multi_source_bfs(graph: &mut Graph, start_nodes: &[&str]) -> Vec<BfsOutcome> {
    let mut outcomes = Vec::with_capacity(start_nodes.len());

    for (index, start) in start_nodes.iter().enumerate() {
        if !graph.has_node(start) {
            warn!("node '{}' could not be found, skipping start node", start);
            outcomes.push(BfsOutcome::SkippedMissing {
                start: start.to_string(),
                index,
            });
            continue;
        }

        let mut distances = BTreeMap::<NodeId, i64>::new();
        let mut parents = BTreeMap::<NodeId, NodeId>::new();
        let mut queue = VecDeque::<(NodeId, i64)>::new();

        distances.insert(start.to_string(), 0);
        queue.push_back((start.to_string(), 0));

        while let Some((current, current_distance)) = queue.pop_front() {
            let neighbors: Vec<NodeId> =
                graph.neighbors(&current).map(str::to_string).collect();
            for neighbor in neighbors {
                if !distances.contains_key(&neighbor) {
                    distances.insert(neighbor.clone(), current_distance + 1);
                    parents.insert(neighbor.clone(), current.clone());
                    queue.push_back((neighbor, current_distance + 1));
                }
            }
        }

        let reached = distances.len();
        let d_key = distance_key(index);
        let p_key = parent_key(index);
        for (node, distance) in distances {
            graph.set_node_attr(&node, &d_key, AttrValue::Int(distance));
        }
        for (node, parent) in parents {
            graph.set_node_attr(&node, &p_key, AttrValue::Str(parent));
        }

        info!(
            "BFS from node '{}' reached {} nodes, attributes stored with suffix '_{}'",
            start, reached, index
        );
        outcomes.push(BfsOutcome::Completed {
            start: start.to_string(),
            index,
            reached,
        });
    }

    outcomes
}

/// Shortest-path distance from the `index`-th start node, if reached.
pub fn bfs_distance(graph: &Graph, node: &str, index: usize) -> Option<i64> {
    graph
        .node_attr(node, &distance_key(index))
        .and_then(AttrValue::as_int)
}

/// Predecessor on the shortest path from the `index`-th start node.
pub fn bfs_parent<'a>(graph: &'a Graph, node: &str, index: usize) -> Option<&'a str> {
    graph
        .node_attr(node, &parent_key(index))
        .and_then(AttrValue::as_str)
}

#[cfg(test)]
mod test_traversal {
    use crate::graph::Graph;
    use crate::traversal::{bfs_distance, bfs_parent, multi_source_bfs, BfsOutcome};

    fn path_graph(ids: &[&str]) -> Graph {
        let mut g = Graph::new();
        for pair in ids.windows(2) {
            g.insert_edge(pair[0], pair[1]);
        }
        g
    }

    #[test]
    fn test_bfs_distances_on_path() {
        let mut g = path_graph(&["0", "1", "2", "3"]);
        let outcomes = multi_source_bfs(&mut g, &["0"]);
        assert_eq!(outcomes.len(), 1);

        assert_eq!(bfs_distance(&g, "0", 0), Some(0));
        assert_eq!(bfs_distance(&g, "1", 0), Some(1));
        assert_eq!(bfs_distance(&g, "2", 0), Some(2));
        assert_eq!(bfs_distance(&g, "3", 0), Some(3));

        assert_eq!(bfs_parent(&g, "0", 0), None);
        assert_eq!(bfs_parent(&g, "1", 0), Some("0"));
        assert_eq!(bfs_parent(&g, "2", 0), Some("1"));
        assert_eq!(bfs_parent(&g, "3", 0), Some("2"));
    }

    #[test]
    fn test_missing_start_keeps_suffix_position() {
        let mut g = path_graph(&["0", "1"]);
        let outcomes = multi_source_bfs(&mut g, &["9", "1"]);
        assert_eq!(
            outcomes[0],
            BfsOutcome::SkippedMissing { start: "9".to_string(), index: 0 }
        );
        assert_eq!(
            outcomes[1],
            BfsOutcome::Completed { start: "1".to_string(), index: 1, reached: 2 }
        );
        // The surviving run keeps its original position as suffix.
        assert_eq!(bfs_distance(&g, "0", 1), Some(1));
        assert_eq!(bfs_distance(&g, "0", 0), None);
    }

    #[test]
    fn test_unreachable_nodes_have_no_distance() {
        let mut g = path_graph(&["0", "1"]);
        g.insert_node("Z");
        multi_source_bfs(&mut g, &["0"]);
        assert_eq!(bfs_distance(&g, "Z", 0), None);
        assert_eq!(bfs_parent(&g, "Z", 0), None);
    }

    #[test]
    fn test_multiple_sources_get_distinct_suffixes() {
        let mut g = path_graph(&["0", "1", "2"]);
        multi_source_bfs(&mut g, &["0", "2"]);
        assert_eq!(bfs_distance(&g, "1", 0), Some(1));
        assert_eq!(bfs_distance(&g, "1", 1), Some(1));
        assert_eq!(bfs_distance(&g, "0", 1), Some(2));
    }
}

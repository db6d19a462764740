use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::analysis::component_sets;
use crate::attribute::AttrValue;
use crate::graph::Graph;
use crate::graph_io;
use crate::types::{EdgeKey, GraphError};

/// Edge-betweenness centrality: for every edge, the accumulated share of
/// all-pairs shortest paths that traverse it (Brandes' algorithm, undirected,
/// so the per-source sums are halved). Only the relative ordering matters to
/// the partitioner, no normalization is applied.
pub fn edge_betweenness(graph: &Graph) -> BTreeMap<EdgeKey, f64> {
    let nodes: Vec<&str> = graph.nodes().collect();
    let index: BTreeMap<&str, usize> =
        nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let n = nodes.len();

    let mut scores: BTreeMap<EdgeKey, f64> =
        graph.edges().map(|edge| (edge.clone(), 0.0)).collect();

    for s in 0..n {
        let mut stack = Vec::<usize>::new();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];
        let mut queue = VecDeque::new();

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for neighbor in graph.neighbors(nodes[v]) {
                let w = index[neighbor];
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                let credit = sigma[v] / sigma[w] * (1.0 + delta[w]);
                if let Some(score) = scores.get_mut(&EdgeKey::new(nodes[v], nodes[w])) {
                    *score += credit;
                }
                delta[v] += credit;
            }
        }
    }

    for score in scores.values_mut() {
        *score /= 2.0;
    }
    scores
}

/// The remaining edge whose removal the divisive pass takes next: highest
/// betweenness, ties broken by canonical edge order.
fn most_central_edge(graph: &Graph) -> Option<EdgeKey> {
    let scores = edge_betweenness(graph);
    let mut best: Option<(EdgeKey, f64)> = None;
    for (edge, score) in scores {
        let better = best.as_ref().map_or(true, |(_, best_score)| score > *best_score);
        if better {
            best = Some((edge, score));
        }
    }
    best.map(|(edge, _)| edge)
}

/// Partition the graph into at least `k` communities with Girvan-Newman
/// style divisive clustering: repeatedly strip the highest-betweenness edge
/// from a working copy (betweenness recomputed after every removal) until the
/// component count first reaches `k` or the edges run out. Labels every node
/// with its `community_id` and returns the achieved community count.
///
/// With an export directory, each community's induced subgraph is persisted
/// as `component_{i}.gml`.
pub fn partition_communities(
    graph: &mut Graph,
    k: usize,
    export_dir: Option<&Path>,
) -> Result<usize, GraphError> {
    if k > graph.node_count() {
        return Err(GraphError::InvalidParameter(format!(
            "cannot find {} components in a graph with only {} nodes",
            k,
            graph.node_count()
        )));
    }

    let mut work = graph.clone();
    let mut communities = component_sets(&work);
    while communities.len() < k {
        let Some(edge) = most_central_edge(&work) else {
            warn!(
                "ran out of edges before reaching {} communities, keeping {}",
                k,
                communities.len()
            );
            break;
        };
        let (u, v) = edge.endpoints();
        work.remove_edge(u, v);
        communities = component_sets(&work);
    }

    for (id, community) in communities.iter().enumerate() {
        for node in community {
            graph.set_node_attr(node, "community_id", AttrValue::Int(id as i64));
        }
    }
    info!("partitioning finished with {} communities", communities.len());

    if let Some(dir) = export_dir {
        fs::create_dir_all(dir)?;
        for (id, community) in communities.iter().enumerate() {
            let sub = graph.induced_subgraph(community);
            let file = dir.join(format!("component_{}.gml", id));
            graph_io::write_graph(&sub, &file)?;
            info!(
                "community {} exported to {} ({} nodes)",
                id,
                file.display(),
                sub.node_count()
            );
        }
    }

    Ok(communities.len())
}

#[cfg(test)]
mod test_partition {
    use crate::attribute::AttrValue;
    use crate::graph::Graph;
    use crate::partition::{edge_betweenness, partition_communities};
    use crate::types::{EdgeKey, GraphError};

    /// Two triangles joined by a single bridge.
    fn barbell() -> Graph {
        let mut g = Graph::new();
        g.insert_edge("a1", "a2");
        g.insert_edge("a2", "a3");
        g.insert_edge("a3", "a1");
        g.insert_edge("b1", "b2");
        g.insert_edge("b2", "b3");
        g.insert_edge("b3", "b1");
        g.insert_edge("a1", "b1");
        g
    }

    #[test]
    fn test_bridge_has_highest_betweenness() {
        let g = barbell();
        let scores = edge_betweenness(&g);
        let bridge = EdgeKey::new("a1", "b1");
        for (edge, score) in &scores {
            if *edge != bridge {
                assert!(scores[&bridge] > *score, "bridge should dominate {}", edge);
            }
        }
    }

    #[test]
    fn test_partition_splits_at_bridge() {
        let mut g = barbell();
        let count = partition_communities(&mut g, 2, None).unwrap();
        assert_eq!(count, 2);

        let a_side = g.node_attr("a2", "community_id").unwrap().clone();
        assert_eq!(g.node_attr("a1", "community_id"), Some(&a_side));
        assert_eq!(g.node_attr("a3", "community_id"), Some(&a_side));
        assert_ne!(g.node_attr("b1", "community_id"), Some(&a_side));
        // The original graph is labeled but never loses edges.
        assert_eq!(g.edge_count(), 7);
    }

    #[test]
    fn test_target_exceeding_node_count_fails_without_side_effects() {
        let mut g = barbell();
        let err = partition_communities(&mut g, 99, None).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParameter(_)));
        assert_eq!(g.node_attr("a1", "community_id"), None);
    }

    #[test]
    fn test_already_partitioned_graph_needs_no_removal() {
        let mut g = Graph::new();
        g.insert_edge("x", "y");
        g.insert_edge("p", "q");
        let count = partition_communities(&mut g, 2, None).unwrap();
        assert_eq!(count, 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_exported_communities_reload_from_gml() {
        let mut g = barbell();
        g.set_node_attr("a1", "color", AttrValue::from("red"));

        let dir = tempfile::tempdir().unwrap();
        let count = partition_communities(&mut g, 2, Some(dir.path())).unwrap();
        assert_eq!(count, 2);

        let first = crate::graph_io::read_graph(&dir.path().join("component_0.gml")).unwrap();
        let second = crate::graph_io::read_graph(&dir.path().join("component_1.gml")).unwrap();
        // Each triangle comes back intact, without the bridge.
        assert_eq!(first.node_count(), 3);
        assert_eq!(first.edge_count(), 3);
        assert_eq!(second.node_count(), 3);
        assert_eq!(second.edge_count(), 3);
        assert!(first.has_edge("a1", "a2"));
        assert!(!first.has_node("b1"));
        assert_eq!(first.node_attr("a1", "color"), Some(&AttrValue::from("red")));
        assert_eq!(
            first.node_attr("a1", "community_id"),
            Some(&AttrValue::Int(0))
        );
    }

    #[test]
    fn test_single_edge_splits_into_singletons() {
        let mut g = Graph::new();
        g.insert_edge("x", "y");
        let count = partition_communities(&mut g, 2, None).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            g.node_attr("x", "community_id"),
            Some(&AttrValue::Int(0))
        );
    }
}

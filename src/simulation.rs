use std::collections::{BTreeMap, VecDeque};

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::analysis::{average_shortest_path, component_sets};
use crate::graph::Graph;
use crate::types::{EdgeKey, GraphError, NodeId};

/// Betweenness centrality per node (Brandes' algorithm for undirected,
/// unweighted graphs), normalized by 2 / ((n - 1)(n - 2)) so scores are
/// comparable across graph sizes; graphs with fewer than three nodes score
/// zero everywhere.
pub fn betweenness_centrality(graph: &Graph) -> BTreeMap<NodeId, f64> {
    let nodes: Vec<&str> = graph.nodes().collect();
    let index: BTreeMap<&str, usize> =
        nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
    let n = nodes.len();
    let mut betweenness = vec![0.0f64; n];

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
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                betweenness[w] += delta[w];
            }
        }
    }

    // Each unordered pair was counted from both endpoints.
    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.to_string(), betweenness[i] * scale))
        .collect()
}

struct MetricSnapshot {
    avg_path: Option<f64>,
    components: usize,
    betweenness: BTreeMap<NodeId, f64>,
}

fn snapshot_metrics(graph: &Graph) -> MetricSnapshot {
    MetricSnapshot {
        avg_path: average_shortest_path(graph),
        components: component_sets(graph).len(),
        betweenness: betweenness_centrality(graph),
    }
}

/// Impact report of a single random edge-failure event.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub removed_edges: Vec<EdgeKey>,
    pub original_components: usize,
    pub new_components: usize,
    /// Percent change of the average shortest path; only available when the
    /// graph stayed connected both before and after the removal.
    pub path_change_pct: Option<f64>,
    /// Node with the largest betweenness-centrality decrease and its
    /// magnitude; ties go to the smallest node id.
    pub max_betweenness_drop: Option<(NodeId, f64)>,
}

/// Remove `k` uniformly sampled distinct edges from an independent copy of
/// the graph and compare path length, component count and betweenness
/// centrality against the untouched baseline.
pub fn simulate_failure(
    graph: &Graph,
    k: usize,
    rng: &mut impl Rng,
) -> Result<FailureReport, GraphError> {
    if k > graph.edge_count() {
        return Err(GraphError::InvalidParameter(format!(
            "cannot remove {} edges from a graph with {} edges",
            k,
            graph.edge_count()
        )));
    }

    let baseline = snapshot_metrics(graph);

    let all_edges: Vec<EdgeKey> = graph.edges().cloned().collect();
    let removed_edges: Vec<EdgeKey> =
        all_edges.choose_multiple(rng, k).cloned().collect();

    let mut copy = graph.clone();
    for edge in &removed_edges {
        let (u, v) = edge.endpoints();
        copy.remove_edge(u, v);
    }
    let damaged = snapshot_metrics(&copy);

    let path_change_pct = match (baseline.avg_path, damaged.avg_path) {
        (Some(before), Some(after)) if before > 0.0 => {
            Some((after - before) / before * 100.0)
        }
        _ => None,
    };

    let mut max_betweenness_drop: Option<(NodeId, f64)> = None;
    for (node, before) in &baseline.betweenness {
        let after = damaged.betweenness.get(node).copied().unwrap_or(0.0);
        let drop = before - after;
        let better = max_betweenness_drop
            .as_ref()
            .map_or(true, |(_, best)| drop > *best);
        if better {
            max_betweenness_drop = Some((node.clone(), drop));
        }
    }

    Ok(FailureReport {
        removed_edges,
        original_components: baseline.components,
        new_components: damaged.components,
        path_change_pct,
        max_betweenness_drop,
    })
}

/// Aggregate outcome of repeated failure trials.
#[derive(Debug, Clone)]
pub struct RobustnessReport {
    pub trials: usize,
    pub failures: usize,
    pub mean_components: f64,
    pub max_largest_component: usize,
    pub min_largest_component: usize,
    /// Set when an expected community count was supplied and any trial
    /// fragmented the graph.
    pub vulnerable: bool,
}

/// Run `trials` independent failure simulations of `k` random edge removals
/// each, always on a fresh copy, and aggregate component statistics. Fails
/// up front when `k` exceeds the edge count; no trial runs in that case.
pub fn robustness_check(
    graph: &Graph,
    k: usize,
    expected_components: Option<usize>,
    trials: usize,
    rng: &mut impl Rng,
) -> Result<RobustnessReport, GraphError> {
    if k > graph.edge_count() {
        return Err(GraphError::InvalidParameter(format!(
            "not enough edges to remove {} (graph has {})",
            k,
            graph.edge_count()
        )));
    }
    if trials == 0 {
        return Err(GraphError::InvalidParameter(
            "robustness check needs at least one trial".to_string(),
        ));
    }

    let all_edges: Vec<EdgeKey> = graph.edges().cloned().collect();
    let mut component_counts = Vec::with_capacity(trials);
    let mut largest_components = Vec::with_capacity(trials);

    for _ in 0..trials {
        let mut copy = graph.clone();
        for edge in all_edges.choose_multiple(rng, k) {
            let (u, v) = edge.endpoints();
            copy.remove_edge(u, v);
        }
        let components = component_sets(&copy);
        component_counts.push(components.len());
        largest_components.push(components.iter().map(|c| c.len()).max().unwrap_or(0));
    }

    let mean_components =
        component_counts.iter().sum::<usize>() as f64 / trials as f64;
    let max_observed = component_counts.iter().copied().max().unwrap_or(0);
    let vulnerable = expected_components.is_some() && max_observed > 1;
    if vulnerable {
        warn!(
            "high component count suggests the network is vulnerable to {} failures",
            k
        );
    }

    Ok(RobustnessReport {
        trials,
        failures: k,
        mean_components,
        max_largest_component: largest_components.iter().copied().max().unwrap_or(0),
        min_largest_component: largest_components.iter().copied().min().unwrap_or(0),
        vulnerable,
    })
}

#[cfg(test)]
mod test_simulation {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::graph::Graph;
    use crate::simulation::{betweenness_centrality, robustness_check, simulate_failure};
    use crate::types::GraphError;

    fn path_graph(ids: &[&str]) -> Graph {
        let mut g = Graph::new();
        for pair in ids.windows(2) {
            g.insert_edge(pair[0], pair[1]);
        }
        g
    }

    #[test]
    fn test_betweenness_on_path() {
        let g = path_graph(&["0", "1", "2", "3"]);
        let bc = betweenness_centrality(&g);
        assert_eq!(bc["0"], 0.0);
        assert_eq!(bc["3"], 0.0);
        assert!((bc["1"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((bc["2"] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulate_failure_reports_fragmentation() {
        let g = path_graph(&["0", "1", "2", "3"]);
        let mut rng = StdRng::seed_from_u64(42);
        let report = simulate_failure(&g, 1, &mut rng).unwrap();
        assert_eq!(report.original_components, 1);
        assert_eq!(report.new_components, 2);
        // Disconnected afterwards, so no path comparison is possible.
        assert_eq!(report.path_change_pct, None);
        assert!(report.max_betweenness_drop.is_some());
        // The original graph is untouched.
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_failure_count_above_edge_count_fails() {
        let g = path_graph(&["0", "1"]);
        let mut rng = StdRng::seed_from_u64(42);
        let err = simulate_failure(&g, 2, &mut rng).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParameter(_)));
        let err = robustness_check(&g, 2, None, 10, &mut rng).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParameter(_)));
    }

    #[test]
    fn test_removing_every_edge_yields_singletons() {
        let g = path_graph(&["0", "1", "2", "3"]);
        let mut rng = StdRng::seed_from_u64(1);
        let report = robustness_check(&g, 3, Some(2), 5, &mut rng).unwrap();
        assert_eq!(report.mean_components, 4.0);
        assert_eq!(report.max_largest_component, 1);
        assert_eq!(report.min_largest_component, 1);
        assert!(report.vulnerable);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let g = path_graph(&["0", "1", "2", "3", "4", "5"]);
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        let report_a = simulate_failure(&g, 2, &mut rng_a).unwrap();
        let report_b = simulate_failure(&g, 2, &mut rng_b).unwrap();
        assert_eq!(report_a.removed_edges, report_b.removed_edges);
        assert_eq!(report_a.new_components, report_b.new_components);
    }
}

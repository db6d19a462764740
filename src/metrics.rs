use std::collections::{BTreeMap, BTreeSet, VecDeque};

use itertools::Itertools;
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::analysis::component_sets;
use crate::attribute::AttrValue;
use crate::graph::Graph;
use crate::types::{EdgeKey, GraphError, NodeId};

/// Outcome of a homophily check. Numeric attributes compare mean absolute
/// differences across connected and sampled non-connected pairs; categorical
/// attributes count matching endpoint values per edge.
#[derive(Debug, Clone, PartialEq)]
pub enum HomophilyReport {
    Numeric {
        connected_mean: f64,
        disconnected_mean: f64,
        sample_size: usize,
        homophilous: bool,
    },
    Categorical {
        matching_edges: usize,
        total_edges: usize,
        ratio: f64,
        homophilous: bool,
    },
}

fn edge_sign(graph: &Graph, u: &str, v: &str, sign_key: &str) -> Result<i64, GraphError> {
    match graph.edge_attr(u, v, sign_key) {
        None => Ok(1),
        Some(AttrValue::Int(value)) => Ok(*value),
        Some(other) => Err(GraphError::Structural(format!(
            "edge ({}, {}) carries a non-integer '{}' value: {}",
            u, v, sign_key, other
        ))),
    }
}

/// Check structural balance of a signed graph: every cycle in a cycle basis
/// must contain an even number of negative edges. A spanning forest of the
/// largest connected component supplies the basis, one cycle per non-tree
/// edge; checking the basis suffices because sign parity is linear over the
/// cycle space. Cycles shorter than three nodes are ignored. Missing signs
/// default to +1.
pub fn check_balance(graph: &Graph, sign_key: &str) -> Result<bool, GraphError> {
    let components = component_sets(graph);
    let Some(target) = components.iter().max_by_key(|c| c.len()) else {
        return Ok(true);
    };

    // Spanning forest with parent links, rooted anywhere in the component.
    let mut parent = BTreeMap::<&str, &str>::new();
    let mut visited = BTreeSet::<&str>::new();
    let mut tree_edges = BTreeSet::<EdgeKey>::new();
    for root in target.iter() {
        if visited.contains(root.as_str()) {
            continue;
        }
        visited.insert(root);
        let mut queue = VecDeque::new();
        queue.push_back(root.as_str());
        while let Some(node) = queue.pop_front() {
            for neighbor in graph.neighbors(node) {
                if !visited.contains(neighbor) {
                    visited.insert(neighbor);
                    parent.insert(neighbor, node);
                    tree_edges.insert(EdgeKey::new(node, neighbor));
                    queue.push_back(neighbor);
                }
            }
        }
    }

    for edge in graph.edges() {
        let (u, v) = edge.endpoints();
        if !target.contains(u) || !target.contains(v) || tree_edges.contains(edge) {
            continue;
        }

        // Tree paths from both endpoints up to their lowest common ancestor
        // close the basis cycle together with the chord itself.
        let mut u_path = vec![u];
        let mut node = u;
        while let Some(p) = parent.get(node) {
            node = p;
            u_path.push(node);
        }
        let u_pos: BTreeMap<&str, usize> =
            u_path.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut v_path = vec![v];
        let mut node = v;
        while !u_pos.contains_key(node) {
            node = parent[node];
            v_path.push(node);
        }
        let lca_index = u_pos[node];

        let cycle_len = lca_index + v_path.len();
        if cycle_len < 3 {
            continue;
        }

        let mut negative = 0;
        for pair in u_path[..=lca_index].windows(2) {
            if edge_sign(graph, pair[0], pair[1], sign_key)? == -1 {
                negative += 1;
            }
        }
        for pair in v_path.windows(2) {
            if edge_sign(graph, pair[0], pair[1], sign_key)? == -1 {
                negative += 1;
            }
        }
        if edge_sign(graph, u, v, sign_key)? == -1 {
            negative += 1;
        }

        if negative % 2 != 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Test whether connected nodes resemble each other on `attribute_key` more
/// than chance would suggest. Numeric attributes: homophily is present when
/// the mean absolute difference over edges is *smaller* than over an equally
/// sized random sample of non-edges (smaller difference means more similar;
/// the reference program inverted this in one branch, corrected here).
/// Categorical attributes: homophily is present when more than half the
/// edges join identical values.
pub fn check_homophily(
    graph: &Graph,
    attribute_key: &str,
    rng: &mut impl Rng,
) -> Result<HomophilyReport, GraphError> {
    let first_value = graph
        .nodes()
        .find_map(|node| graph.node_attr(node, attribute_key));
    let Some(first_value) = first_value else {
        return Err(GraphError::InsufficientData(format!(
            "no node carries the '{}' attribute",
            attribute_key
        )));
    };

    if first_value.is_numeric() {
        let mut connected_diffs = Vec::new();
        for edge in graph.edges() {
            let (u, v) = edge.endpoints();
            let (Some(a), Some(b)) = (
                graph.node_attr(u, attribute_key),
                graph.node_attr(v, attribute_key),
            ) else {
                continue;
            };
            let (Some(a), Some(b)) = (a.as_number(), b.as_number()) else {
                return Err(GraphError::InsufficientData(format!(
                    "attribute '{}' is not consistently numeric",
                    attribute_key
                )));
            };
            connected_diffs.push((a - b).abs());
        }

        let non_edges: Vec<(&str, &str)> = graph
            .nodes()
            .tuple_combinations()
            .filter(|(u, v)| !graph.has_edge(u, v))
            .collect();
        let sample_size = non_edges.len().min(connected_diffs.len());

        let mut disconnected_diffs = Vec::new();
        for (u, v) in non_edges.choose_multiple(rng, sample_size) {
            let (Some(a), Some(b)) = (
                graph.node_attr(u, attribute_key),
                graph.node_attr(v, attribute_key),
            ) else {
                continue;
            };
            if let (Some(a), Some(b)) = (a.as_number(), b.as_number()) {
                disconnected_diffs.push((a - b).abs());
            }
        }

        if connected_diffs.is_empty() || disconnected_diffs.is_empty() {
            return Err(GraphError::InsufficientData(
                "not enough comparison pairs for a homophily check".to_string(),
            ));
        }

        let connected_mean =
            connected_diffs.iter().sum::<f64>() / connected_diffs.len() as f64;
        let disconnected_mean =
            disconnected_diffs.iter().sum::<f64>() / disconnected_diffs.len() as f64;
        Ok(HomophilyReport::Numeric {
            connected_mean,
            disconnected_mean,
            sample_size: disconnected_diffs.len(),
            homophilous: connected_mean < disconnected_mean,
        })
    } else {
        let total_edges = graph.edge_count();
        if total_edges == 0 {
            return Err(GraphError::InsufficientData(
                "graph has no edges to compare".to_string(),
            ));
        }
        let mut matching_edges = 0;
        for edge in graph.edges() {
            let (u, v) = edge.endpoints();
            if let (Some(a), Some(b)) = (
                graph.node_attr(u, attribute_key),
                graph.node_attr(v, attribute_key),
            ) {
                if a == b {
                    matching_edges += 1;
                }
            }
        }
        let ratio = matching_edges as f64 / total_edges as f64;
        Ok(HomophilyReport::Categorical {
            matching_edges,
            total_edges,
            ratio,
            homophilous: ratio > 0.5,
        })
    }
}

/// Annotate the graph with the per-node clustering coefficient and the
/// per-edge neighborhood overlap.
pub fn compute_metrics(graph: &mut Graph) {
    if graph.node_count() == 0 {
        info!("graph empty, no metrics computed");
        return;
    }

    let mut coefficients = BTreeMap::<NodeId, f64>::new();
    for node in graph.nodes() {
        let neighbors: Vec<&str> = graph.neighbors(node).collect();
        let degree = neighbors.len();
        let coefficient = if degree < 2 {
            0.0
        } else {
            let links = neighbors
                .iter()
                .tuple_combinations()
                .filter(|(a, b)| graph.has_edge(a, b))
                .count();
            2.0 * links as f64 / (degree * (degree - 1)) as f64
        };
        coefficients.insert(node.to_string(), coefficient);
    }
    for (node, coefficient) in coefficients {
        graph.set_node_attr(&node, "clustering_coefficient", AttrValue::Float(coefficient));
    }

    let mut overlaps = Vec::<(EdgeKey, f64)>::new();
    for edge in graph.edges() {
        let (u, v) = edge.endpoints();
        let u_neighbors: BTreeSet<&str> = graph.neighbors(u).collect();
        let v_neighbors: BTreeSet<&str> = graph.neighbors(v).collect();
        let common = u_neighbors.intersection(&v_neighbors).count();
        let all = u_neighbors.union(&v_neighbors).count();
        let overlap = if all > 0 { common as f64 / all as f64 } else { 0.0 };
        overlaps.push((edge.clone(), overlap));
    }
    for (edge, overlap) in overlaps {
        let (u, v) = edge.endpoints();
        let (u, v) = (u.to_string(), v.to_string());
        graph.set_edge_attr(&u, &v, "neighborhood_overlap", AttrValue::Float(overlap));
    }
    info!("clustering coefficients and neighborhood overlap stored");
}

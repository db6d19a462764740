use std::collections::{BTreeMap, BTreeSet};

use crate::attribute::{AttrMap, AttrValue};
use crate::types::{EdgeKey, NodeId};

/// In-memory undirected graph with open attribute records on nodes and
/// edges. Adjacency is kept in `BTreeMap`/`BTreeSet`, so node and neighbor
/// enumeration is always in ascending id order. Cloning yields a deep,
/// independent copy, which is what the failure simulator mutates.
#[derive(Default, Debug, Clone)]
pub struct Graph {
    adj_map: BTreeMap<NodeId, BTreeSet<NodeId>>,
    node_attrs: BTreeMap<NodeId, AttrMap>,
    edge_attrs: BTreeMap<EdgeKey, AttrMap>,
    e_size: usize,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn node_count(&self) -> usize {
        self.adj_map.len()
    }

    pub fn edge_count(&self) -> usize {
        self.e_size
    }

    pub fn has_node(&self, u: &str) -> bool {
        self.adj_map.contains_key(u)
    }

    /// If an edge exists in this graph. Symmetric in its arguments.
    pub fn has_edge(&self, u: &str, v: &str) -> bool {
        self.adj_map.get(u).map_or(false, |neighbors| neighbors.contains(v))
    }

    pub fn insert_node(&mut self, u: &str) {
        self.adj_map.entry(u.to_string()).or_default();
    }

    /// Insert an undirected edge, creating missing endpoints. Self loops and
    /// parallel edges are rejected; returns whether the edge was added.
    pub fn insert_edge(&mut self, u: &str, v: &str) -> bool {
        if u == v {
            return false;
        }
        self.insert_node(u);
        self.insert_node(v);
        if self.has_edge(u, v) {
            return false;
        }
        self.adj_map.get_mut(u).unwrap().insert(v.to_string());
        self.adj_map.get_mut(v).unwrap().insert(u.to_string());
        self.edge_attrs.insert(EdgeKey::new(u, v), AttrMap::new());
        self.e_size += 1;
        true
    }

    /// Remove an existing edge from the graph, dropping its attribute record.
    pub fn remove_edge(&mut self, u: &str, v: &str) -> bool {
        if !self.has_edge(u, v) {
            return false;
        }
        self.adj_map.get_mut(u).unwrap().remove(v);
        self.adj_map.get_mut(v).unwrap().remove(u);
        self.edge_attrs.remove(&EdgeKey::new(u, v));
        self.e_size -= 1;
        true
    }

    /// Nodes in ascending id order. The iterator is `Clone` so callers can
    /// enumerate node pairs without collecting first.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + Clone {
        self.adj_map.keys().map(String::as_str)
    }

    /// Neighbors of `u` in ascending id order; empty when `u` is unknown.
    pub fn neighbors<'a>(&'a self, u: &str) -> impl Iterator<Item = &'a str> {
        self.adj_map.get(u).into_iter().flatten().map(String::as_str)
    }

    pub fn degree(&self, u: &str) -> usize {
        self.adj_map.get(u).map_or(0, |neighbors| neighbors.len())
    }

    /// Canonical edge keys in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edge_attrs.keys()
    }

    pub fn node_attr(&self, u: &str, key: &str) -> Option<&AttrValue> {
        self.node_attrs.get(u).and_then(|attrs| attrs.get(key))
    }

    pub fn node_attr_map(&self, u: &str) -> Option<&AttrMap> {
        self.node_attrs.get(u)
    }

    /// Write a node attribute; ignored when the node does not exist.
    pub fn set_node_attr(&mut self, u: &str, key: &str, value: AttrValue) {
        if !self.has_node(u) {
            return;
        }
        self.node_attrs
            .entry(u.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn edge_attr(&self, u: &str, v: &str, key: &str) -> Option<&AttrValue> {
        self.edge_attrs
            .get(&EdgeKey::new(u, v))
            .and_then(|attrs| attrs.get(key))
    }

    pub fn edge_attr_map(&self, edge: &EdgeKey) -> Option<&AttrMap> {
        self.edge_attrs.get(edge)
    }

    /// Write an edge attribute; ignored when the edge does not exist.
    pub fn set_edge_attr(&mut self, u: &str, v: &str, key: &str, value: AttrValue) {
        if let Some(attrs) = self.edge_attrs.get_mut(&EdgeKey::new(u, v)) {
            attrs.insert(key.to_string(), value);
        }
    }

    /// Materialize the subgraph induced by `members`: those nodes with their
    /// attribute records, plus only the edges with both endpoints inside.
    pub fn induced_subgraph(&self, members: &BTreeSet<NodeId>) -> Graph {
        let mut sub = Graph::new();
        for node in members {
            if !self.has_node(node) {
                continue;
            }
            sub.insert_node(node);
            if let Some(attrs) = self.node_attrs.get(node) {
                sub.node_attrs.insert(node.clone(), attrs.clone());
            }
        }
        for (edge, attrs) in &self.edge_attrs {
            let (u, v) = edge.endpoints();
            if members.contains(u) && members.contains(v) {
                sub.insert_edge(u, v);
                sub.edge_attrs.insert(edge.clone(), attrs.clone());
            }
        }
        sub
    }
}

#[cfg(test)]
mod test_graph {
    use std::collections::BTreeSet;

    use crate::attribute::AttrValue;
    use crate::graph::Graph;

    fn triangle() -> Graph {
        let mut g = Graph::new();
        g.insert_edge("A", "B");
        g.insert_edge("B", "C");
        g.insert_edge("C", "A");
        g
    }

    #[test]
    fn test_insert_and_remove_edge() {
        let mut g = triangle();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert!(g.has_edge("B", "A"));

        // Parallel edges and self loops are rejected.
        assert!(!g.insert_edge("A", "B"));
        assert!(!g.insert_edge("A", "A"));
        assert_eq!(g.edge_count(), 3);

        assert!(g.remove_edge("A", "B"));
        assert!(!g.has_edge("A", "B"));
        assert_eq!(g.edge_count(), 2);
        assert!(!g.remove_edge("A", "B"));
    }

    #[test]
    fn test_neighbor_order_is_ascending() {
        let mut g = Graph::new();
        g.insert_edge("N", "Z");
        g.insert_edge("N", "A");
        g.insert_edge("N", "M");
        let neighbors: Vec<&str> = g.neighbors("N").collect();
        assert_eq!(neighbors, vec!["A", "M", "Z"]);
    }

    #[test]
    fn test_attributes_survive_deep_copy() {
        let mut g = triangle();
        g.set_node_attr("A", "color", AttrValue::from("red"));
        g.set_edge_attr("A", "B", "sign", AttrValue::Int(-1));

        let mut copy = g.clone();
        copy.set_node_attr("A", "color", AttrValue::from("blue"));
        copy.remove_edge("A", "B");

        assert_eq!(g.node_attr("A", "color"), Some(&AttrValue::from("red")));
        assert_eq!(g.edge_attr("B", "A", "sign"), Some(&AttrValue::Int(-1)));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_node_iterator_enumerates_pairs() {
        use itertools::Itertools;

        let g = triangle();
        // The iterator must stay cloneable for pairwise enumeration.
        let pairs: Vec<(&str, &str)> = g.nodes().tuple_combinations().collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
    }

    #[test]
    fn test_induced_subgraph() {
        let mut g = triangle();
        g.insert_edge("C", "D");
        let members: BTreeSet<String> =
            ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let sub = g.induced_subgraph(&members);
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.edge_count(), 3);
        assert!(!sub.has_node("D"));
    }
}

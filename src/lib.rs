//! Analysis, transformation and robustness simulation for undirected graphs
//! persisted in the GML text format.
//!
//! The engine loads a graph into [`graph::Graph`], annotates it with the
//! results of traversal, component labeling, community partitioning and
//! metric computation, simulates random edge failures on independent copies,
//! and serializes the annotated graph back to disk via [`graph_io`].

pub mod analysis;
pub mod attribute;
pub mod config;
pub mod graph;
pub mod graph_io;
pub mod logger;
pub mod metrics;
pub mod partition;
pub mod simulation;
pub mod traversal;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;

use graph_analysis::analysis;
use graph_analysis::config::AnalysisConfig;
use graph_analysis::graph_io;
use graph_analysis::logger;
use graph_analysis::metrics::{self, HomophilyReport};
use graph_analysis::partition;
use graph_analysis::simulation;
use graph_analysis::traversal;

/// Analyze structural properties, explore patterns, and simulate
/// manipulations of GML graphs.
#[derive(Parser, Debug)]
#[command(name = "graph_analysis", version)]
struct Args {
    /// Path to one .gml graph file
    graph_file: PathBuf,

    /// Run BFS from one or more start nodes and store path attributes
    #[arg(long, value_name = "NODE", num_args = 1..)]
    multi_bfs: Option<Vec<String>>,

    /// Print connectivity, cycle, density and path-length analysis
    #[arg(long)]
    analyze: bool,

    /// Partition graph into n components using Girvan-Newman
    #[arg(long, value_name = "N")]
    components: Option<usize>,

    /// Directory to export each community as its own .gml file
    #[arg(long, value_name = "DIR")]
    split_output_dir: Option<PathBuf>,

    /// Perform a robustness check with the given number of random edge failures
    #[arg(long, value_name = "K", num_args = 0..=1, default_missing_value = "5")]
    robustness_check: Option<usize>,

    /// Randomly remove k edges and analyze how it affects the network
    #[arg(long, value_name = "K")]
    simulate_failures: Option<usize>,

    /// Check node-attribute homophily across edges
    #[arg(long)]
    verify_homophily: bool,

    /// Node attribute key for the homophily check
    #[arg(long, value_name = "KEY")]
    homophily_key: Option<String>,

    /// Check if the signed graph is structurally balanced
    #[arg(long)]
    verify_balanced_graph: bool,

    /// Compute clustering coefficients and neighborhood overlap
    #[arg(long)]
    metrics: bool,

    /// Optional YAML file with analysis defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for the random generator, for reproducible simulations
    #[arg(long)]
    seed: Option<u64>,

    /// Save the graph with all new attributes to this file
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    logger::init_logger().map_err(|e| anyhow::anyhow!("logger setup failed: {}", e))?;
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("======================================");
    println!("Starting analysis for: {}", args.graph_file.display());
    println!("======================================");

    let mut graph = graph_io::read_graph(&args.graph_file)?;
    println!(
        "Graph loaded successfully: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    if let Some(start_nodes) = &args.multi_bfs {
        let starts: Vec<&str> = start_nodes.iter().map(String::as_str).collect();
        for outcome in traversal::multi_source_bfs(&mut graph, &starts) {
            match outcome {
                traversal::BfsOutcome::Completed { start, index, reached } => println!(
                    "BFS from node '{}' was successful ({} nodes reached, suffix '_{}').",
                    start, reached, index
                ),
                traversal::BfsOutcome::SkippedMissing { start, .. } => {
                    println!("Node '{}' could not be found. Skipping node.", start)
                }
            }
        }
    }

    if let Some(k) = args.simulate_failures {
        println!("\n===== Failure Simulation ({} Edges) =====", k);
        match simulation::simulate_failure(&graph, k, &mut rng) {
            Ok(report) => {
                println!("Original Connected Components: {}", report.original_components);
                println!("New Connected Components: {}", report.new_components);
                match report.path_change_pct {
                    Some(change) => println!("Average Shortest Path Change: {:.2}%", change),
                    None => println!("Average Shortest Path: N/A (disconnected graph)."),
                }
                if let Some((node, drop)) = report.max_betweenness_drop {
                    println!("Node with Max Betweenness Centrality Drop: {}", node);
                    println!("Drop: {:.4}", drop);
                }
            }
            Err(e) => error!("failure simulation aborted: {}", e),
        }
    }

    if let Some(k) = args.robustness_check {
        let trials = config.robustness_trials;
        println!("\n===== Running Robustness Check ({} Failures, {} Runs) =====", k, trials);
        match simulation::robustness_check(&graph, k, args.components, trials, &mut rng) {
            Ok(report) => {
                println!("Average number of connected components: {:.2}", report.mean_components);
                println!("Max component size over all runs: {}", report.max_largest_component);
                println!("Min component size over all runs: {}", report.min_largest_component);
                if report.vulnerable {
                    println!(
                        "Note: the high component count suggests that the network's \
                         structure is vulnerable to {} failures.",
                        k
                    );
                }
            }
            Err(e) => error!("robustness check aborted: {}", e),
        }
    }

    if let Some(k) = args.components {
        println!("\n===== Community Partitioning (Girvan-Newman) =====");
        println!("Target Components: {}", k);
        match partition::partition_communities(&mut graph, k, args.split_output_dir.as_deref()) {
            Ok(actual) => println!("Partitioning successful. Found {} communities.", actual),
            Err(e) => error!("partitioning aborted: {}", e),
        }
    }

    if args.verify_homophily {
        let key = args.homophily_key.as_deref().unwrap_or(&config.homophily_key);
        println!("\n===== Homophily Check Results =====");
        println!("Attribute Key: {}", key);
        match metrics::check_homophily(&graph, key, &mut rng) {
            Ok(HomophilyReport::Numeric {
                connected_mean,
                disconnected_mean,
                homophilous,
                ..
            }) => {
                println!("Connected Node Mean Difference: {:.4}", connected_mean);
                println!("Unconnected Node Mean Difference: {:.4}", disconnected_mean);
                print_homophily_verdict(homophilous);
            }
            Ok(HomophilyReport::Categorical {
                matching_edges,
                total_edges,
                ratio,
                homophilous,
            }) => {
                println!("Edges with same attribute: {}/{}", matching_edges, total_edges);
                println!("Homophily ratio: {:.4}", ratio);
                print_homophily_verdict(homophilous);
            }
            Err(e) => println!("Homophily check failed: {}", e),
        }
    }

    if args.verify_balanced_graph {
        println!(
            "\n=== Structural Balance Check with attribute '{}' ===",
            config.sign_key
        );
        match metrics::check_balance(&graph, &config.sign_key) {
            Ok(true) => println!("The graph is structurally balanced."),
            Ok(false) => println!("The graph is not structurally balanced."),
            Err(e) => println!("Balance check failed: {}", e),
        }
    }

    if args.analyze {
        println!("\n--- Graph Analysis ---");
        let num_components = analysis::connected_components(&mut graph);
        println!("Number of Connected Components: {}", num_components);

        if analysis::is_forest(&graph) {
            println!("The inputted graph does not contain cycles.");
        } else {
            println!("The inputted graph contains cycles.");
        }

        let isolated = analysis::isolated_nodes(&graph).join(", ");
        println!("The graph contains the following isolated nodes: [{}].", isolated);

        println!("Graph Density: {:.4}", analysis::density(&graph));
        match analysis::average_shortest_path(&graph) {
            Some(avg) => println!("Average Shortest Path Length: {:.4}", avg),
            None => println!("Average Shortest Path Length: N/A (graph is not connected)"),
        }
    }

    if args.metrics {
        metrics::compute_metrics(&mut graph);
        println!("Clustering coefficients and neighborhood overlap stored as attributes.");
    }

    if let Some(output) = &args.output {
        if let Err(e) = graph_io::write_graph(&graph, output) {
            error!("could not save graph: {}", e);
        } else {
            println!("Final graph saved to {}", output.display());
        }
    }

    Ok(())
}

fn print_homophily_verdict(homophilous: bool) {
    if homophilous {
        println!("Graph shows evidence of homophily");
    } else {
        println!("Graph does not show evidence of homophily");
    }
}

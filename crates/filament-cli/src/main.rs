//! Filament CLI - link-prediction experiments from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Infer implicit links from a weighted edgelist
//! filament infer graph.edges --group group.txt --features features.txt -o new.edges
//!
//! # Train the embedding model and export normalized embeddings
//! filament embed graph.edges --group group.txt --features features.txt \
//!     --test-edgelist test.edges --test-group tg.txt --test-features tf.txt \
//!     -o train_emb.txt --test-output test_emb.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filament_core::{FeaturePair, WeightedGraph};
use filament_infer::{infer_links, SolverConfig};
use filament_nn::{GraphBatch, ModelConfig, SageEmbedder, TrainConfig, Trainer};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "filament")]
#[command(about = "Link-prediction experiments over weighted graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer implicit links via fixed-point iteration
    Infer {
        /// Input edgelist (`src dst weight` lines)
        input: PathBuf,

        /// Group-half seed state (embedding-table format)
        #[arg(long)]
        group: PathBuf,

        /// Feature-half seed state (embedding-table format)
        #[arg(long)]
        features: PathBuf,

        /// Output edgelist
        #[arg(short, long)]
        output: PathBuf,

        /// Iteration cap
        #[arg(long, default_value = "2000")]
        max_iterations: usize,

        /// Convergence tolerance
        #[arg(long, default_value = "1e-3")]
        tolerance: f32,

        /// Emission threshold for pair scores
        #[arg(long, default_value = "30.0")]
        threshold: f32,
    },

    /// Train the embedding model and export embeddings
    Embed {
        /// Training edgelist
        input: PathBuf,

        /// Group-half node features
        #[arg(long)]
        group: PathBuf,

        /// Feature-half node features
        #[arg(long)]
        features: PathBuf,

        /// Held-out test edgelist
        #[arg(long)]
        test_edgelist: PathBuf,

        /// Test group-half node features
        #[arg(long)]
        test_group: PathBuf,

        /// Test feature-half node features
        #[arg(long)]
        test_features: PathBuf,

        /// Output path for training embeddings
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for test embeddings
        #[arg(long)]
        test_output: PathBuf,

        /// Training configuration as JSON (defaults applied per field)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,

        /// Override the configured random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Infer {
            input,
            group,
            features,
            output,
            max_iterations,
            tolerance,
            threshold,
        } => cmd_infer(
            input,
            group,
            features,
            output,
            max_iterations,
            tolerance,
            threshold,
        ),
        Commands::Embed {
            input,
            group,
            features,
            test_edgelist,
            test_group,
            test_features,
            output,
            test_output,
            config,
            epochs,
            seed,
        } => cmd_embed(
            input,
            group,
            features,
            test_edgelist,
            test_group,
            test_features,
            output,
            test_output,
            config,
            epochs,
            seed,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_infer(
    input: PathBuf,
    group: PathBuf,
    features: PathBuf,
    output: PathBuf,
    max_iterations: usize,
    tolerance: f32,
    threshold: f32,
) -> Result<()> {
    let graph = WeightedGraph::from_edgelist_file(&input)
        .with_context(|| format!("loading edgelist {}", input.display()))?;
    let seed = FeaturePair::from_files(&group, &features)
        .with_context(|| format!("loading seed state {} / {}", group.display(), features.display()))?;

    let config = SolverConfig::default()
        .with_max_iterations(max_iterations)
        .with_tolerance(tolerance)
        .with_threshold(threshold);

    let start = Instant::now();
    let links = infer_links(&graph, &seed, &config).context("link inference failed")?;
    let elapsed = start.elapsed();

    let mut inferred = WeightedGraph::new();
    // Emit in the original graph's node order so the edgelist is stable.
    for id in graph.node_ids() {
        inferred.add_node(id);
    }
    for edge in &links {
        let src = graph.node_id(edge.source).expect("scored edge in graph");
        let dst = graph.node_id(edge.target).expect("scored edge in graph");
        inferred.add_edge(src, dst, edge.weight)?;
    }
    inferred
        .write_edgelist_file(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} nodes, {} inferred edges in {:.3}s",
        graph.node_count(),
        links.len(),
        elapsed.as_secs_f64()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_embed(
    input: PathBuf,
    group: PathBuf,
    features: PathBuf,
    test_edgelist: PathBuf,
    test_group: PathBuf,
    test_features: PathBuf,
    output: PathBuf,
    test_output: PathBuf,
    config: Option<PathBuf>,
    epochs: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut train_config = match config {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<TrainConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => TrainConfig::default(),
    };
    if let Some(epochs) = epochs {
        train_config = train_config.with_epochs(epochs);
    }
    if let Some(seed) = seed {
        train_config = train_config.with_seed(seed);
    }

    let graph = WeightedGraph::from_edgelist_file(&input)
        .with_context(|| format!("loading edgelist {}", input.display()))?;
    let pair = FeaturePair::from_files(&group, &features).context("loading training features")?;

    let test_graph = WeightedGraph::from_edgelist_file(&test_edgelist)
        .with_context(|| format!("loading edgelist {}", test_edgelist.display()))?;
    let test_pair =
        FeaturePair::from_files(&test_group, &test_features).context("loading test features")?;

    let trainer = Trainer::new(train_config).context("initializing trainer")?;
    let model_config = ModelConfig {
        input_dim: pair.dim(),
        ..Default::default()
    };
    let model =
        SageEmbedder::new(model_config, trainer.device()).context("building model")?;

    let train_batch =
        GraphBatch::new(&graph, &pair, trainer.device()).context("staging training batch")?;
    let test_batch =
        GraphBatch::new(&test_graph, &test_pair, trainer.device()).context("staging test batch")?;

    let summary = trainer
        .run(&model, &train_batch, &test_batch, &output, &test_output)
        .context("training run failed")?;

    println!(
        "Val Loss: {:.4}, Duration: {:.3}s ({} epochs{})",
        summary.best_loss,
        summary.duration.as_secs_f64(),
        summary.epochs_run,
        if summary.stopped_early {
            ", stopped early"
        } else {
            ""
        }
    );
    Ok(())
}

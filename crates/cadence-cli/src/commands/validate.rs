//! Check a description: structure, rate consistency and liveness.

use std::path::PathBuf;

use anyhow::Context;
use cadence_core::{SynthesisLimits, solve_repetitions, synthesize};
use clap::Args;

use super::common::load_description;

/// Validate a graph description.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the TOML description
    pub file: PathBuf,
}

/// Run the validate command.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = load_description(&args.file)?;
    let graph = config.to_graph()?;
    graph.validate().context("invalid graph")?;

    let reps = solve_repetitions(&graph).context("rates are not balanced")?;
    let limits = SynthesisLimits {
        max_period_activations: config.max_period_activations,
    };
    let order = synthesize(&graph, &reps, &limits).context("no periodic schedule")?;

    tracing::debug!("validate: repetitions {:?}", reps.as_slice());
    println!(
        "OK: '{}' has {} nodes, {} edges, {} activations per period",
        config.name,
        graph.node_count(),
        graph.edge_count(),
        order.len()
    );
    Ok(())
}

//! Compile a description and print the generated schedule.

use std::path::PathBuf;

use anyhow::Context;
use cadence_config::{ModeConfig, ScheduleReport};
use cadence_core::SchedulingMode;
use clap::{Args, ValueEnum};

use super::common::{format_bytes, load_description};

/// Scheduling mode override.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Fixed period order, no readiness checks
    Static,
    /// Period order with readiness checks
    Async,
    /// Event-driven activation with guards
    FullyAsync,
}

impl From<ModeArg> for ModeConfig {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Static => ModeConfig::Static,
            ModeArg::Async => ModeConfig::Async,
            ModeArg::FullyAsync => ModeConfig::FullyAsync,
        }
    }
}

/// Report format.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Format {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
    /// TOML
    Toml,
}

/// Compile a graph description.
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to the TOML description
    pub file: PathBuf,

    /// Override the description's scheduling mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the asynchronous sizing margin (percent)
    #[arg(long)]
    pub margin: Option<u32>,

    /// Reject any edge that needs more than this many elements
    #[arg(long)]
    pub capacity_limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the schedule command.
pub fn run(args: ScheduleArgs) -> anyhow::Result<()> {
    let mut config = load_description(&args.file)?;
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(margin) = args.margin {
        config.async_margin_percent = margin;
    }
    if args.capacity_limit.is_some() {
        config.capacity_limit = args.capacity_limit;
    }

    let (_, compiled) = config
        .compile()
        .with_context(|| format!("compiling '{}'", config.name))?;
    let report = ScheduleReport::new(&config.name, &compiled);

    let text = match args.format {
        Format::Text => render_text(&report),
        Format::Json => report.to_json()?,
        Format::Toml => report.to_toml()?,
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("schedule written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn render_text(report: &ScheduleReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Graph:   {}\n", report.name));
    out.push_str(&format!("Mode:    {}\n", SchedulingMode::from(report.mode).as_str()));
    out.push_str(&format!("Period:  {} activations\n", report.period_activations));
    out.push_str(&format!("Memory:  {}\n", format_bytes(report.memory_bytes)));
    out.push_str(&format!("Order:   {}\n", report.order.join(" ")));
    if let Some(firing) = &report.firing_order {
        out.push_str(&format!("Firing:  {}\n", firing.join(" ")));
    }

    out.push_str("\nNodes:\n");
    let width = report.nodes.iter().map(|n| n.name.len()).max().unwrap_or(0);
    for node in &report.nodes {
        out.push_str(&format!(
            "  {:<width$}  x{:<4} code {}\n",
            node.name, node.repetitions, node.code
        ));
    }

    out.push_str("\nEdges:\n");
    for edge in &report.edges {
        out.push_str(&format!(
            "  {} -> {}  {} {}:{}  delay {}  capacity {} ({})\n",
            edge.from,
            edge.to,
            edge.ty,
            edge.production,
            edge.consumption,
            edge.delay,
            edge.capacity,
            format_bytes(edge.bytes)
        ));
    }
    out
}

//! Serializable view of a compiled schedule.

use cadence_core::{CompiledSchedule, Schedule};
use serde::{Deserialize, Serialize};

use crate::description::{ModeConfig, port_name};
use crate::error::ConfigError;

/// Per-node line of a [`ScheduleReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Node name.
    pub name: String,
    /// Diagnostic code.
    pub code: u32,
    /// Activations per period.
    pub repetitions: u32,
}

/// Per-edge line of a [`ScheduleReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeReport {
    /// Producer port as `node.slot`.
    pub from: String,
    /// Consumer port as `node.slot`.
    pub to: String,
    /// Element type name.
    #[serde(rename = "type")]
    pub ty: String,
    /// Elements produced per producer activation.
    pub production: u32,
    /// Elements consumed per consumer activation.
    pub consumption: u32,
    /// Initial tokens.
    pub delay: u32,
    /// Sized capacity in elements.
    pub capacity: usize,
    /// Storage in bytes.
    pub bytes: usize,
}

/// Everything the generation step decided, keyed by name rather than index.
///
/// ```rust
/// use cadence_config::{GraphConfig, ScheduleReport};
///
/// let config = GraphConfig::from_toml(r#"
///     name = "decimate"
///     [types]
///     q15 = 2
///     [[nodes]]
///     name = "adc"
///     outputs = [{ type = "q15", rate = 4 }]
///     [[nodes]]
///     name = "fir"
///     inputs = [{ type = "q15", rate = 2 }]
///     [[edges]]
///     from = "adc.0"
///     to = "fir.0"
/// "#).unwrap();
///
/// let (_, compiled) = config.compile().unwrap();
/// let report = ScheduleReport::new(&config.name, &compiled);
/// assert_eq!(report.order, ["adc", "fir", "fir"]);
/// assert_eq!(report.edges[0].capacity, 4);
/// assert_eq!(report.memory_bytes, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    /// Graph name.
    pub name: String,
    /// Scheduling mode.
    pub mode: ModeConfig,
    /// Activations in one period.
    pub period_activations: u64,
    /// Total FIFO storage in bytes.
    pub memory_bytes: usize,
    /// Static activation order of one period, by node name.
    pub order: Vec<String>,
    /// Round-robin firing order (fully-asynchronous schedules only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firing_order: Option<Vec<String>>,
    /// Nodes in declaration order.
    pub nodes: Vec<NodeReport>,
    /// Edges in declaration order.
    pub edges: Vec<EdgeReport>,
}

impl ScheduleReport {
    /// Builds the report for `compiled`.
    pub fn new(name: &str, compiled: &CompiledSchedule) -> Self {
        let graph = compiled.graph();
        let node_name = |id: cadence_core::NodeId| {
            graph
                .node(id)
                .map(|n| n.name().to_string())
                .unwrap_or_else(|| id.to_string())
        };

        let nodes = graph
            .nodes()
            .iter()
            .map(|node| NodeReport {
                name: node.name().to_string(),
                code: node.code(),
                repetitions: compiled.repetitions().get(node.id()),
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .map(|edge| {
                let capacity = compiled.capacity(edge.id()).unwrap_or(0);
                EdgeReport {
                    from: port_name(graph, edge.source()),
                    to: port_name(graph, edge.target()),
                    ty: edge.element().name().to_string(),
                    production: edge.production_rate(),
                    consumption: edge.consumption_rate(),
                    delay: edge.delay(),
                    capacity,
                    bytes: capacity * edge.element().size(),
                }
            })
            .collect();

        let firing_order = match compiled.schedule() {
            Schedule::Guarded(guards) => {
                Some(guards.firing_order.iter().map(|&id| node_name(id)).collect())
            }
            Schedule::Ordered(_) => None,
        };

        Self {
            name: name.to_string(),
            mode: compiled.mode().into(),
            period_activations: compiled.repetitions().total_activations(),
            memory_bytes: compiled.memory_bytes(),
            order: compiled.order().iter().map(|&id| node_name(id)).collect(),
            firing_order,
            nodes,
            edges,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pretty-printed TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

//! Graph description file format.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use cadence_core::{
    CompileOptions, CompiledSchedule, DEFAULT_MAX_PERIOD_ACTIVATIONS, ElementType, NodeId,
    NodeSpec, PortRef, SchedulingMode, SdfGraph,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Scheduling mode as written in description files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeConfig {
    /// `"static"`
    #[default]
    Static,
    /// `"async"`
    Async,
    /// `"fully-async"`
    FullyAsync,
}

impl From<ModeConfig> for SchedulingMode {
    fn from(mode: ModeConfig) -> Self {
        match mode {
            ModeConfig::Static => SchedulingMode::Static,
            ModeConfig::Async => SchedulingMode::Asynchronous,
            ModeConfig::FullyAsync => SchedulingMode::FullyAsynchronous,
        }
    }
}

impl From<SchedulingMode> for ModeConfig {
    fn from(mode: SchedulingMode) -> Self {
        match mode {
            SchedulingMode::Static => ModeConfig::Static,
            SchedulingMode::Asynchronous => ModeConfig::Async,
            SchedulingMode::FullyAsynchronous => ModeConfig::FullyAsync,
        }
    }
}

/// One port: element type name and rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Element type, resolved through the description's `[types]` table.
    #[serde(rename = "type")]
    pub ty: String,
    /// Elements moved per activation.
    pub rate: u32,
}

impl PortConfig {
    /// Create a port description.
    pub fn new(ty: impl Into<String>, rate: u32) -> Self {
        Self { ty: ty.into(), rate }
    }
}

/// One node: name, optional diagnostic code and ports in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node name.
    pub name: String,
    /// Diagnostic code reported on failure (defaults to the declaration
    /// index).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    /// Input ports, slot 0 first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<PortConfig>,
    /// Output ports, slot 0 first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PortConfig>,
}

impl NodeConfig {
    /// Create a node with no ports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    /// Append an input port.
    pub fn with_input(mut self, ty: impl Into<String>, rate: u32) -> Self {
        self.inputs.push(PortConfig::new(ty, rate));
        self
    }

    /// Append an output port.
    pub fn with_output(mut self, ty: impl Into<String>, rate: u32) -> Self {
        self.outputs.push(PortConfig::new(ty, rate));
        self
    }
}

/// One edge between `"node.slot"` port references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Producer output, e.g. `"adc.0"`.
    pub from: String,
    /// Consumer input, e.g. `"fir.0"`.
    pub to: String,
    /// Initial tokens.
    #[serde(default)]
    pub delay: u32,
}

impl EdgeConfig {
    /// Create an edge with no delay.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            delay: 0,
        }
    }

    /// Set the delay.
    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }
}

/// TOML description of a dataflow graph plus its compile options.
///
/// # TOML Format
///
/// ```toml
/// name = "pipeline"
/// mode = "async"            # static | async | fully-async
/// async_margin_percent = 25
///
/// [types]
/// q15 = 2
///
/// [[nodes]]
/// name = "adc"
/// code = 7
/// outputs = [{ type = "q15", rate = 4 }]
///
/// [[nodes]]
/// name = "fir"
/// inputs = [{ type = "q15", rate = 2 }]
///
/// [[edges]]
/// from = "adc.0"
/// to = "fir.0"
/// ```
///
/// Nodes are declared in file order, which is also the scheduler's
/// tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Name of the graph.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Scheduling mode.
    #[serde(default)]
    pub mode: ModeConfig,

    /// Extra headroom for asynchronous buffer sizing, in percent.
    #[serde(default)]
    pub async_margin_percent: u32,

    /// Upper bound on any edge capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_limit: Option<usize>,

    /// Upper bound on activations per period.
    #[serde(default = "default_max_period_activations")]
    pub max_period_activations: u64,

    /// Element type sizes in bytes, by name.
    #[serde(default)]
    pub types: BTreeMap<String, usize>,

    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Edges in declaration order.
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
}

fn default_max_period_activations() -> u64 {
    DEFAULT_MAX_PERIOD_ACTIVATIONS
}

impl GraphConfig {
    /// Create an empty static description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            mode: ModeConfig::Static,
            async_margin_percent: 0,
            capacity_limit: None,
            max_period_activations: DEFAULT_MAX_PERIOD_ACTIVATIONS,
            types: BTreeMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Set the scheduling mode.
    pub fn with_mode(mut self, mode: ModeConfig) -> Self {
        self.mode = mode;
        self
    }

    /// Declare an element type.
    pub fn with_type(mut self, name: impl Into<String>, size: usize) -> Self {
        self.types.insert(name.into(), size);
        self
    }

    /// Append a node.
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append an edge.
    pub fn with_edge(mut self, edge: EdgeConfig) -> Self {
        self.edges.push(edge);
        self
    }

    /// Load a description from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            "config_load: '{}' from {} ({} nodes, {} edges)",
            config.name,
            path.display(),
            config.nodes.len(),
            config.edges.len()
        );
        Ok(config)
    }

    /// Load a description from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the description to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the description to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Compile options carried by the description.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            mode: self.mode.into(),
            async_margin_percent: self.async_margin_percent,
            capacity_limit: self.capacity_limit,
            max_period_activations: self.max_period_activations,
        }
    }

    /// Builds the graph: nodes in file order, then edges in file order.
    ///
    /// Structural errors that need the whole graph (unconnected ports, type
    /// mismatches) are left to [`SdfGraph::validate`].
    pub fn to_graph(&self) -> Result<SdfGraph, ConfigError> {
        let mut graph = SdfGraph::new();
        let mut ids: HashMap<&str, NodeId> = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            if ids.contains_key(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode(node.name.clone()));
            }
            let mut spec = NodeSpec::new(node.name.as_str());
            if let Some(code) = node.code {
                spec = spec.code(code);
            }
            for port in &node.inputs {
                spec = spec.input(self.element(&node.name, &port.ty)?, port.rate);
            }
            for port in &node.outputs {
                spec = spec.output(self.element(&node.name, &port.ty)?, port.rate);
            }
            ids.insert(node.name.as_str(), graph.add_node(spec));
        }

        for edge in &self.edges {
            let (from, from_slot) = resolve(&ids, &edge.from)?;
            let (to, to_slot) = resolve(&ids, &edge.to)?;
            graph.connect_with_delay(from.output(from_slot), to.input(to_slot), edge.delay)?;
        }
        Ok(graph)
    }

    /// Builds, validates and compiles the graph in one step.
    pub fn compile(&self) -> Result<(SdfGraph, CompiledSchedule), ConfigError> {
        let graph = self.to_graph()?;
        let compiled = graph.compile(&self.compile_options())?;
        Ok((graph, compiled))
    }

    fn element(&self, node: &str, ty: &str) -> Result<ElementType, ConfigError> {
        self.types
            .get(ty)
            .map(|&size| ElementType::new(ty, size))
            .ok_or_else(|| ConfigError::UnknownType {
                node: node.to_string(),
                ty: ty.to_string(),
            })
    }
}

/// Splits `"node.slot"` and looks the node up. The slot is everything after
/// the last dot, so node names may themselves contain dots.
fn resolve(ids: &HashMap<&str, NodeId>, port: &str) -> Result<(NodeId, usize), ConfigError> {
    let (name, slot) = port
        .rsplit_once('.')
        .ok_or_else(|| ConfigError::InvalidPortRef(port.to_string()))?;
    let slot = slot
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidPortRef(port.to_string()))?;
    let id = ids
        .get(name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))?;
    Ok((id, slot))
}

/// Formats a port the way description files reference it.
pub fn port_name(graph: &SdfGraph, port: PortRef) -> String {
    match graph.node(port.node) {
        Some(node) => format!("{}.{}", node.name(), port.slot),
        None => format!("{}.{}", port.node, port.slot),
    }
}

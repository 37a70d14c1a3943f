//! Node and port types for the dataflow graph.
//!
//! Every node in a [`SdfGraph`](super::SdfGraph) has a [`NodeId`] (its
//! declaration index), a diagnostic code reported alongside runtime failures,
//! and fixed-rate input and output ports. A node's [`NodeShape`] is derived
//! from its port counts; nothing else about scheduling depends on what the
//! node computes.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use super::edge::EdgeId;

/// Unique identifier for a node in the dataflow graph.
///
/// Node IDs are the node's declaration index. They are assigned sequentially,
/// never reused, and stay valid in every artifact compiled from the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Creates an ID from a raw declaration index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the declaration index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns a reference to this node's input port `slot`.
    #[inline]
    pub fn input(self, slot: usize) -> PortRef {
        PortRef {
            node: self,
            direction: Direction::Input,
            slot,
        }
    }

    /// Returns a reference to this node's output port `slot`.
    #[inline]
    pub fn output(self, slot: usize) -> PortRef {
        PortRef {
            node: self,
            direction: Direction::Output,
            slot,
        }
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Whether a port consumes or produces elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Consumes `rate` elements per activation.
    Input,
    /// Produces `rate` elements per activation.
    Output,
}

/// Address of a single port: node, direction and slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRef {
    /// Owning node.
    pub node: NodeId,
    /// Input or output side.
    pub direction: Direction,
    /// Position among the node's ports of that direction.
    pub slot: usize,
}

impl core::fmt::Display for PortRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let side = match self.direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        write!(f, "node {} {side} {}", self.node.0, self.slot)
    }
}

/// Element type carried by a port or edge.
///
/// Two types match when both the name and the size agree. The size (in bytes)
/// is used to report per-edge memory and to check FIFO storage bound at
/// runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementType {
    name: String,
    size: usize,
}

impl ElementType {
    /// Creates an element type with an explicit size in bytes.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Creates an element type sized after the Rust type `T`.
    pub fn of<T>(name: impl Into<String>) -> Self {
        Self::new(name, core::mem::size_of::<T>())
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the element size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl core::fmt::Display for ElementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({}B)", self.name, self.size)
    }
}

/// Declaration of one port: element type and fixed rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    /// Element type moved through the port.
    pub element: ElementType,
    /// Elements moved per activation.
    pub rate: u32,
}

impl PortSpec {
    /// Creates a port declaration.
    pub fn new(element: ElementType, rate: u32) -> Self {
        Self { element, rate }
    }
}

/// Declaration of a node, consumed by [`SdfGraph::add_node`](super::SdfGraph::add_node).
///
/// ```rust
/// use cadence_core::graph::{ElementType, NodeSpec};
///
/// let q15 = ElementType::of::<i16>("q15");
/// let fir = NodeSpec::new("fir")
///     .code(12)
///     .input(q15.clone(), 4)
///     .output(q15, 4);
/// assert_eq!(fir.inputs.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSpec {
    /// Display name, used in logs and reports.
    pub name: String,
    /// Diagnostic code reported with runtime failures (defaults to the node index).
    pub code: Option<u32>,
    /// Input ports, in slot order.
    pub inputs: Vec<PortSpec>,
    /// Output ports, in slot order.
    pub outputs: Vec<PortSpec>,
}

impl NodeSpec {
    /// Creates a node declaration with no ports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Sets the diagnostic code.
    pub fn code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    /// Appends an input port.
    pub fn input(mut self, element: ElementType, rate: u32) -> Self {
        self.inputs.push(PortSpec::new(element, rate));
        self
    }

    /// Appends an output port.
    pub fn output(mut self, element: ElementType, rate: u32) -> Self {
        self.outputs.push(PortSpec::new(element, rate));
        self
    }
}

/// Structural role of a node, derived from its port counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
    /// Outputs only.
    Source,
    /// Inputs only.
    Sink,
    /// One input, one output.
    Transform,
    /// One input, several outputs.
    Split,
    /// Several inputs, one output.
    Merge,
    /// Several inputs and several outputs.
    Mixed,
    /// No ports at all.
    Isolated,
}

impl NodeShape {
    /// Classifies a node by its input and output port counts.
    pub fn classify(inputs: usize, outputs: usize) -> Self {
        match (inputs, outputs) {
            (0, 0) => Self::Isolated,
            (0, _) => Self::Source,
            (_, 0) => Self::Sink,
            (1, 1) => Self::Transform,
            (1, _) => Self::Split,
            (_, 1) => Self::Merge,
            _ => Self::Mixed,
        }
    }

    /// Returns true if the node produces elements.
    pub fn produces(self) -> bool {
        !matches!(self, Self::Sink | Self::Isolated)
    }

    /// Returns true if the node consumes elements.
    pub fn consumes(self) -> bool {
        !matches!(self, Self::Source | Self::Isolated)
    }
}

/// A node as stored in the graph: declaration plus edge bindings.
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) code: u32,
    pub(crate) inputs: Vec<PortSpec>,
    pub(crate) outputs: Vec<PortSpec>,
    /// Edge bound to each input slot, `None` until connected.
    pub(crate) input_edges: Vec<Option<EdgeId>>,
    /// Edge bound to each output slot, `None` until connected.
    pub(crate) output_edges: Vec<Option<EdgeId>>,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, spec: NodeSpec) -> Self {
        let input_edges = spec.inputs.iter().map(|_| None).collect();
        let output_edges = spec.outputs.iter().map(|_| None).collect();
        Self {
            id,
            code: spec.code.unwrap_or(id.0),
            name: spec.name,
            inputs: spec.inputs,
            outputs: spec.outputs,
            input_edges,
            output_edges,
        }
    }

    /// Returns the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the diagnostic code.
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Returns the input port declarations.
    pub fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    /// Returns the output port declarations.
    pub fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    /// Returns the derived shape.
    pub fn shape(&self) -> NodeShape {
        NodeShape::classify(self.inputs.len(), self.outputs.len())
    }

    /// Returns the edge bound to input `slot`, if connected.
    pub fn input_edge(&self, slot: usize) -> Option<EdgeId> {
        self.input_edges.get(slot).copied().flatten()
    }

    /// Returns the edge bound to output `slot`, if connected.
    pub fn output_edge(&self, slot: usize) -> Option<EdgeId> {
        self.output_edges.get(slot).copied().flatten()
    }

    /// Iterates over all connected edges with this node as consumer.
    pub fn input_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.input_edges.iter().flatten().copied()
    }

    /// Iterates over all connected edges with this node as producer.
    pub fn output_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.output_edges.iter().flatten().copied()
    }

    /// Returns the port declaration at `slot` on the given side.
    pub(crate) fn port(&self, direction: Direction, slot: usize) -> Option<&PortSpec> {
        match direction {
            Direction::Input => self.inputs.get(slot),
            Direction::Output => self.outputs.get(slot),
        }
    }
}

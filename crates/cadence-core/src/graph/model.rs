//! Graph description: construction, queries and validation.
//!
//! [`SdfGraph`] holds nodes and edges in flat arenas addressed by
//! [`NodeId`] / [`EdgeId`]. It is the generation-time input of the scheduler:
//! build it with [`add_node()`](SdfGraph::add_node) and
//! [`connect()`](SdfGraph::connect), then hand it to
//! [`compile()`](SdfGraph::compile).
//!
//! `connect()` rejects structurally impossible edges immediately (unknown
//! node or port, wrong direction, port already bound). Everything else is
//! checked once, in full, by [`validate()`](SdfGraph::validate).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::edge::{Edge, EdgeId};
use super::error::GraphError;
use super::node::{Direction, GraphNode, NodeId, NodeSpec, PortRef, PortSpec};

/// Synchronous dataflow graph: fixed-rate nodes joined by buffered edges.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Declare nodes with [`add_node()`](Self::add_node)
/// 3. Join ports with [`connect()`](Self::connect) or
///    [`connect_with_delay()`](Self::connect_with_delay)
/// 4. Compile with [`compile()`](Self::compile)
///
/// ```rust
/// use cadence_core::graph::{CompileOptions, ElementType, NodeSpec, SdfGraph};
///
/// let q15 = ElementType::of::<i16>("q15");
/// let mut graph = SdfGraph::new();
/// let src = graph.add_node(NodeSpec::new("src").output(q15.clone(), 4));
/// let dst = graph.add_node(NodeSpec::new("dst").input(q15, 2));
/// graph.connect(src.output(0), dst.input(0)).unwrap();
///
/// let compiled = graph.compile(&CompileOptions::default()).unwrap();
/// assert_eq!(compiled.order(), &[src, dst, dst]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SdfGraph {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) edges: Vec<Edge>,
}

impl SdfGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    /// Declares a node. Returns its ID (the declaration index).
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_add: node {} '{}' ({} in, {} out)",
            id.0,
            spec.name,
            spec.inputs.len(),
            spec.outputs.len()
        );
        self.nodes.push(GraphNode::new(id, spec));
        id
    }

    /// Connects an output port to an input port with no initial delay.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<EdgeId, GraphError> {
        self.connect_with_delay(from, to, 0)
    }

    /// Connects an output port to an input port whose FIFO starts with
    /// `delay` pre-filled elements.
    ///
    /// Returns the new edge's ID, or an error if:
    /// - Either node or port doesn't exist
    /// - `from` is not an output or `to` is not an input
    /// - Either port is already connected
    pub fn connect_with_delay(
        &mut self,
        from: PortRef,
        to: PortRef,
        delay: u32,
    ) -> Result<EdgeId, GraphError> {
        if from.direction != Direction::Output {
            return Err(GraphError::DirectionMismatch(from));
        }
        if to.direction != Direction::Input {
            return Err(GraphError::DirectionMismatch(to));
        }

        let source_port = self.port_checked(from)?;
        let (element, production) = (source_port.element.clone(), source_port.rate);
        let consumption = self.port_checked(to)?.rate;

        if self.nodes[from.node.index()].output_edges[from.slot].is_some() {
            return Err(GraphError::PortInUse(from));
        }
        if self.nodes[to.node.index()].input_edges[to.slot].is_some() {
            return Err(GraphError::PortInUse(to));
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            source: from,
            target: to,
            delay,
            element,
            production,
            consumption,
        });
        self.nodes[from.node.index()].output_edges[from.slot] = Some(id);
        self.nodes[to.node.index()].input_edges[to.slot] = Some(id);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} → {to} (delay {delay})");
        Ok(id)
    }

    fn port_checked(&self, port: PortRef) -> Result<&PortSpec, GraphError> {
        self.nodes
            .get(port.node.index())
            .ok_or(GraphError::UnknownNode(port.node))?
            .port(port.direction, port.slot)
            .ok_or(GraphError::UnknownPort(port))
    }

    // --- Queries ---

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Returns all nodes in declaration order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Returns all edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over the connected edges consuming into `id`, in slot order.
    /// Empty for an unknown node.
    pub fn input_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes.get(id.index()).into_iter().flat_map(|n| n.input_edges())
    }

    /// Iterates over the connected edges produced by `id`, in slot order.
    pub fn output_edges(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes.get(id.index()).into_iter().flat_map(|n| n.output_edges())
    }

    /// Looks up a node by display name. The first match in declaration order wins.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    // --- Validation ---

    /// Checks every structural invariant the scheduler relies on.
    ///
    /// - The graph has at least one node
    /// - Every port has a positive rate and exactly one edge
    /// - Both endpoints of every edge carry the same element type
    ///
    /// Delays are unsigned, so non-negativity holds by construction. Errors
    /// are reported for the first violation in declaration order.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        for node in &self.nodes {
            for (slot, port) in node.inputs.iter().enumerate() {
                let port_ref = node.id.input(slot);
                if port.rate == 0 {
                    return Err(GraphError::ZeroRate(port_ref));
                }
                if node.input_edges[slot].is_none() {
                    return Err(GraphError::UnconnectedPort(port_ref));
                }
            }
            for (slot, port) in node.outputs.iter().enumerate() {
                let port_ref = node.id.output(slot);
                if port.rate == 0 {
                    return Err(GraphError::ZeroRate(port_ref));
                }
                if node.output_edges[slot].is_none() {
                    return Err(GraphError::UnconnectedPort(port_ref));
                }
            }
        }

        for edge in &self.edges {
            let target = &self.nodes[edge.target.node.index()].inputs[edge.target.slot];
            if target.element != edge.element {
                return Err(GraphError::TypeMismatch {
                    edge: edge.id,
                    source: edge.element.clone(),
                    target: target.element.clone(),
                });
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_validate: {} nodes, {} edges ok",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

//! Generation-time configuration errors.
//!
//! Every failure between describing a graph and producing its compiled
//! artifact is a [`GraphError`]. No partial artifact is ever produced: the
//! first error aborts [`SdfGraph::compile`](super::SdfGraph::compile).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::edge::EdgeId;
use super::node::{ElementType, NodeId, PortRef};

/// Errors that can occur while building, validating or compiling a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph has no nodes.
    EmptyGraph,
    /// The specified node was not found in the graph.
    UnknownNode(NodeId),
    /// The node exists but has no such port.
    UnknownPort(PortRef),
    /// An input was used as an edge source, or an output as an edge target.
    DirectionMismatch(PortRef),
    /// The port is already bound to another edge.
    PortInUse(PortRef),
    /// The port has no edge.
    UnconnectedPort(PortRef),
    /// The port declares a rate of zero.
    ZeroRate(PortRef),
    /// The two endpoints of an edge carry different element types.
    TypeMismatch {
        /// Offending edge.
        edge: EdgeId,
        /// Type declared on the output port.
        source: ElementType,
        /// Type declared on the input port.
        target: ElementType,
    },
    /// The balance equations have no non-trivial solution.
    Inconsistent {
        /// Edge where two propagation paths disagreed.
        edge: EdgeId,
    },
    /// A repetition count does not fit the solver's integer range.
    RateOverflow {
        /// Node whose count overflowed.
        node: NodeId,
    },
    /// A cycle has too little delay to ever fire.
    Deadlock {
        /// Nodes that still had unscheduled activations.
        nodes: Vec<NodeId>,
    },
    /// One period would need more activations than the configured limit.
    PeriodTooLong {
        /// Activations required by the repetition vector.
        activations: u64,
        /// Configured limit.
        limit: u64,
    },
    /// The sized buffers cannot carry the schedule without over/underflow.
    Unsatisfiable {
        /// Edge that would over- or underflow.
        edge: EdgeId,
        /// Node whose activation would trigger it.
        node: NodeId,
    },
}

impl core::fmt::Display for GraphError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "graph has no nodes"),
            Self::UnknownNode(id) => write!(f, "node {id} not found"),
            Self::UnknownPort(port) => write!(f, "{port} does not exist"),
            Self::DirectionMismatch(port) => {
                write!(f, "{port} cannot be used on this side of an edge")
            }
            Self::PortInUse(port) => write!(f, "{port} is already connected"),
            Self::UnconnectedPort(port) => write!(f, "{port} is not connected"),
            Self::ZeroRate(port) => write!(f, "{port} has a rate of zero"),
            Self::TypeMismatch {
                edge,
                source,
                target,
            } => write!(
                f,
                "edge {edge} connects {source} output to {target} input"
            ),
            Self::Inconsistent { edge } => {
                write!(f, "rates are inconsistent at edge {edge}: no periodic schedule exists")
            }
            Self::RateOverflow { node } => {
                write!(f, "repetition count of node {node} overflows")
            }
            Self::Deadlock { nodes } => {
                write!(f, "deadlock: cycle without enough delay through nodes [")?;
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", node.0)?;
                }
                write!(f, "]")
            }
            Self::PeriodTooLong { activations, limit } => write!(
                f,
                "one period needs {activations} activations, limit is {limit}"
            ),
            Self::Unsatisfiable { edge, node } => write!(
                f,
                "edge {edge} cannot carry the schedule: node {node} would over- or underflow it"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}

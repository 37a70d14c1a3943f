//! Graph edge types.
//!
//! An [`Edge`] connects exactly one output port to exactly one input port.
//! Edges reference their endpoints by index ([`PortRef`]) and never own the
//! nodes they join, so feedback cycles need no special ownership handling.
//! The buffer capacity of an edge is not stored here; it lives in the
//! compiled artifact.

use super::node::{ElementType, PortRef};

/// Unique identifier for an edge: its declaration index in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
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
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// A buffered point-to-point connection.
#[derive(Clone, Debug)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) source: PortRef,
    pub(crate) target: PortRef,
    pub(crate) delay: u32,
    /// Element type declared on the source port.
    pub(crate) element: ElementType,
    pub(crate) production: u32,
    pub(crate) consumption: u32,
}

impl Edge {
    /// Returns the edge's ID.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Returns the producing output port.
    pub fn source(&self) -> PortRef {
        self.source
    }

    /// Returns the consuming input port.
    pub fn target(&self) -> PortRef {
        self.target
    }

    /// Returns the number of pre-filled elements the edge starts with.
    pub fn delay(&self) -> u32 {
        self.delay
    }

    /// Returns the element type carried by the edge.
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// Elements written per activation of the source node.
    pub fn production_rate(&self) -> u32 {
        self.production
    }

    /// Elements read per activation of the target node.
    pub fn consumption_rate(&self) -> u32 {
        self.consumption
    }

    /// Returns true if the edge starts and ends on the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source.node == self.target.node
    }
}

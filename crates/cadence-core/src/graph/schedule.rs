//! Schedule synthesis.
//!
//! Static and asynchronous graphs run a single [`Schedule::Ordered`]
//! activation sequence per period. Fully-asynchronous graphs get a
//! [`Schedule::Guarded`] firing order plus one [`ReadinessGuard`] per node,
//! evaluated at run time.
//!
//! ## Instance expansion
//!
//! Node `n` expands into the instances `(n, 0) .. (n, reps(n))`, chained in
//! activation order. On an edge with production `p`, consumption `c` and
//! delay `d`, consumer instance `j` reads cumulative elements
//! `[j*c, (j+1)*c)`. Elements below `d` come from the delay; element `k >= d`
//! is written by producer instance `(k - d) / p`. The last element read
//! therefore pins consumer `j` behind producer `((j+1)*c - 1 - d) / p`.
//!
//! The instances are sorted with Kahn's algorithm. A min-heap keyed on the
//! flat instance index (node offset + activation index) picks the smallest
//! `(node, activation)` among ready instances, so the output is
//! deterministic.

#[cfg(not(feature = "std"))]
use alloc::{collections::BinaryHeap, vec, vec::Vec};
use core::cmp::Reverse;
#[cfg(feature = "std")]
use std::collections::BinaryHeap;

use super::edge::EdgeId;
use super::error::GraphError;
use super::model::SdfGraph;
use super::node::NodeId;
use super::solver::RepetitionVector;

/// Default bound on activations per period.
pub const DEFAULT_MAX_PERIOD_ACTIVATIONS: u64 = 65_536;

/// Resource limits applied while synthesizing a schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisLimits {
    /// Maximum total activations in one period.
    pub max_period_activations: u64,
}

impl Default for SynthesisLimits {
    fn default() -> Self {
        Self {
            max_period_activations: DEFAULT_MAX_PERIOD_ACTIVATIONS,
        }
    }
}

/// Per-period execution plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed activation sequence replayed every period.
    Ordered(Vec<NodeId>),
    /// Declared firing order plus per-node readiness guards.
    Guarded(GuardSet),
}

impl Schedule {
    /// Returns the fixed order, if this is an ordered schedule.
    pub fn as_ordered(&self) -> Option<&[NodeId]> {
        match self {
            Self::Ordered(order) => Some(order),
            Self::Guarded(_) => None,
        }
    }

    /// Returns the guard set, if this is a guarded schedule.
    pub fn as_guarded(&self) -> Option<&GuardSet> {
        match self {
            Self::Ordered(_) => None,
            Self::Guarded(guards) => Some(guards),
        }
    }
}

/// An `(edge, rate)` requirement inside a [`ReadinessGuard`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRate {
    /// Edge to check.
    pub edge: EdgeId,
    /// Elements that must be available (input) or free (output).
    pub rate: u32,
}

/// Firing condition of one node.
///
/// Satisfied when every input edge holds at least `rate` elements and every
/// output edge has at least `rate` free slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessGuard {
    /// Guarded node.
    pub node: NodeId,
    /// Input requirements, in slot order.
    pub inputs: Vec<EdgeRate>,
    /// Output requirements, in slot order.
    pub outputs: Vec<EdgeRate>,
}

impl ReadinessGuard {
    /// Evaluates the guard against live buffer levels.
    pub fn is_satisfied(
        &self,
        available: impl Fn(EdgeId) -> usize,
        free: impl Fn(EdgeId) -> usize,
    ) -> bool {
        self.inputs
            .iter()
            .all(|r| available(r.edge) >= r.rate as usize)
            && self.outputs.iter().all(|r| free(r.edge) >= r.rate as usize)
    }
}

/// Guards for a fully-asynchronous graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardSet {
    /// Candidate order scanned round-robin by the engine.
    pub firing_order: Vec<NodeId>,
    /// One guard per node, indexed by [`NodeId`].
    pub guards: Vec<ReadinessGuard>,
}

impl GuardSet {
    /// Returns the guard of `node`.
    pub fn guard(&self, node: NodeId) -> Option<&ReadinessGuard> {
        self.guards.get(node.index())
    }
}

/// Builds the guard set of a validated graph: declaration order, one guard
/// per node.
pub fn guard_set(graph: &SdfGraph) -> GuardSet {
    let rate_of = |edge: EdgeId, input: bool| {
        let e = &graph.edges[edge.index()];
        EdgeRate {
            edge,
            rate: if input { e.consumption } else { e.production },
        }
    };

    let guards = graph
        .nodes
        .iter()
        .map(|node| ReadinessGuard {
            node: node.id,
            inputs: node.input_edges().map(|e| rate_of(e, true)).collect(),
            outputs: node.output_edges().map(|e| rate_of(e, false)).collect(),
        })
        .collect();

    GuardSet {
        firing_order: graph.nodes.iter().map(|n| n.id).collect(),
        guards,
    }
}

/// Computes one period's activation order.
///
/// # Errors
///
/// - [`GraphError::PeriodTooLong`] if the period exceeds the limit
/// - [`GraphError::Deadlock`] if some cycle carries too little delay
pub fn synthesize(
    graph: &SdfGraph,
    reps: &RepetitionVector,
    limits: &SynthesisLimits,
) -> Result<Vec<NodeId>, GraphError> {
    let total = reps.total_activations();
    if total > limits.max_period_activations {
        return Err(GraphError::PeriodTooLong {
            activations: total,
            limit: limits.max_period_activations,
        });
    }

    // offsets[n] = flat index of instance (n, 0)
    let node_count = graph.node_count();
    let mut offsets = Vec::with_capacity(node_count + 1);
    let mut acc = 0usize;
    for &r in reps.as_slice() {
        offsets.push(acc);
        acc += r as usize;
    }
    offsets.push(acc);
    let instances = acc;

    let mut owner = Vec::with_capacity(instances);
    for (idx, &r) in reps.as_slice().iter().enumerate() {
        owner.extend(core::iter::repeat_n(NodeId(idx as u32), r as usize));
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); instances];
    let mut in_degree = vec![0u32; instances];
    let mut add_dependency = |from: usize, to: usize| {
        successors[from].push(to);
        in_degree[to] += 1;
    };

    for (idx, &r) in reps.as_slice().iter().enumerate() {
        for k in 1..r as usize {
            add_dependency(offsets[idx] + k - 1, offsets[idx] + k);
        }
    }

    for edge in &graph.edges {
        let p = u64::from(edge.production);
        let c = u64::from(edge.consumption);
        let d = u64::from(edge.delay);
        let src = edge.source.node.index();
        let dst = edge.target.node.index();

        for j in 0..u64::from(reps.as_slice()[dst]) {
            let last = (j + 1) * c;
            if last <= d {
                continue;
            }
            // Balanced rates keep `producer < reps(src)`. On a self-loop
            // without enough delay, `from == to` and the instance never
            // becomes ready.
            let producer = (last - 1 - d) / p;
            add_dependency(offsets[src] + producer as usize, offsets[dst] + j as usize);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(instances);
    while let Some(Reverse(instance)) = ready.pop() {
        order.push(owner[instance]);
        for &next in &successors[instance] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < instances {
        let mut nodes: Vec<NodeId> = Vec::new();
        for (instance, deg) in in_degree.iter().enumerate() {
            if *deg > 0 && nodes.last() != Some(&owner[instance]) {
                nodes.push(owner[instance]);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_schedule: deadlock through {:?}", nodes);
        return Err(GraphError::Deadlock { nodes });
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("graph_schedule: {} activations per period", order.len());
    Ok(order)
}

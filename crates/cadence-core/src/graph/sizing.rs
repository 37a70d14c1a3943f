//! Buffer sizing.
//!
//! The static capacity of an edge is the peak backlog reached while one
//! period of the activation order is simulated, starting from the edge's
//! delay. A firing writes its outputs before it releases its inputs, because
//! a running node holds both regions at once.
//!
//! Asynchronous modes may skip or reorder firings, so their bound is the
//! worst interleaving the guards allow: the producer completes its whole
//! period before the consumer reclaims anything.
//!
//! Every result is re-checked by a second simulation against the final
//! capacities, which catches an over-tight `capacity_limit`.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use super::compile::SchedulingMode;
use super::error::GraphError;
use super::model::SdfGraph;
use super::node::NodeId;
use super::solver::RepetitionVector;

/// Knobs for [`size_buffers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SizingOptions {
    /// Scheduling mode the buffers are sized for.
    pub mode: SchedulingMode,
    /// Extra headroom for asynchronous modes, in percent (rounded up).
    pub async_margin_percent: u32,
    /// Upper bound applied to every capacity.
    pub capacity_limit: Option<usize>,
}

/// Computes the capacity of every edge, indexed by [`EdgeId`](super::EdgeId).
///
/// # Errors
///
/// - [`GraphError::Unsatisfiable`] if the final capacities cannot carry the
///   order
/// - [`GraphError::RateOverflow`] if a capacity does not fit in `usize`
pub fn size_buffers(
    graph: &SdfGraph,
    reps: &RepetitionVector,
    order: &[NodeId],
    options: &SizingOptions,
) -> Result<Vec<usize>, GraphError> {
    let mut backlog: Vec<u64> = graph.edges.iter().map(|e| u64::from(e.delay)).collect();
    let mut peak = backlog.clone();

    for &node in order {
        let gn = &graph.nodes[node.index()];
        for edge in gn.output_edges() {
            let i = edge.index();
            backlog[i] += u64::from(graph.edges[i].production);
            peak[i] = peak[i].max(backlog[i]);
        }
        for edge in gn.input_edges() {
            let i = edge.index();
            backlog[i] = backlog[i]
                .checked_sub(u64::from(graph.edges[i].consumption))
                .ok_or(GraphError::Unsatisfiable { edge, node })?;
        }
    }

    let mut capacities = vec![0usize; graph.edge_count()];
    for (i, edge) in graph.edges.iter().enumerate() {
        let mut cap = peak[i];
        if options.mode.is_asynchronous() {
            let burst = u64::from(edge.delay)
                + u64::from(reps.get(edge.source.node)) * u64::from(edge.production);
            cap = cap.max(burst);
            cap += (cap * u64::from(options.async_margin_percent)).div_ceil(100);
        }
        let mut cap = usize::try_from(cap).map_err(|_| GraphError::RateOverflow {
            node: edge.source.node,
        })?;
        if let Some(limit) = options.capacity_limit {
            cap = cap.min(limit);
        }
        capacities[i] = cap;
    }

    verify(graph, order, &capacities)?;

    #[cfg(feature = "tracing")]
    tracing::debug!("graph_sizing: capacities {:?}", capacities);
    Ok(capacities)
}

/// Replays one period against fixed capacities.
///
/// Each firing must find `rate` elements on every input and `rate` free
/// slots on every output, measured before the firing. Every backlog must end
/// the period where it started.
pub(crate) fn verify(
    graph: &SdfGraph,
    order: &[NodeId],
    capacities: &[usize],
) -> Result<(), GraphError> {
    let mut backlog: Vec<usize> = Vec::with_capacity(graph.edge_count());
    for edge in &graph.edges {
        if edge.delay as usize > capacities[edge.id.index()] {
            return Err(GraphError::Unsatisfiable {
                edge: edge.id,
                node: edge.source.node,
            });
        }
        backlog.push(edge.delay as usize);
    }

    for &node in order {
        let gn = &graph.nodes[node.index()];
        for edge in gn.input_edges() {
            let i = edge.index();
            if backlog[i] < graph.edges[i].consumption as usize {
                return Err(GraphError::Unsatisfiable { edge, node });
            }
        }
        for edge in gn.output_edges() {
            let i = edge.index();
            if capacities[i] - backlog[i] < graph.edges[i].production as usize {
                return Err(GraphError::Unsatisfiable { edge, node });
            }
        }
        for edge in gn.output_edges() {
            backlog[edge.index()] += graph.edges[edge.index()].production as usize;
        }
        for edge in gn.input_edges() {
            backlog[edge.index()] -= graph.edges[edge.index()].consumption as usize;
        }
    }

    for edge in &graph.edges {
        if backlog[edge.id.index()] != edge.delay as usize {
            return Err(GraphError::Unsatisfiable {
                edge: edge.id,
                node: edge.source.node,
            });
        }
    }
    Ok(())
}

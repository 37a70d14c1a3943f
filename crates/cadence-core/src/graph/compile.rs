//! Graph compilation: validate → solve → synthesize → size.
//!
//! [`SdfGraph::compile`] runs every generation step in sequence and packages
//! the results into an immutable [`CompiledSchedule`]. The first failing step
//! aborts with a [`GraphError`]; no partial artifact is ever returned.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::edge::EdgeId;
use super::error::GraphError;
use super::model::SdfGraph;
use super::node::NodeId;
use super::schedule::{
    DEFAULT_MAX_PERIOD_ACTIVATIONS, Schedule, SynthesisLimits, guard_set, synthesize,
};
use super::sizing::{SizingOptions, size_buffers};
use super::solver::{RepetitionVector, solve_repetitions};

/// How the runtime engine drives a compiled graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SchedulingMode {
    /// Replay the fixed order every period, no readiness checks.
    #[default]
    Static,
    /// Replay the fixed order, skipping firings whose node is not ready.
    Asynchronous,
    /// No fixed order: the host fires ready nodes one at a time.
    FullyAsynchronous,
}

impl SchedulingMode {
    /// Returns true for modes that evaluate readiness at run time.
    pub fn is_asynchronous(self) -> bool {
        !matches!(self, Self::Static)
    }

    /// Short lowercase name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Asynchronous => "async",
            Self::FullyAsynchronous => "fully-async",
        }
    }
}

impl core::fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation-time options.
///
/// ```rust
/// use cadence_core::graph::{CompileOptions, SchedulingMode};
///
/// let opts = CompileOptions::default()
///     .with_mode(SchedulingMode::Asynchronous)
///     .with_async_margin_percent(25);
/// assert_eq!(opts.max_period_activations, 65_536);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Scheduling mode of the generated artifact.
    pub mode: SchedulingMode,
    /// Extra buffer headroom for asynchronous modes, in percent.
    pub async_margin_percent: u32,
    /// Upper bound on any single edge capacity.
    pub capacity_limit: Option<usize>,
    /// Upper bound on activations per period.
    pub max_period_activations: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::Static,
            async_margin_percent: 0,
            capacity_limit: None,
            max_period_activations: DEFAULT_MAX_PERIOD_ACTIVATIONS,
        }
    }
}

impl CompileOptions {
    /// Sets the scheduling mode.
    pub fn with_mode(mut self, mode: SchedulingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the asynchronous buffer margin.
    pub fn with_async_margin_percent(mut self, percent: u32) -> Self {
        self.async_margin_percent = percent;
        self
    }

    /// Caps every edge capacity.
    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    /// Sets the period length limit.
    pub fn with_max_period_activations(mut self, limit: u64) -> Self {
        self.max_period_activations = limit;
        self
    }
}

/// Immutable generation artifact.
///
/// Holds a snapshot of the graph it was compiled from, so it can be shared
/// with the runtime (usually behind an `Arc`) independently of the builder.
#[derive(Clone, Debug)]
pub struct CompiledSchedule {
    mode: SchedulingMode,
    graph: SdfGraph,
    repetitions: RepetitionVector,
    schedule: Schedule,
    order: Vec<NodeId>,
    capacities: Vec<usize>,
}

impl CompiledSchedule {
    /// Returns the graph snapshot.
    pub fn graph(&self) -> &SdfGraph {
        &self.graph
    }

    /// Returns the scheduling mode.
    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }

    /// Returns the repetition vector.
    pub fn repetitions(&self) -> &RepetitionVector {
        &self.repetitions
    }

    /// Returns the execution plan for the compiled mode.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Returns the static activation order of one period.
    ///
    /// Present in every mode: fully-asynchronous graphs are still checked
    /// against it for deadlock and sized from it.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns all edge capacities, indexed by [`EdgeId`].
    pub fn capacities(&self) -> &[usize] {
        &self.capacities
    }

    /// Returns the capacity of one edge.
    pub fn capacity(&self, edge: EdgeId) -> Option<usize> {
        self.capacities.get(edge.index()).copied()
    }

    /// Total FIFO storage in bytes (`capacity * element size`, summed).
    pub fn memory_bytes(&self) -> usize {
        self.graph
            .edges
            .iter()
            .zip(&self.capacities)
            .map(|(edge, &cap)| cap * edge.element.size())
            .sum()
    }

    /// Returns the diagnostic code reported for `node`.
    pub fn diagnostic_code(&self, node: NodeId) -> Option<u32> {
        self.graph.node(node).map(|n| n.code)
    }
}

impl SdfGraph {
    /// Compiles the graph into a [`CompiledSchedule`].
    ///
    /// # Errors
    ///
    /// Any [`GraphError`] raised by validation, the rate solver, schedule
    /// synthesis or buffer sizing.
    pub fn compile(&self, options: &CompileOptions) -> Result<CompiledSchedule, GraphError> {
        self.validate()?;
        let repetitions = solve_repetitions(self)?;

        let limits = SynthesisLimits {
            max_period_activations: options.max_period_activations,
        };
        let order = synthesize(self, &repetitions, &limits)?;

        let sizing = SizingOptions {
            mode: options.mode,
            async_margin_percent: options.async_margin_percent,
            capacity_limit: options.capacity_limit,
        };
        let capacities = size_buffers(self, &repetitions, &order, &sizing)?;

        let schedule = match options.mode {
            SchedulingMode::FullyAsynchronous => Schedule::Guarded(guard_set(self)),
            SchedulingMode::Static | SchedulingMode::Asynchronous => {
                Schedule::Ordered(order.clone())
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_compile: mode {}, {} activations/period, {} bytes of FIFO storage",
            options.mode,
            order.len(),
            self.edges
                .iter()
                .zip(&capacities)
                .map(|(e, &c)| c * e.element.size())
                .sum::<usize>()
        );

        Ok(CompiledSchedule {
            mode: options.mode,
            graph: self.clone(),
            repetitions,
            schedule,
            order,
            capacities,
        })
    }
}

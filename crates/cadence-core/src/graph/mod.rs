//! Generation-time half of Cadence: describe a synchronous dataflow graph,
//! compile it into a periodic schedule and minimal FIFO capacities.
//!
//! # Pipeline
//!
//! [`SdfGraph::compile`] runs four steps, each usable on its own:
//!
//! 1. [`SdfGraph::validate`]: every port bound by exactly one edge, positive
//!    rates, matching element types
//! 2. [`solve_repetitions`]: minimal [`RepetitionVector`] satisfying every
//!    balance equation
//! 3. [`synthesize`]: deterministic per-period activation order; cycles
//!    without enough delay are rejected as [`GraphError::Deadlock`]
//! 4. [`size_buffers`]: smallest per-edge capacities that never over- or
//!    underflow under the chosen [`SchedulingMode`]
//!
//! The result is an immutable [`CompiledSchedule`], shared with the
//! [`runtime`](crate::runtime) behind an `Arc`.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::graph::{CompileOptions, ElementType, GraphError, NodeSpec, SdfGraph};
//!
//! let sample = ElementType::of::<f32>("f32");
//! let mut graph = SdfGraph::new();
//! let a = graph.add_node(NodeSpec::new("a").input(sample.clone(), 1).output(sample.clone(), 1));
//! let b = graph.add_node(NodeSpec::new("b").input(sample.clone(), 1).output(sample, 1));
//! graph.connect(a.output(0), b.input(0)).unwrap();
//! graph.connect(b.output(0), a.input(0)).unwrap();
//!
//! // A feedback loop without delay can never fire.
//! assert!(matches!(
//!     graph.compile(&CompileOptions::default()),
//!     Err(GraphError::Deadlock { .. })
//! ));
//! ```
//!
//! # no_std Support
//!
//! This module is `no_std` compatible with `alloc`.

pub mod compile;
pub mod edge;
pub mod error;
pub mod model;
pub mod node;
pub mod schedule;
pub mod sizing;
pub mod solver;

pub use compile::{CompileOptions, CompiledSchedule, SchedulingMode};
pub use edge::{Edge, EdgeId};
pub use error::GraphError;
pub use model::SdfGraph;
pub use node::{
    Direction, ElementType, GraphNode, NodeId, NodeShape, NodeSpec, PortRef, PortSpec,
};
pub use schedule::{
    DEFAULT_MAX_PERIOD_ACTIVATIONS, EdgeRate, GuardSet, ReadinessGuard, Schedule,
    SynthesisLimits, guard_set, synthesize,
};
pub use sizing::{SizingOptions, size_buffers};
pub use solver::{RepetitionVector, solve_repetitions};

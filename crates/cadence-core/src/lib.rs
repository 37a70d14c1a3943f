//! Cadence Core - synchronous dataflow scheduling for constrained devices
//!
//! This crate turns a graph of fixed-rate processing nodes joined by FIFO
//! edges into a periodic schedule with provably safe buffer capacities, and
//! drives that schedule at run time.
//!
//! # Generation Time
//!
//! - [`SdfGraph`] - Graph description: nodes, ports, rates, edges, delays
//! - [`solve_repetitions`] - Minimal activations per node per period
//! - [`synthesize`] - Deterministic activation order with deadlock detection
//! - [`size_buffers`] - Minimal FIFO capacities per edge
//! - [`CompiledSchedule`] - Immutable artifact produced by [`SdfGraph::compile`]
//!
//! # Run Time
//!
//! - [`Fifo`] - Fixed-capacity circular queue with two-region reservations
//! - [`Node`] - Two-phase node contract (`prepare` then `run`)
//! - [`Engine`] - Drives a compiled schedule in static, asynchronous or
//!   fully-asynchronous mode
//! - [`ExecutionContext`] - Per-run error, iteration and state bookkeeping
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! cadence-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cadence_core::{
//!     CompileOptions, ElementType, EngineBuilder, ExecutionContext, ErrorCode, Node, NodeError,
//!     NodeIo, NodeSpec, RunStatus, SdfGraph,
//! };
//!
//! struct Ramp(u32);
//! impl Node for Ramp {
//!     fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
//!         let out = [self.0, self.0 + 1];
//!         self.0 += 2;
//!         io.push_from(0, &out)?;
//!         Ok(RunStatus::Success)
//!     }
//! }
//!
//! struct Sum(u32);
//! impl Node for Sum {
//!     fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
//!         let mut x = [0u32; 1];
//!         io.pop_into(0, &mut x)?;
//!         self.0 += x[0];
//!         Ok(RunStatus::Success)
//!     }
//! }
//!
//! let word = ElementType::of::<u32>("u32");
//! let mut graph = SdfGraph::new();
//! let ramp = graph.add_node(NodeSpec::new("ramp").output(word.clone(), 2));
//! let sum = graph.add_node(NodeSpec::new("sum").input(word, 1));
//! let edge = graph.connect(ramp.output(0), sum.input(0)).unwrap();
//!
//! let compiled = Arc::new(graph.compile(&CompileOptions::default()).unwrap());
//! let mut engine = EngineBuilder::new(compiled)
//!     .node(ramp, Box::new(Ramp(0)))
//!     .node(sum, Box::new(Sum(0)))
//!     .fifo::<u32>(edge)
//!     .build()
//!     .unwrap();
//!
//! let mut ctx = ExecutionContext::bounded(3);
//! let report = engine.run(&mut ctx);
//! assert_eq!(report.code, ErrorCode::SUCCESS);
//! assert_eq!(report.iterations, 3);
//! ```
//!
//! # Design Principles
//!
//! - **Decide at generation time**: rates, order and capacities are fixed
//!   before anything runs; the runtime never resizes or reorders
//! - **No global state**: the [`ExecutionContext`] is passed explicitly
//! - **Index arenas**: nodes and edges are addressed by stable indices

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod fifo;
pub mod graph;
pub mod runtime;

// Re-export main types at crate root
pub use fifo::{ErasedFifo, Fifo, FifoError, ReadRegion, WriteRegion};
pub use graph::{
    CompileOptions, CompiledSchedule, DEFAULT_MAX_PERIOD_ACTIVATIONS, Direction, Edge, EdgeId,
    EdgeRate, ElementType, GraphError, GraphNode, GuardSet, NodeId, NodeShape, NodeSpec, PortRef,
    PortSpec, ReadinessGuard, RepetitionVector, Schedule, SchedulingMode, SdfGraph,
    SizingOptions, SynthesisLimits, guard_set, size_buffers, solve_repetitions, synthesize,
};
pub use runtime::{
    Activation, ActivationOutcome, Engine, EngineBuilder, EngineError, ErrorCode,
    ExecutionContext, ExecutionHooks, Failure, Node, NodeError, NodeIo, NodeState, Readiness,
    RunReport, RunStatus, StateReader, StateWriter, StopToken,
};

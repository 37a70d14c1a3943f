//! Run-time side: node contract, execution context and the engine.
//!
//! Everything here consumes a [`CompiledSchedule`](crate::graph::CompiledSchedule)
//! and never changes it. Rates, order and capacities were fixed at
//! generation time; the runtime only moves elements and reports errors.

pub mod context;
pub mod engine;
pub mod hooks;
pub mod node;
pub mod state;

pub use context::{ErrorCode, ExecutionContext, Failure, RunReport, StopToken};
pub use engine::{Activation, Engine, EngineBuilder, EngineError};
pub use hooks::{ActivationOutcome, ExecutionHooks};
pub use node::{Node, NodeError, NodeIo, Readiness, RunStatus};
pub use state::{NodeState, StateReader, StateWriter};

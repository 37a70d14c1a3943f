//! Instrumentation hooks.

use super::context::ErrorCode;
use crate::graph::NodeId;

/// How one activation ended, as reported to [`ExecutionHooks::after_activation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// `run` returned `Success`.
    Success,
    /// `run` returned `Skip`.
    Skipped,
    /// `run` or the engine's rate check reported an error.
    Failed(ErrorCode),
}

/// Observer called around periods and activations.
///
/// Hooks see every event in the order it happens but have no way to alter
/// what the engine does next. Firings omitted by a readiness check never
/// started, so they produce no activation events.
pub trait ExecutionHooks: Send {
    /// Called before period `iteration` (zero-based) starts.
    fn before_period(&mut self, _iteration: u64) {}

    /// Called after period `iteration` completes without error.
    fn after_period(&mut self, _iteration: u64) {}

    /// Called immediately before `node` runs.
    fn before_activation(&mut self, _node: NodeId) {}

    /// Called immediately after `node` ran.
    fn after_activation(&mut self, _node: NodeId, _outcome: ActivationOutcome) {}
}

//! Per-run execution state and the error code contract shared with hosts.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "std")]
use std::sync::Arc;

use super::state::NodeState;
use crate::graph::NodeId;

/// Integer status code shared verbatim between engine and host.
///
/// Zero is success, positive values are non-errors, negative values are
/// errors. Node-specific codes live at or below `-100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// Activation or run completed.
    pub const SUCCESS: Self = Self(0);
    /// Node declined to fire; not an error. Left in the context by a
    /// single-activation call that fired nothing.
    pub const SKIP: Self = Self(1);
    /// An input held fewer elements than its rate.
    pub const BUFFER_UNDERFLOW: Self = Self(-1);
    /// An output had fewer free slots than its rate.
    pub const BUFFER_OVERFLOW: Self = Self(-2);
    /// A node failed to initialize.
    pub const NODE_INIT_FAILURE: Self = Self(-3);
    /// Unrecoverable failure; the engine is poisoned.
    pub const FATAL: Self = Self(-4);
    /// A FIFO was accessed with the wrong element type.
    pub const TYPE_MISMATCH: Self = Self(-5);
    /// A node addressed a port slot it does not have.
    pub const INVALID_PORT: Self = Self(-6);
    /// A node moved a different number of elements than its declared rate.
    pub const RATE_MISMATCH: Self = Self(-7);

    const NODE_BASE: i32 = -100;

    /// Node-defined error `n`, mapped to `-100 - n`.
    pub const fn node(n: u16) -> Self {
        Self(Self::NODE_BASE - n as i32)
    }

    /// Wraps a raw code received from a host.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// True for negative codes.
    pub const fn is_error(self) -> bool {
        self.0 < 0
    }

    /// Returns `n` for a node-defined code.
    pub const fn node_code(self) -> Option<u16> {
        if self.0 <= Self::NODE_BASE && self.0 >= Self::NODE_BASE - u16::MAX as i32 {
            Some((Self::NODE_BASE - self.0) as u16)
        } else {
            None
        }
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match *self {
            Self::SUCCESS => "success",
            Self::SKIP => "skip",
            Self::BUFFER_UNDERFLOW => "buffer underflow",
            Self::BUFFER_OVERFLOW => "buffer overflow",
            Self::NODE_INIT_FAILURE => "node init failure",
            Self::FATAL => "fatal",
            Self::TYPE_MISMATCH => "type mismatch",
            Self::INVALID_PORT => "invalid port",
            Self::RATE_MISMATCH => "rate mismatch",
            other => {
                return match other.node_code() {
                    Some(n) => write!(f, "node error {n} ({})", other.0),
                    None => write!(f, "code {}", other.0),
                };
            }
        };
        write!(f, "{name} ({})", self.0)
    }
}

/// Where and why an activation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Reported code.
    pub code: ErrorCode,
    /// Failing node.
    pub node: NodeId,
    /// The node's diagnostic code from the compiled schedule.
    pub diagnostic: u32,
    /// True if the engine is now poisoned.
    pub fatal: bool,
}

/// Outcome of [`Engine::run`](super::Engine::run).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// `SUCCESS` or the error that ended the run.
    pub code: ErrorCode,
    /// Periods completed in this run.
    pub iterations: u64,
    /// Failure details when `code` is an error.
    pub failure: Option<Failure>,
}

impl RunReport {
    /// True if the run ended without error.
    pub fn is_ok(&self) -> bool {
        !self.code.is_error()
    }
}

/// Mutable state of one run, passed explicitly to every engine call.
///
/// [`reset()`](Self::reset) clears the error and counters but keeps the
/// iteration bound and the saved node states, which must survive across runs.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    code: ErrorCode,
    failure: Option<Failure>,
    iterations: u64,
    activations: u64,
    limit: Option<u64>,
    period_skips: Vec<u32>,
    total_skips: u64,
    states: Vec<Option<NodeState>>,
}

impl ExecutionContext {
    /// Creates an unbounded context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose runs stop after exactly `iterations` periods.
    pub fn bounded(iterations: u64) -> Self {
        Self {
            limit: Some(iterations),
            ..Self::default()
        }
    }

    /// Sets or clears the iteration bound.
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    /// Clears error, counters and skip bookkeeping.
    pub fn reset(&mut self) {
        self.code = ErrorCode::SUCCESS;
        self.failure = None;
        self.iterations = 0;
        self.activations = 0;
        self.period_skips.fill(0);
        self.total_skips = 0;
    }

    /// Drops every saved node state.
    pub fn clear_states(&mut self) {
        self.states.clear();
    }

    /// Current status code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Failure details, if the last run or activation failed.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Completed periods.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Node activations that ran (readiness skips excluded).
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Iteration bound, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Firings of `node` skipped in the current period.
    pub fn period_skips(&self, node: NodeId) -> u32 {
        self.period_skips.get(node.index()).copied().unwrap_or(0)
    }

    /// Skipped firings since the last reset.
    pub fn total_skips(&self) -> u64 {
        self.total_skips
    }

    /// Saved state blob of `node`, if one is held.
    pub fn state(&self, node: NodeId) -> Option<&NodeState> {
        self.states.get(node.index()).and_then(Option::as_ref)
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.iterations >= limit)
    }

    pub(crate) fn begin_period(&mut self, node_count: usize) {
        self.period_skips.clear();
        self.period_skips.resize(node_count, 0);
    }

    pub(crate) fn complete_period(&mut self) {
        self.iterations += 1;
    }

    pub(crate) fn record_activation(&mut self) {
        self.activations += 1;
    }

    pub(crate) fn record_skip(&mut self, node: NodeId) {
        if self.period_skips.len() <= node.index() {
            self.period_skips.resize(node.index() + 1, 0);
        }
        self.period_skips[node.index()] += 1;
        self.total_skips += 1;
    }

    pub(crate) fn clear_error(&mut self) {
        self.code = ErrorCode::SUCCESS;
        self.failure = None;
    }

    pub(crate) fn note_skip(&mut self) {
        self.code = ErrorCode::SKIP;
    }

    pub(crate) fn fail(&mut self, failure: Failure) {
        self.code = failure.code;
        self.failure = Some(failure);
    }

    pub(crate) fn report(&self) -> RunReport {
        RunReport {
            code: self.code,
            iterations: self.iterations,
            failure: self.failure,
        }
    }

    pub(crate) fn take_state(&mut self, node: NodeId) -> Option<NodeState> {
        self.states.get_mut(node.index()).and_then(Option::take)
    }

    pub(crate) fn store_state(&mut self, node: NodeId, state: NodeState) {
        if self.states.len() <= node.index() {
            self.states.resize(node.index() + 1, None);
        }
        self.states[node.index()] = Some(state);
    }
}

/// Shared stop request, honored at the next suspension point.
///
/// Clones share the same flag, so a host can keep one handle and give
/// another to the engine.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    /// Creates a token with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the engine to stop at its next suspension point.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Withdraws a pending stop request.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_taxonomy() {
        assert!(!ErrorCode::SUCCESS.is_error());
        assert!(!ErrorCode::SKIP.is_error());
        assert!(ErrorCode::BUFFER_UNDERFLOW.is_error());
        assert_eq!(ErrorCode::FATAL.raw(), -4);
        assert_eq!(ErrorCode::node(3).raw(), -103);
        assert_eq!(ErrorCode::node(3).node_code(), Some(3));
        assert_eq!(ErrorCode::FATAL.node_code(), None);
        assert_eq!(ErrorCode::from_raw(-2), ErrorCode::BUFFER_OVERFLOW);
    }

    #[test]
    fn code_display() {
        assert_eq!(format!("{}", ErrorCode::BUFFER_OVERFLOW), "buffer overflow (-2)");
        assert_eq!(format!("{}", ErrorCode::node(7)), "node error 7 (-107)");
        assert_eq!(format!("{}", ErrorCode::from_raw(-50)), "code -50");
    }

    #[test]
    fn reset_keeps_limit_and_states() {
        let mut ctx = ExecutionContext::bounded(4);
        ctx.store_state(NodeId(2), NodeState::from_bytes(vec![1, 2, 3]));
        ctx.begin_period(3);
        ctx.record_skip(NodeId(1));
        ctx.complete_period();
        ctx.fail(Failure {
            code: ErrorCode::BUFFER_UNDERFLOW,
            node: NodeId(1),
            diagnostic: 1,
            fatal: false,
        });

        assert_eq!(ctx.period_skips(NodeId(1)), 1);
        assert_eq!(ctx.iterations(), 1);
        assert!(ctx.code().is_error());

        ctx.reset();
        assert_eq!(ctx.code(), ErrorCode::SUCCESS);
        assert!(ctx.failure().is_none());
        assert_eq!(ctx.iterations(), 0);
        assert_eq!(ctx.total_skips(), 0);
        assert_eq!(ctx.limit(), Some(4));
        assert_eq!(ctx.state(NodeId(2)).unwrap().as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn take_state_empties_the_slot() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.take_state(NodeId(0)).is_none());
        ctx.store_state(NodeId(0), NodeState::from_bytes(vec![9]));
        assert!(ctx.take_state(NodeId(0)).is_some());
        assert!(ctx.state(NodeId(0)).is_none());
    }

    #[test]
    fn stop_token_is_shared() {
        let token = StopToken::new();
        let engine_side = token.clone();
        assert!(!engine_side.is_stop_requested());
        token.request_stop();
        assert!(engine_side.is_stop_requested());
        engine_side.clear();
        assert!(!token.is_stop_requested());
    }
}

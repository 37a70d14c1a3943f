//! The two-phase node contract and the port access a node gets while it runs.
//!
//! Every activation is `prepare` (a side-effect-free readiness check) followed
//! by `run` (the transformation). A node only ever sees the FIFOs of its own
//! edges, through [`NodeIo`], addressed by port slot.

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;

use super::context::ErrorCode;
use super::state::NodeState;
use crate::fifo::{ErasedFifo, Fifo, FifoError, ReadRegion, WriteRegion};
use crate::graph::{Edge, EdgeId, GraphNode, NodeId};

/// Answer of [`Node::prepare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The node can fire now.
    Proceed,
    /// The node cannot fire now; not an error.
    Skip,
    /// The node can never fire again.
    Fatal(ErrorCode),
}

/// Successful outcome of [`Node::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Consumed and produced exactly the declared rates.
    Success,
    /// Did nothing this time; no element moved.
    Skip,
}

/// Failed outcome of [`Node::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// Aborts the current run; the caller may start a new one.
    Recoverable(ErrorCode),
    /// Poisons the engine until it is reinitialized.
    Fatal(ErrorCode),
}

impl NodeError {
    /// Returns the carried code.
    pub fn code(self) -> ErrorCode {
        match self {
            Self::Recoverable(code) | Self::Fatal(code) => code,
        }
    }

    /// True for [`NodeError::Fatal`].
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<FifoError> for NodeError {
    fn from(err: FifoError) -> Self {
        match err {
            FifoError::Underflow { .. } => Self::Recoverable(ErrorCode::BUFFER_UNDERFLOW),
            FifoError::Overflow { .. } => Self::Recoverable(ErrorCode::BUFFER_OVERFLOW),
            _ => Self::Fatal(ErrorCode::FATAL),
        }
    }
}

/// A processing node driven by the [`Engine`](super::Engine).
///
/// Only [`run()`](Self::run) is required. The default
/// [`prepare()`](Self::prepare) fires when every input holds at least its
/// rate and every output has room for its rate, which is exactly the
/// node's readiness guard.
///
/// `run` must move exactly the declared rate on every port (or nothing, when
/// it returns [`RunStatus::Skip`]); the engine checks this after every
/// activation and reports [`ErrorCode::RATE_MISMATCH`] otherwise.
///
/// ```rust
/// use cadence_core::{Node, NodeError, NodeIo, RunStatus};
///
/// /// Scales each block of samples by a fixed gain.
/// struct Gain(f32);
///
/// impl Node for Gain {
///     fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
///         let gain = self.0;
///         io.transform::<f32, f32, _>(0, 0, |input, mut output| {
///             for (dst, src) in output.iter_mut().zip(input.iter()) {
///                 *dst = src * gain;
///             }
///         })?;
///         Ok(RunStatus::Success)
///     }
/// }
/// ```
pub trait Node: Send {
    /// Called once when the engine is built.
    fn init(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Side-effect-free readiness check, evaluated in asynchronous modes.
    fn prepare(&self, io: &NodeIo<'_>) -> Readiness {
        if io.inputs_ready() && io.outputs_ready() {
            Readiness::Proceed
        } else {
            Readiness::Skip
        }
    }

    /// Performs one activation.
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError>;

    /// Captures working state before a fully-asynchronous suspension.
    /// `None` means the node is stateless.
    fn save_state(&self) -> Option<NodeState> {
        None
    }

    /// Restores state captured by [`save_state()`](Self::save_state).
    fn restore_state(&mut self, _state: &NodeState) -> Result<(), NodeError> {
        Ok(())
    }

    /// Returns the node to its freshly initialized state.
    fn reset(&mut self) {}

    /// Releases resources when the engine is torn down.
    fn teardown(&mut self) {}
}

/// A node's view of its own FIFOs during `prepare` and `run`.
///
/// Ports are addressed by slot. Unknown slots report
/// [`ErrorCode::INVALID_PORT`]; asking for the wrong element type reports
/// [`ErrorCode::TYPE_MISMATCH`].
pub struct NodeIo<'a> {
    node: &'a GraphNode,
    edges: &'a [Edge],
    fifos: &'a mut [Box<dyn ErasedFifo>],
}

const INVALID_PORT: NodeError = NodeError::Recoverable(ErrorCode::INVALID_PORT);
const TYPE_MISMATCH: NodeError = NodeError::Recoverable(ErrorCode::TYPE_MISMATCH);
const RATE_MISMATCH: NodeError = NodeError::Recoverable(ErrorCode::RATE_MISMATCH);

impl<'a> NodeIo<'a> {
    pub(crate) fn new(
        node: &'a GraphNode,
        edges: &'a [Edge],
        fifos: &'a mut [Box<dyn ErasedFifo>],
    ) -> Self {
        Self { node, edges, fifos }
    }

    /// The node being activated.
    pub fn node(&self) -> NodeId {
        self.node.id()
    }

    /// Number of input ports.
    pub fn input_count(&self) -> usize {
        self.node.inputs().len()
    }

    /// Number of output ports.
    pub fn output_count(&self) -> usize {
        self.node.outputs().len()
    }

    /// Declared rate of input `slot`.
    pub fn input_rate(&self, slot: usize) -> Option<u32> {
        self.node.inputs().get(slot).map(|p| p.rate)
    }

    /// Declared rate of output `slot`.
    pub fn output_rate(&self, slot: usize) -> Option<u32> {
        self.node.outputs().get(slot).map(|p| p.rate)
    }

    fn input_edge(&self, slot: usize) -> Result<(EdgeId, usize), NodeError> {
        let edge = self.node.input_edge(slot).ok_or(INVALID_PORT)?;
        Ok((edge, self.edges[edge.index()].consumption_rate() as usize))
    }

    fn output_edge(&self, slot: usize) -> Result<(EdgeId, usize), NodeError> {
        let edge = self.node.output_edge(slot).ok_or(INVALID_PORT)?;
        Ok((edge, self.edges[edge.index()].production_rate() as usize))
    }

    fn typed<T: 'static>(&mut self, edge: EdgeId) -> Result<&mut Fifo<T>, NodeError> {
        self.fifos[edge.index()]
            .as_any_mut()
            .downcast_mut::<Fifo<T>>()
            .ok_or(TYPE_MISMATCH)
    }

    /// True if input `slot` holds fewer elements than its rate (or does not exist).
    pub fn will_underflow(&self, slot: usize) -> bool {
        self.input_edge(slot)
            .map(|(edge, rate)| self.fifos[edge.index()].available_to_read() < rate)
            .unwrap_or(true)
    }

    /// True if output `slot` has fewer free slots than its rate (or does not exist).
    pub fn will_overflow(&self, slot: usize) -> bool {
        self.output_edge(slot)
            .map(|(edge, rate)| self.fifos[edge.index()].available_to_write() < rate)
            .unwrap_or(true)
    }

    /// True if no input would underflow.
    pub fn inputs_ready(&self) -> bool {
        (0..self.input_count()).all(|slot| !self.will_underflow(slot))
    }

    /// True if no output would overflow.
    pub fn outputs_ready(&self) -> bool {
        (0..self.output_count()).all(|slot| !self.will_overflow(slot))
    }

    /// Consumes one rate's worth of elements from input `slot`.
    pub fn input<T: 'static>(&mut self, slot: usize) -> Result<ReadRegion<'_, T>, NodeError> {
        let (edge, rate) = self.input_edge(slot)?;
        Ok(self.typed::<T>(edge)?.reserve_read(rate)?)
    }

    /// Commits one rate's worth of slots on output `slot` for writing.
    pub fn output<T: 'static>(&mut self, slot: usize) -> Result<WriteRegion<'_, T>, NodeError> {
        let (edge, rate) = self.output_edge(slot)?;
        Ok(self.typed::<T>(edge)?.reserve_write(rate)?)
    }

    /// Copies one rate's worth of input `slot` into `dst`, whose length must
    /// equal the rate.
    pub fn pop_into<T: Clone + 'static>(
        &mut self,
        slot: usize,
        dst: &mut [T],
    ) -> Result<(), NodeError> {
        let (edge, rate) = self.input_edge(slot)?;
        if dst.len() != rate {
            return Err(RATE_MISMATCH);
        }
        self.typed::<T>(edge)?.pop_slice(dst)?;
        Ok(())
    }

    /// Copies `src`, whose length must equal the rate, into output `slot`.
    pub fn push_from<T: Clone + 'static>(&mut self, slot: usize, src: &[T]) -> Result<(), NodeError> {
        let (edge, rate) = self.output_edge(slot)?;
        if src.len() != rate {
            return Err(RATE_MISMATCH);
        }
        self.typed::<T>(edge)?.push_slice(src)?;
        Ok(())
    }

    /// Lends input `input` and output `output` at the same time.
    ///
    /// Both readiness predicates are checked before either cursor moves, so
    /// a failure leaves both FIFOs untouched. The two ports must be on
    /// different edges; a self-loop should use `pop_into` and `push_from`.
    pub fn transform<T: 'static, U: 'static, R>(
        &mut self,
        input: usize,
        output: usize,
        f: impl FnOnce(ReadRegion<'_, T>, WriteRegion<'_, U>) -> R,
    ) -> Result<R, NodeError> {
        let (in_edge, in_rate) = self.input_edge(input)?;
        let (out_edge, out_rate) = self.output_edge(output)?;
        let (src, dst) =
            pair_mut(self.fifos, in_edge.index(), out_edge.index()).ok_or(INVALID_PORT)?;
        let src = src
            .as_any_mut()
            .downcast_mut::<Fifo<T>>()
            .ok_or(TYPE_MISMATCH)?;
        let dst = dst
            .as_any_mut()
            .downcast_mut::<Fifo<U>>()
            .ok_or(TYPE_MISMATCH)?;

        if src.will_underflow(in_rate) {
            return Err(NodeError::Recoverable(ErrorCode::BUFFER_UNDERFLOW));
        }
        if dst.will_overflow(out_rate) {
            return Err(NodeError::Recoverable(ErrorCode::BUFFER_OVERFLOW));
        }
        Ok(f(src.reserve_read(in_rate)?, dst.reserve_write(out_rate)?))
    }
}

/// Borrows two distinct elements mutably.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a.max(b) >= items.len() {
        return None;
    }
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        Some((&mut lo[a], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(a);
        Some((&mut hi[0], &mut lo[b]))
    }
}

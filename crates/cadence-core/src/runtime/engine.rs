//! Runtime execution engine.
//!
//! [`EngineBuilder`] binds node implementations and FIFO storage to a
//! [`CompiledSchedule`]; [`Engine`] then drives activations under the
//! schedule's [`SchedulingMode`]:
//!
//! - **Static**: [`run()`](Engine::run) replays the period order, no
//!   readiness checks
//! - **Asynchronous**: [`run()`](Engine::run) replays the period order and
//!   omits firings whose node is not ready
//! - **Fully asynchronous**: the host calls
//!   [`activate_next()`](Engine::activate_next) or
//!   [`activate()`](Engine::activate) once per event; control returns after
//!   every activation, and node state is parked in the
//!   [`ExecutionContext`] in between
//!
//! # Error propagation
//!
//! A recoverable node error ends the current run (or activation) with the
//! failing node recorded in the context; FIFO contents persist and the host
//! may simply run again. A fatal error poisons the engine: every later call
//! returns [`ErrorCode::FATAL`] until [`reinitialize()`](Engine::reinitialize).
//! The engine never retries.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use super::context::{ErrorCode, ExecutionContext, Failure, RunReport, StopToken};
use super::hooks::{ActivationOutcome, ExecutionHooks};
use super::node::{Node, NodeError, NodeIo, Readiness, RunStatus};
use crate::fifo::{ErasedFifo, Fifo, FifoError};
use crate::graph::{CompiledSchedule, EdgeId, GraphNode, NodeId, Schedule, SchedulingMode};

/// Errors raised while binding nodes and storage to a compiled schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The node ID is not part of the compiled graph.
    UnknownNode(NodeId),
    /// The edge ID is not part of the compiled graph.
    UnknownEdge(EdgeId),
    /// A node implementation was bound twice.
    DuplicateNode(NodeId),
    /// Storage was bound twice to the same edge.
    DuplicateFifo(EdgeId),
    /// No implementation was bound for this node.
    MissingNode(NodeId),
    /// No storage was bound for this edge.
    MissingFifo(EdgeId),
    /// The Rust element type does not match the edge's declared size.
    ElementSizeMismatch {
        /// Edge being bound.
        edge: EdgeId,
        /// Size declared in the graph.
        expected: usize,
        /// `size_of` of the bound type.
        actual: usize,
    },
    /// The FIFO could not be built on the provided storage.
    Fifo {
        /// Edge being bound.
        edge: EdgeId,
        /// Underlying FIFO error.
        error: FifoError,
    },
    /// A node's `init` failed.
    NodeInit {
        /// Failing node.
        node: NodeId,
        /// Code reported by the node.
        code: ErrorCode,
    },
}

impl EngineError {
    /// Maps the error onto the host error code contract.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NodeInit { .. } => ErrorCode::NODE_INIT_FAILURE,
            Self::ElementSizeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            _ => ErrorCode::FATAL,
        }
    }
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "node {id} is not in the compiled graph"),
            Self::UnknownEdge(id) => write!(f, "edge {id} is not in the compiled graph"),
            Self::DuplicateNode(id) => write!(f, "node {id} is already bound"),
            Self::DuplicateFifo(id) => write!(f, "edge {id} already has storage"),
            Self::MissingNode(id) => write!(f, "node {id} has no implementation"),
            Self::MissingFifo(id) => write!(f, "edge {id} has no storage"),
            Self::ElementSizeMismatch {
                edge,
                expected,
                actual,
            } => write!(
                f,
                "edge {edge} carries {expected}-byte elements, bound type has {actual} bytes"
            ),
            Self::Fifo { edge, error } => write!(f, "edge {edge}: {error}"),
            Self::NodeInit { node, code } => write!(f, "node {node} failed to initialize: {code}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}

/// Result of a single [`Engine::activate_next`] or [`Engine::activate`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// The node ran and returned `Success`.
    Fired(NodeId),
    /// The node ran and returned `Skip`.
    Skipped(NodeId),
    /// The requested node was not ready; nothing ran.
    NotReady(NodeId),
    /// No node in the firing order was ready.
    Idle,
    /// A stop was requested; nothing ran.
    Stopped,
    /// The activation failed (see the context for the same details).
    Failed(Failure),
}

/// Collects node implementations and FIFO storage for an [`Engine`].
///
/// Binding errors are deferred: the first one is returned by
/// [`build()`](Self::build), so calls can be chained.
///
/// ```rust
/// use std::sync::Arc;
/// use cadence_core::{
///     CompileOptions, ElementType, EngineBuilder, EngineError, Node, NodeError, NodeIo,
///     NodeSpec, RunStatus, SdfGraph,
/// };
///
/// struct Idle;
/// impl Node for Idle {
///     fn run(&mut self, _io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
///         Ok(RunStatus::Skip)
///     }
/// }
///
/// let mut graph = SdfGraph::new();
/// let a = graph.add_node(NodeSpec::new("a").output(ElementType::of::<u8>("u8"), 1));
/// let b = graph.add_node(NodeSpec::new("b").input(ElementType::of::<u8>("u8"), 1));
/// let e = graph.connect(a.output(0), b.input(0)).unwrap();
/// let compiled = Arc::new(graph.compile(&CompileOptions::default()).unwrap());
///
/// let err = EngineBuilder::new(compiled)
///     .node(a, Box::new(Idle))
///     .node(b, Box::new(Idle))
///     .fifo::<u32>(e)
///     .build()
///     .err();
/// assert!(matches!(err, Some(EngineError::ElementSizeMismatch { .. })));
/// ```
pub struct EngineBuilder {
    compiled: Arc<CompiledSchedule>,
    nodes: Vec<Option<Box<dyn Node>>>,
    fifos: Vec<Option<Box<dyn ErasedFifo>>>,
    hooks: Option<Box<dyn ExecutionHooks>>,
    stop: StopToken,
    error: Option<EngineError>,
}

impl EngineBuilder {
    /// Starts binding against a compiled schedule.
    pub fn new(compiled: Arc<CompiledSchedule>) -> Self {
        let nodes = (0..compiled.graph().node_count()).map(|_| None).collect();
        let fifos = (0..compiled.graph().edge_count()).map(|_| None).collect();
        Self {
            compiled,
            nodes,
            fifos,
            hooks: None,
            stop: StopToken::new(),
            error: None,
        }
    }

    /// Binds the implementation of `id`.
    pub fn node(mut self, id: NodeId, node: Box<dyn Node>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.nodes.get_mut(id.index()) {
            None => self.error = Some(EngineError::UnknownNode(id)),
            Some(Some(_)) => self.error = Some(EngineError::DuplicateNode(id)),
            Some(slot) => *slot = Some(node),
        }
        self
    }

    /// Allocates the FIFO of `edge` with its compiled capacity; delay
    /// elements are `T::default()`.
    pub fn fifo<T: Default + Clone + Send + 'static>(self, edge: EdgeId) -> Self {
        self.bind(edge, Fifo::<T>::new)
    }

    /// Builds the FIFO of `edge` on host storage. The first `delay` elements
    /// of `storage` are the initial tokens.
    pub fn fifo_storage<T: Clone + Send + 'static>(self, edge: EdgeId, storage: Vec<T>) -> Self {
        self.bind(edge, move |capacity, delay| {
            Fifo::from_storage(storage, capacity, delay)
        })
    }

    /// Allocates every edge still without storage with element type `T`.
    pub fn fifo_all<T: Default + Clone + Send + 'static>(mut self) -> Self {
        for i in 0..self.fifos.len() {
            if self.fifos[i].is_none() {
                self = self.fifo::<T>(EdgeId::new(i as u32));
            }
        }
        self
    }

    /// Installs instrumentation hooks.
    pub fn hooks(mut self, hooks: Box<dyn ExecutionHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Shares an existing stop token with the engine.
    pub fn stop_token(mut self, token: StopToken) -> Self {
        self.stop = token;
        self
    }

    fn bind<T: Clone + Send + 'static>(
        mut self,
        edge: EdgeId,
        make: impl FnOnce(usize, usize) -> Result<Fifo<T>, FifoError>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(info) = self.compiled.graph().edge(edge) else {
            self.error = Some(EngineError::UnknownEdge(edge));
            return self;
        };
        let expected = info.element().size();
        let delay = info.delay() as usize;
        let capacity = self.compiled.capacity(edge).unwrap_or(0);

        let actual = core::mem::size_of::<T>();
        if expected != actual {
            self.error = Some(EngineError::ElementSizeMismatch {
                edge,
                expected,
                actual,
            });
        } else if self.fifos[edge.index()].is_some() {
            self.error = Some(EngineError::DuplicateFifo(edge));
        } else {
            match make(capacity, delay) {
                Ok(fifo) => self.fifos[edge.index()] = Some(Box::new(fifo)),
                Err(error) => self.error = Some(EngineError::Fifo { edge, error }),
            }
        }
        self
    }

    /// Checks that everything is bound, then initializes every node in
    /// declaration order.
    pub fn build(self) -> Result<Engine, EngineError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, n)| n.ok_or(EngineError::MissingNode(NodeId::new(i as u32))))
            .collect::<Result<Vec<_>, _>>()?;
        let fifos = self
            .fifos
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.ok_or(EngineError::MissingFifo(EdgeId::new(i as u32))))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, node) in nodes.iter_mut().enumerate() {
            node.init().map_err(|err| EngineError::NodeInit {
                node: NodeId::new(i as u32),
                code: err.code(),
            })?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine_build: {} nodes, {} fifos, mode {}",
            nodes.len(),
            fifos.len(),
            self.compiled.mode()
        );

        let levels = vec![0; fifos.len()];
        Ok(Engine {
            compiled: self.compiled,
            core: Core {
                nodes,
                fifos,
                hooks: self.hooks,
                levels,
                poisoned: None,
            },
            stop: self.stop,
            cursor: 0,
        })
    }
}

/// Drives a compiled schedule.
///
/// Built by [`EngineBuilder`]. All calls take `&mut self` and an explicit
/// [`ExecutionContext`]; one engine is never driven from two places at once.
pub struct Engine {
    compiled: Arc<CompiledSchedule>,
    core: Core,
    stop: StopToken,
    /// Position in the firing order where the next scan starts.
    cursor: usize,
}

/// Everything an activation mutates, split from the schedule so both can
/// be borrowed at once.
struct Core {
    nodes: Vec<Box<dyn Node>>,
    fifos: Vec<Box<dyn ErasedFifo>>,
    hooks: Option<Box<dyn ExecutionHooks>>,
    /// FIFO levels captured before an activation, indexed by edge.
    levels: Vec<usize>,
    poisoned: Option<Failure>,
}

impl Core {
    fn readiness(&mut self, compiled: &CompiledSchedule, node: NodeId) -> Readiness {
        let graph = compiled.graph();
        let io = NodeIo::new(&graph.nodes()[node.index()], graph.edges(), &mut self.fifos);
        self.nodes[node.index()].prepare(&io)
    }

    fn fire(
        &mut self,
        compiled: &CompiledSchedule,
        node: NodeId,
        ctx: &mut ExecutionContext,
        persist_state: bool,
    ) -> Result<RunStatus, Failure> {
        let graph = compiled.graph();
        let gn = &graph.nodes()[node.index()];
        let idx = node.index();

        if let Some(hooks) = self.hooks.as_mut() {
            hooks.before_activation(node);
        }

        let mut restore_error = None;
        if persist_state
            && let Some(state) = ctx.take_state(node)
            && let Err(err) = self.nodes[idx].restore_state(&state)
        {
            // The parked blob is still the last good state; keep it.
            ctx.store_state(node, state);
            restore_error = Some(err);
        }
        let restored = restore_error.is_none();

        let outcome = match restore_error {
            Some(err) => Err(err),
            None => {
                for edge in gn.input_edges().chain(gn.output_edges()) {
                    self.levels[edge.index()] = self.fifos[edge.index()].available_to_read();
                }
                let mut io = NodeIo::new(gn, graph.edges(), &mut self.fifos);
                match self.nodes[idx].run(&mut io) {
                    Ok(status) if !self.rates_honored(compiled, gn, status) => {
                        Err(NodeError::Recoverable(ErrorCode::RATE_MISMATCH))
                    }
                    other => other,
                }
            }
        };

        if persist_state
            && restored
            && let Some(state) = self.nodes[idx].save_state()
        {
            ctx.store_state(node, state);
        }
        ctx.record_activation();

        if let Some(hooks) = self.hooks.as_mut() {
            let reported = match outcome {
                Ok(RunStatus::Success) => ActivationOutcome::Success,
                Ok(RunStatus::Skip) => ActivationOutcome::Skipped,
                Err(err) => ActivationOutcome::Failed(err.code()),
            };
            hooks.after_activation(node, reported);
        }

        outcome.map_err(|err| self.fail(compiled, node, err))
    }

    /// Checks that the activation moved exactly its rates (nothing on `Skip`).
    fn rates_honored(&self, compiled: &CompiledSchedule, gn: &GraphNode, status: RunStatus) -> bool {
        let edges = compiled.graph().edges();
        gn.input_edges().chain(gn.output_edges()).all(|id| {
            let edge = &edges[id.index()];
            let mut expected = 0i64;
            if status == RunStatus::Success {
                if edge.source().node == gn.id() {
                    expected += i64::from(edge.production_rate());
                }
                if edge.target().node == gn.id() {
                    expected -= i64::from(edge.consumption_rate());
                }
            }
            let before = self.levels[id.index()] as i64;
            let after = self.fifos[id.index()].available_to_read() as i64;
            after - before == expected
        })
    }

    fn fail(&mut self, compiled: &CompiledSchedule, node: NodeId, err: NodeError) -> Failure {
        let failure = Failure {
            code: err.code(),
            node,
            diagnostic: compiled.diagnostic_code(node).unwrap_or(0),
            fatal: err.is_fatal(),
        };
        if failure.fatal {
            #[cfg(feature = "tracing")]
            tracing::error!(
                "engine_fail: node {} (diag {}) fatal: {}",
                node,
                failure.diagnostic,
                failure.code
            );
            self.poisoned = Some(failure);
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "engine_fail: node {} (diag {}): {}",
                node,
                failure.diagnostic,
                failure.code
            );
        }
        failure
    }

    fn poisoned_failure(&self) -> Option<Failure> {
        self.poisoned.map(|failure| Failure {
            code: ErrorCode::FATAL,
            ..failure
        })
    }
}

/// Candidate order scanned by `activate_next`: the guard set's firing order,
/// or the period order for ordered schedules.
fn firing_order(compiled: &CompiledSchedule) -> &[NodeId] {
    match compiled.schedule() {
        Schedule::Guarded(guards) => guards.firing_order.as_slice(),
        Schedule::Ordered(order) => order.as_slice(),
    }
}

impl Engine {
    /// Returns the schedule the engine drives.
    pub fn compiled(&self) -> &Arc<CompiledSchedule> {
        &self.compiled
    }

    /// Returns a handle to the engine's stop flag.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// True after a fatal error, until [`reinitialize()`](Self::reinitialize).
    pub fn is_poisoned(&self) -> bool {
        self.core.poisoned.is_some()
    }

    /// Typed view of one edge's FIFO.
    pub fn fifo<T: 'static>(&self, edge: EdgeId) -> Option<&Fifo<T>> {
        self.core
            .fifos
            .get(edge.index())?
            .as_any()
            .downcast_ref::<Fifo<T>>()
    }

    /// Typed mutable view of one edge's FIFO, for hosts that inject or drain
    /// elements between runs.
    pub fn fifo_mut<T: 'static>(&mut self, edge: EdgeId) -> Option<&mut Fifo<T>> {
        self.core
            .fifos
            .get_mut(edge.index())?
            .as_any_mut()
            .downcast_mut::<Fifo<T>>()
    }

    /// Runs periods until the stop token is raised, the context's iteration
    /// bound is reached, or an error occurs.
    ///
    /// The context is reset first (saved node states survive). In
    /// fully-asynchronous mode a period is one pass over the firing order
    /// that fires every ready node; the run also ends after a pass in which
    /// no node was ready. A stop request is honored between activations of
    /// a pass, and the pass still gets its `after_period` hook.
    pub fn run(&mut self, ctx: &mut ExecutionContext) -> RunReport {
        ctx.reset();
        if let Some(failure) = self.core.poisoned_failure() {
            ctx.fail(failure);
            return ctx.report();
        }

        let result = match self.compiled.mode() {
            SchedulingMode::FullyAsynchronous => self.run_passes(ctx),
            mode => self.run_periods(ctx, mode.is_asynchronous()),
        };
        if let Err(failure) = result {
            ctx.fail(failure);
        }
        ctx.report()
    }

    fn run_periods(
        &mut self,
        ctx: &mut ExecutionContext,
        check_readiness: bool,
    ) -> Result<(), Failure> {
        let compiled = &self.compiled;
        let node_count = compiled.graph().node_count();

        while !self.stop.is_stop_requested() && !ctx.limit_reached() {
            let iteration = ctx.iterations();
            ctx.begin_period(node_count);
            if let Some(hooks) = self.core.hooks.as_mut() {
                hooks.before_period(iteration);
            }
            #[cfg(feature = "tracing")]
            tracing::trace!("engine_period: {iteration} start");

            for &node in compiled.order() {
                if check_readiness {
                    match self.core.readiness(compiled, node) {
                        Readiness::Proceed => {}
                        Readiness::Skip => {
                            ctx.record_skip(node);
                            continue;
                        }
                        Readiness::Fatal(code) => {
                            return Err(self.core.fail(compiled, node, NodeError::Fatal(code)));
                        }
                    }
                }
                self.core.fire(compiled, node, ctx, false)?;
            }

            ctx.complete_period();
            if let Some(hooks) = self.core.hooks.as_mut() {
                hooks.after_period(iteration);
            }
        }
        Ok(())
    }

    fn run_passes(&mut self, ctx: &mut ExecutionContext) -> Result<(), Failure> {
        let compiled = &self.compiled;
        let node_count = compiled.graph().node_count();

        while !self.stop.is_stop_requested() && !ctx.limit_reached() {
            let iteration = ctx.iterations();
            ctx.begin_period(node_count);
            let mut started = false;
            let mut stopped = false;

            for &node in firing_order(compiled) {
                if self.stop.is_stop_requested() {
                    stopped = true;
                    break;
                }
                match self.core.readiness(compiled, node) {
                    Readiness::Proceed => {
                        if !started {
                            started = true;
                            if let Some(hooks) = self.core.hooks.as_mut() {
                                hooks.before_period(iteration);
                            }
                        }
                        self.core.fire(compiled, node, ctx, true)?;
                    }
                    Readiness::Skip => ctx.record_skip(node),
                    Readiness::Fatal(code) => {
                        return Err(self.core.fail(compiled, node, NodeError::Fatal(code)));
                    }
                }
            }

            if !started {
                break;
            }
            // A pass cut short by a stop request still closes its period.
            ctx.complete_period();
            if let Some(hooks) = self.core.hooks.as_mut() {
                hooks.after_period(iteration);
            }
            if stopped {
                break;
            }
        }
        Ok(())
    }

    /// Fires the next ready node, scanning the firing order round-robin from
    /// just after the node fired last. Returns after at most one activation.
    ///
    /// When nothing fires the context's code is [`ErrorCode::SKIP`].
    pub fn activate_next(&mut self, ctx: &mut ExecutionContext) -> Activation {
        if let Some(stopped) = self.check_entry(ctx) {
            return stopped;
        }
        let compiled = Arc::clone(&self.compiled);
        let order = firing_order(&compiled);

        for k in 0..order.len() {
            let pos = (self.cursor + k) % order.len();
            let node = order[pos];
            match self.core.readiness(&compiled, node) {
                Readiness::Proceed => {
                    self.cursor = (pos + 1) % order.len();
                    return self.finish_activation(node, ctx);
                }
                Readiness::Skip => ctx.record_skip(node),
                Readiness::Fatal(code) => {
                    let failure = self.core.fail(&compiled, node, NodeError::Fatal(code));
                    ctx.fail(failure);
                    return Activation::Failed(failure);
                }
            }
        }
        ctx.note_skip();
        Activation::Idle
    }

    /// Fires `node` if it is ready, e.g. from the interrupt that fed it.
    ///
    /// A node that is not ready, or that declines inside `run`, leaves
    /// [`ErrorCode::SKIP`] in the context.
    pub fn activate(&mut self, node: NodeId, ctx: &mut ExecutionContext) -> Activation {
        if let Some(stopped) = self.check_entry(ctx) {
            return stopped;
        }
        if node.index() >= self.compiled.graph().node_count() {
            let failure = Failure {
                code: ErrorCode::INVALID_PORT,
                node,
                diagnostic: 0,
                fatal: false,
            };
            ctx.fail(failure);
            return Activation::Failed(failure);
        }
        match self.core.readiness(&self.compiled, node) {
            Readiness::Proceed => self.finish_activation(node, ctx),
            Readiness::Skip => {
                ctx.record_skip(node);
                ctx.note_skip();
                Activation::NotReady(node)
            }
            Readiness::Fatal(code) => {
                let failure = self.core.fail(&self.compiled, node, NodeError::Fatal(code));
                ctx.fail(failure);
                Activation::Failed(failure)
            }
        }
    }

    /// Common prologue of the single-activation entry points.
    fn check_entry(&mut self, ctx: &mut ExecutionContext) -> Option<Activation> {
        if let Some(failure) = self.core.poisoned_failure() {
            ctx.fail(failure);
            return Some(Activation::Failed(failure));
        }
        if self.stop.is_stop_requested() {
            return Some(Activation::Stopped);
        }
        ctx.clear_error();
        None
    }

    fn finish_activation(&mut self, node: NodeId, ctx: &mut ExecutionContext) -> Activation {
        let persist = self.compiled.mode() == SchedulingMode::FullyAsynchronous;
        match self.core.fire(&self.compiled, node, ctx, persist) {
            Ok(RunStatus::Success) => Activation::Fired(node),
            Ok(RunStatus::Skip) => {
                ctx.note_skip();
                Activation::Skipped(node)
            }
            Err(failure) => {
                ctx.fail(failure);
                Activation::Failed(failure)
            }
        }
    }

    /// Clears a poisoned state: every FIFO returns to its initial delay,
    /// every node is [`reset`](Node::reset), the round-robin cursor rewinds.
    ///
    /// States parked in `ctx` predate the reset and are dropped, so the next
    /// activation starts from the node's fresh state.
    pub fn reinitialize(&mut self, ctx: &mut ExecutionContext) {
        ctx.clear_states();
        ctx.clear_error();
        for fifo in &mut self.core.fifos {
            fifo.reset();
        }
        for node in &mut self.core.nodes {
            node.reset();
        }
        self.core.poisoned = None;
        self.cursor = 0;
        #[cfg(feature = "tracing")]
        tracing::debug!("engine_reinit: {} nodes reset", self.core.nodes.len());
    }

    /// Calls every node's `teardown` and releases all FIFO storage.
    pub fn teardown(mut self) {
        for node in &mut self.core.nodes {
            node.teardown();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("engine_teardown: {} nodes", self.core.nodes.len());
    }
}

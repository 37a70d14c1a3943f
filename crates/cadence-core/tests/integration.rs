//! Integration tests for cadence-core: compile a graph, bind nodes and run it.
//!
//! Covers multirate data ordering, feedback loops with initial tokens,
//! asynchronous skipping, fully-asynchronous activation with state
//! save/restore, error propagation (recoverable, fatal, rate and type
//! violations), hooks and cooperative stop.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cadence_core::{
    Activation, ActivationOutcome, CompileOptions, CompiledSchedule, EdgeId, ElementType,
    EngineBuilder, ErrorCode, ExecutionContext, ExecutionHooks, GraphError, Node, NodeError,
    NodeId, NodeIo, NodeSpec, NodeState, Readiness, RunStatus, SchedulingMode, SdfGraph,
    StateWriter, StopToken,
};

fn word() -> ElementType {
    ElementType::of::<u32>("u32")
}

type Seen = Arc<Mutex<Vec<u32>>>;

// ============================================================================
// Test nodes
// ============================================================================

/// Emits `rate` consecutive integers per activation.
struct Ramp {
    next: u32,
    rate: u32,
}

impl Ramp {
    fn new(rate: u32) -> Self {
        Self { next: 0, rate }
    }
}

impl Node for Ramp {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        let block: Vec<u32> = (self.next..self.next + self.rate).collect();
        io.push_from(0, &block)?;
        self.next += self.rate;
        Ok(RunStatus::Success)
    }

    fn reset(&mut self) {
        self.next = 0;
    }
}

/// Records everything it consumes.
struct Collect {
    rate: usize,
    seen: Seen,
}

impl Collect {
    fn new(rate: usize) -> (Self, Seen) {
        let seen = Seen::default();
        (
            Self {
                rate,
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl Node for Collect {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        let mut block = vec![0u32; self.rate];
        io.pop_into(0, &mut block)?;
        self.seen.lock().unwrap().extend(block);
        Ok(RunStatus::Success)
    }
}

/// Pops one element and pushes it back incremented.
struct Increment;

impl Node for Increment {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        io.transform::<u32, u32, _>(0, 0, |input, mut output| {
            output.copy_from(&[input.iter().copied().sum::<u32>() + 1]);
        })?;
        Ok(RunStatus::Success)
    }
}

fn ramp_to_collect(
    produce: u32,
    consume: u32,
    options: &CompileOptions,
) -> (Arc<CompiledSchedule>, NodeId, NodeId, EdgeId) {
    let mut graph = SdfGraph::new();
    let src = graph.add_node(NodeSpec::new("src").code(10).output(word(), produce));
    let dst = graph.add_node(NodeSpec::new("dst").code(77).input(word(), consume));
    let edge = graph.connect(src.output(0), dst.input(0)).unwrap();
    (Arc::new(graph.compile(options).unwrap()), src, dst, edge)
}

// ============================================================================
// 1. Static schedules
// ============================================================================

#[test]
fn multirate_chain_preserves_order() {
    let (compiled, src, dst, edge) = ramp_to_collect(4, 2, &CompileOptions::default());
    assert_eq!(compiled.order(), &[src, dst, dst]);
    assert_eq!(compiled.capacity(edge), Some(4));

    let (sink, seen) = Collect::new(2);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(4)))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let mut ctx = ExecutionContext::bounded(3);
    let report = engine.run(&mut ctx);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 3);
    assert_eq!(ctx.activations(), 9);
    assert_eq!(*seen.lock().unwrap(), (0..12).collect::<Vec<_>>());
    assert_eq!(engine.fifo::<u32>(edge).unwrap().available_to_read(), 0);
}

#[test]
fn feedback_loop_runs_on_initial_token() {
    let mut graph = SdfGraph::new();
    let a = graph.add_node(NodeSpec::new("a").input(word(), 1).output(word(), 1));
    let b = graph.add_node(NodeSpec::new("b").input(word(), 1).output(word(), 1));
    let forward = graph.connect(a.output(0), b.input(0)).unwrap();
    let back = graph.connect_with_delay(b.output(0), a.input(0), 1).unwrap();
    let compiled = Arc::new(graph.compile(&CompileOptions::default()).unwrap());
    assert_eq!(compiled.order(), &[a, b]);

    let mut engine = EngineBuilder::new(compiled)
        .node(a, Box::new(Increment))
        .node(b, Box::new(Increment))
        .fifo::<u32>(forward)
        .fifo_storage(back, vec![10u32])
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::bounded(4));
    assert!(report.is_ok());
    assert_eq!(report.iterations, 4);

    // Each period adds two; the loop edge is back at its delay.
    let fifo = engine.fifo_mut::<u32>(back).unwrap();
    assert_eq!(fifo.available_to_read(), 1);
    let mut token = [0u32];
    fifo.pop_slice(&mut token).unwrap();
    assert_eq!(token, [18]);
}

#[test]
fn feedback_loop_without_delay_deadlocks() {
    let mut graph = SdfGraph::new();
    let a = graph.add_node(NodeSpec::new("a").input(word(), 1).output(word(), 1));
    let b = graph.add_node(NodeSpec::new("b").input(word(), 1).output(word(), 1));
    graph.connect(a.output(0), b.input(0)).unwrap();
    graph.connect(b.output(0), a.input(0)).unwrap();

    let err = graph.compile(&CompileOptions::default()).unwrap_err();
    assert_eq!(err, GraphError::Deadlock { nodes: vec![a, b] });
}

#[test]
fn three_node_ring_with_delay_runs() {
    let mut graph = SdfGraph::new();
    let nodes: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| graph.add_node(NodeSpec::new(*name).input(word(), 1).output(word(), 1)))
        .collect();
    graph.connect(nodes[0].output(0), nodes[1].input(0)).unwrap();
    graph.connect(nodes[1].output(0), nodes[2].input(0)).unwrap();
    let closing = graph
        .connect_with_delay(nodes[2].output(0), nodes[0].input(0), 3)
        .unwrap();
    let compiled = Arc::new(graph.compile(&CompileOptions::default()).unwrap());
    assert_eq!(compiled.order(), &nodes[..]);
    assert_eq!(compiled.capacity(closing), Some(3));

    let mut builder = EngineBuilder::new(compiled);
    for &node in &nodes {
        builder = builder.node(node, Box::new(Increment));
    }
    let mut engine = builder.fifo_all::<u32>().build().unwrap();
    let report = engine.run(&mut ExecutionContext::bounded(5));
    assert!(report.is_ok());
    assert_eq!(engine.fifo::<u32>(closing).unwrap().available_to_read(), 3);
}

#[test]
fn capacity_limit_is_enforced_at_compile_time() {
    let mut graph = SdfGraph::new();
    let src = graph.add_node(NodeSpec::new("src").output(word(), 4));
    let dst = graph.add_node(NodeSpec::new("dst").input(word(), 2));
    let edge = graph.connect(src.output(0), dst.input(0)).unwrap();

    let err = graph
        .compile(&CompileOptions::default().with_capacity_limit(3))
        .unwrap_err();
    assert!(matches!(err, GraphError::Unsatisfiable { edge: e, .. } if e == edge));
}

// ============================================================================
// 2. Asynchronous mode
// ============================================================================

/// Produces one element on every other activation, skipping in between.
struct Bursty {
    next: u32,
    tick: u32,
}

impl Node for Bursty {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        self.tick += 1;
        if self.tick % 2 == 0 {
            return Ok(RunStatus::Skip);
        }
        io.push_from(0, &[self.next])?;
        self.next += 1;
        Ok(RunStatus::Success)
    }
}

#[test]
fn asynchronous_consumer_skips_without_loss() {
    let options = CompileOptions::default().with_mode(SchedulingMode::Asynchronous);
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &options);

    let (sink, seen) = Collect::new(1);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Bursty { next: 0, tick: 0 }))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let mut ctx = ExecutionContext::bounded(6);
    let report = engine.run(&mut ctx);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 6);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(ctx.total_skips(), 3);
    assert_eq!(ctx.activations(), 9);
}

#[test]
fn static_mode_does_not_check_readiness() {
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &CompileOptions::default());
    let (sink, _) = Collect::new(1);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Bursty { next: 0, tick: 0 }))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::new());
    assert_eq!(report.code, ErrorCode::BUFFER_UNDERFLOW);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.failure.unwrap().node, dst);
}

// ============================================================================
// 3. Fully-asynchronous mode
// ============================================================================

/// Counter gated by a host flag.
///
/// The working count lives in `scratch`, a cell the host can clobber
/// between activations, so only the saved state carries it across a
/// suspension.
struct Ticker {
    scratch: Arc<AtomicU32>,
    open: Arc<AtomicBool>,
    refuse_restore: Arc<AtomicBool>,
    restores: Arc<AtomicUsize>,
}

impl Node for Ticker {
    fn prepare(&self, io: &NodeIo<'_>) -> Readiness {
        if self.open.load(Ordering::SeqCst) && io.outputs_ready() {
            Readiness::Proceed
        } else {
            Readiness::Skip
        }
    }

    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        let count = self.scratch.load(Ordering::SeqCst);
        io.push_from(0, &[count])?;
        self.scratch.store(count + 1, Ordering::SeqCst);
        Ok(RunStatus::Success)
    }

    fn save_state(&self) -> Option<NodeState> {
        Some(StateWriter::new().u32(self.scratch.load(Ordering::SeqCst)).finish())
    }

    fn restore_state(&mut self, state: &NodeState) -> Result<(), NodeError> {
        if self.refuse_restore.load(Ordering::SeqCst) {
            return Err(NodeError::Recoverable(ErrorCode::node(2)));
        }
        let count = state
            .reader()
            .u32()
            .ok_or(NodeError::Fatal(ErrorCode::node(1)))?;
        self.scratch.store(count, Ordering::SeqCst);
        self.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&mut self) {
        self.scratch.store(0, Ordering::SeqCst);
    }
}

struct TickerRig {
    engine: cadence_core::Engine,
    ticker: NodeId,
    sink: NodeId,
    edge: EdgeId,
    scratch: Arc<AtomicU32>,
    open: Arc<AtomicBool>,
    refuse_restore: Arc<AtomicBool>,
    restores: Arc<AtomicUsize>,
    seen: Seen,
}

fn ticker_rig() -> TickerRig {
    let options = CompileOptions::default().with_mode(SchedulingMode::FullyAsynchronous);
    let (compiled, ticker, sink, edge) = ramp_to_collect(1, 1, &options);
    let scratch = Arc::new(AtomicU32::new(0));
    let open = Arc::new(AtomicBool::new(true));
    let refuse_restore = Arc::new(AtomicBool::new(false));
    let restores = Arc::new(AtomicUsize::new(0));
    let (collect, seen) = Collect::new(1);
    let engine = EngineBuilder::new(compiled)
        .node(
            ticker,
            Box::new(Ticker {
                scratch: Arc::clone(&scratch),
                open: Arc::clone(&open),
                refuse_restore: Arc::clone(&refuse_restore),
                restores: Arc::clone(&restores),
            }),
        )
        .node(sink, Box::new(collect))
        .fifo::<u32>(edge)
        .build()
        .unwrap();
    TickerRig {
        engine,
        ticker,
        sink,
        edge,
        scratch,
        open,
        refuse_restore,
        restores,
        seen,
    }
}

#[test]
fn activate_next_round_robins_ready_nodes() {
    let mut rig = ticker_rig();
    let mut ctx = ExecutionContext::new();

    assert_eq!(rig.engine.activate_next(&mut ctx), Activation::Fired(rig.ticker));
    assert_eq!(rig.engine.activate_next(&mut ctx), Activation::Fired(rig.sink));
    assert_eq!(rig.engine.activate_next(&mut ctx), Activation::Fired(rig.ticker));
    assert_eq!(ctx.code(), ErrorCode::SUCCESS);
    // Ticker's output is full, so the scan moves past it.
    assert_eq!(rig.engine.activate(rig.ticker, &mut ctx), Activation::NotReady(rig.ticker));
    assert_eq!(ctx.code(), ErrorCode::SKIP);
    assert_eq!(rig.engine.activate_next(&mut ctx), Activation::Fired(rig.sink));
    assert_eq!(ctx.code(), ErrorCode::SUCCESS);
    assert_eq!(rig.engine.activate(rig.sink, &mut ctx), Activation::NotReady(rig.sink));

    rig.open.store(false, Ordering::SeqCst);
    assert_eq!(rig.engine.activate_next(&mut ctx), Activation::Idle);
    assert_eq!(ctx.code(), ErrorCode::SKIP);
    assert!(ctx.failure().is_none());

    assert_eq!(*rig.seen.lock().unwrap(), vec![0, 1]);
    assert_eq!(ctx.activations(), 4);
}

#[test]
fn state_is_parked_between_activations() {
    let mut rig = ticker_rig();
    let mut ctx = ExecutionContext::bounded(3);

    let report = rig.engine.run(&mut ctx);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 3);
    assert_eq!(*rig.seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(3));
    assert!(ctx.state(rig.sink).is_none());
    // No state existed before the first activation.
    assert_eq!(rig.restores.load(Ordering::SeqCst), 2);

    // Saved state survives into the next run.
    ctx.set_limit(Some(1));
    rig.engine.run(&mut ctx);
    assert_eq!(rig.restores.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(4));
}

#[test]
fn restored_state_replaces_clobbered_working_state() {
    let mut rig = ticker_rig();
    let mut ctx = ExecutionContext::new();

    assert_eq!(rig.engine.activate(rig.ticker, &mut ctx), Activation::Fired(rig.ticker));
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(1));
    rig.scratch.store(99, Ordering::SeqCst);
    assert_eq!(rig.engine.activate(rig.sink, &mut ctx), Activation::Fired(rig.sink));

    assert_eq!(rig.engine.activate(rig.ticker, &mut ctx), Activation::Fired(rig.ticker));
    assert_eq!(rig.engine.activate(rig.sink, &mut ctx), Activation::Fired(rig.sink));
    assert_eq!(*rig.seen.lock().unwrap(), vec![0, 1]);
    assert_eq!(rig.restores.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(2));
}

#[test]
fn failed_restore_keeps_parked_state() {
    let mut rig = ticker_rig();
    let mut ctx = ExecutionContext::bounded(2);
    assert!(rig.engine.run(&mut ctx).is_ok());
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(2));

    rig.scratch.store(50, Ordering::SeqCst);
    rig.refuse_restore.store(true, Ordering::SeqCst);
    match rig.engine.activate(rig.ticker, &mut ctx) {
        Activation::Failed(failure) => {
            assert_eq!(failure.code, ErrorCode::node(2));
            assert_eq!(failure.node, rig.ticker);
            assert!(!failure.fatal);
        }
        other => panic!("expected a failed restore, got {other:?}"),
    }
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(2));
    assert_eq!(rig.engine.fifo::<u32>(rig.edge).unwrap().available_to_read(), 0);
    assert!(!rig.engine.is_poisoned());

    rig.refuse_restore.store(false, Ordering::SeqCst);
    assert_eq!(rig.engine.activate(rig.ticker, &mut ctx), Activation::Fired(rig.ticker));
    assert_eq!(rig.engine.activate(rig.sink, &mut ctx), Activation::Fired(rig.sink));
    assert_eq!(*rig.seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn reinitialize_drops_parked_state() {
    let mut rig = ticker_rig();
    let mut ctx = ExecutionContext::bounded(3);
    assert!(rig.engine.run(&mut ctx).is_ok());
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(3));

    rig.engine.reinitialize(&mut ctx);
    assert!(ctx.state(rig.ticker).is_none());

    ctx.set_limit(Some(1));
    assert!(rig.engine.run(&mut ctx).is_ok());
    assert_eq!(*rig.seen.lock().unwrap(), vec![0, 1, 2, 0]);
    assert_eq!(ctx.state(rig.ticker).unwrap().reader().u32(), Some(1));
}

#[test]
fn fully_asynchronous_run_ends_when_idle() {
    let mut rig = ticker_rig();
    rig.open.store(false, Ordering::SeqCst);

    let mut ctx = ExecutionContext::new();
    let report = rig.engine.run(&mut ctx);
    assert_eq!(report.code, ErrorCode::SUCCESS);
    assert_eq!(report.iterations, 0);
    assert_eq!(ctx.activations(), 0);
    assert_eq!(ctx.period_skips(rig.ticker), 1);
    assert_eq!(ctx.period_skips(rig.sink), 1);
}

// ============================================================================
// 4. Error propagation
// ============================================================================

/// Consumes normally but fails on its second activation.
struct Flaky {
    calls: u32,
}

impl Node for Flaky {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        let mut x = [0u32];
        io.pop_into(0, &mut x)?;
        self.calls += 1;
        if self.calls == 2 {
            return Err(NodeError::Recoverable(ErrorCode::node(5)));
        }
        Ok(RunStatus::Success)
    }
}

#[test]
fn recoverable_error_reports_node_and_allows_rerun() {
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &CompileOptions::default());
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(1)))
        .node(dst, Box::new(Flaky { calls: 0 }))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let mut ctx = ExecutionContext::new();
    let report = engine.run(&mut ctx);
    assert_eq!(report.code, ErrorCode::node(5));
    assert_eq!(report.iterations, 1);
    let failure = report.failure.unwrap();
    assert_eq!(failure.node, dst);
    assert_eq!(failure.diagnostic, 77);
    assert!(!failure.fatal);
    assert!(!engine.is_poisoned());

    ctx.set_limit(Some(2));
    let report = engine.run(&mut ctx);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 2);
    assert!(ctx.failure().is_none());
}

/// Fails fatally until reset.
struct Fragile {
    broken: bool,
}

impl Node for Fragile {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        if self.broken {
            return Err(NodeError::Fatal(ErrorCode::node(1)));
        }
        let mut x = [0u32];
        io.pop_into(0, &mut x)?;
        Ok(RunStatus::Success)
    }

    fn reset(&mut self) {
        self.broken = false;
    }
}

#[test]
fn fatal_error_poisons_until_reinitialized() {
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &CompileOptions::default());
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(1)))
        .node(dst, Box::new(Fragile { broken: true }))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let mut ctx = ExecutionContext::bounded(5);
    let report = engine.run(&mut ctx);
    assert_eq!(report.code, ErrorCode::node(1));
    assert!(report.failure.unwrap().fatal);
    assert!(engine.is_poisoned());

    let report = engine.run(&mut ctx);
    assert_eq!(report.code, ErrorCode::FATAL);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.failure.unwrap().node, dst);
    assert!(matches!(engine.activate_next(&mut ctx), Activation::Failed(f) if f.code == ErrorCode::FATAL));

    engine.reinitialize(&mut ctx);
    assert!(!engine.is_poisoned());
    assert_eq!(engine.fifo::<u32>(edge).unwrap().available_to_read(), 0);
    let report = engine.run(&mut ctx);
    assert!(report.is_ok());
    assert_eq!(report.iterations, 5);
}

/// Claims success without producing anything.
struct Lazy;

impl Node for Lazy {
    fn run(&mut self, _io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        Ok(RunStatus::Success)
    }
}

#[test]
fn rate_violation_is_reported() {
    let (compiled, src, dst, edge) = ramp_to_collect(2, 2, &CompileOptions::default());
    let (sink, _) = Collect::new(2);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Lazy))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::new());
    assert_eq!(report.code, ErrorCode::RATE_MISMATCH);
    assert_eq!(report.failure.unwrap().node, src);
    assert_eq!(report.iterations, 0);
}

/// Reads its input with the wrong element type.
struct Confused;

impl Node for Confused {
    fn run(&mut self, io: &mut NodeIo<'_>) -> Result<RunStatus, NodeError> {
        let mut x = [0i64];
        io.pop_into(0, &mut x)?;
        Ok(RunStatus::Success)
    }
}

#[test]
fn wrong_element_type_is_reported() {
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &CompileOptions::default());
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(1)))
        .node(dst, Box::new(Confused))
        .fifo::<u32>(edge)
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::new());
    assert_eq!(report.code, ErrorCode::TYPE_MISMATCH);
    assert_eq!(report.failure.unwrap().node, dst);
}

// ============================================================================
// 5. Hooks and stop
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    BeforePeriod(u64),
    AfterPeriod(u64),
    Before(NodeId),
    After(NodeId, ActivationOutcome),
}

struct Recorder(Arc<Mutex<Vec<Event>>>);

impl ExecutionHooks for Recorder {
    fn before_period(&mut self, iteration: u64) {
        self.0.lock().unwrap().push(Event::BeforePeriod(iteration));
    }

    fn after_period(&mut self, iteration: u64) {
        self.0.lock().unwrap().push(Event::AfterPeriod(iteration));
    }

    fn before_activation(&mut self, node: NodeId) {
        self.0.lock().unwrap().push(Event::Before(node));
    }

    fn after_activation(&mut self, node: NodeId, outcome: ActivationOutcome) {
        self.0.lock().unwrap().push(Event::After(node, outcome));
    }
}

#[test]
fn hooks_observe_every_event_in_order() {
    let (compiled, src, dst, edge) = ramp_to_collect(4, 2, &CompileOptions::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let (sink, _) = Collect::new(2);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(4)))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .hooks(Box::new(Recorder(Arc::clone(&events))))
        .build()
        .unwrap();

    engine.run(&mut ExecutionContext::bounded(2));

    let events = events.lock().unwrap();
    let ok = ActivationOutcome::Success;
    assert_eq!(
        events[..8],
        [
            Event::BeforePeriod(0),
            Event::Before(src),
            Event::After(src, ok),
            Event::Before(dst),
            Event::After(dst, ok),
            Event::Before(dst),
            Event::After(dst, ok),
            Event::AfterPeriod(0),
        ]
    );
    assert_eq!(events.len(), 16);
    assert_eq!(events[15], Event::AfterPeriod(1));
}

struct StopAfter {
    token: StopToken,
    period: u64,
}

impl ExecutionHooks for StopAfter {
    fn after_period(&mut self, iteration: u64) {
        if iteration == self.period {
            self.token.request_stop();
        }
    }
}

#[test]
fn stop_request_ends_run_at_period_boundary() {
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &CompileOptions::default());
    let token = StopToken::new();
    let (sink, seen) = Collect::new(1);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(1)))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .stop_token(token.clone())
        .hooks(Box::new(StopAfter {
            token: token.clone(),
            period: 2,
        }))
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::new());
    assert!(report.is_ok());
    assert_eq!(report.iterations, 3);
    assert_eq!(seen.lock().unwrap().len(), 3);

    token.clear();
    let report = engine.run(&mut ExecutionContext::bounded(1));
    assert_eq!(report.iterations, 1);
}

/// Records period and activation events, and requests a stop right after
/// `node` fires.
struct StopAfterNode {
    token: StopToken,
    node: NodeId,
    events: Arc<Mutex<Vec<Event>>>,
}

impl ExecutionHooks for StopAfterNode {
    fn before_period(&mut self, iteration: u64) {
        self.events.lock().unwrap().push(Event::BeforePeriod(iteration));
    }

    fn after_period(&mut self, iteration: u64) {
        self.events.lock().unwrap().push(Event::AfterPeriod(iteration));
    }

    fn after_activation(&mut self, node: NodeId, outcome: ActivationOutcome) {
        self.events.lock().unwrap().push(Event::After(node, outcome));
        if node == self.node {
            self.token.request_stop();
        }
    }
}

#[test]
fn stop_inside_a_pass_still_closes_the_period() {
    let options = CompileOptions::default().with_mode(SchedulingMode::FullyAsynchronous);
    let (compiled, src, dst, edge) = ramp_to_collect(1, 1, &options);
    let token = StopToken::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let (sink, seen) = Collect::new(1);
    let mut engine = EngineBuilder::new(compiled)
        .node(src, Box::new(Ramp::new(1)))
        .node(dst, Box::new(sink))
        .fifo::<u32>(edge)
        .stop_token(token.clone())
        .hooks(Box::new(StopAfterNode {
            token,
            node: src,
            events: Arc::clone(&events),
        }))
        .build()
        .unwrap();

    let report = engine.run(&mut ExecutionContext::new());
    assert!(report.is_ok());
    assert_eq!(report.iterations, 1);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(
        *events.lock().unwrap(),
        [
            Event::BeforePeriod(0),
            Event::After(src, ActivationOutcome::Success),
            Event::AfterPeriod(0),
        ]
    );
}

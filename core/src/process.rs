//! Process trait and the context handed to a process when it resumes.
//!
//! RULES:
//!   - Exactly one process runs between two clock advances, so every
//!     mutation made through the context is atomic with respect to all
//!     other processes. No locking anywhere.
//!   - A process suspends only by sleeping (timed) or by parking until
//!     another process wakes it. There is no blocking I/O.
//!   - All shared state lives in the Center. Processes never hold
//!     references to each other.

use crate::{
    config::ScenarioConfig,
    error::SimResult,
    event::{SimEvent, TraceEntry},
    resources::{EvaluatorPool, VolunteerPool},
    rng::{RngBank, StreamRng, StreamSlot},
    scheduler::{ProcessId, Scheduler, WakeKey},
    stats::StatsCollector,
    types::{EntityId, SimTime},
};

/// What a process reports after handling a wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Suspended; something is scheduled or will wake it.
    Pending,
    /// Terminated. The engine discards it.
    Done,
}

/// The contract every logical process must fulfill.
pub trait Process: Send {
    fn id(&self) -> ProcessId;

    /// Stable name for logging.
    fn name(&self) -> &'static str;

    /// Called by the engine each time a wakeup for this process fires.
    ///
    /// - `wake`: key of the wakeup being delivered, so a process can
    ///   tell its own timer from a notification
    /// - `ctx`:  the shared state and scheduling primitives
    fn resume(&mut self, wake: WakeKey, ctx: &mut ProcessContext<'_>) -> SimResult<Resume>;
}

/// The variate streams, one per family, all derived from the seed.
pub struct Streams {
    pub inter_arrival: StreamRng,
    pub attributes:    StreamRng,
    pub evaluation:    StreamRng,
    pub service:       StreamRng,
}

impl Streams {
    pub fn new(seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            inter_arrival: bank.for_stream(StreamSlot::InterArrival),
            attributes:    bank.for_stream(StreamSlot::Attributes),
            evaluation:    bank.for_stream(StreamSlot::Evaluation),
            service:       bank.for_stream(StreamSlot::Service),
        }
    }
}

/// Everything shared between processes for one run.
pub struct Center {
    pub config:     ScenarioConfig,
    pub evaluator:  EvaluatorPool,
    pub volunteers: VolunteerPool,
    pub stats:      StatsCollector,
    pub streams:    Streams,
    trace:          Option<Vec<TraceEntry>>,
    /// Children parked until a volunteer is released, in search order.
    searching:      Vec<EntityId>,
}

impl Center {
    pub fn new(config: ScenarioConfig) -> SimResult<Self> {
        let volunteers = VolunteerPool::from_roster(&config.roster)?;
        Ok(Self {
            evaluator: EvaluatorPool::new(config.evaluator_capacity),
            volunteers,
            stats: StatsCollector::new(),
            streams: Streams::new(config.seed),
            trace: Some(Vec::new()),
            searching: Vec::new(),
            config,
        })
    }

    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.trace = if enabled { Some(self.trace.take().unwrap_or_default()) } else { None };
    }

    pub fn emit(&mut self, time: SimTime, event: SimEvent) {
        log::debug!("[{time:8.3}] {event}");
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry { time, event });
        }
    }

    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn searching(&self) -> &[EntityId] {
        &self.searching
    }
}

/// Handle passed into [`Process::resume`].
pub struct ProcessContext<'a> {
    pub center: &'a mut Center,
    scheduler:  &'a mut Scheduler,
    spawned:    &'a mut Vec<Box<dyn Process>>,
}

impl<'a> ProcessContext<'a> {
    pub fn new(
        center: &'a mut Center,
        scheduler: &'a mut Scheduler,
        spawned: &'a mut Vec<Box<dyn Process>>,
    ) -> Self {
        Self { center, scheduler, spawned }
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn horizon(&self) -> SimTime {
        self.scheduler.clock.horizon
    }

    /// Portion of `duration`, starting now, that falls inside the horizon.
    pub fn clip_to_horizon(&self, duration: SimTime) -> SimTime {
        self.scheduler.clock.clip_to_horizon(duration)
    }

    /// Resume `process` after `delay`.
    pub fn sleep(&mut self, process: ProcessId, delay: SimTime) -> WakeKey {
        self.scheduler.schedule_after(process, delay)
    }

    /// Resume `process` in the current time step, after everything
    /// already scheduled for now.
    pub fn wake(&mut self, process: ProcessId) -> WakeKey {
        self.scheduler.schedule_after(process, 0.0)
    }

    pub fn cancel(&mut self, key: WakeKey) {
        self.scheduler.cancel(key);
    }

    /// Start a new process. Its first wakeup is in the current time step.
    pub fn spawn(&mut self, process: Box<dyn Process>) {
        self.scheduler.schedule_after(process.id(), 0.0);
        self.spawned.push(process);
    }

    pub fn emit(&mut self, event: SimEvent) {
        let now = self.now();
        self.center.emit(now, event);
    }

    /// Park `child` until the next volunteer release.
    pub fn await_release(&mut self, child: EntityId) {
        if !self.center.searching.contains(&child) {
            self.center.searching.push(child);
        }
    }

    pub fn stop_awaiting_release(&mut self, child: EntityId) {
        self.center.searching.retain(|c| *c != child);
    }

    /// A volunteer was released: wake every parked child in search
    /// order. The list is drained; children that still find nothing
    /// park again.
    pub fn notify_release(&mut self) {
        let woken: Vec<EntityId> = self.center.searching.drain(..).collect();
        for child in woken {
            self.scheduler.schedule_after(ProcessId::Child(child), 0.0);
        }
    }
}

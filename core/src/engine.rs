//! The simulation engine — owns the scheduler, the shared center and
//! every live process for one run.
//!
//! RUN ORDER:
//!   1. Validate the config. Nothing is simulated on failure.
//!   2. Register the arrival generator with a wakeup at t = 0.
//!   3. Pop wakeups in (time, sequence) order and resume the owning
//!      process until nothing is due at or before the horizon.
//!   4. Whatever child processes remain are counted in flight.
//!   5. Reduce the statistics into a KPI record.
//!
//! RULES:
//!   - All randomness flows through the per-stream RNGs in the Center.
//!   - A process is removed from the registry while it runs and put
//!     back only if it is still pending.
//!   - Wakeups addressed to a finished process are dropped silently.

use crate::{
    arrivals::ArrivalGenerator,
    config::ScenarioConfig,
    error::SimResult,
    event::{SimEvent, TraceEntry},
    process::{Center, Process, ProcessContext, Resume},
    resources::VolunteerPool,
    scheduler::{ProcessId, Scheduler},
    stats::KpiRecord,
    types::RunId,
};
use anyhow::anyhow;
use std::collections::BTreeMap;

pub struct SimEngine {
    pub run_id: RunId,
    scheduler:  Scheduler,
    center:     Center,
    processes:  BTreeMap<ProcessId, Box<dyn Process>>,
    started:    bool,
}

impl SimEngine {
    pub fn new(run_id: RunId, config: ScenarioConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            scheduler: Scheduler::new(config.horizon),
            center:    Center::new(config)?,
            processes: BTreeMap::new(),
            started:   false,
            run_id,
        })
    }

    /// Keep (or drop) the display trace. On by default.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.center.set_trace_enabled(enabled);
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.center.config
    }

    /// Run to the horizon. An engine runs exactly once.
    pub fn run(&mut self) -> SimResult<KpiRecord> {
        if self.started {
            return Err(anyhow!("run {} has already been executed", self.run_id).into());
        }
        self.started = true;

        let (scenario, seed, horizon) = {
            let c = &self.center.config;
            (c.name.clone(), c.seed, c.horizon)
        };
        log::info!(
            "Run {} starting: scenario '{scenario}', seed {seed}, horizon {horizon}",
            self.run_id
        );
        self.center.emit(0.0, SimEvent::RunInitialized { scenario: scenario.clone(), seed, horizon });

        let generator = ArrivalGenerator::for_script(self.center.config.scripted_arrivals.as_deref());
        self.register(Box::new(generator));

        let center = &mut self.center;
        let processes = &mut self.processes;
        let delivered = self.scheduler.run_until(|scheduler, wakeup| {
            let Some(mut process) = processes.remove(&wakeup.process) else {
                log::trace!("dropping wakeup for finished {:?}", wakeup.process);
                return Ok(());
            };

            log::trace!("[{:8.3}] resume {} {:?}", wakeup.at, process.name(), wakeup.process);
            let mut spawned = Vec::new();
            let outcome = {
                let mut ctx = ProcessContext::new(&mut *center, scheduler, &mut spawned);
                process.resume(wakeup.key(), &mut ctx)?
            };
            if outcome == Resume::Pending {
                processes.insert(process.id(), process);
            }
            for child in spawned {
                processes.insert(child.id(), child);
            }
            Ok(())
        })?;

        let in_flight = self
            .processes
            .keys()
            .filter(|id| matches!(id, ProcessId::Child(_)))
            .count() as u64;

        let stats = &self.center.stats;
        let summary = SimEvent::RunCompleted {
            arrived:   stats.arrived(),
            served:    stats.served(),
            abandoned: stats.abandoned(),
            in_flight,
        };
        self.center.emit(horizon, summary);

        let kpis = self.center.stats.finalize(
            &scenario,
            seed,
            horizon,
            in_flight,
            &self.center.volunteers,
            &self.center.evaluator,
        );
        log::info!(
            "Run {} complete: {} wakeups, {} arrived, {} served, {} abandoned, {} in flight",
            self.run_id,
            delivered,
            kpis.arrived,
            kpis.served,
            kpis.abandoned,
            kpis.in_flight
        );
        Ok(kpis)
    }

    /// Register a process and give it its first wakeup now.
    fn register(&mut self, process: Box<dyn Process>) {
        self.scheduler.schedule_after(process.id(), 0.0);
        self.processes.insert(process.id(), process);
    }

    /// The display trace, in emission order.
    pub fn trace(&self) -> &[TraceEntry] {
        self.center.trace()
    }

    /// Final roster state, busy-time accumulators included.
    pub fn volunteers(&self) -> &VolunteerPool {
        &self.center.volunteers
    }
}

/// Run one scenario to its horizon and return its KPI record.
/// Deterministic for a given config, seed included.
pub fn run_scenario(config: &ScenarioConfig) -> SimResult<KpiRecord> {
    let mut engine = SimEngine::new(format!("{}-{}", config.name, config.seed), config.clone())?
        .with_trace(false);
    engine.run()
}

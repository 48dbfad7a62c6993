//! Arrival generator — the single source of new children.
//!
//! Two modes, fixed for the run:
//!   - Poisson: exponential gaps at `arrival_rate` from the
//!     inter-arrival stream; severity then domain drawn from the
//!     attribute stream. The first child arrives after one gap, never
//!     at t = 0.
//!   - Scripted: replays `scripted_arrivals` in time order. Entries
//!     sharing a timestamp keep their listed order.
//!
//! Ids are assigned sequentially from 1 in arrival order.

use crate::{
    config::ScriptedArrival,
    error::SimResult,
    event::SimEvent,
    lifecycle::ChildLifecycle,
    model::{Child, Domain, Level},
    process::{Process, ProcessContext, Resume},
    scheduler::{ProcessId, WakeKey},
    types::EntityId,
};
use std::collections::VecDeque;

enum Source {
    Poisson { started: bool },
    Scripted(VecDeque<ScriptedArrival>),
}

pub struct ArrivalGenerator {
    source:  Source,
    next_id: EntityId,
}

impl ArrivalGenerator {
    pub fn poisson() -> Self {
        Self { source: Source::Poisson { started: false }, next_id: 1 }
    }

    pub fn scripted(mut script: Vec<ScriptedArrival>) -> Self {
        // sort_by is stable: simultaneous entries keep their order.
        script.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { source: Source::Scripted(script.into()), next_id: 1 }
    }

    /// Build the generator a config asks for.
    pub fn for_script(script: Option<&[ScriptedArrival]>) -> Self {
        match script {
            Some(entries) => Self::scripted(entries.to_vec()),
            None => Self::poisson(),
        }
    }

    fn admit(&mut self, ctx: &mut ProcessContext<'_>, severity: Level, domain: Domain) {
        let child = Child { id: self.next_id, severity, domain, arrived_at: ctx.now() };
        self.next_id += 1;

        ctx.center.stats.record_arrival();
        ctx.emit(SimEvent::ChildArrived { child: child.id, severity, domain });
        ctx.spawn(Box::new(ChildLifecycle::new(child)));
    }

    fn draw_attributes(ctx: &mut ProcessContext<'_>) -> (Level, Domain) {
        let center = &mut *ctx.center;
        let rng = &mut center.streams.attributes;
        let severity = Level::ALL[rng.pick_weighted(&center.config.severity_weights)];
        let domain = Domain::ALL[rng.pick_weighted(&center.config.domain_weights)];
        (severity, domain)
    }
}

impl Process for ArrivalGenerator {
    fn id(&self) -> ProcessId {
        ProcessId::Arrivals
    }

    fn name(&self) -> &'static str {
        "arrivals"
    }

    fn resume(&mut self, _wake: WakeKey, ctx: &mut ProcessContext<'_>) -> SimResult<Resume> {
        match &mut self.source {
            Source::Poisson { started } => {
                let first = !*started;
                *started = true;
                if !first {
                    let (severity, domain) = Self::draw_attributes(ctx);
                    self.admit(ctx, severity, domain);
                }
                let rate = ctx.center.config.arrival_rate;
                let gap = ctx.center.streams.inter_arrival.exponential(rate);
                ctx.sleep(ProcessId::Arrivals, gap);
                Ok(Resume::Pending)
            }

            Source::Scripted(queue) => {
                let now = ctx.now();
                let mut due = Vec::new();
                while queue.front().is_some_and(|a| a.at <= now) {
                    if let Some(arrival) = queue.pop_front() {
                        due.push(arrival);
                    }
                }
                let next_at = queue.front().map(|a| a.at);

                for arrival in due {
                    self.admit(ctx, arrival.severity, arrival.domain);
                }
                match next_at {
                    Some(at) => {
                        ctx.sleep(ProcessId::Arrivals, at - now);
                        Ok(Resume::Pending)
                    }
                    None => Ok(Resume::Done),
                }
            }
        }
    }
}

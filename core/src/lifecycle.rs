//! Lifecycle process — one per child.
//!
//! Arrived -> AwaitingEvaluator -> BeingEvaluated -> Searching
//!         -> InService -> Completed
//!                      \-> Abandoned   (strict policy, timeout reached)
//!
//! Arrived and the terminal stages are instantaneous. Abandonment is
//! checked only while searching; evaluation and service always run to
//! completion once started. A child whose wakeup lies past the horizon
//! is simply never resumed and counts as in flight.

use crate::{
    config::{MatchPolicy, SearchMode},
    error::SimResult,
    event::SimEvent,
    matching::{self, MatchQuality},
    model::Child,
    process::{Process, ProcessContext, Resume},
    resources::Acquire,
    scheduler::{ProcessId, WakeKey},
    types::SimTime,
};

/// Slack when comparing elapsed search time to the timeout.
const TIMEOUT_EPSILON: SimTime = 1e-9;

/// Evaluator waits shorter than this are not traced.
const TRACE_WAIT_THRESHOLD: SimTime = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Arrived,
    AwaitingEvaluator { since: SimTime },
    BeingEvaluated { duration: SimTime },
    Searching { since: SimTime },
    InService { volunteer: usize, quality: MatchQuality, duration: SimTime },
    Completed,
    Abandoned,
}

pub struct ChildLifecycle {
    child: Child,
    stage: Stage,
    /// The timed wakeup this process is waiting on, if any.
    timer: Option<WakeKey>,
}

impl ChildLifecycle {
    pub fn new(child: Child) -> Self {
        Self { child, stage: Stage::Arrived, timer: None }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn pid(&self) -> ProcessId {
        ProcessId::Child(self.child.id)
    }

    fn sleep(&mut self, ctx: &mut ProcessContext<'_>, delay: SimTime) {
        self.timer = Some(ctx.sleep(self.pid(), delay));
    }

    /// Request an evaluator; start evaluating at once or queue FIFO.
    fn request_evaluator(&mut self, ctx: &mut ProcessContext<'_>) -> Resume {
        match ctx.center.evaluator.acquire(self.child.id) {
            Acquire::Granted => self.start_evaluation(ctx, 0.0),
            Acquire::Queued { ahead } => {
                log::trace!("{} queued for evaluator behind {ahead}", self.child.label());
                self.stage = Stage::AwaitingEvaluator { since: ctx.now() };
                Resume::Pending
            }
        }
    }

    fn start_evaluation(&mut self, ctx: &mut ProcessContext<'_>, waited: SimTime) -> Resume {
        ctx.center.stats.record_evaluator_wait(waited);
        if waited > TRACE_WAIT_THRESHOLD {
            ctx.emit(SimEvent::EvaluatorWaited { child: self.child.id, waited });
        }

        let params = ctx.center.config.evaluation;
        let duration = ctx
            .center
            .streams
            .evaluation
            .truncated_normal(params.mean, params.std_dev, params.floor);
        let accrued = ctx.clip_to_horizon(duration);
        ctx.center.evaluator.accrue(accrued);

        self.stage = Stage::BeingEvaluated { duration };
        self.sleep(ctx, duration);
        Resume::Pending
    }

    fn finish_evaluation(&mut self, ctx: &mut ProcessContext<'_>, duration: SimTime) -> Resume {
        ctx.emit(SimEvent::EvaluationCompleted { child: self.child.id, duration });
        if let Some(next) = ctx.center.evaluator.release() {
            ctx.wake(ProcessId::Child(next));
        }
        self.stage = Stage::Searching { since: ctx.now() };
        self.search(ctx, None)
    }

    /// One matching attempt. `wake` is the wakeup that triggered it.
    fn search(&mut self, ctx: &mut ProcessContext<'_>, wake: Option<WakeKey>) -> Resume {
        let Stage::Searching { since } = self.stage else {
            return Resume::Pending;
        };
        if wake.is_some() && wake == self.timer {
            self.timer = None;
        }
        let now = ctx.now();
        let elapsed = now - since;
        let policy = ctx.center.config.policy;

        if let Some(assignment) = matching::assign(&self.child, &mut ctx.center.volunteers, policy) {
            if let Some(timer) = self.timer.take() {
                ctx.cancel(timer);
            }
            ctx.stop_awaiting_release(self.child.id);
            return self.start_service(ctx, assignment.volunteer, assignment.quality, elapsed);
        }

        let timeout = ctx.center.config.abandon_after;
        if policy == MatchPolicy::Strict && elapsed + TIMEOUT_EPSILON >= timeout {
            if let Some(timer) = self.timer.take() {
                ctx.cancel(timer);
            }
            ctx.stop_awaiting_release(self.child.id);
            ctx.center.stats.record_abandonment(elapsed);
            ctx.emit(SimEvent::ChildAbandoned { child: self.child.id, waited: elapsed });
            self.stage = Stage::Abandoned;
            return Resume::Done;
        }

        match ctx.center.config.search {
            SearchMode::Poll { interval } => {
                let delay = match policy {
                    MatchPolicy::Strict => interval.min(timeout - elapsed),
                    MatchPolicy::Fallback => interval,
                };
                self.sleep(ctx, delay);
            }
            SearchMode::OnRelease => {
                ctx.await_release(self.child.id);
                if policy == MatchPolicy::Strict && self.timer.is_none() {
                    self.sleep(ctx, timeout - elapsed);
                }
            }
        }
        Resume::Pending
    }

    fn start_service(
        &mut self,
        ctx: &mut ProcessContext<'_>,
        volunteer: usize,
        quality: MatchQuality,
        waited: SimTime,
    ) -> Resume {
        let now = ctx.now();
        if let Some(v) = ctx.center.volunteers.get(volunteer) {
            ctx.center.stats.record_assignment(&self.child, v, quality, now, waited);
            let event = SimEvent::VolunteerAssigned {
                child:     self.child.id,
                volunteer: v.name.clone(),
                skill:     v.skill,
                domain:    v.domain,
                quality,
                waited,
            };
            ctx.emit(event);
        }

        let params = ctx.center.config.service;
        let duration = ctx
            .center
            .streams
            .service
            .truncated_normal(params.mean, params.std_dev, params.floor);
        self.stage = Stage::InService { volunteer, quality, duration };
        self.sleep(ctx, duration);
        Resume::Pending
    }

    fn finish_service(
        &mut self,
        ctx: &mut ProcessContext<'_>,
        volunteer: usize,
        duration: SimTime,
    ) -> Resume {
        ctx.center.volunteers.release(volunteer, duration);
        let name = ctx
            .center
            .volunteers
            .get(volunteer)
            .map(|v| v.name.clone())
            .unwrap_or_default();

        let in_system = ctx.now() - self.child.arrived_at;
        ctx.center.stats.record_service_completed(&self.child, in_system - duration);
        ctx.emit(SimEvent::ServiceCompleted { child: self.child.id, volunteer: name, duration });

        if matches!(ctx.center.config.search, SearchMode::OnRelease) {
            ctx.notify_release();
        }
        self.stage = Stage::Completed;
        Resume::Done
    }

    /// True when `wake` is not the timer this stage is waiting on.
    fn is_stale(&self, wake: WakeKey) -> bool {
        self.timer != Some(wake)
    }
}

impl Process for ChildLifecycle {
    fn id(&self) -> ProcessId {
        self.pid()
    }

    fn name(&self) -> &'static str {
        "child"
    }

    fn resume(&mut self, wake: WakeKey, ctx: &mut ProcessContext<'_>) -> SimResult<Resume> {
        let outcome = match self.stage {
            Stage::Arrived => self.request_evaluator(ctx),

            // Only the evaluator pool wakes a queued child, and only
            // after handing it a slot.
            Stage::AwaitingEvaluator { since } => {
                let waited = ctx.now() - since;
                self.start_evaluation(ctx, waited)
            }

            Stage::BeingEvaluated { duration } => {
                if self.is_stale(wake) {
                    return Ok(Resume::Pending);
                }
                self.timer = None;
                self.finish_evaluation(ctx, duration)
            }

            Stage::Searching { .. } => {
                if matches!(ctx.center.config.search, SearchMode::Poll { .. }) && self.is_stale(wake) {
                    return Ok(Resume::Pending);
                }
                self.search(ctx, Some(wake))
            }

            Stage::InService { volunteer, duration, .. } => {
                if self.is_stale(wake) {
                    return Ok(Resume::Pending);
                }
                self.timer = None;
                self.finish_service(ctx, volunteer, duration)
            }

            Stage::Completed | Stage::Abandoned => Resume::Done,
        };
        Ok(outcome)
    }
}

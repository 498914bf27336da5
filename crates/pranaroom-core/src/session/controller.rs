//! Session controller.
//!
//! The controller owns the clock, the session state, the camera lease and the
//! random source. Like the clock it does not spawn anything: the host calls
//! [`SessionController::tick`] once per clock interval and renders from
//! [`SessionController::view`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active <-> Paused -> (Completed | Aborted)
//! (Completed | Aborted) -> Active    via a fresh start()
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = SessionController::new(&config);
//! controller.start_by_id(&catalog, "box", None)?;
//! // Once per interval:
//! for event in controller.tick() { /* ... */ }
//! ```

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::camera::{CameraLease, CameraResult, CameraStatus};
use super::report::SessionReport;
use super::state::{Progress, SessionOutcome, SessionState, SessionStatus};
use super::view::SessionView;
use crate::biometrics::{sim_rng, BiometricSimulator, SimRng};
use crate::error::{ClockError, ConfigError, SessionError};
use crate::events::Event;
use crate::scoring::ScoringEngine;
use crate::storage::{ClockConfig, EngineConfig};
use crate::technique::{Catalog, PracticePlan, TechniqueDefinition};
use crate::timer::{PhaseScheduler, SequenceCursor, SessionClock};

/// Drives one practice session at a time.
#[derive(Debug)]
pub struct SessionController {
    clock_config: ClockConfig,
    clock: SessionClock,
    simulator: BiometricSimulator,
    scoring: ScoringEngine,
    rng: SimRng,
    status: SessionStatus,
    state: Option<SessionState>,
    camera: Option<CameraLease>,
    camera_status: CameraStatus,
    report: Option<SessionReport>,
}

impl SessionController {
    /// Controller seeded from `config.biometrics.seed`, or from entropy.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rng(config, sim_rng(config.biometrics.seed))
    }

    pub fn with_rng(config: &EngineConfig, rng: SimRng) -> Self {
        Self {
            clock_config: config.clock.clone(),
            clock: SessionClock::new(),
            simulator: BiometricSimulator::new(config.biometrics.clone()),
            scoring: ScoringEngine::new(config.scoring.clone()),
            rng,
            status: SessionStatus::Idle,
            state: None,
            camera: None,
            camera_status: CameraStatus::NotRequired,
            report: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.state.as_ref().map(SessionState::id)
    }

    /// Report of the last session that reached a terminal state.
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub fn camera_status(&self) -> &CameraStatus {
        &self.camera_status
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Interval the host should tick at for the running session.
    pub fn tick_interval(&self) -> Duration {
        self.clock.interval()
    }

    pub fn view(&self) -> SessionView {
        match &self.state {
            Some(state) => SessionView::project(self.status, state, &self.camera_status),
            None => SessionView::idle(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Look up `technique_id` in `catalog` and start it.
    pub fn start_by_id(
        &mut self,
        catalog: &Catalog,
        technique_id: &str,
        duration_override: Option<Duration>,
    ) -> Result<Vec<Event>, SessionError> {
        let technique = catalog
            .get(technique_id)
            .ok_or_else(|| SessionError::UnknownTechnique(technique_id.to_string()))?;
        self.start(technique, duration_override)
    }

    /// Begin a new session. A previous terminal session is replaced.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidTransition`] while a session is live.
    /// - [`SessionError::InvalidTechnique`] when the definition cannot run.
    /// - [`SessionError::ClockUnavailable`] when the clock cannot be scheduled.
    ///
    /// On error nothing changes: the previous status and report stay.
    pub fn start(
        &mut self,
        technique: &TechniqueDefinition,
        duration_override: Option<Duration>,
    ) -> Result<Vec<Event>, SessionError> {
        if self.status.is_live() {
            return Err(SessionError::InvalidTransition {
                command: "start",
                status: self.status,
            });
        }

        let plan = technique.plan(duration_override)?;
        let progress = match plan {
            PracticePlan::Cycle { cycle, session_ms } => {
                let cursor = PhaseScheduler::start_cycle(&cycle).ok_or_else(|| {
                    SessionError::InvalidTechnique(ConfigError::EmptyCycle {
                        technique: technique.id.clone(),
                    })
                })?;
                Progress::Cycle {
                    cycle,
                    cursor,
                    session_ms,
                }
            }
            PracticePlan::Sequence { items } => Progress::Sequence {
                items,
                cursor: SequenceCursor::default(),
            },
        };

        let interval = self.clock_config.interval_for(technique.mode());
        self.clock
            .start(interval)
            .map_err(SessionError::ClockUnavailable)?;

        if let Some(mut stale) = self.camera.take() {
            stale.release();
        }
        self.report = None;
        let state = SessionState::new(technique.clone(), progress);
        let session_id = state.id();
        let planned_ms = state.planned_ms();
        self.state = Some(state);
        self.status = SessionStatus::Active;

        let now = Utc::now();
        let mut events = vec![Event::SessionStarted {
            session_id,
            technique_id: technique.id.clone(),
            mode: technique.mode(),
            tick_interval_ms: interval.as_millis() as u64,
            planned_ms,
            at: now,
        }];
        if technique.requires_camera() {
            self.camera_status = CameraStatus::Pending;
            events.push(Event::CameraRequested { at: now });
        } else {
            self.camera_status = CameraStatus::NotRequired;
        }

        info!(
            %session_id,
            technique = %technique.id,
            mode = ?technique.mode(),
            interval_ms = interval.as_millis() as u64,
            "session started"
        );
        Ok(events)
    }

    pub fn pause(&mut self) -> Result<Event, SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::InvalidTransition {
                command: "pause",
                status: self.status,
            });
        }
        self.clock.pause();
        self.status = SessionStatus::Paused;
        let total_elapsed_ms = match self.state.as_mut() {
            Some(state) => {
                state.paused = true;
                state.total_elapsed_ms
            }
            None => 0,
        };
        debug!(total_elapsed_ms, "session paused");
        Ok(Event::SessionPaused {
            total_elapsed_ms,
            at: Utc::now(),
        })
    }

    /// Resume a paused session. A clock that cannot be rescheduled aborts
    /// the session.
    pub fn resume(&mut self) -> Result<Event, SessionError> {
        if self.status != SessionStatus::Paused {
            return Err(SessionError::InvalidTransition {
                command: "resume",
                status: self.status,
            });
        }
        if let Err(e) = self.clock.resume() {
            return Err(self.fail_clock(e));
        }
        self.status = SessionStatus::Active;
        let total_elapsed_ms = match self.state.as_mut() {
            Some(state) => {
                state.paused = false;
                state.total_elapsed_ms
            }
            None => 0,
        };
        debug!(total_elapsed_ms, "session resumed");
        Ok(Event::SessionResumed {
            total_elapsed_ms,
            at: Utc::now(),
        })
    }

    /// End the session early and build its report.
    ///
    /// After the session already finished on its own this returns no events
    /// and the stored report stays as it was.
    pub fn stop(&mut self) -> Result<Vec<Event>, SessionError> {
        self.end("stop")
    }

    /// Cancel the session, e.g. when the user navigates away.
    pub fn abort(&mut self) -> Result<Vec<Event>, SessionError> {
        self.end("abort")
    }

    fn end(&mut self, command: &'static str) -> Result<Vec<Event>, SessionError> {
        match self.status {
            SessionStatus::Active | SessionStatus::Paused => {
                info!(command, "session ended by user");
                Ok(self.finish(SessionOutcome::Aborted))
            }
            SessionStatus::Completed | SessionStatus::Aborted => Ok(Vec::new()),
            SessionStatus::Idle => Err(SessionError::InvalidTransition {
                command,
                status: self.status,
            }),
        }
    }

    /// Apply one clock tick, if one is due.
    ///
    /// Returns the phase, item and completion events produced by this tick.
    /// Does nothing unless the session is active.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.status != SessionStatus::Active {
            return Vec::new();
        }
        let Some(tick) = self.clock.poll_tick() else {
            return Vec::new();
        };
        let Some(state) = self.state.as_mut() else {
            return Vec::new();
        };

        let now = Utc::now();
        let mut events = Vec::new();
        state.total_elapsed_ms = state.total_elapsed_ms.saturating_add(tick.delta_ms);
        let total_elapsed_ms = state.total_elapsed_ms;

        match &mut state.progress {
            Progress::Cycle { cycle, cursor, .. } => {
                for t in PhaseScheduler::advance_cycle(cycle, cursor, tick.delta_ms) {
                    trace!(from = ?t.from, to = ?t.to, total_elapsed_ms, "phase changed");
                    events.push(Event::PhaseChanged {
                        from: t.from,
                        to: t.to,
                        total_elapsed_ms,
                        at: now,
                    });
                    if t.cycle_completed {
                        events.push(Event::CycleCompleted {
                            cycles_completed: cursor.cycles_completed,
                            at: now,
                        });
                    }
                }
            }
            Progress::Sequence { items, cursor } => {
                for t in PhaseScheduler::advance_sequence(items, cursor, tick.delta_ms) {
                    let next = t.next_index.and_then(|i| items.get(i));
                    debug!(
                        completed = t.completed_index,
                        next = ?t.next_index,
                        total_elapsed_ms,
                        "item advanced"
                    );
                    events.push(Event::ItemAdvanced {
                        completed_index: t.completed_index,
                        step_index: t.next_index,
                        item_name: next.map(|i| i.name.clone()),
                        at: now,
                    });
                }
            }
        }

        let previous = state
            .samples
            .last()
            .copied()
            .unwrap_or_else(|| self.simulator.initial());
        let sample = self
            .simulator
            .sample(&mut self.rng, &previous, total_elapsed_ms);
        state.samples.push(sample);

        if state.is_exhausted() {
            info!(total_elapsed_ms, "session completed");
            events.extend(self.finish(SessionOutcome::Completed));
        }
        events
    }

    /// Deliver the outcome of a camera acquisition started for `session_id`.
    ///
    /// A stream that arrives for a session that is no longer live, or for an
    /// earlier session, is released immediately.
    pub fn attach_camera(&mut self, session_id: Uuid, result: CameraResult) -> Vec<Event> {
        let now = Utc::now();
        let current = self.session_id() == Some(session_id)
            && self.status.is_live()
            && self.camera_status == CameraStatus::Pending;

        match result {
            Ok(stream) => {
                let mut lease = CameraLease::new(stream);
                let label = lease.label().to_string();
                if current {
                    info!(%label, "camera attached");
                    self.camera_status = CameraStatus::Active {
                        label: label.clone(),
                    };
                    self.camera = Some(lease);
                    vec![Event::CameraAttached { label, at: now }]
                } else {
                    debug!(%session_id, %label, "camera arrived after session ended, releasing");
                    lease.release();
                    if self.session_id() == Some(session_id)
                        && self.camera_status == CameraStatus::Pending
                    {
                        self.camera_status = CameraStatus::Released { label };
                    }
                    vec![Event::CameraReleased { at: now }]
                }
            }
            Err(e) => {
                if !current {
                    debug!(%session_id, error = %e, "stale camera failure ignored");
                    return Vec::new();
                }
                warn!(error = %e, "camera unavailable, continuing without it");
                let reason = e.to_string();
                self.camera_status = CameraStatus::Unavailable {
                    reason: reason.clone(),
                };
                vec![Event::CameraUnavailable { reason, at: now }]
            }
        }
    }

    /// Abort the live session after the host's timer failed.
    ///
    /// The returned error carries the partial report when any samples were
    /// collected, and the events produced by the abort.
    pub fn fail_clock(&mut self, source: ClockError) -> SessionError {
        if !self.status.is_live() {
            return SessionError::ClockFailed {
                source,
                report: None,
                events: Vec::new(),
            };
        }
        error!(error = %source, "session clock failed, aborting");
        let mut events = vec![Event::ClockFailed {
            reason: source.to_string(),
            at: Utc::now(),
        }];
        events.extend(self.finish(SessionOutcome::Aborted));
        let has_samples = self
            .state
            .as_ref()
            .is_some_and(|s| !s.samples.is_empty());
        let report = self
            .report
            .clone()
            .filter(|_| has_samples)
            .map(Box::new);
        SessionError::ClockFailed {
            source,
            report,
            events,
        }
    }

    /// Move a live session to its terminal state: stop the clock, release
    /// the camera and build the report.
    fn finish(&mut self, outcome: SessionOutcome) -> Vec<Event> {
        let now = Utc::now();
        let mut events = Vec::new();

        self.clock.stop();
        if let Some(mut lease) = self.camera.take() {
            if lease.release() {
                self.camera_status = CameraStatus::Released {
                    label: lease.label().to_string(),
                };
                events.push(Event::CameraReleased { at: now });
            }
        }

        let Some(state) = self.state.as_mut() else {
            self.status = outcome.into();
            return events;
        };
        state.running = false;
        state.paused = false;

        let summary =
            self.scoring
                .summarize(&state.samples, state.total_elapsed_ms, state.completed_units());
        let report = SessionReport {
            session_id: state.id,
            technique_id: state.technique.id.clone(),
            technique_name: state.technique.name.clone(),
            mode: state.technique.mode(),
            outcome,
            started_at: state.started_at,
            ended_at: now,
            cycles_completed: state.cycles_completed(),
            camera: self.camera_status.clone(),
            summary,
        };
        info!(
            session_id = %report.session_id,
            outcome = ?outcome,
            score = report.summary.score,
            duration_ms = report.summary.duration_ms,
            "session finished"
        );

        events.push(Event::SessionFinished {
            session_id: report.session_id,
            outcome,
            score: report.summary.score,
            quality: report.summary.quality,
            insufficient_data: report.summary.insufficient_data,
            at: now,
        });
        self.report = Some(report);
        self.status = outcome.into();
        events
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.clock.stop();
        if let Some(mut lease) = self.camera.take() {
            lease.release();
        }
    }
}

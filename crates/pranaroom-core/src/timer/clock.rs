//! Pausable repeating session clock.
//!
//! The clock does not own a thread or a timer handle. The host event loop
//! (see [`crate::session::SessionRunner`]) fires at `interval()` and calls
//! [`SessionClock::poll_tick`]; the clock decides whether that firing is a
//! tick. This keeps every timing rule in one place and lets tests drive the
//! clock without waiting.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> Paused -> Stopped
//! ```
//!
//! Each delivered tick advances session time by exactly the nominal
//! interval, so a pause followed by a resume never produces a time jump.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClockError;

/// Finest cadence the clock will schedule.
pub const MIN_INTERVAL_MS: u64 = 10;
/// Coarsest cadence the clock will schedule.
pub const MAX_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// One delivered tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based tick number since the clock was last started.
    pub sequence: u64,
    /// Session time this tick accounts for.
    pub delta_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    interval_ms: u64,
    state: ClockState,
    ticks_delivered: u64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            interval_ms: 0,
            state: ClockState::Stopped,
            ticks_delivered: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn ticks_delivered(&self) -> u64 {
        self.ticks_delivered
    }

    /// Running or paused.
    pub fn is_active(&self) -> bool {
        self.state != ClockState::Stopped
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin delivering ticks at `interval`.
    ///
    /// An already active clock is stopped first, so there is never more than
    /// one schedule per clock.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidInterval`] when the interval is outside
    /// `MIN_INTERVAL_MS..=MAX_INTERVAL_MS`; the clock is left stopped.
    pub fn start(&mut self, interval: Duration) -> Result<(), ClockError> {
        if self.is_active() {
            debug!(previous_interval_ms = self.interval_ms, "restarting active clock");
            self.stop();
        }
        let interval_ms = interval.as_millis() as u64;
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval_ms) {
            return Err(ClockError::InvalidInterval {
                interval_ms,
                min_ms: MIN_INTERVAL_MS,
                max_ms: MAX_INTERVAL_MS,
            });
        }
        self.interval_ms = interval_ms;
        self.ticks_delivered = 0;
        self.state = ClockState::Running;
        debug!(interval_ms, "clock started");
        Ok(())
    }

    /// Suspend delivery. Returns `false` if the clock was not running.
    pub fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    /// Continue delivery after a pause. Resuming a running clock is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NotScheduled`] if the clock is stopped.
    pub fn resume(&mut self) -> Result<(), ClockError> {
        match self.state {
            ClockState::Paused => {
                self.state = ClockState::Running;
                Ok(())
            }
            ClockState::Running => Ok(()),
            ClockState::Stopped => Err(ClockError::NotScheduled),
        }
    }

    /// Cancel the schedule. Idempotent; returns whether the clock was active.
    /// After this returns no further tick is delivered.
    pub fn stop(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            debug!(ticks = self.ticks_delivered, "clock stopped");
        }
        self.state = ClockState::Stopped;
        was_active
    }

    /// Called by the host on every timer firing. Returns a tick only while
    /// running; paused and stopped clocks swallow the firing.
    pub fn poll_tick(&mut self) -> Option<Tick> {
        if self.state != ClockState::Running {
            return None;
        }
        self.ticks_delivered += 1;
        Some(Tick {
            sequence: self.ticks_delivered,
            delta_ms: self.interval_ms,
        })
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_pause_resume_stop() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert!(clock.poll_tick().is_none());

        clock.start(Duration::from_millis(100)).unwrap();
        assert_eq!(
            clock.poll_tick(),
            Some(Tick {
                sequence: 1,
                delta_ms: 100
            })
        );

        assert!(clock.pause());
        assert!(!clock.pause());
        assert!(clock.poll_tick().is_none());

        clock.resume().unwrap();
        assert_eq!(clock.poll_tick().map(|t| t.sequence), Some(2));

        assert!(clock.stop());
        assert!(!clock.stop());
        assert!(clock.poll_tick().is_none());
    }

    #[test]
    fn resume_after_stop_is_an_error() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.resume(), Err(ClockError::NotScheduled));
        clock.start(Duration::from_secs(1)).unwrap();
        clock.stop();
        assert_eq!(clock.resume(), Err(ClockError::NotScheduled));
    }

    #[test]
    fn restart_replaces_previous_schedule() {
        let mut clock = SessionClock::new();
        clock.start(Duration::from_millis(100)).unwrap();
        clock.poll_tick();
        clock.poll_tick();
        clock.start(Duration::from_secs(1)).unwrap();
        assert_eq!(clock.interval(), Duration::from_secs(1));
        assert_eq!(
            clock.poll_tick(),
            Some(Tick {
                sequence: 1,
                delta_ms: 1000
            })
        );
    }

    #[test]
    fn unschedulable_interval_leaves_clock_stopped() {
        let mut clock = SessionClock::new();
        clock.start(Duration::from_millis(100)).unwrap();
        let err = clock.start(Duration::ZERO).unwrap_err();
        assert!(matches!(err, ClockError::InvalidInterval { interval_ms: 0, .. }));
        assert_eq!(clock.state(), ClockState::Stopped);
        assert!(clock.start(Duration::from_secs(120)).is_err());
    }
}

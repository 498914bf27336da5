use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::QualityBand;
use crate::session::SessionOutcome;
use crate::technique::{PhaseKind, PracticeMode};

/// Every state change of a practice session produces an Event.
/// The UI renders from the view model; history and analytics subscribe here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        technique_id: String,
        mode: PracticeMode,
        tick_interval_ms: u64,
        planned_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: PhaseKind,
        to: PhaseKind,
        total_elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    /// A breath cycle wrapped back to its first phase.
    CycleCompleted {
        cycles_completed: u64,
        at: DateTime<Utc>,
    },
    /// A pose or meditation item finished its hold.
    ItemAdvanced {
        completed_index: usize,
        step_index: Option<usize>,
        item_name: Option<String>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        total_elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        total_elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    CameraRequested {
        at: DateTime<Utc>,
    },
    CameraAttached {
        label: String,
        at: DateTime<Utc>,
    },
    /// Acquisition failed or was denied; the session continues without it.
    CameraUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
    CameraReleased {
        at: DateTime<Utc>,
    },
    ClockFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per session, when the summary is built.
    SessionFinished {
        session_id: Uuid,
        outcome: SessionOutcome,
        score: u8,
        quality: QualityBand,
        insufficient_data: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_finished(&self) -> bool {
        matches!(self, Event::SessionFinished { .. })
    }
}

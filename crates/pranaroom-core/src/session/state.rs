use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::biometrics::BiometricSample;
use crate::technique::{Phase, PhaseCycle, PlannedItem, TechniqueDefinition};
use crate::timer::{CycleCursor, PhaseScheduler, SequenceCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Active,
    Paused,
    Completed,
    Aborted,
}

impl SessionStatus {
    /// Active or Paused: the clock is scheduled and resources may be held.
    pub fn is_live(self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Aborted,
}

impl From<SessionOutcome> for SessionStatus {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Completed => SessionStatus::Completed,
            SessionOutcome::Aborted => SessionStatus::Aborted,
        }
    }
}

/// Where the session is within its technique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Cycle {
        cycle: PhaseCycle,
        cursor: CycleCursor,
        session_ms: Option<u64>,
    },
    Sequence {
        items: Vec<PlannedItem>,
        cursor: SequenceCursor,
    },
}

/// Mutable state of one session run. Owned by the controller; everything
/// else sees it read-only.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(super) id: Uuid,
    pub(super) technique: TechniqueDefinition,
    pub(super) running: bool,
    pub(super) paused: bool,
    pub(super) total_elapsed_ms: u64,
    pub(super) progress: Progress,
    pub(super) samples: Vec<BiometricSample>,
    pub(super) started_at: DateTime<Utc>,
}

impl SessionState {
    pub(super) fn new(technique: TechniqueDefinition, progress: Progress) -> Self {
        Self {
            id: Uuid::new_v4(),
            technique,
            running: true,
            paused: false,
            total_elapsed_ms: 0,
            progress,
            samples: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn technique(&self) -> &TechniqueDefinition {
        &self.technique
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.total_elapsed_ms
    }

    pub fn samples(&self) -> &[BiometricSample] {
        &self.samples
    }

    pub fn latest_sample(&self) -> Option<&BiometricSample> {
        self.samples.last()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Current breath phase; `None` for sequence practices.
    pub fn current_phase(&self) -> Option<&Phase> {
        match &self.progress {
            Progress::Cycle { cycle, cursor, .. } => cycle.get(cursor.phase_index),
            Progress::Sequence { .. } => None,
        }
    }

    pub fn current_phase_index(&self) -> Option<usize> {
        match &self.progress {
            Progress::Cycle { cursor, .. } => Some(cursor.phase_index),
            Progress::Sequence { .. } => None,
        }
    }

    /// Time spent in the current phase, or in the current item's hold.
    pub fn phase_elapsed_ms(&self) -> u64 {
        match &self.progress {
            Progress::Cycle { cursor, .. } => cursor.phase_elapsed_ms,
            Progress::Sequence { cursor, .. } => cursor.item_elapsed_ms,
        }
    }

    pub fn phase_remaining_ms(&self) -> u64 {
        match &self.progress {
            Progress::Cycle { cycle, cursor, .. } => {
                PhaseScheduler::phase_remaining_ms(cycle, cursor)
            }
            Progress::Sequence { items, cursor } => PhaseScheduler::item_remaining_ms(items, cursor),
        }
    }

    /// Index into the item list; `None` for breath practices.
    pub fn step_index(&self) -> Option<usize> {
        match &self.progress {
            Progress::Cycle { .. } => None,
            Progress::Sequence { cursor, .. } => Some(cursor.step_index),
        }
    }

    pub fn current_item(&self) -> Option<&PlannedItem> {
        match &self.progress {
            Progress::Cycle { .. } => None,
            Progress::Sequence { items, cursor } => items.get(cursor.step_index),
        }
    }

    pub fn step_count(&self) -> Option<usize> {
        match &self.progress {
            Progress::Cycle { .. } => None,
            Progress::Sequence { items, .. } => Some(items.len()),
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        match &self.progress {
            Progress::Cycle { cursor, .. } => cursor.cycles_completed,
            Progress::Sequence { .. } => 0,
        }
    }

    /// Phases completed for breath work, items completed for sequences.
    pub fn completed_units(&self) -> u64 {
        match &self.progress {
            Progress::Cycle { cursor, .. } => cursor.phases_completed,
            Progress::Sequence { cursor, .. } => cursor.items_completed as u64,
        }
    }

    pub fn planned_ms(&self) -> Option<u64> {
        match &self.progress {
            Progress::Cycle { session_ms, .. } => *session_ms,
            Progress::Sequence { items, .. } => {
                Some(items.iter().fold(0u64, |acc, i| acc.saturating_add(i.hold_ms)))
            }
        }
    }

    /// The technique's sequence or planned length has run out.
    pub fn is_exhausted(&self) -> bool {
        match &self.progress {
            Progress::Cycle { session_ms, .. } => {
                session_ms.is_some_and(|limit| self.total_elapsed_ms >= limit)
            }
            Progress::Sequence { cursor, .. } => cursor.exhausted,
        }
    }
}

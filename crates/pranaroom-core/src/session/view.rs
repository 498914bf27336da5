use serde::{Deserialize, Serialize};

use super::camera::CameraStatus;
use super::state::{Progress, SessionState, SessionStatus};
use crate::biometrics::BiometricSample;
use crate::technique::{PhaseKind, PracticeMode};

/// Current breath phase as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseView {
    pub index: usize,
    pub kind: PhaseKind,
    pub label: String,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
    pub remaining_ms: u64,
}

/// Current pose or meditation item as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub index: usize,
    pub count: usize,
    pub name: String,
    pub elapsed_ms: u64,
    pub hold_ms: u64,
    pub remaining_ms: u64,
}

/// Read-only projection of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub technique_id: Option<String>,
    pub technique_name: Option<String>,
    pub mode: Option<PracticeMode>,
    pub total_elapsed_ms: u64,
    pub planned_ms: Option<u64>,
    /// 0.0 .. 100.0 across the planned length; `None` for open-ended sessions.
    pub progress_pct: Option<f64>,
    pub phase: Option<PhaseView>,
    pub item: Option<ItemView>,
    pub cycles_completed: u64,
    pub latest_sample: Option<BiometricSample>,
    pub camera: CameraStatus,
}

impl SessionView {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            technique_id: None,
            technique_name: None,
            mode: None,
            total_elapsed_ms: 0,
            planned_ms: None,
            progress_pct: None,
            phase: None,
            item: None,
            cycles_completed: 0,
            latest_sample: None,
            camera: CameraStatus::NotRequired,
        }
    }

    pub(super) fn project(status: SessionStatus, state: &SessionState, camera: &CameraStatus) -> Self {
        let planned_ms = state.planned_ms();
        let progress_pct = planned_ms.filter(|&p| p > 0).map(|p| {
            (state.total_elapsed_ms() as f64 / p as f64 * 100.0).min(100.0)
        });

        let (phase, item) = match state.progress() {
            Progress::Cycle { cycle, cursor, .. } => {
                let phase = cycle.get(cursor.phase_index).map(|p| PhaseView {
                    index: cursor.phase_index,
                    kind: p.kind,
                    label: p.kind.label().to_string(),
                    elapsed_ms: cursor.phase_elapsed_ms,
                    duration_ms: p.duration_ms,
                    remaining_ms: state.phase_remaining_ms(),
                });
                (phase, None)
            }
            Progress::Sequence { items, cursor } => {
                let item = items.get(cursor.step_index).map(|i| ItemView {
                    index: cursor.step_index,
                    count: items.len(),
                    name: i.name.clone(),
                    elapsed_ms: cursor.item_elapsed_ms,
                    hold_ms: i.hold_ms,
                    remaining_ms: state.phase_remaining_ms(),
                });
                (None, item)
            }
        };

        let technique = state.technique();
        Self {
            status,
            technique_id: Some(technique.id.clone()),
            technique_name: Some(technique.name.clone()),
            mode: Some(technique.mode()),
            total_elapsed_ms: state.total_elapsed_ms(),
            planned_ms,
            progress_pct,
            phase,
            item,
            cycles_completed: state.cycles_completed(),
            latest_sample: state.latest_sample().copied(),
            camera: camera.clone(),
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self::idle()
    }
}

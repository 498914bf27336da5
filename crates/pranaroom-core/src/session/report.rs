use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::camera::CameraStatus;
use super::state::SessionOutcome;
use crate::error::CoreError;
use crate::scoring::SessionSummary;
use crate::technique::PracticeMode;

/// Everything known about a finished session. Built once when the session
/// reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub technique_id: String,
    pub technique_name: String,
    pub mode: PracticeMode,
    pub outcome: SessionOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cycles_completed: u64,
    pub camera: CameraStatus,
    pub summary: SessionSummary,
}

impl SessionReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == SessionOutcome::Completed
    }
}

/// Destination for finished session reports (history, analytics, stdout).
pub trait SummarySink {
    fn record(&mut self, report: &SessionReport) -> Result<(), CoreError>;
}

impl SummarySink for Vec<SessionReport> {
    fn record(&mut self, report: &SessionReport) -> Result<(), CoreError> {
        self.push(report.clone());
        Ok(())
    }
}

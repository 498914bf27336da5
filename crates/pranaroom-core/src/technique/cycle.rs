use serde::{Deserialize, Serialize};

/// One slot of a breathing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
    HoldAfter,
}

impl PhaseKind {
    /// Canonical slot order of a breath cycle.
    pub const CYCLE_ORDER: [PhaseKind; 4] = [
        PhaseKind::Inhale,
        PhaseKind::Hold,
        PhaseKind::Exhale,
        PhaseKind::HoldAfter,
    ];

    /// Label shown to the practitioner. Both retention slots read "Hold".
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Inhale",
            PhaseKind::Hold | PhaseKind::HoldAfter => "Hold",
            PhaseKind::Exhale => "Exhale",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::Inhale => "inhale",
            PhaseKind::Hold => "hold",
            PhaseKind::Exhale => "exhale",
            PhaseKind::HoldAfter => "hold-after",
        }
    }

    /// Inhale and Exhale are always part of a breath cycle.
    pub fn is_optional(self) -> bool {
        matches!(self, PhaseKind::Hold | PhaseKind::HoldAfter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    /// Duration in milliseconds. Zero means the phase is skipped.
    pub duration_ms: u64,
}

impl Phase {
    pub fn new(kind: PhaseKind, duration_ms: u64) -> Self {
        Self { kind, duration_ms }
    }

    pub fn is_skipped(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Ordered phases of a breathing technique, repeated until the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCycle {
    phases: Vec<Phase>,
}

impl PhaseCycle {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// Build the fixed four-slot cycle from millisecond durations.
    pub fn four_slot(inhale_ms: u64, hold_ms: u64, exhale_ms: u64, hold_after_ms: u64) -> Self {
        Self::new(vec![
            Phase::new(PhaseKind::Inhale, inhale_ms),
            Phase::new(PhaseKind::Hold, hold_ms),
            Phase::new(PhaseKind::Exhale, exhale_ms),
            Phase::new(PhaseKind::HoldAfter, hold_after_ms),
        ])
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Length of one full traversal in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.phases
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.duration_ms))
    }

    /// Phases that will actually be entered.
    pub fn active_phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|p| !p.is_skipped())
    }

    /// Breaths per minute at this pacing, if the cycle has any length.
    pub fn breaths_per_minute(&self) -> Option<f64> {
        let total = self.total_ms();
        if total == 0 {
            return None;
        }
        Some(60_000.0 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_slot_total() {
        let cycle = PhaseCycle::four_slot(4000, 7000, 8000, 0);
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.total_ms(), 19_000);
        assert_eq!(cycle.active_phases().count(), 3);
    }

    #[test]
    fn hold_labels_collapse() {
        assert_eq!(PhaseKind::Hold.label(), PhaseKind::HoldAfter.label());
        assert_ne!(PhaseKind::Hold.name(), PhaseKind::HoldAfter.name());
        assert!(!PhaseKind::Inhale.is_optional());
    }

    #[test]
    fn box_breathing_pace() {
        let cycle = PhaseCycle::four_slot(4000, 4000, 4000, 4000);
        assert_eq!(cycle.breaths_per_minute(), Some(3.75));
        assert_eq!(PhaseCycle::four_slot(0, 0, 0, 0).breaths_per_minute(), None);
    }
}

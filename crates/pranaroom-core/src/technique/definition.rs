use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cycle::{PhaseCycle, PhaseKind};
use crate::error::ConfigError;
use crate::timer::PhaseScheduler;

/// Default hold per pose, in seconds.
pub const DEFAULT_POSE_HOLD_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Breath,
    Pose,
    Meditation,
}

impl PracticeMode {
    /// Whether "phase" means a single hold per item rather than a breath cycle.
    pub fn is_sequence(self) -> bool {
        !matches!(self, PracticeMode::Breath)
    }

    pub fn label(self) -> &'static str {
        match self {
            PracticeMode::Breath => "breath",
            PracticeMode::Pose => "pose",
            PracticeMode::Meditation => "meditation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// Breath ratios in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathRatios {
    pub inhale: f64,
    #[serde(default)]
    pub hold: f64,
    pub exhale: f64,
    #[serde(default)]
    pub hold_after: f64,
}

impl BreathRatios {
    pub fn new(inhale: f64, hold: f64, exhale: f64, hold_after: f64) -> Self {
        Self {
            inhale,
            hold,
            exhale,
            hold_after,
        }
    }

    pub fn total_secs(&self) -> f64 {
        self.inhale + self.hold + self.exhale + self.hold_after
    }

    /// Convert to a millisecond cycle, rejecting negative or non-finite values.
    pub fn to_cycle(&self, technique: &str) -> Result<PhaseCycle, ConfigError> {
        let to_ms = |kind: PhaseKind, secs: f64| -> Result<u64, ConfigError> {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::InvalidPhaseDuration {
                    technique: technique.to_string(),
                    phase: kind.name().to_string(),
                    value: secs,
                });
            }
            Ok((secs * 1000.0).round() as u64)
        };
        Ok(PhaseCycle::four_slot(
            to_ms(PhaseKind::Inhale, self.inhale)?,
            to_ms(PhaseKind::Hold, self.hold)?,
            to_ms(PhaseKind::Exhale, self.exhale)?,
            to_ms(PhaseKind::HoldAfter, self.hold_after)?,
        ))
    }
}

/// A pose or meditation item in an ordered practice sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub id: String,
    pub name: String,
    /// Secondary name, e.g. the Sanskrit name of a pose.
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub focus: Vec<String>,
    /// Per-item hold, overriding the technique's hold.
    #[serde(default)]
    pub hold_secs: Option<u64>,
}

impl SequenceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subtitle: String::new(),
            focus: Vec::new(),
            hold_secs: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_focus(mut self, focus: &[&str]) -> Self {
        self.focus = focus.iter().map(|f| f.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Practice {
    Breath {
        /// Typical session length in seconds; `None` runs until stopped.
        #[serde(default)]
        session_secs: Option<u64>,
        ratios: BreathRatios,
    },
    Pose {
        #[serde(default = "default_pose_hold")]
        hold_secs: u64,
        items: Vec<SequenceItem>,
    },
    Meditation {
        /// Offered sit lengths in minutes; the first is the default.
        durations_min: Vec<u64>,
        #[serde(default)]
        guide: Option<String>,
    },
}

fn default_pose_hold() -> u64 {
    DEFAULT_POSE_HOLD_SECS
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub cautions: Vec<String>,
    pub practice: Practice,
}

/// An item resolved for one session run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedItem {
    pub id: String,
    pub name: String,
    pub hold_ms: u64,
}

/// What a session will actually execute, after overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PracticePlan {
    Cycle {
        cycle: PhaseCycle,
        session_ms: Option<u64>,
    },
    Sequence {
        items: Vec<PlannedItem>,
    },
}

impl PracticePlan {
    /// Total planned length, when known.
    pub fn planned_ms(&self) -> Option<u64> {
        match self {
            PracticePlan::Cycle { session_ms, .. } => *session_ms,
            PracticePlan::Sequence { items } => Some(
                items
                    .iter()
                    .fold(0u64, |acc, i| acc.saturating_add(i.hold_ms)),
            ),
        }
    }
}

impl TechniqueDefinition {
    pub fn mode(&self) -> PracticeMode {
        match self.practice {
            Practice::Breath { .. } => PracticeMode::Breath,
            Practice::Pose { .. } => PracticeMode::Pose,
            Practice::Meditation { .. } => PracticeMode::Meditation,
        }
    }

    /// Pose sessions use the camera for the alignment overlay.
    pub fn requires_camera(&self) -> bool {
        self.mode() == PracticeMode::Pose
    }

    /// Resolve the plan for one run, applying an optional duration override.
    ///
    /// The override is the session length for breath work, the per-item hold
    /// for poses and the sit length for meditation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the definition cannot be run: a cycle
    /// with no positive phase, an empty sequence, or a zero hold.
    pub fn plan(&self, duration_override: Option<Duration>) -> Result<PracticePlan, ConfigError> {
        let override_ms = duration_override.map(|d| d.as_millis() as u64);
        match &self.practice {
            Practice::Breath {
                ratios,
                session_secs,
            } => {
                let cycle = ratios.to_cycle(&self.id)?;
                PhaseScheduler::validate(&self.id, &cycle)?;
                let session_ms =
                    override_ms.or_else(|| session_secs.map(|s| s.saturating_mul(1000)));
                if session_ms == Some(0) {
                    return Err(ConfigError::InvalidValue {
                        key: "duration".into(),
                        message: format!("session length for '{}' must be positive", self.id),
                    });
                }
                Ok(PracticePlan::Cycle { cycle, session_ms })
            }
            Practice::Pose { items, hold_secs } => {
                if items.is_empty() {
                    return Err(ConfigError::EmptySequence {
                        technique: self.id.clone(),
                    });
                }
                let planned = items
                    .iter()
                    .map(|item| {
                        let hold_ms = override_ms.unwrap_or_else(|| {
                            item.hold_secs.unwrap_or(*hold_secs).saturating_mul(1000)
                        });
                        if hold_ms == 0 {
                            return Err(ConfigError::ZeroHold {
                                technique: self.id.clone(),
                                item: item.id.clone(),
                            });
                        }
                        Ok(PlannedItem {
                            id: item.id.clone(),
                            name: item.name.clone(),
                            hold_ms,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PracticePlan::Sequence { items: planned })
            }
            Practice::Meditation { durations_min, .. } => {
                let default_ms = durations_min
                    .first()
                    .map(|m| m.saturating_mul(60_000));
                let hold_ms = match (override_ms, default_ms) {
                    (Some(ms), _) => {
                        if !durations_min.iter().any(|m| m.saturating_mul(60_000) == ms) {
                            debug!(technique = %self.id, override_ms = ms, "custom meditation length");
                        }
                        ms
                    }
                    (None, Some(ms)) => ms,
                    (None, None) => {
                        return Err(ConfigError::EmptySequence {
                            technique: self.id.clone(),
                        })
                    }
                };
                if hold_ms == 0 {
                    return Err(ConfigError::ZeroHold {
                        technique: self.id.clone(),
                        item: self.id.clone(),
                    });
                }
                Ok(PracticePlan::Sequence {
                    items: vec![PlannedItem {
                        id: self.id.clone(),
                        name: self.name.clone(),
                        hold_ms,
                    }],
                })
            }
        }
    }

    /// Check that the definition can be started with its defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan(None).map(|_| ())
    }

    /// Every name a library search should match against.
    pub fn search_terms(&self) -> Vec<&str> {
        let mut terms = vec![self.name.as_str(), self.category.as_str()];
        if let Practice::Pose { items, .. } = &self.practice {
            for item in items {
                terms.push(item.name.as_str());
                if !item.subtitle.is_empty() {
                    terms.push(item.subtitle.as_str());
                }
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breath(ratios: BreathRatios, session_secs: Option<u64>) -> TechniqueDefinition {
        TechniqueDefinition {
            id: "test".into(),
            name: "Test Breath".into(),
            category: "Calming".into(),
            difficulty: Difficulty::Beginner,
            description: String::new(),
            benefits: vec![],
            cautions: vec![],
            practice: Practice::Breath {
                ratios,
                session_secs,
            },
        }
    }

    #[test]
    fn fractional_ratios_round_to_millis() {
        let cycle = BreathRatios::new(1.0, 0.0, 0.5, 0.0).to_cycle("kapala").unwrap();
        assert_eq!(cycle.get(2).unwrap().duration_ms, 500);
        assert_eq!(cycle.total_ms(), 1500);
    }

    #[test]
    fn negative_ratio_is_rejected() {
        let err = BreathRatios::new(4.0, -1.0, 4.0, 0.0)
            .to_cycle("bad")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPhaseDuration { ref phase, .. } if phase == "hold"));
    }

    #[test]
    fn all_zero_cycle_cannot_be_planned() {
        let def = breath(BreathRatios::new(0.0, 0.0, 0.0, 0.0), None);
        assert_eq!(
            def.plan(None).unwrap_err(),
            ConfigError::EmptyCycle {
                technique: "test".into()
            }
        );
    }

    #[test]
    fn breath_override_sets_session_length() {
        let def = breath(BreathRatios::new(4.0, 4.0, 4.0, 0.0), Some(600));
        match def.plan(Some(Duration::from_secs(60))).unwrap() {
            PracticePlan::Cycle { session_ms, .. } => assert_eq!(session_ms, Some(60_000)),
            other => panic!("unexpected plan {other:?}"),
        }
        assert_eq!(def.plan(None).unwrap().planned_ms(), Some(600_000));
    }

    #[test]
    fn pose_override_replaces_hold() {
        let def = TechniqueDefinition {
            practice: Practice::Pose {
                items: vec![SequenceItem::new("1", "Mountain"), SequenceItem::new("2", "Tree")],
                hold_secs: 30,
            },
            ..breath(BreathRatios::new(1.0, 0.0, 1.0, 0.0), None)
        };
        assert!(def.requires_camera());
        let plan = def.plan(Some(Duration::from_secs(10))).unwrap();
        assert_eq!(plan.planned_ms(), Some(20_000));
    }

    #[test]
    fn meditation_defaults_to_first_duration() {
        let def = TechniqueDefinition {
            practice: Practice::Meditation {
                durations_min: vec![10, 20],
                guide: None,
            },
            ..breath(BreathRatios::new(1.0, 0.0, 1.0, 0.0), None)
        };
        assert_eq!(def.mode(), PracticeMode::Meditation);
        assert_eq!(def.plan(None).unwrap().planned_ms(), Some(600_000));
        assert_eq!(
            def.plan(Some(Duration::from_secs(90))).unwrap().planned_ms(),
            Some(90_000)
        );
    }

    #[test]
    fn empty_pose_sequence_is_rejected() {
        let def = TechniqueDefinition {
            practice: Practice::Pose {
                items: vec![],
                hold_secs: 30,
            },
            ..breath(BreathRatios::new(1.0, 0.0, 1.0, 0.0), None)
        };
        assert!(matches!(def.validate(), Err(ConfigError::EmptySequence { .. })));
    }
}

mod catalog;
mod cycle;
mod definition;

pub use catalog::{Catalog, FOUNDATIONS_FLOW_ID};
pub use cycle::{Phase, PhaseCycle, PhaseKind};
pub use definition::{
    BreathRatios, Difficulty, PlannedItem, Practice, PracticeMode, PracticePlan, SequenceItem,
    TechniqueDefinition, DEFAULT_POSE_HOLD_SECS,
};

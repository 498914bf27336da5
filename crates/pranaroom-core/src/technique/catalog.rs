//! Static, read-only technique catalog.
//!
//! The built-in catalog covers the three practice screens: breath work,
//! pose sequences and timed meditation. A custom catalog can be loaded from
//! TOML; every entry is validated on load so a malformed technique is
//! reported before anyone tries to start it.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::definition::{
    BreathRatios, Difficulty, Practice, PracticeMode, SequenceItem, TechniqueDefinition,
    DEFAULT_POSE_HOLD_SECS,
};
use crate::error::ConfigError;

/// Id of the built-in pose flow that strings the whole asana library together.
pub const FOUNDATIONS_FLOW_ID: &str = "foundations-flow";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(rename = "technique", default)]
    techniques: Vec<TechniqueDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    techniques: Vec<TechniqueDefinition>,
}

impl Catalog {
    /// Build a catalog, validating every entry and rejecting duplicate ids.
    pub fn new(techniques: Vec<TechniqueDefinition>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for technique in &techniques {
            if !seen.insert(technique.id.as_str()) {
                return Err(ConfigError::DuplicateTechnique(technique.id.clone()));
            }
            technique.validate()?;
        }
        Ok(Self { techniques })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::new(file.techniques)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let file = CatalogFile {
            techniques: self.techniques.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&TechniqueDefinition> {
        self.techniques.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[TechniqueDefinition] {
        &self.techniques
    }

    pub fn by_mode(&self, mode: PracticeMode) -> impl Iterator<Item = &TechniqueDefinition> {
        self.techniques.iter().filter(move |t| t.mode() == mode)
    }

    /// Case-insensitive match on name, category, and pose item names.
    pub fn search(&self, query: &str) -> Vec<&TechniqueDefinition> {
        let needle = query.trim().to_lowercase();
        self.techniques
            .iter()
            .filter(|t| {
                needle.is_empty()
                    || t.search_terms()
                        .iter()
                        .any(|term| term.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Every pose item offered by any pose technique, first occurrence wins.
    pub fn pose_items(&self) -> Vec<&SequenceItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for technique in self.by_mode(PracticeMode::Pose) {
            if let Practice::Pose { items: poses, .. } = &technique.practice {
                for pose in poses {
                    if seen.insert(pose.id.as_str()) {
                        items.push(pose);
                    }
                }
            }
        }
        items
    }

    /// Assemble a custom pose sequence from catalog items, in the given order.
    /// Items may repeat.
    pub fn build_sequence(
        &self,
        id: &str,
        name: &str,
        item_ids: &[&str],
        hold_secs: Option<u64>,
    ) -> Result<TechniqueDefinition, ConfigError> {
        let library = self.pose_items();
        let items = item_ids
            .iter()
            .map(|wanted| {
                library
                    .iter()
                    .find(|item| item.id == *wanted)
                    .map(|item| (*item).clone())
                    .ok_or_else(|| ConfigError::UnknownItem(wanted.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let technique = TechniqueDefinition {
            id: id.to_string(),
            name: name.to_string(),
            category: "Custom".into(),
            difficulty: Difficulty::Beginner,
            description: String::new(),
            benefits: vec![],
            cautions: vec![],
            practice: Practice::Pose {
                items,
                hold_secs: hold_secs.unwrap_or(DEFAULT_POSE_HOLD_SECS),
            },
        };
        technique.validate()?;
        Ok(technique)
    }

    /// The catalog shipped with the app.
    pub fn builtin() -> Self {
        Self {
            techniques: builtin_techniques(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn breath(
    id: &str,
    name: &str,
    category: &str,
    difficulty: Difficulty,
    description: &str,
    benefits: &[&str],
    cautions: &[&str],
    ratios: BreathRatios,
    session_secs: u64,
) -> TechniqueDefinition {
    TechniqueDefinition {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        difficulty,
        description: description.into(),
        benefits: strings(benefits),
        cautions: strings(cautions),
        practice: Practice::Breath {
            ratios,
            session_secs: Some(session_secs),
        },
    }
}

fn meditation(
    id: &str,
    name: &str,
    category: &str,
    difficulty: Difficulty,
    description: &str,
    durations_min: &[u64],
    guide: Option<&str>,
) -> TechniqueDefinition {
    TechniqueDefinition {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        difficulty,
        description: description.into(),
        benefits: vec![],
        cautions: vec![],
        practice: Practice::Meditation {
            durations_min: durations_min.to_vec(),
            guide: guide.map(str::to_string),
        },
    }
}

fn asana_library() -> Vec<SequenceItem> {
    vec![
        SequenceItem::new("mountain", "Mountain Pose")
            .with_subtitle("Tadasana")
            .with_focus(&["Full Body"]),
        SequenceItem::new("warrior-2", "Warrior II")
            .with_subtitle("Virabhadrasana II")
            .with_focus(&["Legs", "Arms"]),
        SequenceItem::new("tree", "Tree Pose")
            .with_subtitle("Vrikshasana")
            .with_focus(&["Core", "Legs"]),
        SequenceItem::new("triangle", "Triangle Pose")
            .with_subtitle("Trikonasana")
            .with_focus(&["Hips", "Shoulders"]),
        SequenceItem::new("down-dog", "Down Dog")
            .with_subtitle("Adho Mukha Svanasana")
            .with_focus(&["Full Body"]),
        SequenceItem::new("crow", "Crow Pose")
            .with_subtitle("Bakasana")
            .with_focus(&["Arms", "Core"]),
    ]
}

fn builtin_techniques() -> Vec<TechniqueDefinition> {
    vec![
        breath(
            "nadi",
            "Nadi Shodhana",
            "Balancing",
            Difficulty::Beginner,
            "Alternate nostril breathing to balance the nervous system.",
            &["Balances Ida and Pingala", "Reduces anxiety", "Improves focus"],
            &["Avoid if you have a severe cold", "Do not force the breath"],
            BreathRatios::new(4.0, 4.0, 4.0, 0.0),
            600,
        ),
        breath(
            "box",
            "Box Breathing",
            "Focus",
            Difficulty::Beginner,
            "Square breathing used by Navy SEALs for instant calm.",
            &["Stress reduction", "Improves CO2 tolerance", "Heightens awareness"],
            &["If pregnant, avoid the hold phases"],
            BreathRatios::new(4.0, 4.0, 4.0, 4.0),
            300,
        ),
        breath(
            "kapala",
            "Kapalabhati",
            "Energizing",
            Difficulty::Intermediate,
            "Skull shining breath for high energy and detoxification.",
            &["Cleanses lungs", "Energizes the mind", "Improves digestion"],
            &[
                "Avoid if having high blood pressure",
                "Do not practice during menstruation",
            ],
            BreathRatios::new(1.0, 0.0, 0.5, 0.0),
            180,
        ),
        breath(
            "478",
            "4-7-8 Relax",
            "Sleep",
            Difficulty::Beginner,
            "The natural tranquilizer for the nervous system.",
            &["Insomnia relief", "Deep relaxation", "Vagus nerve stimulation"],
            &["Best practiced sitting down"],
            BreathRatios::new(4.0, 7.0, 8.0, 0.0),
            120,
        ),
        TechniqueDefinition {
            id: FOUNDATIONS_FLOW_ID.into(),
            name: "Foundations Flow".into(),
            category: "Asana".into(),
            difficulty: Difficulty::Beginner,
            description: "The full asana library held in sequence with live alignment cues."
                .into(),
            benefits: strings(&["Posture", "Balance", "Strength"]),
            cautions: strings(&["Skip Crow Pose if your wrists are sore"]),
            practice: Practice::Pose {
                items: asana_library(),
                hold_secs: DEFAULT_POSE_HOLD_SECS,
            },
        },
        meditation(
            "vipassana",
            "Vipassana Insight",
            "Insight",
            Difficulty::Intermediate,
            "Focus on the physical sensations of the body to cultivate awareness.",
            &[10, 20, 30],
            Some("Guru Ananda"),
        ),
        meditation(
            "metta",
            "Metta Loving-Kindness",
            "Compassion",
            Difficulty::Beginner,
            "Direct well-wishes toward yourself and others to open the heart.",
            &[5, 15, 20],
            Some("Shanti Devi"),
        ),
        meditation(
            "zazen",
            "Zen Zazen",
            "Zen",
            Difficulty::Advanced,
            "Just sitting. Let words, ideas, and images pass without judgement.",
            &[20, 40, 60],
            Some("Silent Transmission"),
        ),
        meditation(
            "yoga-nidra",
            "Yoga Nidra",
            "Sleep",
            Difficulty::Beginner,
            "The yoga of sleep. Deep relaxation for mental and physical restoration.",
            &[20, 30, 45],
            Some("Yogi Raj"),
        ),
        meditation(
            "chakra",
            "Chakra Balancing",
            "Energy",
            Difficulty::Intermediate,
            "A visualization journey through the seven energy centers of the body.",
            &[15, 30],
            Some("Amrit Kaur"),
        ),
        meditation(
            "presence",
            "Presence",
            "Timer",
            Difficulty::Beginner,
            "Open, unguided sitting timer.",
            &[5, 10, 20, 30, 60],
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let builtin = Catalog::builtin();
        let rebuilt = Catalog::new(builtin.all().to_vec()).unwrap();
        assert_eq!(rebuilt.all().len(), 11);
        assert_eq!(builtin.by_mode(PracticeMode::Breath).count(), 4);
        assert_eq!(builtin.by_mode(PracticeMode::Meditation).count(), 6);
    }

    #[test]
    fn search_matches_sanskrit_item_names() {
        let catalog = Catalog::builtin();
        let hits = catalog.search("vrikshasana");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, FOUNDATIONS_FLOW_ID);
        assert_eq!(catalog.search("  ").len(), catalog.all().len());
        assert_eq!(catalog.search("BOX")[0].id, "box");
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut techniques = Catalog::builtin().all().to_vec();
        techniques.push(techniques[0].clone());
        assert_eq!(
            Catalog::new(techniques).unwrap_err(),
            ConfigError::DuplicateTechnique("nadi".into())
        );
    }

    #[test]
    fn toml_round_trip_preserves_catalog() {
        let catalog = Catalog::builtin();
        let text = catalog.to_toml_string().unwrap();
        let parsed = Catalog::from_toml_str(&text).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn custom_toml_with_all_zero_cycle_fails_to_load() {
        let text = r#"
            [[technique]]
            id = "flat"
            name = "Flat"
            category = "Broken"
            difficulty = "beginner"

            [technique.practice]
            mode = "breath"

            [technique.practice.ratios]
            inhale = 0
            exhale = 0
        "#;
        assert_eq!(
            Catalog::from_toml_str(text).unwrap_err(),
            ConfigError::EmptyCycle {
                technique: "flat".into()
            }
        );
    }

    #[test]
    fn build_sequence_from_library() {
        let catalog = Catalog::builtin();
        let seq = catalog
            .build_sequence("mine", "My Flow", &["tree", "mountain", "tree"], Some(20))
            .unwrap();
        match &seq.practice {
            Practice::Pose { items, hold_secs } => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1].id, "mountain");
                assert_eq!(*hold_secs, 20);
            }
            other => panic!("unexpected practice {other:?}"),
        }
        assert_eq!(
            catalog
                .build_sequence("x", "X", &["headstand"], None)
                .unwrap_err(),
            ConfigError::UnknownItem("headstand".into())
        );
    }
}

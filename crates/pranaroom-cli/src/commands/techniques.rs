use clap::{Subcommand, ValueEnum};
use pranaroom_core::technique::Practice;
use pranaroom_core::{EngineConfig, PracticeMode, TechniqueDefinition};

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Breath,
    Pose,
    Meditation,
}

impl From<ModeArg> for PracticeMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Breath => PracticeMode::Breath,
            ModeArg::Pose => PracticeMode::Pose,
            ModeArg::Meditation => PracticeMode::Meditation,
        }
    }
}

#[derive(Subcommand)]
pub enum TechniquesAction {
    /// List catalog techniques
    List {
        /// Only techniques of this practice mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Case-insensitive match on name, category or pose name
        #[arg(long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one technique
    Show {
        /// Technique id
        id: String,
    },
}

fn describe_practice(technique: &TechniqueDefinition) -> String {
    match &technique.practice {
        Practice::Breath {
            ratios,
            session_secs,
        } => {
            let length = session_secs
                .map(|s| format!("{s}s session"))
                .unwrap_or_else(|| "open-ended".into());
            format!(
                "{}-{}-{}-{} breath, {length}",
                ratios.inhale, ratios.hold, ratios.exhale, ratios.hold_after
            )
        }
        Practice::Pose { hold_secs, items } => {
            format!("{} poses, {hold_secs}s hold", items.len())
        }
        Practice::Meditation { durations_min, .. } => {
            let offered: Vec<String> = durations_min.iter().map(|m| format!("{m}")).collect();
            format!("{} min", offered.join("/"))
        }
    }
}

pub fn run(action: TechniquesAction) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = EngineConfig::load()?.catalog()?;
    match action {
        TechniquesAction::List { mode, search, json } => {
            let mode = mode.map(PracticeMode::from);
            let found: Vec<&TechniqueDefinition> = catalog
                .search(search.as_deref().unwrap_or(""))
                .into_iter()
                .filter(|t| mode.map_or(true, |m| t.mode() == m))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else if found.is_empty() {
                println!("No techniques found.");
            } else {
                for t in found {
                    println!(
                        "{:<18} {:<11} {:<13} {} ({})",
                        t.id,
                        t.mode().label(),
                        t.difficulty.label(),
                        t.name,
                        describe_practice(t)
                    );
                }
            }
        }
        TechniquesAction::Show { id } => {
            let technique = catalog
                .get(&id)
                .ok_or_else(|| format!("unknown technique: {id}"))?;
            println!("{}", serde_json::to_string_pretty(technique)?);
        }
    }
    Ok(())
}

mod config;

pub use config::{CatalogConfig, ClockConfig, EngineConfig};

use std::path::PathBuf;

/// Returns `~/.config/pranaroom[-dev]/` based on PRANAROOM_ENV.
///
/// Set PRANAROOM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PRANAROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pranaroom-dev")
    } else {
        base_dir.join("pranaroom")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

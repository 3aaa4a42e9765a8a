pub mod backup;
pub mod init;
pub mod learners;
pub mod recompute;
pub mod record;
pub mod restore;
pub mod score;
pub mod snapshots;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use learnkeep_records::{load_config_from, LearningService};

/// Load config and open the data directory it names.
pub fn open_service(config_path: Option<&Path>) -> Result<LearningService> {
    let config = load_config_from(config_path)?;
    let service = LearningService::from_config(&config)
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;
    tracing::debug!(data_dir = %config.data_dir.display(), "opened data directory");
    for name in service.recovered_documents() {
        eprintln!(
            "Warning: {name} was unreadable and has been reset; \
             the damaged copy was kept beside it."
        );
    }
    Ok(service)
}

/// Read and parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

//! The `learnkeep record` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use learnkeep_core::model::SessionRecord;

use super::{open_service, read_json};

pub fn execute(config_path: Option<&Path>, session_path: PathBuf, format: String) -> Result<()> {
    let service = open_service(config_path)?;
    let record: SessionRecord = read_json(&session_path)?;
    let outcome = service
        .finish_session(record)
        .context("failed to store session")?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => {
            println!("Session {} stored", outcome.session.id);
            super::score::print_breakdown(&outcome.breakdown);
            let d = &outcome.decision;
            println!(
                "Difficulty: {} -> {} ({})",
                outcome.session.difficulty_used, d.next_difficulty, d.reason
            );
            if d.cooldown_set > 0 {
                println!("Cooldown: {} session(s)", d.cooldown_set);
            }
        }
    }
    Ok(())
}

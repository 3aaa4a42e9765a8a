//! The `learnkeep score` command.

use std::path::PathBuf;

use anyhow::Result;

use learnkeep_core::model::SessionRecord;
use learnkeep_core::scoring::ScoreBreakdown;

use super::read_json;

pub fn execute(session_path: PathBuf, history_path: Option<PathBuf>, format: String) -> Result<()> {
    let session: SessionRecord = read_json(&session_path)?;
    let history: Vec<SessionRecord> = match &history_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let breakdown = ScoreBreakdown::compute(&session, &history);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&breakdown)?),
        _ => print_breakdown(&breakdown),
    }
    Ok(())
}

pub(crate) fn print_breakdown(b: &ScoreBreakdown) {
    println!("Score: {}", b.score);
    println!("  precision     {:.3}", b.precision);
    println!("  consistency   {:.3}", b.consistency);
    println!("  time          {:.3}", b.time_score);
    println!("  completeness  {:.3} (factor {:.3})", b.completeness, b.completeness_factor);
    println!("  base          {:.3}", b.base);
}

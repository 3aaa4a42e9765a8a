//! The `learnkeep recompute` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::open_service;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let service = open_service(config_path)?;
    let rows = service.recompute_progress()?;
    if rows.is_empty() {
        println!("No objectives to recompute.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Learner", "Objective", "Rounds", "Sessions", "Done"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.learner_id),
            Cell::new(&row.description),
            Cell::new(format!("{}/{}", row.rounds_correct, row.target_rounds_correct)),
            Cell::new(format!("{}/{}", row.sessions_completed, row.target_sessions)),
            Cell::new(if row.completed { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

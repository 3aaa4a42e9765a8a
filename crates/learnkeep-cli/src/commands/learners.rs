//! The `learnkeep learners` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::open_service;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let service = open_service(config_path)?;
    let learners = service.profiles().list();
    if learners.is_empty() {
        println!("No learners yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Classroom", "Points", "Games"]);
    for learner in &learners {
        let games = learner
            .assigned_games
            .iter()
            .map(|g| {
                let level = learner
                    .difficulty_for(g)
                    .map(|d| d.effective_level())
                    .unwrap_or_default();
                format!("{g}@{level}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&learner.id),
            Cell::new(&learner.display_name),
            Cell::new(&learner.classroom_id),
            Cell::new(learner.points),
            Cell::new(games),
        ]);
    }
    println!("{table}");
    Ok(())
}

//! The `learnkeep snapshots` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::open_service;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let service = open_service(config_path)?;
    let snapshots = service.store().list_snapshots()?;
    if snapshots.is_empty() {
        println!("No snapshots yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Snapshot", "Created", "Files"]);
    for snapshot in snapshots.iter().rev() {
        let created = snapshot
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&snapshot.name),
            Cell::new(created),
            Cell::new(snapshot.files.join(", ")),
        ]);
    }
    println!("{table}");
    Ok(())
}

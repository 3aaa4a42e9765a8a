//! The `learnkeep backup` command.

use std::path::Path;

use anyhow::{Context, Result};

use super::open_service;

pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let service = open_service(config_path)?;
    match service.snapshot_now().context("backup failed")? {
        Some(snapshot) => println!(
            "Created snapshot {} ({} file(s))",
            snapshot.name,
            snapshot.files.len()
        ),
        None => println!("Nothing to back up."),
    }
    Ok(())
}

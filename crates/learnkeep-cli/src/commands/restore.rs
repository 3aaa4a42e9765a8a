//! The `learnkeep restore` command.

use std::path::Path;

use anyhow::Result;

use super::open_service;

pub fn execute(config_path: Option<&Path>, snapshot: String) -> Result<()> {
    let service = open_service(config_path)?;
    let report = service.restore_snapshot(&snapshot)?;

    for failure in &report.failures {
        eprintln!("  {failure}");
    }
    if !report.ok {
        anyhow::bail!("restore failed: {}", report.message);
    }
    println!("{}", report.message);
    Ok(())
}

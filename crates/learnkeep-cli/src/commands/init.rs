//! The `learnkeep init` command.

use std::path::Path;

use anyhow::{Context, Result};

use learnkeep_records::config::CONFIG_FILE_NAME;

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)
            .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    println!("\nNext steps:");
    println!("  1. Point data_dir in {CONFIG_FILE_NAME} at your data directory");
    println!("  2. Run: learnkeep learners");
    println!("  3. Run: learnkeep backup");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# learnkeep configuration

# Directory holding profiles.json, sessions.json, plans.json and backups/.
# ${VAR} references are expanded; LEARNKEEP_DATA_DIR overrides this value.
data_dir = "./data"

# Snapshots kept under data_dir/backups before the oldest are pruned.
backup_retention = 30

# Sessions, including the one just finished, used to decide difficulty changes.
recent_window = 3

[adaptation]
# Games whose difficulty is never changed automatically.
disabled_games = []
"#;

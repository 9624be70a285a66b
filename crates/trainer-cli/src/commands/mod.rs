//! CLI command implementations.

pub mod read;
pub mod run;
pub mod show;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use trainer_core::{CheatTable, Error, ProcessHandle, TrainerConfig, parse_with_limit};

use crate::shutdown::ShutdownSignal;

/// Delay between attempts to find the target process
const PROCESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Read and parse a table file.
///
/// A table that fails to parse is reported and replaced by an empty one.
pub fn load_table(path: &Path, config: &TrainerConfig) -> Result<CheatTable> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cheat table {}", path.display()))?;

    match parse_with_limit(&text, config.entries_limit) {
        Ok(table) => {
            info!("Loaded {} entries from {}", table.len(), path.display());
            Ok(table)
        }
        Err(e) => {
            error!("{}: {}", path.display(), e);
            Ok(CheatTable::new())
        }
    }
}

pub fn target_process(config: &TrainerConfig) -> Result<&str> {
    config
        .process
        .as_deref()
        .context("No target process; pass --process or set `process` in the config")
}

/// Wait until `name` is running and open it.
///
/// Returns `Ok(None)` if shutdown was signaled first.
pub fn wait_for_process(name: &str, shutdown: &ShutdownSignal) -> Result<Option<ProcessHandle>> {
    let mut announced = false;
    loop {
        match ProcessHandle::find_and_open(name) {
            Ok(process) => return Ok(Some(process)),
            Err(Error::ProcessNotFound(_)) if cfg!(target_os = "windows") => {
                if !announced {
                    println!("Waiting for {}... (Press Esc or q to quit)", name);
                    announced = true;
                }
            }
            Err(e) => return Err(e.into()),
        }

        if shutdown.wait(PROCESS_POLL_INTERVAL) {
            return Ok(None);
        }
    }
}

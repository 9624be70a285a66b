//! Print the live value of every entry.

use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use trainer_core::{AddressResolver, ProcessHandle, TrainerConfig, read_entry_values};

use super::{load_table, target_process};

pub fn run(table_path: &Path, config: &TrainerConfig) -> Result<()> {
    let table = load_table(table_path, config)?;
    if table.is_empty() {
        bail!("No entries to read in {}", table_path.display());
    }

    let process = ProcessHandle::find_and_open(target_process(config)?)?;
    let resolver = AddressResolver::new(config.pointer_width);

    for reading in read_entry_values(&table, process.base_address, &process, &resolver) {
        let address = reading
            .address
            .map(|a| format!("{:#010x}", a))
            .unwrap_or_else(|| "?".to_string());
        match &reading.value {
            Ok(value) => println!(
                "{:>4}  {:<32} {}  {}",
                reading.id,
                reading.label,
                address.dimmed(),
                value.green()
            ),
            Err(e) => println!(
                "{:>4}  {:<32} {}  {}",
                reading.id,
                reading.label,
                address.dimmed(),
                e.red()
            ),
        }
    }
    Ok(())
}

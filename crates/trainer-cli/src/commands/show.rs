//! Print a parsed cheat table.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use trainer_core::{CheatEntry, TrainerConfig, combo_label};

use super::load_table;

pub fn run(table_path: &Path, config: &TrainerConfig, json: bool) -> Result<()> {
    let table = load_table(table_path, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for entry in &table.entries {
        print_entry(entry, 0);
    }
    Ok(())
}

fn print_entry(entry: &CheatEntry, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!(
        "{}{} {}  {}",
        indent,
        format!("[{}]", entry.id).dimmed(),
        entry.label().bold(),
        entry.declared_type
    );
    if let Some(address) = &entry.address {
        line.push_str(&format!("  {}", address));
    }
    if !entry.offsets.is_empty() {
        let offsets: Vec<String> = entry.offsets.iter().map(|o| format!("{:X}", o)).collect();
        line.push_str(&format!("  [{}]", offsets.join(", ")));
    }
    println!("{}", line);

    for hotkey in &entry.hotkeys {
        let value = if hotkey.value.is_empty() {
            String::new()
        } else {
            format!(" {}", hotkey.value)
        };
        println!(
            "{}    {} {}{}",
            indent,
            combo_label(&hotkey.keys).cyan(),
            hotkey.action,
            value
        );
    }

    for child in &entry.children {
        print_entry(child, depth + 1);
    }
}

//! Hotkey mode: attach, resolve and poll until exit.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use tracing::{debug, info};
use trainer_core::{
    ActionExecutor, AddressResolver, CheatTable, HotkeyScheduler, SystemKeyboard,
    TrainerConfig, combo_label, key_name, resolve_all,
};

use crate::input;
use crate::shutdown::ShutdownSignal;

use super::{load_table, target_process, wait_for_process};

pub fn run(table_path: &Path, config: &TrainerConfig) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown));

    let mut table = load_table(table_path, config)?;
    if table.is_empty() {
        bail!("No entries to run in {}", table_path.display());
    }
    if let Some(ids) = &config.activate {
        table.activate_subset(ids);
        debug!("Activated {} of the table's entries", table.len());
    }

    let exit_key = config.exit_key_code()?;
    let Some(process) = wait_for_process(target_process(config)?, &shutdown)? else {
        return Ok(());
    };
    info!(
        "Attached to {} (pid {}, base: {:#x})",
        process.name, process.pid, process.base_address
    );
    let process = Arc::new(process);

    let resolver = AddressResolver::new(config.pointer_width);
    let summary = resolve_all(&mut table, process.base_address, process.as_ref(), &resolver)?;
    info!(
        "{} entries ready, {} discarded",
        summary.resolved, summary.discarded
    );
    if summary.resolved == 0 {
        bail!("None of the table's entries could be resolved");
    }

    print_menu(&table, exit_key);

    let executor = ActionExecutor::with_freeze_interval(process, config.freeze_interval());
    let mut scheduler = HotkeyScheduler::new(table, executor, SystemKeyboard)
        .with_exit_key(exit_key)
        .with_tick_interval(config.tick_interval());

    // Console shutdown keys and the in-game exit key both end the loop
    scheduler.run(|interval| shutdown.wait(interval));
    shutdown.trigger();

    println!("Trainer stopped.");
    Ok(())
}

fn print_menu(table: &CheatTable, exit_key: u32) {
    println!();
    println!("{}", "Hotkeys".bold());
    for entry in table.active_entries() {
        let Some(runtime) = &entry.runtime else {
            continue;
        };
        let value = runtime
            .current_value
            .as_ref()
            .map(|v| format!(" {}", v))
            .unwrap_or_default();
        println!(
            "  {:<16} {} {}",
            combo_label(&runtime.active_key_combo).cyan(),
            entry.label(),
            format!("({}{})", runtime.active_action, value).dimmed()
        );
    }
    println!();
    println!("Press {} to exit.", key_name(exit_key).yellow());
}

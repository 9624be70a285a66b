//! Console key handling.
//!
//! Game hotkeys are polled globally by the scheduler; this monitor only sees
//! keys typed into the trainer's own console window.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};

use crate::shutdown::ShutdownSignal;

/// Watch the console for Esc, q or Ctrl+C and request a stop
pub fn spawn_keyboard_monitor(shutdown: Arc<ShutdownSignal>) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("console-keys".to_string())
        .spawn(move || {
            while !shutdown.is_shutdown() {
                if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                    continue;
                }
                if let Ok(Event::Key(key)) = event::read()
                    && is_quit_key(&key)
                {
                    debug!("Quit key pressed: {:?}", key.code);
                    shutdown.trigger();
                }
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Console key monitor unavailable: {}", e);
            None
        }
    }
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

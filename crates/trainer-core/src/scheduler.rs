//! Hotkey polling loop.
//!
//! Every tick scans the active entries in table order and dispatches the first
//! one whose whole key combination is held. Only when nothing matched is the
//! exit key checked.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::action::ActionExecutor;
use crate::input::{KeyState, VK_F12, key_name};
use crate::memory::{ReadMemory, WriteMemory};
use crate::table::CheatTable;

/// Default delay between ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Dispatching,
    ExitCheck,
    Stopped,
}

pub struct HotkeyScheduler<M: ?Sized, K> {
    table: CheatTable,
    executor: ActionExecutor<M>,
    keyboard: K,
    exit_key: u32,
    tick_interval: Duration,
    state: SchedulerState,
}

impl<M, K> HotkeyScheduler<M, K>
where
    M: ReadMemory + WriteMemory + Send + Sync + ?Sized + 'static,
    K: KeyState,
{
    /// Create a scheduler over a resolved table
    pub fn new(table: CheatTable, executor: ActionExecutor<M>, keyboard: K) -> Self {
        Self {
            table,
            executor,
            keyboard,
            exit_key: VK_F12,
            tick_interval: DEFAULT_TICK_INTERVAL,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_exit_key(mut self, exit_key: u32) -> Self {
        self.exit_key = exit_key;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn table(&self) -> &CheatTable {
        &self.table
    }

    pub fn executor(&self) -> &ActionExecutor<M> {
        &self.executor
    }

    pub fn exit_key(&self) -> u32 {
        self.exit_key
    }

    /// Poll the keyboard once and act on it
    pub fn tick(&mut self) -> SchedulerState {
        if self.state == SchedulerState::Stopped {
            return self.state;
        }
        self.state = SchedulerState::Polling;

        let pressed = self.table.active_entries().find(|entry| {
            entry
                .runtime
                .as_ref()
                .is_some_and(|rt| self.keyboard.combo_down(&rt.active_key_combo))
        });

        if let Some(entry) = pressed {
            self.state = SchedulerState::Dispatching;
            if let Err(e) = self.executor.execute_entry(entry) {
                warn!("{}: {}", entry.label(), e);
            }
            self.state = SchedulerState::Polling;
            return self.state;
        }

        self.state = SchedulerState::ExitCheck;
        if self.keyboard.is_toggled(self.exit_key) {
            info!("Exit key {} pressed", key_name(self.exit_key));
            self.state = SchedulerState::Stopped;
        } else {
            self.state = SchedulerState::Polling;
        }
        self.state
    }

    /// Tick until the exit key is pressed or `wait` reports a stop.
    ///
    /// `wait` is called with the tick interval between ticks and returns
    /// `true` to end the loop. Every freeze is released before returning.
    pub fn run(&mut self, mut wait: impl FnMut(Duration) -> bool) {
        info!(
            "Hotkey loop started: {} active entries, exit with {}",
            self.table.active_entries().count(),
            key_name(self.exit_key)
        );

        loop {
            if self.tick() == SchedulerState::Stopped {
                break;
            }
            if wait(self.tick_interval) {
                break;
            }
        }

        if self.state != SchedulerState::Stopped {
            debug!("Hotkey loop interrupted");
        }
        self.stop();
    }

    /// Stop the loop and release every freeze
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
        self.executor.release_all();
        info!("Hotkey loop stopped");
    }

    /// Give the table back, releasing every freeze
    pub fn into_table(mut self) -> CheatTable {
        self.stop();
        std::mem::take(&mut self.table)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::input::{MockKeyboard, VK_CONTROL};
    use crate::memory::{MockMemory, MockMemoryBuilder};
    use crate::resolve::{AddressResolver, resolve_all};
    use crate::table::parse;

    const MODULE_BASE: u64 = 0x400000;
    const KEY_M: u32 = 0x4D;
    const KEY_N: u32 = 0x4E;

    /// `(address, action, value, comma separated key codes)` per entry
    fn table_xml(entries: &[(&str, &str, &str, &str)]) -> String {
        let mut xml = String::from("<CheatTable><CheatEntries>");
        for (address, action, value, keys) in entries {
            let keys: String = keys
                .split(',')
                .map(|k| format!("<Key>{}</Key>", k))
                .collect();
            xml.push_str(&format!(
                "<CheatEntry><Description>\"{address}\"</Description>\
                 <VariableType>4 Bytes</VariableType><Address>{address}</Address>\
                 <Hotkeys><Hotkey><Action>{action}</Action><Keys>{keys}</Keys>\
                 <Value>{value}</Value><ID>0</ID></Hotkey></Hotkeys></CheatEntry>"
            ));
        }
        xml.push_str("</CheatEntries></CheatTable>");
        xml
    }

    fn scheduler(
        xml: &str,
        memory: MockMemory,
    ) -> (
        HotkeyScheduler<MockMemory, Arc<MockKeyboard>>,
        Arc<MockMemory>,
        Arc<MockKeyboard>,
    ) {
        let memory = Arc::new(memory);
        let keyboard = Arc::new(MockKeyboard::new());
        let mut table = parse(xml).unwrap();
        resolve_all(&mut table, MODULE_BASE, memory.as_ref(), &AddressResolver::default())
            .unwrap();

        let executor =
            ActionExecutor::with_freeze_interval(Arc::clone(&memory), Duration::from_millis(1));
        let scheduler = HotkeyScheduler::new(table, executor, Arc::clone(&keyboard))
            .with_tick_interval(Duration::from_millis(1));
        (scheduler, memory, keyboard)
    }

    #[test]
    fn test_ctrl_m_sets_value_once() {
        let xml = table_xml(&[("07290BC8", "Set Value", "150", "17,77")]);
        let (mut scheduler, memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x07290BC8, 4).build());

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        keyboard.press(VK_CONTROL);
        keyboard.press(KEY_M);
        assert_eq!(scheduler.tick(), SchedulerState::Polling);

        assert_eq!(
            memory.writes(),
            vec![(0x07290BC8, 150u32.to_le_bytes().to_vec())]
        );

        keyboard.release_all();
        scheduler.tick();
        assert_eq!(memory.writes().len(), 1);
    }

    #[test]
    fn test_increase_scenario() {
        let xml = table_xml(&[("07290BC8", "Increase Value", "5", "17,77")]);
        let (mut scheduler, memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().write_u32(0x07290BC8, 10).build());

        keyboard.press(VK_CONTROL);
        keyboard.press(KEY_M);
        scheduler.tick();

        assert_eq!(memory.peek_u32(0x07290BC8), Some(15));
    }

    #[test]
    fn test_partial_combo_does_nothing() {
        let xml = table_xml(&[("07290BC8", "Set Value", "150", "17,77")]);
        let (mut scheduler, memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x07290BC8, 4).build());

        keyboard.press(KEY_M);
        scheduler.tick();
        assert!(memory.writes().is_empty());
    }

    #[test]
    fn test_only_first_match_dispatches() {
        let xml = table_xml(&[
            ("00001000", "Set Value", "1", "77"),
            ("00002000", "Set Value", "2", "77"),
            ("00003000", "Set Value", "3", "78"),
        ]);
        let memory = MockMemoryBuilder::new()
            .zeroed(0x1000, 4)
            .zeroed(0x2000, 4)
            .zeroed(0x3000, 4)
            .build();
        let (mut scheduler, memory, keyboard) = scheduler(&xml, memory);

        keyboard.press(KEY_M);
        keyboard.press(KEY_N);
        scheduler.tick();

        assert_eq!(memory.writes(), vec![(0x1000, 1u32.to_le_bytes().to_vec())]);
    }

    #[test]
    fn test_failed_action_does_not_stop_loop() {
        let xml = table_xml(&[("00001000", "Set Value", "1", "77")]);
        let memory = MockMemoryBuilder::new()
            .zeroed(0x1000, 4)
            .read_only(0x1000, 4)
            .build();
        let (mut scheduler, memory, keyboard) = scheduler(&xml, memory);

        keyboard.press(KEY_M);
        assert_eq!(scheduler.tick(), SchedulerState::Polling);
        assert!(memory.writes().is_empty());
    }

    #[test]
    fn test_exit_key_stops() {
        let xml = table_xml(&[("00001000", "Set Value", "1", "77")]);
        let (mut scheduler, _memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x1000, 4).build());

        keyboard.tap(VK_F12);
        assert_eq!(scheduler.tick(), SchedulerState::Stopped);
        assert_eq!(scheduler.tick(), SchedulerState::Stopped);
    }

    #[test]
    fn test_hotkey_takes_priority_over_exit_key() {
        let xml = table_xml(&[("00001000", "Set Value", "1", "77")]);
        let (mut scheduler, _memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x1000, 4).build());

        keyboard.press(KEY_M);
        keyboard.tap(VK_F12);
        assert_eq!(scheduler.tick(), SchedulerState::Polling);

        keyboard.release_all();
        assert_eq!(scheduler.tick(), SchedulerState::Stopped);
    }

    #[test]
    fn test_custom_exit_key() {
        let xml = table_xml(&[("00001000", "Set Value", "1", "77")]);
        let (scheduler, _memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x1000, 4).build());
        let mut scheduler = scheduler.with_exit_key(KEY_N);

        keyboard.tap(VK_F12);
        assert_eq!(scheduler.tick(), SchedulerState::Polling);
        keyboard.tap(KEY_N);
        assert_eq!(scheduler.tick(), SchedulerState::Stopped);
    }

    #[test]
    fn test_run_releases_freezes_on_exit() {
        let xml = table_xml(&[("00001000", "Activate", "9", "77")]);
        let (mut scheduler, _memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x1000, 4).build());

        keyboard.press(KEY_M);
        scheduler.tick();
        assert!(scheduler.executor().freezes().is_frozen(0x1000));

        keyboard.release_all();
        keyboard.tap(VK_F12);
        scheduler.run(|_| false);

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(scheduler.executor().freezes().is_empty());
    }

    #[test]
    fn test_run_returns_when_wait_reports_stop() {
        let xml = table_xml(&[("00001000", "Set Value", "1", "77")]);
        let (scheduler, memory, keyboard) =
            scheduler(&xml, MockMemoryBuilder::new().zeroed(0x1000, 4).build());
        let mut scheduler = scheduler.with_tick_interval(Duration::from_millis(5));

        keyboard.press(KEY_M);
        let mut waits = Vec::new();
        scheduler.run(|interval| {
            waits.push(interval);
            waits.len() == 3
        });

        assert_eq!(waits, vec![Duration::from_millis(5); 3]);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        // One write per tick while the combo is held
        assert_eq!(memory.writes_to(0x1000).len(), 3);
    }
}

//! Background writers that pin a value in place.
//!
//! Each frozen address owns one thread that rewrites the value every interval
//! until its cancellation flag is raised. Cancelling unparks the writer, so it
//! exits within one write, and the registry joins it before returning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::memory::WriteMemory;
use crate::value::Value;

/// Default rewrite cadence of a freeze
pub const DEFAULT_FREEZE_INTERVAL: Duration = Duration::from_millis(25);

struct FreezeTask {
    value: Value,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl FreezeTask {
    fn stop(self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            warn!("Freeze writer panicked");
        }
    }
}

/// At most one freeze per address
#[derive(Clone)]
pub struct FreezeRegistry {
    interval: Duration,
    tasks: Arc<Mutex<HashMap<u64, FreezeTask>>>,
}

impl Default for FreezeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FREEZE_INTERVAL)
    }
}

impl FreezeRegistry {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Keep writing `value` at `address`, replacing any existing freeze there
    pub fn freeze<W>(&self, writer: Arc<W>, address: u64, value: Value) -> Result<()>
    where
        W: WriteMemory + Send + Sync + ?Sized + 'static,
    {
        let mut tasks = self.lock();
        if let Some(previous) = tasks.remove(&address) {
            debug!("Replacing freeze at {:#x}", address);
            previous.stop();
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let interval = self.interval;
        let bytes = value.to_bytes();
        let handle = thread::Builder::new()
            .name(format!("freeze-{:x}", address))
            .spawn(move || write_loop(writer.as_ref(), address, &bytes, &flag, interval))?;

        info!("Frozen {:#x} at {}", address, value);
        tasks.insert(
            address,
            FreezeTask {
                value,
                cancel,
                handle,
            },
        );
        Ok(())
    }

    /// Stop the freeze at `address`; returns whether one was active
    pub fn unfreeze(&self, address: u64) -> bool {
        let task = self.lock().remove(&address);
        match task {
            Some(task) => {
                task.stop();
                info!("Unfrozen {:#x}", address);
                true
            }
            None => {
                debug!("No freeze at {:#x}", address);
                false
            }
        }
    }

    pub fn is_frozen(&self, address: u64) -> bool {
        self.lock().contains_key(&address)
    }

    /// Value pinned at `address`, if frozen
    pub fn frozen_value(&self, address: u64) -> Option<Value> {
        self.lock().get(&address).map(|task| task.value.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancel and join every writer
    pub fn release_all(&self) {
        let tasks: Vec<(u64, FreezeTask)> = self.lock().drain().collect();
        if tasks.is_empty() {
            return;
        }

        let count = tasks.len();
        for (_, task) in tasks {
            task.stop();
        }
        info!("Released {} freezes", count);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, FreezeTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FreezeRegistry {
    fn drop(&mut self) {
        // Clones share the task map; only the last one tears it down.
        if Arc::strong_count(&self.tasks) == 1 {
            self.release_all();
        }
    }
}

fn write_loop<W: WriteMemory + ?Sized>(
    writer: &W,
    address: u64,
    bytes: &[u8],
    cancel: &AtomicBool,
    interval: Duration,
) {
    let mut failing = false;
    while !cancel.load(Ordering::SeqCst) {
        match writer.write_bytes(address, bytes) {
            Ok(()) => failing = false,
            Err(e) if !failing => {
                warn!("Freeze write failed: {}", e);
                failing = true;
            }
            Err(_) => {}
        }
        thread::park_timeout(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockMemory, MockMemoryBuilder};

    const ADDRESS: u64 = 0x1000;

    fn memory() -> Arc<MockMemory> {
        Arc::new(MockMemoryBuilder::new().zeroed(ADDRESS, 8).build())
    }

    fn wait_for_write(memory: &MockMemory, address: u64) {
        for _ in 0..200 {
            if !memory.writes_to(address).is_empty() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("no write observed at {:#x}", address);
    }

    #[test]
    fn test_freeze_rewrites_value() {
        let memory = memory();
        let registry = FreezeRegistry::new(Duration::from_millis(1));

        registry.freeze(memory.clone(), ADDRESS, Value::U32(99)).unwrap();
        wait_for_write(&memory, ADDRESS);
        memory.poke(ADDRESS, &0u32.to_le_bytes());
        memory.clear_writes();
        wait_for_write(&memory, ADDRESS);

        assert_eq!(memory.peek_u32(ADDRESS), Some(99));
        assert!(registry.is_frozen(ADDRESS));
    }

    #[test]
    fn test_double_freeze_leaves_one_writer() {
        let memory = memory();
        let registry = FreezeRegistry::new(Duration::from_millis(1));

        registry.freeze(memory.clone(), ADDRESS, Value::U32(1)).unwrap();
        registry.freeze(memory.clone(), ADDRESS, Value::U32(2)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.frozen_value(ADDRESS), Some(Value::U32(2)));

        // The first writer was joined before the second started
        memory.clear_writes();
        thread::sleep(Duration::from_millis(20));
        let writes = memory.writes_to(ADDRESS);
        assert!(!writes.is_empty());
        assert!(writes.iter().all(|w| w == &2u32.to_le_bytes()));
    }

    #[test]
    fn test_unfreeze_stops_writes() {
        let memory = memory();
        let registry = FreezeRegistry::new(Duration::from_millis(1));

        registry.freeze(memory.clone(), ADDRESS, Value::U16(7)).unwrap();
        wait_for_write(&memory, ADDRESS);
        assert!(registry.unfreeze(ADDRESS));

        memory.clear_writes();
        thread::sleep(Duration::from_millis(10));
        assert!(memory.writes().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stray_unfreeze_is_noop() {
        let registry = FreezeRegistry::default();
        assert!(!registry.unfreeze(ADDRESS));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_all_and_drop() {
        let memory = memory();
        let registry = FreezeRegistry::new(Duration::from_millis(1));
        registry.freeze(memory.clone(), ADDRESS, Value::U8(1)).unwrap();
        registry.freeze(memory.clone(), ADDRESS + 4, Value::U8(2)).unwrap();
        assert_eq!(registry.len(), 2);

        registry.release_all();
        assert!(registry.is_empty());

        registry.freeze(memory.clone(), ADDRESS, Value::U8(3)).unwrap();
        drop(registry);
        memory.clear_writes();
        thread::sleep(Duration::from_millis(10));
        assert!(memory.writes().is_empty());
    }

    #[test]
    fn test_failing_writer_keeps_running() {
        let memory = Arc::new(MockMemoryBuilder::new().read_only(ADDRESS, 4).build());
        let registry = FreezeRegistry::new(Duration::from_millis(1));

        registry.freeze(memory.clone(), ADDRESS, Value::U32(5)).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert!(registry.is_frozen(ADDRESS));
        assert!(registry.unfreeze(ADDRESS));
    }
}

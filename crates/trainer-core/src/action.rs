//! Hotkey action execution against a resolved entry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::freeze::FreezeRegistry;
use crate::memory::{ReadMemory, WriteMemory};
use crate::table::{CheatAction, CheatEntry, EntryRuntime};
use crate::value::{Value, ValueKind};

/// Applies [`CheatAction`]s to target memory.
///
/// Owns the freeze registry, so dropping the executor stops every freeze it
/// started.
pub struct ActionExecutor<M: ?Sized> {
    memory: Arc<M>,
    freezes: FreezeRegistry,
}

impl<M> ActionExecutor<M>
where
    M: ReadMemory + WriteMemory + Send + Sync + ?Sized + 'static,
{
    pub fn new(memory: Arc<M>) -> Self {
        Self {
            memory,
            freezes: FreezeRegistry::default(),
        }
    }

    pub fn with_freeze_interval(memory: Arc<M>, interval: Duration) -> Self {
        Self {
            memory,
            freezes: FreezeRegistry::new(interval),
        }
    }

    pub fn memory(&self) -> &Arc<M> {
        &self.memory
    }

    pub fn freezes(&self) -> &FreezeRegistry {
        &self.freezes
    }

    /// Run the entry's bound action
    pub fn execute_entry(&self, entry: &CheatEntry) -> Result<()> {
        let runtime = runtime(entry)?;
        self.execute(runtime.active_action, entry)
    }

    pub fn execute(&self, action: CheatAction, entry: &CheatEntry) -> Result<()> {
        let runtime = runtime(entry)?;
        let kind = entry.declared_type.value_kind().ok_or_else(|| {
            Error::UnsupportedOperation(format!("entry {} has no memory target", entry.id))
        })?;
        let address = runtime.resolved_address;

        match action {
            CheatAction::SetValue => {
                let value = literal(entry, runtime)?;
                value.write(self.memory.as_ref(), address)?;
                info!("{}: set {:#x} to {}", entry.label(), address, value);
            }
            CheatAction::IncreaseValue | CheatAction::DecreaseValue => {
                if kind == ValueKind::Text {
                    return Err(Error::UnsupportedOperation(format!(
                        "cannot {} a text value",
                        if action == CheatAction::IncreaseValue {
                            "increase"
                        } else {
                            "decrease"
                        }
                    )));
                }
                let delta = literal(entry, runtime)?;
                let current = Value::read_as(kind, self.memory.as_ref(), address)?;
                let updated = if action == CheatAction::IncreaseValue {
                    current.add(&delta)?
                } else {
                    current.subtract(&delta)?
                };
                updated.write(self.memory.as_ref(), address)?;
                info!(
                    "{}: {} -> {} at {:#x}",
                    entry.label(),
                    current,
                    updated,
                    address
                );
            }
            CheatAction::Freeze => self.freeze(entry, runtime, kind)?,
            CheatAction::Unfreeze => {
                if !self.freezes.unfreeze(address) {
                    debug!("{}: not frozen", entry.label());
                }
            }
            CheatAction::ToggleFreeze => {
                if !self.freezes.unfreeze(address) {
                    self.freeze(entry, runtime, kind)?;
                }
            }
        }
        Ok(())
    }

    /// Stop every freeze started by this executor
    pub fn release_all(&self) {
        self.freezes.release_all();
    }

    fn freeze(&self, entry: &CheatEntry, runtime: &EntryRuntime, kind: ValueKind) -> Result<()> {
        let value = match &runtime.current_value {
            Some(value) if !value.is_zero() => value.clone(),
            _ => Value::read_as(kind, self.memory.as_ref(), runtime.resolved_address)?,
        };
        debug!("{}: freezing at {}", entry.label(), value);
        self.freezes
            .freeze(Arc::clone(&self.memory), runtime.resolved_address, value)
    }
}

fn runtime(entry: &CheatEntry) -> Result<&EntryRuntime> {
    entry.runtime.as_ref().ok_or(Error::Unresolved(entry.id))
}

fn literal(entry: &CheatEntry, runtime: &EntryRuntime) -> Result<Value> {
    runtime
        .current_value
        .clone()
        .ok_or(Error::MissingValue(entry.id))
}

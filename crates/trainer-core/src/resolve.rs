//! Pointer chain resolution.
//!
//! Cheat Engine lists an entry's offsets innermost first, so a chain is
//! reversed before it is walked. Walking dereferences the base literal and
//! every intermediate offset; the final offset is only added, giving one
//! fewer dereference than there are offsets.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::memory::{PointerWidth, ReadMemory};
use crate::table::{CheatEntry, CheatTable, DeclaredType, EntryRuntime};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct AddressResolver {
    width: PointerWidth,
}

impl AddressResolver {
    pub fn new(width: PointerWidth) -> Self {
        Self { width }
    }

    pub fn width(&self) -> PointerWidth {
        self.width
    }

    /// Follow `offsets` (already in resolution order) from `base_literal`.
    ///
    /// An empty chain returns `base_literal` unchanged.
    pub fn resolve<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        base_literal: u64,
        offsets: &[u32],
        module_base: u64,
    ) -> Result<u64> {
        let Some((last, rest)) = offsets.split_last() else {
            return Ok(base_literal);
        };

        let static_offset = base_literal.wrapping_sub(module_base);
        let mut pointer = self.deref(reader, module_base.wrapping_add(static_offset))?;
        for &offset in rest {
            pointer = self.deref(reader, pointer.wrapping_add(u64::from(offset)))?;
        }

        let address = pointer.wrapping_add(u64::from(*last));
        debug!(
            "Resolved {:#x} through {} offsets to {:#x}",
            base_literal,
            offsets.len(),
            address
        );
        Ok(address)
    }

    /// Resolve an entry's authored address and offset list
    pub fn resolve_chain<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        entry: &CheatEntry,
        module_base: u64,
    ) -> Result<u64> {
        let literal = entry.address.as_ref().ok_or_else(|| {
            Error::UnsupportedOperation(format!("entry {} has no address", entry.id))
        })?;

        let offsets: Vec<u32> = entry.offsets.iter().rev().copied().collect();
        self.resolve(reader, literal.base(module_base), &offsets, module_base)
    }

    fn deref<R: ReadMemory + ?Sized>(&self, reader: &R, address: u64) -> Result<u64> {
        reader
            .read_pointer(address, self.width)
            .map_err(|e| Error::Resolution {
                address,
                message: e.to_string(),
            })
    }
}

/// Outcome of [`resolve_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub discarded: usize,
}

/// One-time resolution pass over `table`.
///
/// Every enabled value entry gets its address resolved and the literal of its
/// first hotkey coerced to the entry's kind. Entries that cannot be made
/// executable (no hotkey, bad literal, unreadable chain) are dropped unless a
/// descendant survives, in which case they stay as inert structure.
pub fn resolve_all<R: ReadMemory + ?Sized>(
    table: &mut CheatTable,
    module_base: u64,
    reader: &R,
    resolver: &AddressResolver,
) -> Result<ResolveSummary> {
    if module_base == 0 {
        return Err(Error::MissingBaseAddress);
    }
    table.base_address = module_base;

    let mut summary = ResolveSummary::default();
    let entries = std::mem::take(&mut table.entries);
    table.entries = entries
        .into_iter()
        .filter_map(|entry| resolve_entry(entry, module_base, reader, resolver, &mut summary))
        .collect();

    debug!(
        "Resolution finished: {} resolved, {} discarded",
        summary.resolved, summary.discarded
    );
    Ok(summary)
}

fn resolve_entry<R: ReadMemory + ?Sized>(
    mut entry: CheatEntry,
    module_base: u64,
    reader: &R,
    resolver: &AddressResolver,
    summary: &mut ResolveSummary,
) -> Option<CheatEntry> {
    let children = std::mem::take(&mut entry.children);
    entry.children = children
        .into_iter()
        .filter_map(|child| resolve_entry(child, module_base, reader, resolver, summary))
        .collect();

    if entry.enabled && entry.is_value() {
        match build_runtime(&entry, module_base, reader, resolver) {
            Ok(runtime) => {
                entry.runtime = Some(runtime);
                summary.resolved += 1;
                return Some(entry);
            }
            Err(e) => {
                warn!("Discarding entry {} ({}): {}", entry.id, entry.label(), e);
                summary.discarded += 1;
                entry.runtime = None;
            }
        }
    }

    (!entry.children.is_empty()).then_some(entry)
}

fn build_runtime<R: ReadMemory + ?Sized>(
    entry: &CheatEntry,
    module_base: u64,
    reader: &R,
    resolver: &AddressResolver,
) -> Result<EntryRuntime> {
    let DeclaredType::Value(kind) = entry.declared_type else {
        return Err(Error::UnsupportedOperation(format!(
            "entry {} has no memory target",
            entry.id
        )));
    };

    let hotkey = entry.primary_hotkey().ok_or_else(|| {
        Error::UnsupportedOperation(format!("entry {} has no hotkey", entry.id))
    })?;
    if hotkey.keys.is_empty() {
        return Err(Error::UnsupportedOperation(format!(
            "entry {} has an empty key combination",
            entry.id
        )));
    }

    let current_value = if hotkey.value.trim().is_empty() {
        if hotkey.action.needs_value() {
            return Err(Error::MissingValue(entry.id));
        }
        None
    } else {
        Some(Value::parse_as(kind, &hotkey.value)?)
    };

    let resolved_address = resolver.resolve_chain(reader, entry, module_base)?;

    Ok(EntryRuntime {
        resolved_address,
        current_value,
        active_action: hotkey.action,
        active_key_combo: hotkey.keys.clone(),
    })
}

/// Live value of one entry, as read by [`read_entry_values`]
#[derive(Debug)]
pub struct EntryReading {
    pub id: u32,
    pub label: String,
    pub address: Option<u64>,
    pub value: Result<Value>,
}

/// Resolve and read every value entry of `table`, hotkeys or not
pub fn read_entry_values<R: ReadMemory + ?Sized>(
    table: &CheatTable,
    module_base: u64,
    reader: &R,
    resolver: &AddressResolver,
) -> Vec<EntryReading> {
    table
        .iter()
        .filter_map(|entry| {
            let kind = entry.declared_type.value_kind()?;
            let address = resolver.resolve_chain(reader, entry, module_base);
            let reading = match address {
                Ok(address) => EntryReading {
                    id: entry.id,
                    label: entry.label().to_string(),
                    address: Some(address),
                    value: Value::read_as(kind, reader, address),
                },
                Err(e) => EntryReading {
                    id: entry.id,
                    label: entry.label().to_string(),
                    address: None,
                    value: Err(e),
                },
            };
            Some(reading)
        })
        .collect()
}

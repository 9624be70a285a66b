//! # trainer-core
//!
//! Core library for driving Cheat Engine tables against a running process.
//!
//! This crate provides:
//! - Cheat table parsing into an entry tree
//! - Pointer chain resolution
//! - Typed value reads, writes and arithmetic
//! - Hotkey-driven actions, including background freezes
//! - Windows process memory access behind the [`ReadMemory`]/[`WriteMemory`] traits

pub mod action;
pub mod config;
pub mod error;
pub mod freeze;
pub mod input;
pub mod memory;
pub mod prelude;
pub mod resolve;
pub mod scheduler;
pub mod table;
pub mod value;

pub use action::ActionExecutor;
pub use config::{CONFIG_FILE, TrainerConfig};
pub use error::{Error, Result};
pub use freeze::{DEFAULT_FREEZE_INTERVAL, FreezeRegistry};
pub use input::{KeyState, SystemKeyboard, combo_label, key_code, key_name};
pub use memory::{PointerWidth, ProcessHandle, ReadMemory, WriteMemory, normalize_process_name};
pub use resolve::{AddressResolver, EntryReading, ResolveSummary, read_entry_values, resolve_all};
pub use scheduler::{DEFAULT_TICK_INTERVAL, HotkeyScheduler, SchedulerState};
pub use table::{
    AddressLiteral, CheatAction, CheatEntry, CheatTable, DeclaredType, EntryRuntime,
    HotkeyBinding, parse, parse_with_limit,
};
pub use value::{Value, ValueKind};

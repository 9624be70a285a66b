//! Prelude module for convenient imports
//!
//! ```ignore
//! use trainer_core::prelude::*;
//! ```

// Table model
pub use crate::table::{CheatAction, CheatEntry, CheatTable, HotkeyBinding, parse};

// Execution
pub use crate::action::ActionExecutor;
pub use crate::resolve::{AddressResolver, resolve_all};
pub use crate::scheduler::HotkeyScheduler;

// Platform seams
pub use crate::input::{KeyState, SystemKeyboard};
pub use crate::memory::{ProcessHandle, ReadMemory, WriteMemory};

// Values and errors
pub use crate::error::{Error, Result};
pub use crate::value::{Value, ValueKind};

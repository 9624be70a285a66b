//! Cheat table data model.
//!
//! A [`CheatTable`] is a tree of [`CheatEntry`] rows parsed from a Cheat
//! Engine table. Entries own their children; ids are assigned in pre-order at
//! parse time and keep counting when entries are added programmatically.

pub mod markup;
mod parser;

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::value::{Value, ValueKind};

pub use parser::{parse, parse_address, parse_with_limit};

/// Hotkey action, spelled the way Cheat Engine stores it
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
#[strum(ascii_case_insensitive)]
pub enum CheatAction {
    #[strum(serialize = "Set Value")]
    SetValue,
    #[strum(serialize = "Increase Value")]
    IncreaseValue,
    #[strum(serialize = "Decrease Value")]
    DecreaseValue,
    #[strum(to_string = "Activate", serialize = "Freeze")]
    Freeze,
    #[strum(to_string = "Deactivate", serialize = "Unfreeze")]
    Unfreeze,
    #[strum(to_string = "Toggle Activation", serialize = "Toggle Freeze")]
    ToggleFreeze,
}

impl CheatAction {
    /// Whether the action needs the binding's literal
    pub fn needs_value(&self) -> bool {
        matches!(
            self,
            Self::SetValue | Self::IncreaseValue | Self::DecreaseValue
        )
    }
}

/// Declared data type of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeclaredType {
    Value(ValueKind),
    /// No concrete memory target (scripts, group headers, unsupported types)
    Script(String),
}

impl DeclaredType {
    /// Map a `VariableType` name; anything unknown becomes a script row
    pub fn from_table_name(name: &str) -> Self {
        name.parse::<ValueKind>()
            .map(Self::Value)
            .unwrap_or_else(|_| Self::Script(name.to_string()))
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Value(kind) => Some(*kind),
            Self::Script(_) => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(kind) => write!(f, "{}", kind),
            Self::Script(name) if name.is_empty() => f.write_str("Group"),
            Self::Script(name) => f.write_str(name),
        }
    }
}

/// Authored address of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AddressLiteral {
    Absolute(u64),
    /// `"module.exe"+offset`, relative to the module's load address
    ModuleRelative { module: String, offset: u64 },
}

impl AddressLiteral {
    /// Concrete base literal given the module load address
    pub fn base(&self, module_base: u64) -> u64 {
        match self {
            Self::Absolute(address) => *address,
            Self::ModuleRelative { offset, .. } => module_base.wrapping_add(*offset),
        }
    }
}

impl fmt::Display for AddressLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(address) => write!(f, "{:08X}", address),
            Self::ModuleRelative { module, offset } => write!(f, "\"{}\"+{:X}", module, offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotkeyBinding {
    pub action: CheatAction,
    /// Virtual-key codes, all of which must be held
    pub keys: Vec<u32>,
    /// Literal operand as authored (may be empty)
    pub value: String,
    pub id: u32,
}

/// Resolved state of an entry, filled in by the resolution pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRuntime {
    pub resolved_address: u64,
    /// Coerced literal of the active binding, if it has one
    pub current_value: Option<Value>,
    pub active_action: CheatAction,
    pub active_key_combo: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheatEntry {
    pub description: String,
    pub id: u32,
    /// `<ID>` as written in the file
    pub source_id: Option<u32>,
    pub declared_type: DeclaredType,
    pub address: Option<AddressLiteral>,
    /// Pointer offsets in authored order (outermost first)
    pub offsets: Vec<u32>,
    pub hotkeys: Vec<HotkeyBinding>,
    pub children: Vec<CheatEntry>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<EntryRuntime>,
}

impl CheatEntry {
    pub fn new(description: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            description: description.into(),
            id: 0,
            source_id: None,
            declared_type,
            address: None,
            offsets: Vec::new(),
            hotkeys: Vec::new(),
            children: Vec::new(),
            enabled: true,
            runtime: None,
        }
    }

    pub fn with_address(mut self, address: AddressLiteral) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_offsets(mut self, offsets: Vec<u32>) -> Self {
        self.offsets = offsets;
        self
    }

    pub fn with_hotkey(mut self, hotkey: HotkeyBinding) -> Self {
        self.hotkeys.push(hotkey);
        self
    }

    pub fn with_child(mut self, child: CheatEntry) -> Self {
        self.children.push(child);
        self
    }

    /// Description without the surrounding quotes tables usually carry
    pub fn label(&self) -> &str {
        self.description.trim().trim_matches('"')
    }

    /// The binding the execution loop acts on
    pub fn primary_hotkey(&self) -> Option<&HotkeyBinding> {
        self.hotkeys.first()
    }

    /// Whether this entry has a memory target
    pub fn is_value(&self) -> bool {
        matches!(self.declared_type, DeclaredType::Value(_))
    }

    /// This entry followed by its descendants, pre-order
    pub fn iter(&self) -> EntryIter<'_> {
        EntryIter { stack: vec![self] }
    }

    fn visit_mut(&mut self, f: &mut impl FnMut(&mut CheatEntry)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

/// Pre-order traversal over an entry forest
pub struct EntryIter<'a> {
    stack: Vec<&'a CheatEntry>,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = &'a CheatEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.stack.extend(entry.children.iter().rev());
        Some(entry)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheatTable {
    pub entries: Vec<CheatEntry>,
    /// Load address of the target's main module; 0 until attached
    pub base_address: u64,
    #[serde(skip)]
    next_id: u32,
}

impl CheatTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(entries: Vec<CheatEntry>, next_id: u32) -> Self {
        Self {
            entries,
            base_address: 0,
            next_id,
        }
    }

    /// Append a top-level entry, assigning fresh ids to it and its children.
    /// Returns the id given to `entry`.
    pub fn add_entry(&mut self, mut entry: CheatEntry) -> u32 {
        let first = self.next_id;
        let mut next = self.next_id;
        entry.visit_mut(&mut |e| {
            e.id = next;
            next += 1;
        });
        self.next_id = next;
        self.entries.push(entry);
        first
    }

    /// Restrict the table to the entries in `ids`.
    ///
    /// Selected entries keep their subtree. Ancestors of a selected entry stay
    /// in the tree so structure is preserved, but are disabled themselves.
    pub fn activate_subset(&mut self, ids: &[u32]) {
        let wanted: HashSet<u32> = ids.iter().copied().collect();
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|entry| retain_selected(entry, &wanted))
            .collect();
    }

    /// Every entry, pre-order
    pub fn iter(&self) -> impl Iterator<Item = &CheatEntry> {
        self.entries.iter().flat_map(|e| e.iter())
    }

    pub fn flatten(&self) -> Vec<&CheatEntry> {
        self.iter().collect()
    }

    pub fn find(&self, id: u32) -> Option<&CheatEntry> {
        self.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut CheatEntry> {
        fn search(entries: &mut [CheatEntry], id: u32) -> Option<&mut CheatEntry> {
            for entry in entries {
                if entry.id == id {
                    return Some(entry);
                }
                if let Some(found) = search(&mut entry.children, id) {
                    return Some(found);
                }
            }
            None
        }
        search(&mut self.entries, id)
    }

    /// Total number of entries at all depths
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled entries that have been resolved, pre-order
    pub fn active_entries(&self) -> impl Iterator<Item = &CheatEntry> {
        self.iter().filter(|e| e.enabled && e.runtime.is_some())
    }
}

fn retain_selected(mut entry: CheatEntry, wanted: &HashSet<u32>) -> Option<CheatEntry> {
    if wanted.contains(&entry.id) {
        return Some(entry);
    }

    let children = std::mem::take(&mut entry.children);
    entry.children = children
        .into_iter()
        .filter_map(|child| retain_selected(child, wanted))
        .collect();

    if entry.children.is_empty() {
        None
    } else {
        entry.enabled = false;
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn leaf(description: &str) -> CheatEntry {
        CheatEntry::new(description, DeclaredType::Value(ValueKind::U32))
            .with_address(AddressLiteral::Absolute(0x1000))
    }

    fn sample_table() -> CheatTable {
        let mut table = CheatTable::new();
        table.add_entry(
            CheatEntry::new("Player", DeclaredType::Script(String::new()))
                .with_child(leaf("Health"))
                .with_child(leaf("Armor")),
        );
        table.add_entry(leaf("Money"));
        table
    }

    #[test]
    fn test_action_spellings() {
        assert_eq!(CheatAction::from_str("Set Value").unwrap(), CheatAction::SetValue);
        assert_eq!(CheatAction::from_str("Activate").unwrap(), CheatAction::Freeze);
        assert_eq!(CheatAction::from_str("Unfreeze").unwrap(), CheatAction::Unfreeze);
        assert_eq!(
            CheatAction::from_str("toggle activation").unwrap(),
            CheatAction::ToggleFreeze
        );
        assert!(CheatAction::from_str("Explode").is_err());
        assert_eq!(CheatAction::ToggleFreeze.to_string(), "Toggle Activation");
    }

    #[test]
    fn test_declared_type_from_table_name() {
        assert_eq!(
            DeclaredType::from_table_name("4 Bytes"),
            DeclaredType::Value(ValueKind::U32)
        );
        assert_eq!(
            DeclaredType::from_table_name("Auto Assembler Script"),
            DeclaredType::Script("Auto Assembler Script".to_string())
        );
    }

    #[test]
    fn test_add_entry_assigns_preorder_ids() {
        let table = sample_table();
        let ids: Vec<(u32, &str)> = table.iter().map(|e| (e.id, e.label())).collect();
        assert_eq!(
            ids,
            vec![(0, "Player"), (1, "Health"), (2, "Armor"), (3, "Money")]
        );
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_activate_subset_keeps_ancestors_disabled() {
        let mut table = sample_table();
        table.activate_subset(&[2]);

        assert_eq!(table.entries.len(), 1);
        let player = &table.entries[0];
        assert!(!player.enabled);
        assert_eq!(player.children.len(), 1);
        assert_eq!(player.children[0].label(), "Armor");
        assert!(player.children[0].enabled);
        assert!(table.find(3).is_none());
    }

    #[test]
    fn test_activate_subset_keeps_selected_subtree() {
        let mut table = sample_table();
        table.activate_subset(&[0, 3]);
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|e| e.enabled));
    }

    #[test]
    fn test_find_mut() {
        let mut table = sample_table();
        table.find_mut(1).unwrap().enabled = false;
        assert!(!table.find(1).unwrap().enabled);
    }

    #[test]
    fn test_label_strips_quotes() {
        assert_eq!(leaf("\"Infinite Health\"").label(), "Infinite Health");
    }

    #[test]
    fn test_address_literal_base() {
        let literal = AddressLiteral::ModuleRelative {
            module: "game.exe".to_string(),
            offset: 0x1234,
        };
        assert_eq!(literal.base(0x400000), 0x401234);
        assert_eq!(AddressLiteral::Absolute(0x5000).base(0x400000), 0x5000);
        assert_eq!(literal.to_string(), "\"game.exe\"+1234");
    }
}

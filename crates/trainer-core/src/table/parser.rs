use tracing::{debug, warn};

use super::markup::{Element, parse_document};
use super::{AddressLiteral, CheatAction, CheatEntry, CheatTable, DeclaredType, HotkeyBinding};
use crate::error::{Error, Result};

/// Parse a cheat table document
pub fn parse(text: &str) -> Result<CheatTable> {
    parse_with_limit(text, None)
}

/// Parse a cheat table, materialising at most `limit` top-level entries.
///
/// A limit of zero means no limit.
pub fn parse_with_limit(text: &str, limit: Option<usize>) -> Result<CheatTable> {
    let limit = limit.filter(|&limit| limit > 0);
    let document = parse_document(text)?;
    let container = find_container(&document)
        .ok_or_else(|| Error::MalformedTable("missing <CheatEntries> container".to_string()))?;

    let mut ids = IdCounter::default();
    let mut entries = Vec::new();
    for element in container.children_named("CheatEntry") {
        if limit.is_some_and(|limit| entries.len() >= limit) {
            debug!("Entry limit {} reached, ignoring the rest", entries.len());
            break;
        }
        entries.push(parse_entry(element, &mut ids)?);
    }

    let table = CheatTable::from_parts(entries, ids.0);
    debug!(
        "Parsed cheat table: {} top-level entries, {} total",
        table.entries.len(),
        table.len()
    );
    Ok(table)
}

#[derive(Default)]
struct IdCounter(u32);

impl IdCounter {
    fn next(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// `<CheatEntries>` at the top level or directly inside `<CheatTable>`
fn find_container(document: &[Element]) -> Option<&Element> {
    document.iter().find_map(|element| match element.name.as_str() {
        "CheatEntries" => Some(element),
        "CheatTable" => element.child("CheatEntries"),
        _ => None,
    })
}

fn parse_entry(element: &Element, ids: &mut IdCounter) -> Result<CheatEntry> {
    let id = ids.next();
    let description = element.child_text("Description").unwrap_or_default();
    let malformed = |what: String| Error::MalformedTable(format!("entry {}: {}", description, what));

    let source_id = element
        .child_text("ID")
        .map(|text| {
            text.parse::<u32>()
                .map_err(|_| malformed(format!("invalid ID {:?}", text)))
        })
        .transpose()?;

    let declared_type = element
        .child_text("VariableType")
        .map(DeclaredType::from_table_name)
        .unwrap_or_else(|| DeclaredType::Script(String::new()));

    let address = match &declared_type {
        DeclaredType::Value(_) => {
            let text = element
                .child_text("Address")
                .ok_or_else(|| malformed("missing <Address>".to_string()))?;
            let address = parse_address(text)
                .ok_or_else(|| malformed(format!("invalid address {:?}", text)))?;
            Some(address)
        }
        DeclaredType::Script(_) => None,
    };

    let offsets = element
        .child("Offsets")
        .map(|offsets| {
            offsets
                .children_named("Offset")
                .map(|offset| {
                    parse_hex(offset.text())
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(|| malformed(format!("invalid offset {:?}", offset.text())))
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let mut hotkeys = Vec::new();
    if let Some(container) = element.child("Hotkeys") {
        for (index, hotkey) in container.children_named("Hotkey").enumerate() {
            if let Some(binding) = parse_hotkey(hotkey, index as u32).map_err(malformed)? {
                hotkeys.push(binding);
            }
        }
    }

    let children = match element.child("CheatEntries") {
        Some(nested) => nested
            .children_named("CheatEntry")
            .map(|child| parse_entry(child, ids))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(CheatEntry {
        description: description.to_string(),
        id,
        source_id,
        declared_type,
        address,
        offsets,
        hotkeys,
        children,
        enabled: true,
        runtime: None,
    })
}

/// `Ok(None)` for bindings whose action the engine does not perform
fn parse_hotkey(element: &Element, index: u32) -> std::result::Result<Option<HotkeyBinding>, String> {
    let action_text = element.child_text("Action").unwrap_or_default();
    let Ok(action) = action_text.parse::<CheatAction>() else {
        warn!("Skipping hotkey with unsupported action {:?}", action_text);
        return Ok(None);
    };

    let keys = element
        .child("Keys")
        .map(|keys| {
            keys.children_named("Key")
                .map(|key| {
                    key.text()
                        .parse::<u32>()
                        .map_err(|_| format!("invalid key code {:?}", key.text()))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let id = match element.child_text("ID") {
        Some(text) => text
            .parse::<u32>()
            .map_err(|_| format!("invalid hotkey ID {:?}", text))?,
        None => index,
    };

    Ok(Some(HotkeyBinding {
        action,
        keys,
        value: element.child_text("Value").unwrap_or_default().to_string(),
        id,
    }))
}

/// Parse an address as Cheat Engine writes it.
///
/// An all-hex token is absolute (`07290BC8`); otherwise the token names a
/// module, optionally quoted, plus an optional hex offset (`"game.exe"+1F0`).
pub fn parse_address(text: &str) -> Option<AddressLiteral> {
    let text = text.trim();

    if let Some(quoted) = text.strip_prefix('"') {
        let close = quoted.find('"')?;
        let module = &quoted[..close];
        if module.is_empty() {
            return None;
        }
        return Some(AddressLiteral::ModuleRelative {
            module: module.to_string(),
            offset: parse_module_offset(&quoted[close + 1..])?,
        });
    }

    if let Some(address) = parse_hex(text) {
        return Some(AddressLiteral::Absolute(address));
    }

    let first = text.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }

    let (module, tail) = match text.find('+') {
        Some(plus) => (text[..plus].trim(), &text[plus..]),
        None => (text, ""),
    };
    Some(AddressLiteral::ModuleRelative {
        module: module.to_string(),
        offset: parse_module_offset(tail)?,
    })
}

fn parse_module_offset(tail: &str) -> Option<u64> {
    let tail = tail.trim();
    if tail.is_empty() {
        return Some(0);
    }
    parse_hex(tail.strip_prefix('+')?)
}

fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

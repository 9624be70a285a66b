//! Typed values stored in the target process.
//!
//! [`Value`] hides the concrete width of a cheat entry's data so callers can
//! read, write, format and combine values without matching on the kind
//! themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::memory::{ReadMemory, WriteMemory};

/// Maximum number of bytes read for a text value (MAX_PATH)
pub const TEXT_READ_LEN: usize = 260;

/// Value kinds, named as they appear in a table's `VariableType`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
pub enum ValueKind {
    #[strum(serialize = "Byte")]
    U8,
    #[strum(serialize = "2 Bytes")]
    U16,
    #[strum(serialize = "4 Bytes")]
    U32,
    #[strum(serialize = "8 Bytes")]
    U64,
    #[strum(serialize = "Float")]
    F32,
    #[strum(serialize = "Double")]
    F64,
    #[strum(serialize = "String")]
    Text,
}

impl ValueKind {
    /// Size in bytes of a read, or `None` for text
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 | Self::F32 => Some(4),
            Self::U64 | Self::F64 => Some(8),
            Self::Text => None,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.into()
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
}

/// Candidate kinds tried by [`Value::parse_literal`], narrowest first
const LITERAL_ORDER: [ValueKind; 6] = [
    ValueKind::U8,
    ValueKind::U16,
    ValueKind::U32,
    ValueKind::U64,
    ValueKind::F32,
    ValueKind::F64,
];

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::U8(_) => ValueKind::U8,
            Self::U16(_) => ValueKind::U16,
            Self::U32(_) => ValueKind::U32,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// The zero of `kind` (empty string for text)
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::U8 => Self::U8(0),
            ValueKind::U16 => Self::U16(0),
            ValueKind::U32 => Self::U32(0),
            ValueKind::U64 => Self::U64(0),
            ValueKind::F32 => Self::F32(0.0),
            ValueKind::F64 => Self::F64(0.0),
            ValueKind::Text => Self::Text(String::new()),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero(self.kind())
    }

    /// Coerce a literal into the narrowest kind that consumes all of it.
    ///
    /// A numeric kind only matches when it formats back to exactly `text`, so
    /// "007", "+5" and "1e2" stay text. A float kind must also hold the
    /// literal without rounding, so "0.1" lands in `F64`. Falls back to text
    /// when no numeric kind matches.
    pub fn parse_literal(text: &str) -> Value {
        LITERAL_ORDER
            .iter()
            .find_map(|&kind| {
                let value = Self::parse_as(kind, text).ok()?;
                (value.holds_exactly(text) && value.to_string() == text).then_some(value)
            })
            .unwrap_or_else(|| Self::Text(text.to_string()))
    }

    fn holds_exactly(&self, text: &str) -> bool {
        match self {
            Self::F32(v) => text
                .trim()
                .parse::<f64>()
                .is_ok_and(|wide| wide == f64::from(*v) || (wide.is_nan() && v.is_nan())),
            _ => true,
        }
    }

    /// Parse `text` as exactly `kind`; the whole (trimmed) input must match.
    pub fn parse_as(kind: ValueKind, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let invalid = || Error::InvalidValue {
            kind: kind.to_string(),
            text: text.to_string(),
        };

        let value = match kind {
            ValueKind::U8 => Self::U8(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::U16 => Self::U16(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::U32 => Self::U32(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::U64 => Self::U64(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::F32 => Self::F32(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::F64 => Self::F64(trimmed.parse().map_err(|_| invalid())?),
            ValueKind::Text => Self::Text(text.to_string()),
        };
        Ok(value)
    }

    /// Read a value of `kind` at `address`
    pub fn read_as<R: ReadMemory + ?Sized>(kind: ValueKind, reader: &R, address: u64) -> Result<Value> {
        let value = match kind {
            ValueKind::U8 => Self::U8(u8::from_le_bytes(reader.read_exact::<1>(address)?)),
            ValueKind::U16 => Self::U16(u16::from_le_bytes(reader.read_exact::<2>(address)?)),
            ValueKind::U32 => Self::U32(u32::from_le_bytes(reader.read_exact::<4>(address)?)),
            ValueKind::U64 => Self::U64(u64::from_le_bytes(reader.read_exact::<8>(address)?)),
            ValueKind::F32 => Self::F32(f32::from_le_bytes(reader.read_exact::<4>(address)?)),
            ValueKind::F64 => Self::F64(f64::from_le_bytes(reader.read_exact::<8>(address)?)),
            ValueKind::Text => {
                let bytes = reader.read_bytes(address, TEXT_READ_LEN)?;
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Self::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        };
        Ok(value)
    }

    /// Little-endian encoding; text is NUL-terminated
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::U8(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
            Self::Text(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
        }
    }

    pub fn write<W: WriteMemory + ?Sized>(&self, writer: &W, address: u64) -> Result<()> {
        writer.write_bytes(address, &self.to_bytes())
    }

    /// Same-kind numeric addition; integers wrap at their width
    pub fn add(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Self::U8(a), Self::U8(b)) => Ok(Self::U8(a.wrapping_add(*b))),
            (Self::U16(a), Self::U16(b)) => Ok(Self::U16(a.wrapping_add(*b))),
            (Self::U32(a), Self::U32(b)) => Ok(Self::U32(a.wrapping_add(*b))),
            (Self::U64(a), Self::U64(b)) => Ok(Self::U64(a.wrapping_add(*b))),
            (Self::F32(a), Self::F32(b)) => Ok(Self::F32(a + b)),
            (Self::F64(a), Self::F64(b)) => Ok(Self::F64(a + b)),
            _ => Err(self.arithmetic_error("add", rhs)),
        }
    }

    /// Same-kind numeric subtraction; integers wrap at their width
    pub fn subtract(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Self::U8(a), Self::U8(b)) => Ok(Self::U8(a.wrapping_sub(*b))),
            (Self::U16(a), Self::U16(b)) => Ok(Self::U16(a.wrapping_sub(*b))),
            (Self::U32(a), Self::U32(b)) => Ok(Self::U32(a.wrapping_sub(*b))),
            (Self::U64(a), Self::U64(b)) => Ok(Self::U64(a.wrapping_sub(*b))),
            (Self::F32(a), Self::F32(b)) => Ok(Self::F32(a - b)),
            (Self::F64(a), Self::F64(b)) => Ok(Self::F64(a - b)),
            _ => Err(self.arithmetic_error("subtract", rhs)),
        }
    }

    fn arithmetic_error(&self, op: &str, rhs: &Value) -> Error {
        if self.kind() == ValueKind::Text || rhs.kind() == ValueKind::Text {
            Error::UnsupportedOperation(format!("cannot {} text values", op))
        } else {
            Error::UnsupportedOperation(format!(
                "cannot {} {} and {}",
                op,
                self.kind(),
                rhs.kind()
            ))
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

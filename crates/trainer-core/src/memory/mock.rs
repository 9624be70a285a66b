//! In-memory stand-in for a target process, used by unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{ReadMemory, WriteMemory};
use crate::error::{Error, Result};

/// Sparse byte-addressed memory that records every write.
#[derive(Default)]
pub struct MockMemory {
    bytes: Mutex<BTreeMap<u64, u8>>,
    writes: Mutex<Vec<(u64, Vec<u8>)>>,
    read_only: Mutex<Vec<(u64, u64)>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes performed through [`WriteMemory`], in order
    pub fn writes(&self) -> Vec<(u64, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, address: u64) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|(addr, _)| *addr == address)
            .map(|(_, bytes)| bytes)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Store bytes without recording a write (test setup)
    pub fn poke(&self, address: u64, data: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap();
        for (i, byte) in data.iter().enumerate() {
            bytes.insert(address + i as u64, *byte);
        }
    }

    pub fn peek_u32(&self, address: u64) -> Option<u32> {
        self.read_u32(address).ok()
    }

    fn is_read_only(&self, address: u64, len: usize) -> bool {
        let end = address + len as u64;
        self.read_only
            .lock()
            .unwrap()
            .iter()
            .any(|&(start, stop)| address < stop && end > start)
    }
}

impl ReadMemory for MockMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let bytes = self.bytes.lock().unwrap();
        (0..size as u64)
            .map(|i| {
                bytes
                    .get(&(address + i))
                    .copied()
                    .ok_or_else(|| Error::MemoryReadFailed {
                        address,
                        message: format!("unmapped byte at {:#x}", address + i),
                    })
            })
            .collect()
    }
}

impl WriteMemory for MockMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        if self.is_read_only(address, data.len()) {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "page is read-only".to_string(),
            });
        }
        self.poke(address, data);
        self.writes.lock().unwrap().push((address, data.to_vec()));
        Ok(())
    }
}

/// Builder for [`MockMemory`]
#[derive(Default)]
pub struct MockMemoryBuilder {
    memory: MockMemory,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bytes(self, address: u64, data: &[u8]) -> Self {
        self.memory.poke(address, data);
        self
    }

    pub fn write_u8(self, address: u64, value: u8) -> Self {
        self.write_bytes(address, &[value])
    }

    pub fn write_u32(self, address: u64, value: u32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_f32(self, address: u64, value: f32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Map `len` zeroed bytes so reads succeed
    pub fn zeroed(self, address: u64, len: usize) -> Self {
        self.write_bytes(address, &vec![0; len])
    }

    /// Reject writes overlapping `[address, address + len)`
    pub fn read_only(self, address: u64, len: usize) -> Self {
        self.memory
            .read_only
            .lock()
            .unwrap()
            .push((address, address + len as u64));
        self
    }

    pub fn build(self) -> MockMemory {
        self.memory
    }
}

//! Target process discovery and raw memory access.
//!
//! On Windows this wraps a process handle opened with VM read/write access.
//! Other platforms only get stubs so the rest of the crate stays portable.

use crate::error::{Error, Result};

use super::{ReadMemory, WriteMemory};

/// Append `.exe` when the caller gave a bare game name ("ac_client")
pub fn normalize_process_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".exe") {
        name.to_string()
    } else {
        format!("{}.exe", name)
    }
}

#[cfg(target_os = "windows")]
pub use windows_impl::ProcessHandle;

#[cfg(not(target_os = "windows"))]
pub use stub::ProcessHandle;

#[cfg(target_os = "windows")]
mod windows_impl {
    use tracing::debug;
    use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE};
    use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W,
        Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
        PROCESS_VM_WRITE,
    };

    use super::*;

    pub struct ProcessHandle {
        handle: HANDLE,
        pub pid: u32,
        pub name: String,
        /// Load address of the main executable module
        pub base_address: u64,
    }

    // SAFETY: a process HANDLE is a kernel object reference; Read/WriteProcessMemory
    // may be called on it from any thread concurrently.
    unsafe impl Send for ProcessHandle {}
    unsafe impl Sync for ProcessHandle {}

    impl ProcessHandle {
        /// Find a running process by executable name and open it
        pub fn find_and_open(name: &str) -> Result<Self> {
            let target = normalize_process_name(name);
            let pid = find_pid(&target)?;
            let mut process = Self::open(pid)?;
            process.name = target;
            Ok(process)
        }

        pub fn open(pid: u32) -> Result<Self> {
            // SAFETY: OpenProcess has no memory-safety preconditions; failure is reported via Result.
            let handle = unsafe {
                OpenProcess(
                    PROCESS_VM_READ
                        | PROCESS_VM_WRITE
                        | PROCESS_VM_OPERATION
                        | PROCESS_QUERY_INFORMATION,
                    BOOL::from(false),
                    pid,
                )
            }
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;

            let (name, base_address) = match main_module(pid) {
                Ok(module) => module,
                Err(e) => {
                    // SAFETY: handle was returned by OpenProcess above and is not used again.
                    unsafe {
                        let _ = CloseHandle(handle);
                    }
                    return Err(e);
                }
            };

            debug!(
                "Opened process {} (pid {}, base {:#x})",
                name, pid, base_address
            );

            Ok(Self {
                handle,
                pid,
                name,
                base_address,
            })
        }
    }

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            // SAFETY: the handle is owned by this struct and closed exactly once.
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }

    impl ReadMemory for ProcessHandle {
        fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
            let mut buffer = vec![0u8; size];
            let mut bytes_read = 0usize;

            // SAFETY: buffer is valid for `size` bytes and outlives the call.
            unsafe {
                ReadProcessMemory(
                    self.handle,
                    address as *const _,
                    buffer.as_mut_ptr().cast(),
                    size,
                    Some(&mut bytes_read),
                )
            }
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;

            if bytes_read != size {
                return Err(Error::MemoryReadFailed {
                    address,
                    message: format!("expected {} bytes, read {}", size, bytes_read),
                });
            }

            Ok(buffer)
        }
    }

    impl WriteMemory for ProcessHandle {
        fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
            let mut bytes_written = 0usize;

            // SAFETY: bytes is a valid slice for the duration of the call.
            unsafe {
                WriteProcessMemory(
                    self.handle,
                    address as *const _,
                    bytes.as_ptr().cast(),
                    bytes.len(),
                    Some(&mut bytes_written),
                )
            }
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })?;

            if bytes_written != bytes.len() {
                return Err(Error::MemoryWriteFailed {
                    address,
                    message: format!("expected {} bytes, wrote {}", bytes.len(), bytes_written),
                });
            }

            Ok(())
        }
    }

    fn wide_to_string(wide: &[u16]) -> String {
        let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
        String::from_utf16_lossy(&wide[..len])
    }

    fn find_pid(exe_name: &str) -> Result<u32> {
        // SAFETY: snapshot creation has no preconditions; the handle is closed below.
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot failed: {}", e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        // SAFETY: entry.dwSize is initialised as the API requires.
        let mut more = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
        while more {
            if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(exe_name) {
                found = Some(entry.th32ProcessID);
                break;
            }
            // SAFETY: same snapshot and entry as above.
            more = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
        }

        // SAFETY: snapshot handle is owned here and not used afterwards.
        unsafe {
            let _ = CloseHandle(snapshot);
        }

        found.ok_or_else(|| Error::ProcessNotFound(exe_name.to_string()))
    }

    fn main_module(pid: u32) -> Result<(String, u64)> {
        // SAFETY: snapshot creation has no preconditions; the handle is closed below.
        let snapshot =
            unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid) }
                .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot failed: {}", e)))?;

        let mut module = MODULEENTRY32W {
            dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        // SAFETY: module.dwSize is initialised as the API requires.
        let result = unsafe { Module32FirstW(snapshot, &mut module) };

        // SAFETY: snapshot handle is owned here and not used afterwards.
        unsafe {
            let _ = CloseHandle(snapshot);
        }

        result.map_err(|e| Error::ProcessOpenFailed(format!("main module lookup failed: {}", e)))?;

        Ok((
            wide_to_string(&module.szModule),
            module.modBaseAddr as u64,
        ))
    }
}

#[cfg(not(target_os = "windows"))]
mod stub {
    use super::*;

    pub struct ProcessHandle {
        pub pid: u32,
        pub name: String,
        pub base_address: u64,
    }

    impl ProcessHandle {
        pub fn find_and_open(name: &str) -> Result<Self> {
            Err(Error::ProcessNotFound(format!(
                "{} (process attach is only supported on Windows)",
                normalize_process_name(name)
            )))
        }

        pub fn open(pid: u32) -> Result<Self> {
            Err(Error::ProcessOpenFailed(format!(
                "pid {} (process attach is only supported on Windows)",
                pid
            )))
        }
    }

    impl ReadMemory for ProcessHandle {
        fn read_bytes(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
            Err(Error::MemoryReadFailed {
                address,
                message: "memory access is only supported on Windows".to_string(),
            })
        }
    }

    impl WriteMemory for ProcessHandle {
        fn write_bytes(&self, address: u64, _bytes: &[u8]) -> Result<()> {
            Err(Error::MemoryWriteFailed {
                address,
                message: "memory access is only supported on Windows".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_process_name() {
        assert_eq!(normalize_process_name("ac_client"), "ac_client.exe");
        assert_eq!(normalize_process_name("igi.exe"), "igi.exe");
        assert_eq!(normalize_process_name("Game.EXE"), "Game.EXE");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_attach_unsupported_off_windows() {
        let err = ProcessHandle::find_and_open("ac_client").err().unwrap();
        assert!(matches!(err, Error::ProcessNotFound(name) if name.starts_with("ac_client.exe")));
    }
}

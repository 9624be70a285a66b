use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed cheat table: {0}")]
    MalformedTable(String),

    #[error("Failed to resolve pointer chain at {address:#x}: {message}")]
    Resolution { address: u64, message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Module base address is not set")]
    MissingBaseAddress,

    #[error("Entry {0} has no value for this action")]
    MissingValue(u32),

    #[error("Invalid {kind} value: {text:?}")]
    InvalidValue { kind: String, text: String },

    #[error("Entry {0} has not been resolved")]
    Unresolved(u32),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error only affects a single entry for a single tick
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. }
                | Error::MemoryReadFailed { .. }
                | Error::MemoryWriteFailed { .. }
                | Error::UnsupportedOperation(_)
                | Error::MissingValue(_)
                | Error::Unresolved(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_error_is_recoverable() {
        let err = Error::Resolution {
            address: 0x1000,
            message: "page not mapped".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(Error::UnsupportedOperation("decrease on text".to_string()).is_recoverable());

        assert!(!Error::MalformedTable("missing <CheatEntries>".to_string()).is_recoverable());
        assert!(!Error::MissingBaseAddress.is_recoverable());
    }

    #[test]
    fn test_error_messages_show_hex_address() {
        let err = Error::MemoryWriteFailed {
            address: 0x07290BC8,
            message: "access denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write process memory at address 0x7290bc8: access denied"
        );
    }
}

//! Trainer settings loaded from `trainer.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::key_code;
use crate::memory::PointerWidth;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "trainer.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Target executable name
    pub process: Option<String>,
    /// Key that stops the hotkey loop, by name ("F12", "Esc", "0x7B")
    pub exit_key: String,
    pub tick_interval_ms: u64,
    pub freeze_interval_ms: u64,
    /// Maximum number of top-level entries to load
    pub entries_limit: Option<usize>,
    pub pointer_width: PointerWidth,
    /// Entry ids to activate; everything when unset
    pub activate: Option<Vec<u32>>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            process: None,
            exit_key: "F12".to_string(),
            tick_interval_ms: 100,
            freeze_interval_ms: 25,
            entries_limit: None,
            pointer_width: PointerWidth::default(),
            activate: None,
        }
    }
}

impl TrainerConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.exit_key_code()?;
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.freeze_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "freeze_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Virtual-key code of `exit_key`
    pub fn exit_key_code(&self) -> Result<u32> {
        key_code(&self.exit_key)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown exit key {:?}", self.exit_key)))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn freeze_interval(&self) -> Duration {
        Duration::from_millis(self.freeze_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{VK_ESCAPE, VK_F12};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = TrainerConfig::default();
        assert_eq!(config.exit_key_code().unwrap(), VK_F12);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.freeze_interval(), Duration::from_millis(25));
        assert_eq!(config.pointer_width, PointerWidth::Bits32);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = TrainerConfig::from_toml(
            r#"
process = "game.exe"
exit_key = "Esc"
pointer_width = "64"
activate = [0, 3]
"#,
        )
        .unwrap();

        assert_eq!(config.process.as_deref(), Some("game.exe"));
        assert_eq!(config.exit_key_code().unwrap(), VK_ESCAPE);
        assert_eq!(config.pointer_width, PointerWidth::Bits64);
        assert_eq!(config.activate, Some(vec![0, 3]));
        assert_eq!(config.tick_interval_ms, 100);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "entries_limit = 5\nfreeze_interval_ms = 10").unwrap();

        let config = TrainerConfig::load(file.path()).unwrap();
        assert_eq!(config.entries_limit, Some(5));
        assert_eq!(config.freeze_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_missing_file() {
        let err = TrainerConfig::load("/nonexistent/trainer.toml").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            TrainerConfig::from_toml("exit_key = \"Hyper\""),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            TrainerConfig::from_toml("tick_interval_ms = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            TrainerConfig::from_toml("pointer_width = \"16\""),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let config = TrainerConfig {
            process: Some("game.exe".to_string()),
            activate: Some(vec![1]),
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(TrainerConfig::from_toml(&text).unwrap(), config);
    }
}

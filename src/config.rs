//! Save configuration, loadable from YAML
//!
//! ```yaml
//! temp_dir_name: TemporaryFiles
//! backup_suffix: " - Backup"
//! backup_naming: timestamped
//! target_wait:
//!   attempts: 20
//!   delay_ms: 250
//! ```

use crate::error::{SaveError, SaveResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Bounded polling policy used while waiting for a locked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl WaitPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// How backup files are named next to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupNaming {
    /// `<stem> - Backup<ext>`, overwritten on every save
    #[default]
    Fixed,
    /// `<stem> - Backup <YYYYMMDD-HHMMSS><ext>`
    Timestamped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Subdirectory (next to the destination) holding in-flight temp files
    pub temp_dir_name: String,
    pub backup_suffix: String,
    pub backup_naming: BackupNaming,
    /// Wait before replacing an existing destination (fatal on timeout)
    pub target_wait: WaitPolicy,
    /// Wait before overwriting an existing backup (backup skipped on timeout)
    pub backup_wait: WaitPolicy,
    /// Ignore Ctrl+C while a save is between temp write and replace
    pub guard_interrupts: bool,
    /// Threads for detached saves
    pub worker_threads: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            temp_dir_name: "TemporaryFiles".to_string(),
            backup_suffix: " - Backup".to_string(),
            backup_naming: BackupNaming::Fixed,
            target_wait: WaitPolicy {
                attempts: 10,
                delay_ms: 500,
            },
            backup_wait: WaitPolicy {
                attempts: 5,
                delay_ms: 500,
            },
            guard_interrupts: true,
            worker_threads: 2,
        }
    }
}

impl SaveConfig {
    pub fn from_yaml_str(yaml: &str) -> SaveResult<Self> {
        let config: SaveConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> SaveResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> SaveResult<()> {
        if self.temp_dir_name.trim().is_empty() {
            return Err(SaveError::Config("temp_dir_name must not be empty".into()));
        }
        if self.temp_dir_name.contains(['/', '\\']) {
            return Err(SaveError::Config(format!(
                "temp_dir_name '{}' must be a single directory name",
                self.temp_dir_name
            )));
        }
        if self.backup_suffix.is_empty() {
            return Err(SaveError::Config("backup_suffix must not be empty".into()));
        }
        if self.target_wait.attempts == 0 || self.backup_wait.attempts == 0 {
            return Err(SaveError::Config("wait attempts must be at least 1".into()));
        }
        if self.worker_threads == 0 {
            return Err(SaveError::Config("worker_threads must be at least 1".into()));
        }
        Ok(())
    }
}

//! Backup naming and metadata-preserving copies

use crate::config::{BackupNaming, SaveConfig};
use crate::error::SaveResult;
use chrono::{DateTime, Local};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Backup path next to `target`
///
/// Examples (default suffix):
/// - Fixed: `data.csv` → `data - Backup.csv`
/// - Timestamped: `data.csv` → `data - Backup 20250131-142500.csv`
pub fn backup_path(target: &Path, config: &SaveConfig, now: DateTime<Local>) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let name = match config.backup_naming {
        BackupNaming::Fixed => format!("{}{}{}", stem, config.backup_suffix, ext),
        BackupNaming::Timestamped => format!(
            "{}{} {}{}",
            stem,
            config.backup_suffix,
            now.format("%Y%m%d-%H%M%S"),
            ext
        ),
    };
    target.with_file_name(name)
}

/// Copy `from` to `to`, keeping permissions and access/modification times
pub fn copy_preserving_metadata(from: &Path, to: &Path) -> SaveResult<()> {
    fs::copy(from, to)?;
    let metadata = fs::metadata(from)?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_backup_path() {
        let config = SaveConfig::default();
        let path = backup_path(Path::new("/data/report.xlsx"), &config, Local::now());
        assert_eq!(path, PathBuf::from("/data/report - Backup.xlsx"));
    }

    #[test]
    fn test_timestamped_backup_path() {
        let config = SaveConfig {
            backup_naming: BackupNaming::Timestamped,
            ..Default::default()
        };
        let now = Local.with_ymd_and_hms(2025, 1, 31, 14, 25, 0).unwrap();
        let path = backup_path(Path::new("data.csv"), &config, now);
        assert_eq!(path, PathBuf::from("data - Backup 20250131-142500.csv"));
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.csv");
        let to = dir.path().join("b.csv");

        let mut file = fs::File::create(&from).unwrap();
        file.write_all(b"x,y\n1,2\n").unwrap();
        drop(file);
        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&from, old).unwrap();

        copy_preserving_metadata(&from, &to).unwrap();

        let copied = fs::metadata(&to).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), old);
        assert_eq!(fs::read(&to).unwrap(), b"x,y\n1,2\n");
    }
}

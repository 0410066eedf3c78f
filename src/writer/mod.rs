//! Atomic writer: temp file → optional format transplant → wait → atomic replace → backup → open
//!
//! Layout produced next to the destination:
//!
//! ```text
//! <dir>/TemporaryFiles/<random>.<ext>   (transient)
//! <dir>/<name>.<ext>                    (final)
//! <dir>/<name> - Backup.<ext>           (optional)
//! ```

mod availability;
mod backup;

pub use availability::{wait_for_availability, FileAccess, OpenAccess};
pub use backup::{backup_path, copy_preserving_metadata};

use crate::config::SaveConfig;
use crate::dataset::Dataset;
use crate::delimited::write_csv;
use crate::error::{SaveError, SaveResult};
use crate::excel::{transplant_format, ExcelExporter};
use crate::interrupt::CriticalSection;
use crate::launcher::Launcher;
use crate::types::Table;
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

//==============================================================================
// File Formats
//==============================================================================

/// Supported output formats, chosen by the destination's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text (.csv)
    Csv,
    /// Excel workbook (.xlsx)
    Xlsx,
}

impl FileFormat {
    pub const SUPPORTED_EXTENSIONS: [&'static str; 2] = [".csv", ".xlsx"];

    /// Pick the format for `path`, or fail with an unsupported-extension error
    pub fn from_path(path: &Path) -> SaveResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xlsx") => Ok(FileFormat::Xlsx),
            _ => Err(SaveError::UnsupportedExtension {
                path: path.to_path_buf(),
                expected: Self::SUPPORTED_EXTENSIONS.join(", "),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Xlsx => ".xlsx",
        }
    }

    /// Serialize `table` into `file`, without an index column
    pub fn serialize(&self, table: &Table, file: &mut File) -> SaveResult<()> {
        match self {
            FileFormat::Csv => write_csv(table, BufWriter::new(&mut *file))?,
            FileFormat::Xlsx => file.write_all(&ExcelExporter::new(table).to_bytes()?)?,
        }
        file.sync_all()?;
        Ok(())
    }
}

//==============================================================================
// Save Request
//==============================================================================

/// Flags for one save call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Copy column widths and header alignment from the existing file (or source)
    pub retain_format: bool,
    /// Run the save on the detached worker; the caller gets no result
    pub async_mode: bool,
    /// Open the saved file with the OS default application
    pub auto_open: bool,
    /// Keep a backup copy next to the destination
    pub create_backup: bool,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain_format(mut self, yes: bool) -> Self {
        self.retain_format = yes;
        self
    }

    pub fn async_mode(mut self, yes: bool) -> Self {
        self.async_mode = yes;
        self
    }

    pub fn auto_open(mut self, yes: bool) -> Self {
        self.auto_open = yes;
        self
    }

    pub fn create_backup(mut self, yes: bool) -> Self {
        self.create_backup = yes;
        self
    }
}

/// A resolved destination plus the flags for this save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub path: PathBuf,
    pub options: SaveOptions,
}

/// What a completed save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    /// Workbook whose formatting was transplanted, if any
    pub format_reference: Option<PathBuf>,
    /// Backup written by this save
    pub backup: Option<PathBuf>,
    /// A backup was requested but the backup file stayed locked
    pub backup_skipped: bool,
    pub opened: bool,
}

//==============================================================================
// Atomic Writer
//==============================================================================

pub struct AtomicWriter<'a> {
    config: &'a SaveConfig,
    access: &'a dyn FileAccess,
    launcher: &'a dyn Launcher,
}

impl<'a> AtomicWriter<'a> {
    pub fn new(config: &'a SaveConfig, access: &'a dyn FileAccess, launcher: &'a dyn Launcher) -> Self {
        Self {
            config,
            access,
            launcher,
        }
    }

    /// Persist `dataset` at `request.path` without ever exposing a partial file there
    pub fn write(&self, dataset: &Dataset, request: &SaveRequest) -> SaveResult<SaveReport> {
        let target = request.path.as_path();
        let format = FileFormat::from_path(target)?;
        let options = request.options;

        let guard = if self.config.guard_interrupts {
            CriticalSection::enter()
        } else {
            CriticalSection::disabled()
        };

        let temp_dir = self.temp_dir_for(target);
        // Only the staging directory is created; a missing destination folder is an error
        match fs::create_dir(&temp_dir) {
            Err(e) if e.kind() != io::ErrorKind::AlreadyExists => return Err(e.into()),
            _ => {}
        }

        let mut temp = tempfile::Builder::new()
            .suffix(format.extension())
            .tempfile_in(&temp_dir)?;
        format.serialize(dataset.table(), temp.as_file_mut())?;
        debug!(temp = %temp.path().display(), "Wrote temp file");

        let format_reference = if options.retain_format && format == FileFormat::Xlsx {
            select_format_reference(target, dataset)
        } else {
            None
        };
        if let Some(reference) = &format_reference {
            transplant_format(reference, temp.path(), dataset.table())?;
        }

        let target_existed = target.exists();
        if target_existed
            && !wait_for_availability(target, &self.config.target_wait, self.access)
        {
            return Err(SaveError::FileLocked {
                path: target.to_path_buf(),
                attempts: self.config.target_wait.attempts,
            });
        }

        // The backup holds what the destination contained before this save
        let previous = if options.create_backup && target_existed {
            Some(self.copy_previous(target, &temp_dir, format)?)
        } else {
            None
        };

        temp.persist(target).map_err(|e| SaveError::Io(e.error))?;
        info!(path = %target.display(), "Saved");

        let (backup, backup_skipped) = if options.create_backup {
            self.write_backup(target, previous)?
        } else {
            (None, false)
        };

        drop(guard);

        let opened = options.auto_open && self.open(target);

        Ok(SaveReport {
            path: target.to_path_buf(),
            format_reference,
            backup,
            backup_skipped,
            opened,
        })
    }

    /// `<dir>/<temp_dir_name>` for a destination in `<dir>`
    pub fn temp_dir_for(&self, target: &Path) -> PathBuf {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        parent.join(&self.config.temp_dir_name)
    }

    fn copy_previous(
        &self,
        target: &Path,
        temp_dir: &Path,
        format: FileFormat,
    ) -> SaveResult<NamedTempFile> {
        let previous = tempfile::Builder::new()
            .prefix("previous")
            .suffix(format.extension())
            .tempfile_in(temp_dir)?;
        copy_preserving_metadata(target, previous.path())?;
        Ok(previous)
    }

    fn write_backup(
        &self,
        target: &Path,
        previous: Option<NamedTempFile>,
    ) -> SaveResult<(Option<PathBuf>, bool)> {
        let backup = backup_path(target, self.config, Local::now());

        if backup.exists()
            && !wait_for_availability(&backup, &self.config.backup_wait, self.access)
        {
            warn!(backup = %backup.display(), "Backup file is locked, skipping backup");
            return Ok((None, true));
        }

        match previous {
            Some(previous) => {
                previous.persist(&backup).map_err(|e| SaveError::Io(e.error))?;
            }
            None => copy_preserving_metadata(target, &backup)?,
        }
        info!(backup = %backup.display(), "Backup written");
        Ok((Some(backup), false))
    }

    fn open(&self, target: &Path) -> bool {
        match self.launcher.open(target) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %target.display(), "Failed to open saved file: {}", e);
                false
            }
        }
    }
}

/// The existing destination if present, else the dataset's source; only workbooks qualify
pub fn select_format_reference(target: &Path, dataset: &Dataset) -> Option<PathBuf> {
    let candidate = if target.exists() {
        target.to_path_buf()
    } else {
        dataset.source_file()?.to_path_buf()
    };

    let is_workbook = candidate
        .extension()
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);

    (is_workbook && candidate.exists()).then_some(candidate)
}

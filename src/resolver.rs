//! Destination resolution: explicit path → stored destination → source (confirmed) → save-as prompt

use crate::dataset::Dataset;
use crate::error::{SaveError, SaveResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Yes/no question shown before overwriting the source file
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    /// Keep the dialog above other application windows
    pub topmost: bool,
}

/// One filter group in a save-as dialog, e.g. `("CSV files", ["*.csv"])`
#[derive(Debug, Clone, PartialEq)]
pub struct FileFilter {
    pub label: String,
    pub patterns: Vec<String>,
}

impl FileFilter {
    pub fn new(label: &str, patterns: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Save-as dialog request
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDialog {
    pub title: String,
    pub filters: Vec<FileFilter>,
    pub default_extension: String,
    pub topmost: bool,
}

impl SaveDialog {
    /// The dialog offered when the user declines to overwrite the source
    pub fn save_as() -> Self {
        Self {
            title: "Save File As".to_string(),
            filters: vec![
                FileFilter::new("Excel and CSV files", &["*.xlsx", "*.csv"]),
                FileFilter::new("Excel files", &["*.xlsx"]),
                FileFilter::new("CSV files", &["*.csv"]),
                FileFilter::new("All files", &["*.*"]),
            ],
            default_extension: ".xlsx".to_string(),
            topmost: true,
        }
    }
}

/// Interactive questions asked while resolving a destination.
///
/// Implementations block until the user answers.
pub trait Prompter: Send + Sync {
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool;

    /// None (or an empty path) means the dialog was cancelled
    fn save_path(&self, dialog: &SaveDialog) -> Option<PathBuf>;
}

/// Declines every question; used when no UI is available
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        false
    }

    fn save_path(&self, _dialog: &SaveDialog) -> Option<PathBuf> {
        None
    }
}

/// Decide where `dataset` should be saved
pub fn resolve_destination(
    explicit: Option<&Path>,
    dataset: &Dataset,
    prompter: &dyn Prompter,
) -> SaveResult<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path.to_path_buf());
    }

    if let Some(destination) = dataset.destination_file() {
        debug!(path = %destination.display(), "Using stored destination");
        return Ok(destination.to_path_buf());
    }

    let chosen = match dataset.source_file() {
        Some(source) => {
            let prompt = ConfirmPrompt {
                title: "Save Notice".to_string(),
                message: format!(
                    "No destination file found.\nSave to source file?\nSource File: {}",
                    source.display()
                ),
                topmost: true,
            };
            if prompter.confirm(&prompt) {
                Some(source.to_path_buf())
            } else {
                prompter.save_path(&SaveDialog::save_as())
            }
        }
        None => None,
    };

    chosen
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(SaveError::NoPath)
}

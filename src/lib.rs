//! SafeSave - atomic, format-preserving saves for tabular data
//!
//! This library saves an in-memory table to CSV or Excel without ever leaving a
//! half-written file at the destination.
//!
//! # Features
//!
//! - Atomic replace through a `TemporaryFiles/` staging directory
//! - Column widths and header alignment carried over from the previous workbook
//! - Waits out files held open by other applications
//! - Optional backup (`<name> - Backup.<ext>`), detached saves and auto-open
//! - Datasets remember their source and destination across transformations
//!
//! # Example
//!
//! ```no_run
//! use royalbit_safesave::reader::load_dataset;
//! use royalbit_safesave::writer::SaveOptions;
//! use royalbit_safesave::types::CellValue;
//! use std::path::Path;
//!
//! let dataset = load_dataset(Path::new("data.xlsx"), Some(Path::new("out.xlsx")), false)?;
//! let flagged = dataset.with_column("checked", vec![CellValue::Bool(true); dataset.row_count()])?;
//!
//! let options = SaveOptions::new().retain_format(true).create_backup(true);
//! flagged.save(None, &options)?;
//! # Ok::<(), royalbit_safesave::error::SaveError>(())
//! ```

pub mod config;
pub mod dataset;
pub mod delimited;
pub mod error;
pub mod excel;
pub mod interrupt;
pub mod launcher;
pub mod logging;
pub mod reader;
pub mod resolver;
pub mod saver;
pub mod types;
pub mod worker;
pub mod writer;

// Re-export commonly used types
pub use config::{BackupNaming, SaveConfig, WaitPolicy};
pub use dataset::Dataset;
pub use error::{SaveError, SaveResult};
pub use reader::load_dataset;
pub use saver::{SaveOutcome, Saver};
pub use types::{CellValue, Column, Table};
pub use writer::{SaveOptions, SaveReport};

//! Opening a saved file with the OS default application

use std::path::Path;

pub trait Launcher: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<()>;
}

/// Delegates to the platform opener (`xdg-open`, `open`, `start`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        open::that(path)
    }
}

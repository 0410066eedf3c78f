//! Waiting for a file that another process may hold open

use crate::config::WaitPolicy;
use std::fs::OpenOptions;
use std::path::Path;
use std::thread;
use tracing::debug;

/// Decides whether a file can currently be replaced
pub trait FileAccess: Send + Sync {
    fn is_available(&self, path: &Path) -> bool;
}

/// A file is available when it can be opened for read+write (never truncated).
///
/// On Windows this fails while a spreadsheet application has the file open.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl FileAccess for OpenAccess {
    fn is_available(&self, path: &Path) -> bool {
        OpenOptions::new().read(true).write(true).open(path).is_ok()
    }
}

/// Poll `access` until `path` is available or the policy runs out.
///
/// Returns true as soon as the file is available, false after `attempts` failed
/// checks. Sleeps `delay` between checks, never after the last one.
pub fn wait_for_availability(path: &Path, policy: &WaitPolicy, access: &dyn FileAccess) -> bool {
    for attempt in 1..=policy.attempts {
        if access.is_available(path) {
            return true;
        }
        debug!(
            path = %path.display(),
            attempt,
            attempts = policy.attempts,
            "File is locked, waiting"
        );
        if attempt < policy.attempts {
            thread::sleep(policy.delay());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tempfile::NamedTempFile;

    /// Locked for the first `locked_for` checks
    struct CountingAccess {
        checks: AtomicU32,
        locked_for: u32,
    }

    impl FileAccess for CountingAccess {
        fn is_available(&self, _path: &Path) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst) >= self.locked_for
        }
    }

    #[test]
    fn test_open_access_on_plain_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(OpenAccess.is_available(file.path()));
        assert!(!OpenAccess.is_available(Path::new("no/such/file.csv")));
    }

    #[test]
    fn test_wait_succeeds_once_released() {
        let access = CountingAccess {
            checks: AtomicU32::new(0),
            locked_for: 2,
        };
        let policy = WaitPolicy::new(5, Duration::from_millis(1));
        assert!(wait_for_availability(Path::new("x.csv"), &policy, &access));
        assert_eq!(access.checks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wait_gives_up_after_attempts() {
        let access = CountingAccess {
            checks: AtomicU32::new(0),
            locked_for: u32::MAX,
        };
        let policy = WaitPolicy::new(3, Duration::from_millis(1));
        assert!(!wait_for_availability(Path::new("x.csv"), &policy, &access));
        assert_eq!(access.checks.load(Ordering::SeqCst), 3);
    }
}

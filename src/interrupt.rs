//! Critical sections that Ctrl+C cannot abort
//!
//! The first live [`CriticalSection`] switches the interrupt disposition to
//! "ignore" and remembers the previous one. The last guard to drop puts the
//! previous disposition back, so whatever the host had in place (default
//! termination or its own handler) applies again outside a save.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

struct GuardState {
    active: usize,
    saved: Option<platform::Disposition>,
}

static STATE: Mutex<GuardState> = Mutex::new(GuardState {
    active: 0,
    saved: None,
});

fn state() -> MutexGuard<'static, GuardState> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII guard: interrupts are ignored until the last guard is dropped
#[derive(Debug)]
pub struct CriticalSection {
    armed: bool,
}

impl CriticalSection {
    pub fn enter() -> Self {
        let mut state = state();
        if state.active == 0 {
            match platform::ignore_interrupts() {
                Ok(previous) => state.saved = Some(previous),
                Err(e) => {
                    warn!("Interrupt guard unavailable: {}", e);
                    return Self { armed: false };
                }
            }
            debug!("Interrupts ignored while saving");
        }
        state.active += 1;
        Self { armed: true }
    }

    /// A guard that protects nothing (interrupt guarding disabled in config)
    pub fn disabled() -> Self {
        Self { armed: false }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = state();
        state.active -= 1;
        if state.active == 0 {
            if let Some(previous) = state.saved.take() {
                match platform::restore_interrupts(&previous) {
                    Ok(()) => debug!("Interrupt handling restored"),
                    Err(e) => warn!("Failed to restore interrupt handling: {}", e),
                }
            }
        }
    }
}

/// Number of live armed guards in the process
pub fn active_sections() -> usize {
    state().active
}

#[cfg(unix)]
mod platform {
    use std::{io, mem, ptr};

    pub type Disposition = libc::sigaction;

    pub fn ignore_interrupts() -> io::Result<Disposition> {
        // SAFETY: both structs are fully initialised before sigaction reads them
        unsafe {
            let mut ignore: libc::sigaction = mem::zeroed();
            ignore.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut ignore.sa_mask);

            let mut previous: libc::sigaction = mem::zeroed();
            if libc::sigaction(libc::SIGINT, &ignore, &mut previous) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(previous)
        }
    }

    pub fn restore_interrupts(previous: &Disposition) -> io::Result<()> {
        // SAFETY: `previous` was filled in by sigaction itself
        if unsafe { libc::sigaction(libc::SIGINT, previous, ptr::null_mut()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(windows)]
mod platform {
    use std::io;
    use windows_sys::Win32::System::Console::SetConsoleCtrlHandler;

    pub type Disposition = ();

    pub fn ignore_interrupts() -> io::Result<Disposition> {
        // SAFETY: a null routine only toggles the process-wide Ctrl+C flag
        if unsafe { SetConsoleCtrlHandler(None, 1) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn restore_interrupts(_previous: &Disposition) -> io::Result<()> {
        // SAFETY: see ignore_interrupts
        if unsafe { SetConsoleCtrlHandler(None, 0) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::io;

    pub type Disposition = ();

    pub fn ignore_interrupts() -> io::Result<Disposition> {
        Ok(())
    }

    pub fn restore_interrupts(_previous: &Disposition) -> io::Result<()> {
        Ok(())
    }
}

/// Serialises tests that change the process-wide interrupt disposition
#[cfg(test)]
pub(crate) static DISPOSITION_LOCK: Mutex<()> = Mutex::new(());

/// Current SIGINT handler address (`SIG_DFL`, `SIG_IGN` or a function)
#[cfg(all(test, unix))]
pub(crate) fn current_sigint_handler() -> libc::sighandler_t {
    // SAFETY: a null new action only queries the disposition
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        libc::sigaction(libc::SIGINT, std::ptr::null(), &mut current);
        current.sa_sigaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial() -> MutexGuard<'static, ()> {
        DISPOSITION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_disabled_guard_is_not_armed() {
        let guard = CriticalSection::disabled();
        assert!(!guard.is_armed());
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_ignored_while_guarded() {
        let _serial = serial();
        let before = current_sigint_handler();

        let guard = CriticalSection::enter();
        assert!(guard.is_armed());
        assert_eq!(current_sigint_handler(), libc::SIG_IGN);

        // Delivered synchronously to this thread; SIG_IGN discards it
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        drop(guard);
        assert_eq!(current_sigint_handler(), before);
        assert_eq!(active_sections(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_nested_guards_restore_once() {
        let _serial = serial();
        let before = current_sigint_handler();

        let outer = CriticalSection::enter();
        let inner = CriticalSection::enter();
        assert_eq!(active_sections(), 2);

        drop(inner);
        assert_eq!(current_sigint_handler(), libc::SIG_IGN);

        drop(outer);
        assert_eq!(current_sigint_handler(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_host_handler_runs_again_after_guard() {
        use std::sync::atomic::{AtomicBool, Ordering};

        static HOST_SAW_INTERRUPT: AtomicBool = AtomicBool::new(false);

        extern "C" fn host_handler(_signal: libc::c_int) {
            HOST_SAW_INTERRUPT.store(true, Ordering::SeqCst);
        }

        let _serial = serial();
        let original = unsafe {
            let mut host: libc::sigaction = std::mem::zeroed();
            host.sa_sigaction = host_handler as usize;
            libc::sigemptyset(&mut host.sa_mask);
            let mut original: libc::sigaction = std::mem::zeroed();
            libc::sigaction(libc::SIGINT, &host, &mut original);
            original
        };

        {
            let _guard = CriticalSection::enter();
            unsafe { libc::raise(libc::SIGINT) };
            assert!(!HOST_SAW_INTERRUPT.load(Ordering::SeqCst));
        }

        assert_eq!(current_sigint_handler(), host_handler as usize);
        unsafe { libc::raise(libc::SIGINT) };
        assert!(HOST_SAW_INTERRUPT.load(Ordering::SeqCst));

        unsafe { libc::sigaction(libc::SIGINT, &original, std::ptr::null_mut()) };
    }
}

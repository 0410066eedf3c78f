//! Detached save worker
//!
//! Jobs submitted here are fire-and-forget: the caller gets a job id, never a
//! result. Outcomes are only logged. The worker counts jobs in flight so that
//! dropping it, or [`SaveWorker::wait_idle`], lets every submitted save land.

use crate::error::{SaveError, SaveResult};
use crate::writer::SaveReport;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Default)]
struct InFlight {
    jobs: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn jobs(&self) -> MutexGuard<'_, usize> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements the in-flight count when a job ends, even by panicking
struct JobTicket(Arc<InFlight>);

impl Drop for JobTicket {
    fn drop(&mut self) {
        let mut jobs = self.0.jobs();
        *jobs -= 1;
        if *jobs == 0 {
            self.0.idle.notify_all();
        }
    }
}

pub struct SaveWorker {
    runtime: Runtime,
    in_flight: Arc<InFlight>,
}

impl SaveWorker {
    pub fn new(threads: usize) -> SaveResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads.max(1))
            .max_blocking_threads(threads.max(1))
            .thread_name("safesave-worker")
            .build()
            .map_err(|e| SaveError::Worker(format!("Failed to start save worker: {}", e)))?;
        Ok(Self {
            runtime,
            in_flight: Arc::new(InFlight::default()),
        })
    }

    /// Run `job` on the worker and discard its result
    pub fn submit_detached<F>(&self, job: F) -> Uuid
    where
        F: FnOnce() -> SaveResult<SaveReport> + Send + 'static,
    {
        let job_id = Uuid::new_v4();

        *self.in_flight.jobs() += 1;
        let ticket = JobTicket(Arc::clone(&self.in_flight));

        // The handle is dropped on purpose: there is no completion channel
        let _ = self.runtime.spawn_blocking(move || {
            let _ticket = ticket;
            match job() {
                Ok(report) => {
                    info!(%job_id, path = %report.path.display(), "Detached save finished")
                }
                Err(e) => error!(%job_id, "Detached save failed: {}", e),
            }
        });

        info!(%job_id, "Detached save submitted");
        job_id
    }

    /// Jobs submitted and not yet finished
    pub fn in_flight(&self) -> usize {
        *self.in_flight.jobs()
    }

    /// Block until every submitted job has finished
    pub fn wait_idle(&self) {
        let mut jobs = self.in_flight.jobs();
        if *jobs > 0 {
            debug!(jobs = *jobs, "Waiting for detached saves");
        }
        while *jobs > 0 {
            jobs = self
                .in_flight
                .idle
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn report() -> SaveReport {
        SaveReport {
            path: PathBuf::from("x.csv"),
            format_reference: None,
            backup: None,
            backup_skipped: false,
            opened: false,
        }
    }

    #[test]
    fn test_dropping_worker_waits_for_jobs() {
        let done = Arc::new(AtomicUsize::new(0));
        let worker = SaveWorker::new(2).unwrap();

        for _ in 0..4 {
            let done = done.clone();
            worker.submit_detached(move || {
                std::thread::sleep(Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
                Ok(report())
            });
        }
        drop(worker);

        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_wait_idle_tracks_in_flight_jobs() {
        let worker = SaveWorker::new(1).unwrap();
        let (release, gate) = std::sync::mpsc::channel::<()>();

        worker.submit_detached(move || {
            let _ = gate.recv();
            Ok(report())
        });
        assert_eq!(worker.in_flight(), 1);

        release.send(()).unwrap();
        worker.wait_idle();
        assert_eq!(worker.in_flight(), 0);
    }

    #[test]
    fn test_failed_and_panicking_jobs_are_silent() {
        let worker = SaveWorker::new(1).unwrap();
        let first = worker.submit_detached(|| Err(SaveError::NoPath));
        let second = worker.submit_detached(|| panic!("job blew up"));
        assert_ne!(first, second);

        worker.wait_idle();
        assert_eq!(worker.in_flight(), 0);
    }
}

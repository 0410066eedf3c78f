//! Save entry point: resolve the destination, then write in place or hand off to the worker

use crate::config::SaveConfig;
use crate::dataset::Dataset;
use crate::error::SaveResult;
use crate::launcher::{Launcher, SystemLauncher};
use crate::resolver::{resolve_destination, NonInteractive, Prompter};
use crate::worker::SaveWorker;
use crate::writer::{
    AtomicWriter, FileFormat, FileAccess, OpenAccess, SaveOptions, SaveReport, SaveRequest,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::warn;
use uuid::Uuid;

/// Result of [`Saver::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Synchronous save finished
    Completed(SaveReport),
    /// Handed to the detached worker; success or failure is not reported back
    Detached { job_id: Uuid, path: PathBuf },
}

/// Owns the configuration and the collaborators a save needs
pub struct Saver {
    config: Arc<SaveConfig>,
    prompter: Arc<dyn Prompter>,
    launcher: Arc<dyn Launcher>,
    access: Arc<dyn FileAccess>,
    worker: OnceLock<SaveWorker>,
}

impl Default for Saver {
    fn default() -> Self {
        Self::from_parts(SaveConfig::default())
    }
}

impl Saver {
    pub fn new(config: SaveConfig) -> SaveResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: SaveConfig) -> Self {
        Self {
            config: Arc::new(config),
            prompter: Arc::new(NonInteractive),
            launcher: Arc::new(SystemLauncher),
            access: Arc::new(OpenAccess),
            worker: OnceLock::new(),
        }
    }

    /// Process-wide saver with default configuration.
    ///
    /// Statics are never dropped, so detached saves submitted through it are
    /// drained by an exit hook instead.
    pub fn global() -> &'static Saver {
        GLOBAL.get_or_init(|| {
            register_exit_drain();
            Saver::default()
        })
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Arc::new(prompter);
        self
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Arc::new(launcher);
        self
    }

    pub fn with_access(mut self, access: impl FileAccess + 'static) -> Self {
        self.access = Arc::new(access);
        self
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    /// Save `dataset` to `path`, or to the destination the resolver picks
    pub fn save(
        &self,
        dataset: &Dataset,
        path: Option<&Path>,
        options: &SaveOptions,
    ) -> SaveResult<SaveOutcome> {
        let resolved = resolve_destination(path, dataset, self.prompter.as_ref())?;
        // Caller errors surface here even when the write itself is detached
        FileFormat::from_path(&resolved)?;

        let request = SaveRequest {
            path: resolved,
            options: *options,
        };

        if options.async_mode {
            return self.save_detached(dataset.clone(), request);
        }

        let writer = AtomicWriter::new(&self.config, self.access.as_ref(), self.launcher.as_ref());
        Ok(SaveOutcome::Completed(writer.write(dataset, &request)?))
    }

    fn save_detached(&self, dataset: Dataset, request: SaveRequest) -> SaveResult<SaveOutcome> {
        let config = Arc::clone(&self.config);
        let access = Arc::clone(&self.access);
        let launcher = Arc::clone(&self.launcher);
        let path = request.path.clone();

        let job_id = self.worker()?.submit_detached(move || {
            AtomicWriter::new(&config, access.as_ref(), launcher.as_ref()).write(&dataset, &request)
        });

        Ok(SaveOutcome::Detached { job_id, path })
    }

    /// Block until every detached save submitted through this saver has finished
    pub fn drain(&self) {
        if let Some(worker) = self.worker.get() {
            worker.wait_idle();
        }
    }

    fn worker(&self) -> SaveResult<&SaveWorker> {
        if let Some(worker) = self.worker.get() {
            return Ok(worker);
        }
        let started = SaveWorker::new(self.config.worker_threads)?;
        Ok(self.worker.get_or_init(move || started))
    }
}

static GLOBAL: OnceLock<Saver> = OnceLock::new();

extern "C" fn drain_global_saver() {
    if let Some(saver) = GLOBAL.get() {
        saver.drain();
    }
}

/// Run [`drain_global_saver`] when the process exits normally
fn register_exit_drain() {
    // SAFETY: the hook only waits on the worker's idle condition and never unwinds
    if unsafe { libc::atexit(drain_global_saver) } != 0 {
        warn!("Could not register exit hook; detached saves may be cut short at exit");
    }
}

impl Dataset {
    /// Save with the process-wide [`Saver`] (non-interactive, default config)
    pub fn save(&self, path: Option<&Path>, options: &SaveOptions) -> SaveResult<SaveOutcome> {
        Saver::global().save(self, path, options)
    }
}

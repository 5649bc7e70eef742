pub mod generation;
pub mod orchestrator;
pub mod state;
pub mod stream;
pub mod transform;

pub use generation::{GenerationDescriptor, GenerationMigrator};
pub use orchestrator::{MigrationOrchestrator, DEFAULT_BATCH_SIZE};
pub use state::{ActionKind, DocumentAction, MigrationState};
pub use stream::{MigrationListener, ProgressStream};
pub use transform::{TransformFn, TransformRegistry, TransformRegistryBuilder};

use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use std::sync::atomic::{AtomicU8, Ordering};

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// Single-shot guard for `migrate()`.
///
/// The state moves `NotStarted -> Running -> Done` and never back. `begin()`
/// is a single compare-exchange executed synchronously before any storage
/// access, so a second invocation fails without side effects even when the
/// first is still in flight.
pub(crate) struct RunState {
    state: AtomicU8,
}

impl RunState {
    pub(crate) fn new() -> Self {
        RunState {
            state: AtomicU8::new(NOT_STARTED),
        }
    }

    /// Claims the single run, failing with [ErrorKind::AlreadyRunning] on any
    /// later attempt.
    pub(crate) fn begin(&self, who: &str) -> DocliftResult<()> {
        self.state
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| {
                log::error!("{} migration invoked more than once", who);
                DocliftError::new(
                    &format!("{} migration has already been started", who),
                    ErrorKind::AlreadyRunning,
                )
            })
    }

    /// Marks the run finished.
    pub(crate) fn finish(&self) {
        self.state.store(DONE, Ordering::SeqCst);
    }
}

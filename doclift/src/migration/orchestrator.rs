use crate::codec::{FieldCodec, PlainCodec};
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use crate::migration::generation::{GenerationDescriptor, GenerationMigrator};
use crate::migration::state::MigrationState;
use crate::migration::stream::ProgressStream;
use crate::migration::transform::TransformRegistry;
use crate::migration::RunState;
use crate::schema::Schema;
use crate::store::{GenerationCatalog, Storage};
use itertools::Itertools;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Default number of documents fetched and processed per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Top-level entry point driving a collection's migration to its newest
/// schema.
///
/// # Purpose
/// Bound to one newest collection, the orchestrator discovers every older
/// schema generation that still has a live storage backing, computes the
/// aggregate document count, and drains the generations strictly sequentially,
/// oldest first, folding each per-document outcome into a single
/// [MigrationState] stream.
///
/// # Characteristics
/// - **Single-Shot**: `migrate()` succeeds at most once per instance
/// - **Sequential**: Generation *i + 1* starts only after generation *i*'s
///   stream has closed; only the initial counting step fans out across
///   generations
/// - **Cold**: No document is touched before the returned stream is consumed
///
/// # Examples
///
/// ```rust,ignore
/// let orchestrator = MigrationOrchestrator::new(
///     "users", newest_schema, newest_storage, transforms, catalog,
/// )?;
/// let final_state = orchestrator.migrate_and_wait(DEFAULT_BATCH_SIZE)?;
/// assert!(final_state.done());
/// ```
#[derive(Clone)]
pub struct MigrationOrchestrator {
    inner: Arc<MigrationOrchestratorInner>,
}

struct MigrationOrchestratorInner {
    collection: String,
    newest_schema: Schema,
    newest_storage: Storage,
    transforms: TransformRegistry,
    catalog: GenerationCatalog,
    codec_factory: Arc<dyn Fn() -> FieldCodec + Send + Sync>,
    run_state: RunState,
    waited: Mutex<Option<DocliftResult<MigrationState>>>,
}

impl MigrationOrchestrator {
    /// Creates an orchestrator for a collection, decoding old-generation
    /// documents with the identity codec.
    ///
    /// # Errors
    /// Fails with [ErrorKind::RegistryError] when the transform registry does
    /// not target the newest schema's version.
    pub fn new(
        collection: &str,
        newest_schema: Schema,
        newest_storage: Storage,
        transforms: TransformRegistry,
        catalog: GenerationCatalog,
    ) -> DocliftResult<Self> {
        Self::with_codec_factory(
            collection,
            newest_schema,
            newest_storage,
            transforms,
            catalog,
            || FieldCodec::new(PlainCodec),
        )
    }

    /// Creates an orchestrator whose per-generation codecs are built lazily by
    /// `codec_factory`.
    pub fn with_codec_factory(
        collection: &str,
        newest_schema: Schema,
        newest_storage: Storage,
        transforms: TransformRegistry,
        catalog: GenerationCatalog,
        codec_factory: impl Fn() -> FieldCodec + Send + Sync + 'static,
    ) -> DocliftResult<Self> {
        if transforms.newest_version() != newest_schema.version() {
            return Err(DocliftError::new(
                &format!(
                    "transform registry targets version {} but the newest schema is version {}",
                    transforms.newest_version(),
                    newest_schema.version()
                ),
                ErrorKind::RegistryError,
            ));
        }

        Ok(MigrationOrchestrator {
            inner: Arc::new(MigrationOrchestratorInner {
                collection: collection.to_string(),
                newest_schema,
                newest_storage,
                transforms,
                catalog,
                codec_factory: Arc::new(codec_factory),
                run_state: RunState::new(),
                waited: Mutex::new(None),
            }),
        })
    }

    /// Starts the collection's migration.
    ///
    /// The returned stream is cold: generations are discovered and drained
    /// only once the stream is consumed. The first emission carries the
    /// aggregate `total` with all counters at zero; one emission follows every
    /// per-document outcome; the terminal emission has `done` set and
    /// `percent` at exactly 100. On a fatal error the stream stops without the
    /// terminal emission and remaining generations are never started.
    ///
    /// # Errors
    /// Fails synchronously with [ErrorKind::AlreadyRunning] on a second
    /// invocation, before any storage access.
    pub fn migrate(&self, batch_size: usize) -> DocliftResult<ProgressStream<MigrationState>> {
        self.inner.run_state.begin("orchestrator")?;

        let inner = self.inner.clone();
        Ok(ProgressStream::new(move |sink| {
            let outcome = inner.run(batch_size, sink);
            inner.run_state.finish();
            outcome
        }))
    }

    /// Drives the migration to completion and returns the final state.
    ///
    /// Memoized: repeated calls return the first invocation's outcome instead
    /// of re-running.
    pub fn migrate_and_wait(&self, batch_size: usize) -> DocliftResult<MigrationState> {
        let mut memo = self.inner.waited.lock();
        if let Some(outcome) = memo.as_ref() {
            return outcome.clone();
        }

        let outcome = self
            .migrate(batch_size)
            .and_then(|stream| stream.last())
            .and_then(|last| {
                last.ok_or_else(|| {
                    DocliftError::new(
                        "migration stream closed without emitting a state",
                        ErrorKind::InternalError,
                    )
                })
            });
        *memo = Some(outcome.clone());
        outcome
    }
}

impl Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("collection", &self.inner.collection)
            .field("newest_version", &self.inner.newest_schema.version())
            .finish()
    }
}

impl MigrationOrchestratorInner {
    fn run(
        &self,
        batch_size: usize,
        sink: &mut dyn FnMut(MigrationState),
    ) -> DocliftResult<()> {
        let migrators = self.discover_generations()?;
        log::info!(
            "Migrating '{}' to v{}: {} live generation(s)",
            self.collection,
            self.newest_schema.version(),
            migrators.len()
        );

        // total must be known before any outcome is reported
        let total = self.total_count(&migrators)?;
        let mut state = MigrationState::new(total);
        sink(state.clone());

        for migrator in migrators {
            migrator.migrate(batch_size)?.for_each(|action| {
                state.record(action.kind());
                sink(state.clone());
            })?;
        }

        state.finish();
        sink(state.clone());
        log::info!(
            "Migration of '{}' complete: {} migrated, {} dropped",
            self.collection,
            state.success(),
            state.deleted()
        );
        Ok(())
    }

    /// Builds one migrator per live old generation, ascending version order.
    ///
    /// Versions are sorted explicitly rather than trusting the schema's
    /// ordering; catalog lookups that miss are silently dropped.
    ///
    /// # Errors
    /// A live generation older than the transform registry's oldest supported
    /// version has no transform chain to the newest schema; it is reported as
    /// [ErrorKind::RegistryError] here instead of surfacing mid-run.
    fn discover_generations(&self) -> DocliftResult<Vec<GenerationMigrator>> {
        let mut migrators = Vec::new();
        for version in self.newest_schema.previous_versions().into_iter().sorted() {
            let entry = match self.catalog.lookup_generation(&self.collection, version) {
                Some(entry) => entry,
                None => continue,
            };

            if entry.schema.version() < self.transforms.oldest_version() {
                return Err(DocliftError::new(
                    &format!(
                        "generation v{} of '{}' predates the transform registry's oldest supported version {}",
                        entry.schema.version(),
                        self.collection,
                        self.transforms.oldest_version()
                    ),
                    ErrorKind::RegistryError,
                ));
            }

            let factory = self.codec_factory.clone();
            migrators.push(GenerationMigrator::with_codec_factory(
                &self.collection,
                GenerationDescriptor::new(entry.schema, entry.storage),
                self.newest_schema.clone(),
                self.newest_storage.clone(),
                self.transforms.clone(),
                self.catalog.clone(),
                move || factory(),
            ));
        }
        Ok(migrators)
    }

    /// Sums the undeleted-document counts across all generations, fetched
    /// concurrently. This is the only step that fans out across generations.
    fn total_count(&self, migrators: &[GenerationMigrator]) -> DocliftResult<u64> {
        std::thread::scope(|scope| {
            let handles = migrators
                .iter()
                .map(|migrator| scope.spawn(move || migrator.count_undeleted()))
                .collect_vec();

            let mut total: u64 = 0;
            for handle in handles {
                match handle.join() {
                    Ok(count) => total += count?,
                    Err(_) => {
                        return Err(DocliftError::new(
                            "generation count worker panicked",
                            ErrorKind::InternalError,
                        ))
                    }
                }
            }
            Ok(total)
        })
    }
}

use crate::codec::{FieldCodec, PlainCodec};
use crate::common::DOC_REVISION;
use crate::document::Document;
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use crate::migration::state::DocumentAction;
use crate::migration::stream::ProgressStream;
use crate::migration::transform::TransformRegistry;
use crate::migration::RunState;
use crate::schema::Schema;
use crate::store::{GenerationCatalog, Storage};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::{mpsc, Arc};

/// Identifies one old schema generation and the storage handle backing it.
///
/// Immutable once constructed; the version is taken from the schema.
#[derive(Clone)]
pub struct GenerationDescriptor {
    schema: Schema,
    storage: Storage,
}

impl GenerationDescriptor {
    /// Creates a descriptor for a generation.
    pub fn new(schema: Schema, storage: Storage) -> Self {
        GenerationDescriptor { schema, storage }
    }

    /// Returns the generation's schema version.
    pub fn version(&self) -> u32 {
        self.schema.version()
    }

    /// Returns the generation's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the storage handle backing this generation.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl Debug for GenerationDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationDescriptor")
            .field("version", &self.version())
            .field("storage", &self.storage.name())
            .finish()
    }
}

/// Drains one old schema generation into the newest collection.
///
/// # Purpose
/// A `GenerationMigrator` owns a single generation's storage handle. It
/// fetches undeleted documents in fixed-size batches, decodes each document
/// out of its storage representation, runs it through the transform chain up
/// to the newest schema version, validates and writes the result into the
/// newest collection, removes the original, and reports one
/// [DocumentAction] per document. Once its store is drained it destroys the
/// generation's storage and removes its registry entry.
///
/// # Characteristics
/// - **Single-Shot**: `migrate()` succeeds at most once per instance
/// - **Batched**: No two batches are in flight at once; documents within one
///   batch are processed concurrently
/// - **Cold**: No document is touched before the returned stream is consumed
///
/// # Examples
///
/// ```rust,ignore
/// let migrator = GenerationMigrator::new(
///     "users", descriptor, newest_schema, newest_storage, transforms, catalog,
/// );
/// migrator.migrate(10)?.for_each(|action| {
///     println!("{:?}", action.kind());
/// })?;
/// ```
#[derive(Clone)]
pub struct GenerationMigrator {
    inner: Arc<GenerationMigratorInner>,
}

struct GenerationMigratorInner {
    collection: String,
    descriptor: GenerationDescriptor,
    newest_schema: Schema,
    newest_storage: Storage,
    transforms: TransformRegistry,
    catalog: GenerationCatalog,
    codec_factory: Box<dyn Fn() -> FieldCodec + Send + Sync>,
    codec: OnceCell<FieldCodec>,
    run_state: RunState,
    waited: Mutex<Option<DocliftResult<()>>>,
}

impl GenerationMigrator {
    /// Creates a migrator for one generation, decoding documents with the
    /// identity codec.
    pub fn new(
        collection: &str,
        descriptor: GenerationDescriptor,
        newest_schema: Schema,
        newest_storage: Storage,
        transforms: TransformRegistry,
        catalog: GenerationCatalog,
    ) -> Self {
        Self::with_codec_factory(
            collection,
            descriptor,
            newest_schema,
            newest_storage,
            transforms,
            catalog,
            || FieldCodec::new(PlainCodec),
        )
    }

    /// Creates a migrator whose codec is built lazily by `codec_factory` on
    /// first use and cached for the migrator's lifetime.
    pub fn with_codec_factory(
        collection: &str,
        descriptor: GenerationDescriptor,
        newest_schema: Schema,
        newest_storage: Storage,
        transforms: TransformRegistry,
        catalog: GenerationCatalog,
        codec_factory: impl Fn() -> FieldCodec + Send + Sync + 'static,
    ) -> Self {
        GenerationMigrator {
            inner: Arc::new(GenerationMigratorInner {
                collection: collection.to_string(),
                descriptor,
                newest_schema,
                newest_storage,
                transforms,
                catalog,
                codec_factory: Box::new(codec_factory),
                codec: OnceCell::new(),
                run_state: RunState::new(),
                waited: Mutex::new(None),
            }),
        }
    }

    /// Returns the version of the generation this migrator drains.
    pub fn version(&self) -> u32 {
        self.inner.descriptor.version()
    }

    /// Counts this generation's undeleted documents.
    ///
    /// # Errors
    /// A backend failure is reported as [ErrorKind::CountFailure]; without a
    /// trustworthy count the overall run's total cannot be computed.
    pub fn count_undeleted(&self) -> DocliftResult<u64> {
        self.inner.descriptor.storage().count_undeleted().map_err(|cause| {
            log::error!(
                "Could not count documents of generation v{} of '{}'",
                self.version(),
                self.inner.collection
            );
            DocliftError::new_with_cause(
                &format!(
                    "could not count documents of generation v{} of '{}'",
                    self.version(),
                    self.inner.collection
                ),
                ErrorKind::CountFailure,
                cause,
            )
        })
    }

    /// Starts this generation's migration.
    ///
    /// The returned stream is cold: batches are fetched and documents migrated
    /// only once the stream is consumed. One [DocumentAction] is emitted per
    /// processed document, in completion order. After the last batch the
    /// generation's storage is destroyed and its registry entry removed, then
    /// the stream closes.
    ///
    /// # Errors
    /// Fails synchronously with [ErrorKind::AlreadyRunning] on a second
    /// invocation, before any storage access.
    pub fn migrate(&self, batch_size: usize) -> DocliftResult<ProgressStream<DocumentAction>> {
        self.inner
            .run_state
            .begin(&format!("generation v{}", self.version()))?;

        let inner = self.inner.clone();
        Ok(ProgressStream::new(move |sink| {
            let outcome = inner.drain(batch_size, sink);
            inner.run_state.finish();
            if let Err(e) = &outcome {
                log::error!(
                    "Migration of generation v{} of '{}' failed: {}",
                    inner.descriptor.version(),
                    inner.collection,
                    e
                );
            }
            outcome
        }))
    }

    /// Drives this generation's migration to completion, discarding the
    /// per-document actions.
    ///
    /// Memoized: repeated calls return the first invocation's outcome instead
    /// of re-running.
    pub fn migrate_and_wait(&self, batch_size: usize) -> DocliftResult<()> {
        let mut memo = self.inner.waited.lock();
        if let Some(outcome) = memo.as_ref() {
            return outcome.clone();
        }
        let outcome = self.migrate(batch_size).and_then(|stream| stream.wait());
        *memo = Some(outcome.clone());
        outcome
    }

    /// Destroys this generation's storage and removes its registry entry.
    ///
    /// Invoked by the batch loop as the last act of a drained migration;
    /// exposed for callers that discard a generation without migrating it.
    pub fn delete(&self) -> DocliftResult<()> {
        self.inner.delete()
    }
}

impl Debug for GenerationMigrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationMigrator")
            .field("collection", &self.inner.collection)
            .field("version", &self.version())
            .finish()
    }
}

impl GenerationMigratorInner {
    fn codec(&self) -> &FieldCodec {
        self.codec.get_or_init(|| (self.codec_factory)())
    }

    /// Batch loop: fetch, fan out, repeat until the store is drained, then
    /// delete the generation.
    fn drain(
        &self,
        batch_size: usize,
        sink: &mut dyn FnMut(DocumentAction),
    ) -> DocliftResult<()> {
        // Identifiers of documents already handled in this run. Old-store
        // removal is best-effort, so a document whose remove failed would be
        // refetched forever without this. A fetched document without an
        // identifier cannot be tracked and would spin the loop the same way,
        // so it is a fatal backend error.
        let mut handled: HashSet<String> = HashSet::new();

        loop {
            let fetched = self
                .descriptor
                .storage()
                .fetch_batch(batch_size + handled.len())?;

            let mut batch: Vec<Document> = Vec::new();
            for doc in fetched {
                let id = doc.id().ok_or_else(|| {
                    log::error!(
                        "Generation v{} of '{}' returned a document without an identifier",
                        self.descriptor.version(),
                        self.collection
                    );
                    DocliftError::new(
                        &format!(
                            "generation v{} of '{}' returned a document without an identifier",
                            self.descriptor.version(),
                            self.collection
                        ),
                        ErrorKind::BackendError,
                    )
                })?;
                if handled.contains(&id) || batch.len() == batch_size {
                    continue;
                }
                handled.insert(id);
                batch.push(doc);
            }

            if batch.is_empty() {
                log::debug!(
                    "Generation v{} of '{}' drained, deleting",
                    self.descriptor.version(),
                    self.collection
                );
                return self.delete();
            }

            self.migrate_batch(batch, sink)?;
        }
    }

    /// Processes one batch concurrently, emitting each action as its document
    /// completes.
    ///
    /// On the first fatal error, emission stops and the error becomes the
    /// batch's outcome; in-flight documents finish naturally and nothing is
    /// rolled back.
    fn migrate_batch(
        &self,
        batch: Vec<Document>,
        sink: &mut dyn FnMut(DocumentAction),
    ) -> DocliftResult<()> {
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|scope| {
            for doc in batch {
                let tx = tx.clone();
                scope.spawn(move || {
                    // receiver outlives all senders, send cannot fail
                    let _ = tx.send(self.migrate_one(doc));
                });
            }
            drop(tx);

            let mut first_error: Option<DocliftError> = None;
            for outcome in rx {
                match outcome {
                    Ok(action) if first_error.is_none() => sink(action),
                    Ok(_) => {}
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    /// Migrates a single stored document through decode, transform chain,
    /// validation and insert, then best-effort removes the original.
    fn migrate_one(&self, stored: Document) -> DocliftResult<DocumentAction> {
        let original = stored.clone();
        let decoded = self.decode(stored)?;
        let migrated = self.run_transform_chain(decoded)?;

        let action = match migrated {
            None => DocumentAction::deleted(original.clone()),
            Some(migrated) => {
                self.validate_final(&migrated)?;
                self.write_newest(&migrated)?;
                DocumentAction::success(original.clone(), migrated)
            }
        };

        // best-effort: old-store cleanup must never fail the migration
        if let Err(e) = self.descriptor.storage().remove(&original) {
            log::warn!(
                "Could not remove document '{}' from generation v{} of '{}': {}",
                original.id().unwrap_or_default(),
                self.descriptor.version(),
                self.collection,
                e
            );
        }

        Ok(action)
    }

    /// Reverses the storage representation: identifier mapping, field-name
    /// decompression, field decryption.
    fn decode(&self, stored: Document) -> DocliftResult<Document> {
        let doc = self.descriptor.schema().map_storage_id_to_primary_key(stored)?;
        let doc = self.codec().decompress_field_names(doc)?;
        self.codec().decrypt_fields(doc)
    }

    /// Applies every transform step from this generation's version up to the
    /// newest version. A step dropping the document stops the chain; later
    /// steps are never invoked.
    fn run_transform_chain(&self, decoded: Document) -> DocliftResult<Option<Document>> {
        let mut current = decoded;
        for target in (self.descriptor.version() + 1)..=self.newest_schema.version() {
            match self.transforms.apply_step(target, &current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn validate_final(&self, migrated: &Document) -> DocliftResult<()> {
        self.newest_schema.validate(migrated).map_err(|cause| {
            DocliftError::new_with_cause(
                &format!(
                    "document migrated from v{} to v{} failed final validation: {}",
                    self.descriptor.version(),
                    self.newest_schema.version(),
                    migrated
                ),
                ErrorKind::ValidationError,
                cause,
            )
        })
    }

    /// Strips the revision marker and inserts into the newest collection as a
    /// fresh document.
    fn write_newest(&self, migrated: &Document) -> DocliftResult<()> {
        let insert = migrated.without(DOC_REVISION);
        self.newest_storage.put(insert, true).map_err(|cause| {
            DocliftError::new_with_cause(
                &format!(
                    "could not write migrated document into newest collection '{}'",
                    self.collection
                ),
                ErrorKind::WriteFailure,
                cause,
            )
        })
    }

    fn delete(&self) -> DocliftResult<()> {
        self.descriptor.storage().destroy()?;
        self.catalog
            .remove_generation_entry(&self.collection, self.descriptor.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NameTableCodec;
    use crate::common::Value;
    use crate::doc;
    use crate::migration::state::ActionKind;
    use crate::migration::transform::TransformRegistryBuilder;
    use crate::store::InMemoryStorage;
    use crate::test_util::{identity, FailingRemoveStorage, IdStrippingStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn old_storage(docs: &[Document]) -> Storage {
        let storage = InMemoryStorage::create("users-1");
        for doc in docs {
            storage.put(doc.clone(), false).unwrap();
        }
        storage
    }

    fn newest_storage() -> Storage {
        InMemoryStorage::create_with_id_field("users", "key")
    }

    fn registry() -> TransformRegistry {
        TransformRegistryBuilder::new()
            .register(2, identity)
            .build(1, 2)
            .unwrap()
    }

    fn migrator(old: Storage, newest: Storage, transforms: TransformRegistry) -> GenerationMigrator {
        let old_schema = Schema::new(1, "key", &[]).unwrap();
        let newest_schema = Schema::new(2, "key", &["name"]).unwrap();
        let catalog = GenerationCatalog::new();
        catalog.register("users", old_schema.clone(), old.clone()).unwrap();

        GenerationMigrator::new(
            "users",
            GenerationDescriptor::new(old_schema, old),
            newest_schema,
            newest,
            transforms,
            catalog,
        )
    }

    // ==================== Happy Path ====================

    #[test]
    fn test_migrate_drains_generation_into_newest() {
        let old = old_storage(&[
            doc! { "_id" => "a", "name" => "Alice" },
            doc! { "_id" => "b", "name" => "Bob" },
        ]);
        let newest = newest_storage();
        let migrator = migrator(old.clone(), newest.clone(), registry());
        let catalog = migrator.inner.catalog.clone();

        let actions = migrator.migrate(10).unwrap().drain().unwrap();

        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.kind() == &ActionKind::Success));
        assert_eq!(newest.count_undeleted().unwrap(), 2);
        assert!(old.is_destroyed());
        assert!(!catalog.has_entry("users", 1));
    }

    #[test]
    fn test_migrated_document_is_keyed_by_primary_key() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let newest = newest_storage();
        migrator(old, newest.clone(), registry())
            .migrate(10)
            .unwrap()
            .wait()
            .unwrap();

        let written = &newest.fetch_batch(1).unwrap()[0];
        assert_eq!(written.get("key"), Some(Value::String("a".to_string())));
        assert!(!written.contains_key("_id"));
    }

    #[test]
    fn test_revision_marker_is_stripped_before_insert() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice", "_rev" => "3-abc" }]);
        let newest = newest_storage();
        migrator(old, newest.clone(), registry())
            .migrate(10)
            .unwrap()
            .wait()
            .unwrap();

        assert!(!newest.fetch_batch(1).unwrap()[0].contains_key("_rev"));
    }

    #[test]
    fn test_batches_smaller_than_store_drain_fully() {
        let docs: Vec<Document> = (0..7)
            .map(|i| doc! { "_id" => format!("doc-{}", i), "name" => format!("n{}", i) })
            .collect();
        let old = old_storage(&docs);
        let newest = newest_storage();

        let actions = migrator(old.clone(), newest.clone(), registry())
            .migrate(2)
            .unwrap()
            .drain()
            .unwrap();

        assert_eq!(actions.len(), 7);
        assert_eq!(newest.count_undeleted().unwrap(), 7);
        assert!(old.is_destroyed());
    }

    // ==================== Dropped Documents ====================

    #[test]
    fn test_null_transform_classifies_deleted() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let newest = newest_storage();
        let transforms = TransformRegistryBuilder::new()
            .register(2, |_| Ok(None))
            .build(1, 2)
            .unwrap();

        let actions = migrator(old.clone(), newest.clone(), transforms)
            .migrate(10)
            .unwrap()
            .drain()
            .unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind(), &ActionKind::Deleted);
        assert!(actions[0].migrated().is_none());
        assert_eq!(newest.count_undeleted().unwrap(), 0);
        assert!(old.is_destroyed());
    }

    #[test]
    fn test_dropped_document_skips_later_steps() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let newest = newest_storage();
        // canary: failing if ever invoked
        let transforms = TransformRegistryBuilder::new()
            .register(2, |_| Ok(None))
            .register(3, |_| {
                Err(DocliftError::new(
                    "step 3 must not run for a dropped document",
                    ErrorKind::InternalError,
                ))
            })
            .build(1, 3)
            .unwrap();

        let old_schema = Schema::new(1, "key", &[]).unwrap();
        let newest_schema = Schema::new(3, "key", &[]).unwrap();
        let migrator = GenerationMigrator::new(
            "users",
            GenerationDescriptor::new(old_schema, old),
            newest_schema,
            newest,
            transforms,
            GenerationCatalog::new(),
        );

        let actions = migrator.migrate(10).unwrap().drain().unwrap();
        assert_eq!(actions[0].kind(), &ActionKind::Deleted);
    }

    // ==================== Fatal Errors ====================

    #[test]
    fn test_validation_failure_aborts_without_rollback() {
        // batch_size 1: "a" migrates in the first batch, "b" fails in the next
        let old = old_storage(&[
            doc! { "_id" => "a", "name" => "Alice" },
            doc! { "_id" => "b" },
        ]);
        let newest = newest_storage();

        let err = migrator(old.clone(), newest.clone(), registry())
            .migrate(1)
            .unwrap()
            .wait()
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(err.message().contains("v1"));
        assert!(err.message().contains("v2"));
        assert_eq!(newest.count_undeleted().unwrap(), 1);
        assert!(!old.is_destroyed());
    }

    #[test]
    fn test_same_batch_completed_writes_survive_abort() {
        // one batch of three, "b" fails final validation while its batch
        // mates run concurrently
        let old = old_storage(&[
            doc! { "_id" => "a", "name" => "Alice" },
            doc! { "_id" => "b" },
            doc! { "_id" => "c", "name" => "Carol" },
        ]);
        let newest = newest_storage();

        let err = migrator(old.clone(), newest.clone(), registry())
            .migrate(3)
            .unwrap()
            .wait()
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        // in-flight batch mates finish and their writes are not rolled back
        assert_eq!(newest.count_undeleted().unwrap(), 2);
        assert!(!old.is_destroyed());
    }

    #[test]
    fn test_fetched_document_without_identifier_is_fatal() {
        let inner = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let old = IdStrippingStorage::wrap(inner);
        let newest = newest_storage();

        let err = migrator(old.clone(), newest.clone(), registry())
            .migrate(10)
            .unwrap()
            .wait()
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::BackendError);
        assert!(err.message().contains("identifier"));
        // the loop stops before migrating anything
        assert_eq!(newest.count_undeleted().unwrap(), 0);
        assert!(!old.is_destroyed());
    }

    #[test]
    fn test_transform_failure_aborts_stream() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let transforms = TransformRegistryBuilder::new()
            .register(2, |_| Err(DocliftError::new("boom", ErrorKind::InvalidOperation)))
            .build(1, 2)
            .unwrap();

        let err = migrator(old.clone(), newest_storage(), transforms)
            .migrate(10)
            .unwrap()
            .wait()
            .unwrap_err();

        assert_eq!(err.kind(), &ErrorKind::TransformFailure);
        assert!(!old.is_destroyed());
    }

    // ==================== Single-Shot Guard ====================

    #[test]
    fn test_migrate_twice_fails_immediately() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let migrator = migrator(old, newest_storage(), registry());

        let first = migrator.migrate(10).unwrap();
        let second = migrator.migrate(10);
        assert_eq!(second.unwrap_err().kind(), &ErrorKind::AlreadyRunning);

        // the claimed stream still runs
        first.wait().unwrap();
    }

    #[test]
    fn test_migrate_and_wait_is_memoized() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let migrator = migrator(old.clone(), newest_storage(), registry());

        migrator.migrate_and_wait(10).unwrap();
        assert!(old.is_destroyed());
        // a re-run would hit the destroyed store; memoization returns Ok
        migrator.migrate_and_wait(10).unwrap();
    }

    // ==================== Best-Effort Cleanup ====================

    #[test]
    fn test_failing_remove_does_not_fail_migration() {
        let inner = old_storage(&[
            doc! { "_id" => "a", "name" => "Alice" },
            doc! { "_id" => "b", "name" => "Bob" },
        ]);
        let old = FailingRemoveStorage::wrap(inner);
        let newest = newest_storage();

        let actions = migrator(old.clone(), newest.clone(), registry())
            .migrate(1)
            .unwrap()
            .drain()
            .unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(newest.count_undeleted().unwrap(), 2);
        assert!(old.is_destroyed());
    }

    // ==================== Decode and Codec ====================

    #[test]
    fn test_decode_expands_compressed_field_names() {
        let old = old_storage(&[doc! { "_id" => "a", "n" => "Alice" }]);
        let newest = newest_storage();
        let old_schema = Schema::new(1, "key", &[]).unwrap();
        let newest_schema = Schema::new(2, "key", &["name"]).unwrap();

        let migrator = GenerationMigrator::with_codec_factory(
            "users",
            GenerationDescriptor::new(old_schema, old),
            newest_schema,
            newest.clone(),
            registry(),
            GenerationCatalog::new(),
            || FieldCodec::new(NameTableCodec::new(&[("n", "name")])),
        );

        migrator.migrate(10).unwrap().wait().unwrap();
        let written = &newest.fetch_batch(1).unwrap()[0];
        assert_eq!(written.get("name"), Some(Value::String("Alice".to_string())));
        assert!(!written.contains_key("n"));
    }

    #[test]
    fn test_codec_factory_runs_once() {
        let old = old_storage(&[
            doc! { "_id" => "a", "name" => "Alice" },
            doc! { "_id" => "b", "name" => "Bob" },
        ]);
        let calls = Arc::new(AtomicUsize::new(0));
        let factory_calls = calls.clone();

        let old_schema = Schema::new(1, "key", &[]).unwrap();
        let newest_schema = Schema::new(2, "key", &[]).unwrap();
        let migrator = GenerationMigrator::with_codec_factory(
            "users",
            GenerationDescriptor::new(old_schema, old),
            newest_schema,
            newest_storage(),
            registry(),
            GenerationCatalog::new(),
            move || {
                factory_calls.fetch_add(1, Ordering::SeqCst);
                FieldCodec::new(PlainCodec)
            },
        );

        migrator.migrate(10).unwrap().wait().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ==================== Count ====================

    #[test]
    fn test_count_undeleted_delegates_to_storage() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        assert_eq!(migrator(old, newest_storage(), registry()).count_undeleted().unwrap(), 1);
    }

    #[test]
    fn test_count_failure_is_reported_as_count_failure() {
        let old = old_storage(&[doc! { "_id" => "a", "name" => "Alice" }]);
        let migrator = migrator(old.clone(), newest_storage(), registry());
        old.destroy().unwrap();

        let err = migrator.count_undeleted().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CountFailure);
        assert!(err.cause().is_some());
    }
}

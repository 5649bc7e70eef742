pub mod catalog;
pub mod memory;

pub use catalog::{GenerationCatalog, GenerationEntry};
pub use memory::InMemoryStorage;

use crate::document::Document;
use crate::errors::DocliftResult;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Low-level interface for per-generation document storage backends.
///
/// # Purpose
/// Defines the contract every storage backend must implement so a generation
/// migrator can drain it: counting and fetching undeleted documents, inserting
/// migrated documents into the newest collection, removing drained originals,
/// and destroying the backing once the generation is empty.
///
/// # Key Methods
/// - **Reads**: `count_undeleted()`, `fetch_batch(n)` (undeleted only)
/// - **Writes**: `put()` (conflict behavior selected by the caller),
///   `remove()` (errors when the document is absent - callers that treat
///   cleanup as best-effort must swallow it)
/// - **Lifecycle**: `destroy()`, `is_destroyed()`
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; the newest collection's storage is
/// written by concurrently-processed batch documents.
pub trait StorageProvider: Send + Sync {
    /// Returns the name of this storage handle.
    fn name(&self) -> String;

    /// Counts the documents not carrying the soft-delete marker.
    fn count_undeleted(&self) -> DocliftResult<u64>;

    /// Fetches up to `batch_size` undeleted documents.
    ///
    /// The iteration order is whatever the backend provides; callers must not
    /// rely on it.
    fn fetch_batch(&self, batch_size: usize) -> DocliftResult<Vec<Document>>;

    /// Inserts a document.
    ///
    /// With `allow_conflict` set, an existing document under the same
    /// identifier is overwritten; otherwise the insert fails with
    /// [crate::errors::ErrorKind::WriteFailure].
    fn put(&self, doc: Document, allow_conflict: bool) -> DocliftResult<()>;

    /// Removes a document by its identifier.
    ///
    /// # Errors
    /// Fails if the document carries no identifier or is not present.
    fn remove(&self, doc: &Document) -> DocliftResult<()>;

    /// Destroys the storage backing. All subsequent operations fail with
    /// [crate::errors::ErrorKind::StoreDestroyed].
    fn destroy(&self) -> DocliftResult<()>;

    /// Checks whether the storage has been destroyed.
    fn is_destroyed(&self) -> bool;
}

/// Cloneable handle to a storage backend.
///
/// Wraps any [StorageProvider] behind an `Arc` for polymorphic dispatch and
/// cheap sharing between the catalog, migrators and tests.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn StorageProvider>,
}

impl Storage {
    /// Creates a new storage handle from a provider implementation.
    pub fn new<T: StorageProvider + 'static>(inner: T) -> Self {
        Storage { inner: Arc::new(inner) }
    }

    /// Returns the name of this storage handle.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Counts the documents not carrying the soft-delete marker.
    pub fn count_undeleted(&self) -> DocliftResult<u64> {
        self.inner.count_undeleted()
    }

    /// Fetches up to `batch_size` undeleted documents.
    pub fn fetch_batch(&self, batch_size: usize) -> DocliftResult<Vec<Document>> {
        self.inner.fetch_batch(batch_size)
    }

    /// Inserts a document, overwriting an existing one when `allow_conflict`.
    pub fn put(&self, doc: Document, allow_conflict: bool) -> DocliftResult<()> {
        self.inner.put(doc, allow_conflict)
    }

    /// Removes a document by its identifier.
    pub fn remove(&self, doc: &Document) -> DocliftResult<()> {
        self.inner.remove(doc)
    }

    /// Destroys the storage backing.
    pub fn destroy(&self) -> DocliftResult<()> {
        self.inner.destroy()
    }

    /// Checks whether the storage has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }
}

impl Debug for Storage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.name())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

use crate::document::Document;
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use crate::store::{Storage, StorageProvider};
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory storage backend keyed by document identifier.
///
/// Documents live in a lock-free skip map, so concurrent batch workers can
/// read and remove while the newest collection takes inserts. The identifier
/// field is configurable: old-generation stores key by the reserved `_id`
/// field, the newest collection keys by its schema's primary key.
pub struct InMemoryStorage {
    name: String,
    id_field: String,
    docs: SkipMap<String, Document>,
    destroyed: AtomicBool,
}

impl InMemoryStorage {
    /// Creates a storage handle keyed by the reserved `_id` field.
    pub fn create(name: &str) -> Storage {
        Self::create_with_id_field(name, crate::common::DOC_ID)
    }

    /// Creates a storage handle keyed by the given identifier field.
    pub fn create_with_id_field(name: &str, id_field: &str) -> Storage {
        Storage::new(InMemoryStorage {
            name: name.to_string(),
            id_field: id_field.to_string(),
            docs: SkipMap::new(),
            destroyed: AtomicBool::new(false),
        })
    }

    fn guard_destroyed(&self) -> DocliftResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            log::error!("Storage '{}' has been destroyed", self.name);
            return Err(DocliftError::new(
                &format!("storage '{}' has been destroyed", self.name),
                ErrorKind::StoreDestroyed,
            ));
        }
        Ok(())
    }

    fn key_of(&self, doc: &Document) -> DocliftResult<String> {
        match doc.get(&self.id_field) {
            Some(value) if !value.is_null() => Ok(value.to_string()),
            _ => Err(DocliftError::new(
                &format!(
                    "document has no '{}' identifier in storage '{}'",
                    self.id_field, self.name
                ),
                ErrorKind::BackendError,
            )),
        }
    }
}

impl StorageProvider for InMemoryStorage {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn count_undeleted(&self) -> DocliftResult<u64> {
        self.guard_destroyed()?;
        let count = self
            .docs
            .iter()
            .filter(|entry| !entry.value().is_marked_deleted())
            .count();
        Ok(count as u64)
    }

    fn fetch_batch(&self, batch_size: usize) -> DocliftResult<Vec<Document>> {
        self.guard_destroyed()?;
        Ok(self
            .docs
            .iter()
            .filter(|entry| !entry.value().is_marked_deleted())
            .take(batch_size)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn put(&self, doc: Document, allow_conflict: bool) -> DocliftResult<()> {
        self.guard_destroyed()?;

        let mut doc = doc;
        let key = match doc.get(&self.id_field) {
            Some(value) if !value.is_null() => value.to_string(),
            _ if self.id_field == crate::common::DOC_ID => doc.ensure_id()?,
            _ => {
                return Err(DocliftError::new(
                    &format!(
                        "document has no '{}' identifier in storage '{}'",
                        self.id_field, self.name
                    ),
                    ErrorKind::BackendError,
                ))
            }
        };

        if !allow_conflict && self.docs.contains_key(&key) {
            log::error!(
                "Storage '{}' rejected insert: document '{}' already exists",
                self.name,
                key
            );
            return Err(DocliftError::new(
                &format!("document '{}' already exists in storage '{}'", key, self.name),
                ErrorKind::WriteFailure,
            ));
        }

        self.docs.insert(key, doc);
        Ok(())
    }

    fn remove(&self, doc: &Document) -> DocliftResult<()> {
        self.guard_destroyed()?;
        let key = self.key_of(doc)?;
        match self.docs.remove(&key) {
            Some(_) => Ok(()),
            None => Err(DocliftError::new(
                &format!("document '{}' not found in storage '{}'", key, self.name),
                ErrorKind::BackendError,
            )),
        }
    }

    fn destroy(&self) -> DocliftResult<()> {
        self.guard_destroyed()?;
        self.destroyed.store(true, Ordering::SeqCst);
        self.docs.clear();
        log::debug!("Storage '{}' destroyed", self.name);
        Ok(())
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use crate::schema::Schema;
use crate::store::Storage;
use dashmap::DashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Registry of live schema generations.
///
/// # Purpose
/// `GenerationCatalog` tracks which old schema generations of a collection
/// still have a live storage backing. Entries are keyed by a naming
/// convention derived from the collection name and the generation's version.
/// A generation exists exactly as long as its entry does: the migrator that
/// drains a generation removes its entry as the last act of its migration.
///
/// # Characteristics
/// - **Thread-Safe**: Can be cloned and shared across migrators
/// - **Absence is not an error**: Lookups for missing generations return `None`
#[derive(Clone, Default)]
pub struct GenerationCatalog {
    inner: Arc<GenerationCatalogInner>,
}

/// One registered generation: its schema and its storage handle.
#[derive(Clone)]
pub struct GenerationEntry {
    pub schema: Schema,
    pub storage: Storage,
}

#[derive(Default)]
struct GenerationCatalogInner {
    entries: DashMap<String, GenerationEntry>,
}

impl GenerationCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        GenerationCatalog::default()
    }

    /// Returns the conventional registry key for a generation.
    pub fn generation_key(collection: &str, version: u32) -> String {
        format!("{}-{}", collection, version)
    }

    /// Registers a generation.
    ///
    /// # Errors
    /// Fails if the collection name is empty or the generation is already
    /// registered.
    pub fn register(&self, collection: &str, schema: Schema, storage: Storage) -> DocliftResult<()> {
        if collection.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(DocliftError::new(
                "Collection name cannot be empty",
                ErrorKind::RegistryError,
            ));
        }

        let key = Self::generation_key(collection, schema.version());
        if self.inner.entries.contains_key(&key) {
            return Err(DocliftError::new(
                &format!("generation '{}' is already registered", key),
                ErrorKind::RegistryError,
            ));
        }

        self.inner.entries.insert(key, GenerationEntry { schema, storage });
        Ok(())
    }

    /// Looks up a live generation. Absence is not an error.
    pub fn lookup_generation(&self, collection: &str, version: u32) -> Option<GenerationEntry> {
        let key = Self::generation_key(collection, version);
        self.inner.entries.get(&key).map(|entry| entry.value().clone())
    }

    /// Removes a generation's registry entry.
    ///
    /// Removing an absent entry is logged and ignored, so a drained generation
    /// can never fail its own cleanup here.
    pub fn remove_generation_entry(&self, collection: &str, version: u32) -> DocliftResult<()> {
        let key = Self::generation_key(collection, version);
        if self.inner.entries.remove(&key).is_none() {
            log::warn!("Generation '{}' was not registered", key);
        }
        Ok(())
    }

    /// Checks whether a generation is registered.
    pub fn has_entry(&self, collection: &str, version: u32) -> bool {
        self.inner
            .entries
            .contains_key(&Self::generation_key(collection, version))
    }

    /// Returns the number of registered generations.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Checks whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl Debug for GenerationCatalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCatalog")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStorage;

    fn schema(version: u32) -> Schema {
        Schema::new(version, "key", &[]).unwrap()
    }

    #[test]
    fn test_generation_key_convention() {
        assert_eq!(GenerationCatalog::generation_key("users", 2), "users-2");
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = GenerationCatalog::new();
        catalog
            .register("users", schema(1), InMemoryStorage::create("users-1"))
            .unwrap();

        let entry = catalog.lookup_generation("users", 1).unwrap();
        assert_eq!(entry.schema.version(), 1);
        assert_eq!(entry.storage.name(), "users-1");
        assert!(catalog.has_entry("users", 1));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_lookup_absent_generation_is_none() {
        let catalog = GenerationCatalog::new();
        assert!(catalog.lookup_generation("users", 7).is_none());
    }

    #[test]
    fn test_register_duplicate_fails() {
        let catalog = GenerationCatalog::new();
        catalog
            .register("users", schema(1), InMemoryStorage::create("users-1"))
            .unwrap();
        let result = catalog.register("users", schema(1), InMemoryStorage::create("users-1"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::RegistryError);
    }

    #[test]
    fn test_register_empty_collection_fails() {
        let catalog = GenerationCatalog::new();
        let result = catalog.register("", schema(1), InMemoryStorage::create("x"));
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::RegistryError);
    }

    #[test]
    fn test_remove_entry_is_lenient() {
        let catalog = GenerationCatalog::new();
        catalog
            .register("users", schema(1), InMemoryStorage::create("users-1"))
            .unwrap();

        catalog.remove_generation_entry("users", 1).unwrap();
        assert!(!catalog.has_entry("users", 1));
        // removing again is not an error
        catalog.remove_generation_entry("users", 1).unwrap();
    }
}

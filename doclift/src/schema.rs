use crate::common::{Value, DOC_ID};
use crate::document::Document;
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use itertools::Itertools;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Describes one schema generation of a collection.
///
/// # Purpose
/// A `Schema` carries the version number of a generation, the name of the
/// primary key field, and the set of fields a document must carry to satisfy
/// the schema. The newest schema drives final validation of migrated
/// documents; each old generation's schema drives the reverse mapping of the
/// storage identifier back to the primary key field.
///
/// # Characteristics
/// - **Immutable**: All fields are fixed at construction
/// - **Cheaply cloneable**: Shared via Arc across migrators
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    version: u32,
    primary_key: String,
    required_fields: Vec<String>,
}

impl Schema {
    /// Creates a new schema.
    ///
    /// # Arguments
    /// * `version` - The schema generation number
    /// * `primary_key` - The primary key field name, must not be empty
    /// * `required_fields` - Fields every valid document must carry with a
    ///   non-null value (the primary key is always required and need not be
    ///   listed)
    pub fn new(version: u32, primary_key: &str, required_fields: &[&str]) -> DocliftResult<Self> {
        if primary_key.is_empty() {
            log::error!("Schema primary key cannot be empty");
            return Err(DocliftError::new(
                "Schema primary key cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                version,
                primary_key: primary_key.to_string(),
                required_fields: required_fields.iter().map(|f| f.to_string()).collect(),
            }),
        })
    }

    /// Returns the schema generation number.
    pub fn version(&self) -> u32 {
        self.inner.version
    }

    /// Returns the primary key field name.
    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    /// Returns all previous schema versions, ascending, oldest first.
    pub fn previous_versions(&self) -> Vec<u32> {
        (0..self.inner.version).collect()
    }

    /// Validates a document against this schema.
    ///
    /// The primary key and every required field must be present and non-null.
    ///
    /// # Errors
    /// Returns [ErrorKind::ValidationError] naming the offending fields.
    pub fn validate(&self, doc: &Document) -> DocliftResult<()> {
        let mut missing: Vec<&str> = Vec::new();

        if !has_field(doc, &self.inner.primary_key) {
            missing.push(&self.inner.primary_key);
        }
        for field in &self.inner.required_fields {
            if !has_field(doc, field) {
                missing.push(field);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        Err(DocliftError::new(
            &format!(
                "document does not satisfy schema v{}: missing or null fields [{}]",
                self.inner.version,
                missing.iter().join(", ")
            ),
            ErrorKind::ValidationError,
        ))
    }

    /// Reverses the storage-identifier mapping of a document.
    ///
    /// Storage keeps every document under the reserved `_id` field; this moves
    /// the identifier back to the schema's primary key field. Documents
    /// without an `_id` field are returned unchanged, as are documents whose
    /// schema uses `_id` itself as the primary key.
    pub fn map_storage_id_to_primary_key(&self, doc: Document) -> DocliftResult<Document> {
        if self.inner.primary_key == DOC_ID {
            return Ok(doc);
        }
        let mut doc = doc;
        match doc.remove(DOC_ID) {
            Some(id) => {
                doc.put(self.inner.primary_key.as_str(), id)?;
                Ok(doc)
            }
            None => Ok(doc),
        }
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.inner.version)
            .field("primary_key", &self.inner.primary_key)
            .field("required_fields", &self.inner.required_fields)
            .finish()
    }
}

fn has_field(doc: &Document, field: &str) -> bool {
    match doc.get(field) {
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn schema_v3() -> Schema {
        Schema::new(3, "key", &["name"]).unwrap()
    }

    // ==================== Construction ====================

    #[test]
    fn test_new_rejects_empty_primary_key() {
        let result = Schema::new(1, "", &[]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::ValidationError);
    }

    #[test]
    fn test_previous_versions_ascending() {
        let schema = schema_v3();
        assert_eq!(schema.previous_versions(), vec![0, 1, 2]);
        assert!(Schema::new(0, "key", &[]).unwrap().previous_versions().is_empty());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_accepts_complete_document() {
        let doc = doc! { "key" => "1", "name" => "Alice" };
        assert!(schema_v3().validate(&doc).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required_field() {
        let doc = doc! { "key" => "1" };
        let err = schema_v3().validate(&doc).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(err.message().contains("name"));
    }

    #[test]
    fn test_validate_rejects_null_field() {
        let doc = doc! { "key" => "1", "name" => Value::Null };
        assert!(schema_v3().validate(&doc).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_primary_key() {
        let doc = doc! { "name" => "Alice" };
        let err = schema_v3().validate(&doc).unwrap_err();
        assert!(err.message().contains("key"));
    }

    // ==================== Storage Id Mapping ====================

    #[test]
    fn test_map_storage_id_moves_id_to_primary_key() {
        let doc = doc! { "_id" => "42", "name" => "Alice" };
        let mapped = schema_v3().map_storage_id_to_primary_key(doc).unwrap();

        assert!(!mapped.contains_key("_id"));
        assert_eq!(mapped.get("key"), Some(Value::String("42".to_string())));
    }

    #[test]
    fn test_map_storage_id_without_id_is_identity() {
        let doc = doc! { "name" => "Alice" };
        let mapped = schema_v3().map_storage_id_to_primary_key(doc.clone()).unwrap();
        assert_eq!(mapped, doc);
    }

    #[test]
    fn test_map_storage_id_primary_key_is_id() {
        let schema = Schema::new(1, "_id", &[]).unwrap();
        let doc = doc! { "_id" => "42" };
        let mapped = schema.map_storage_id_to_primary_key(doc.clone()).unwrap();
        assert_eq!(mapped, doc);
    }
}

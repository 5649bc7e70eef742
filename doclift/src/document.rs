use im::OrdMap;

use crate::common::{Value, DOC_DELETED, DOC_ID};
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use std::fmt::{Debug, Display, Formatter};

/// Represents a document in a versioned document store, backed by a lock-free
/// persistent data structure.
///
/// Documents are composed of key-value pairs. The key is always a [String] and
/// the value is a [Value]. Cloning is O(1) via internal structural sharing, so
/// every transform step in a migration chain receives its own independent copy
/// without paying for a deep copy.
///
/// Below fields are reserved by the storage layer:
///
/// * `_id` - the storage identifier of the document
/// * `_rev` - the storage revision marker
/// * `_deleted` - the soft-delete marker
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    /// Persistent ordered map: O(1) clone via internal Arc, O(log n) mutations
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document { data: OrdMap::new() }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of fields in the document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key in this document.
    ///
    /// If the key already exists, its value is updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> DocliftResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DocliftError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        self.data = self.data.update(key, value.into());
        Ok(())
    }

    /// Returns the value associated with the key, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    /// Checks whether the document contains the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Removes the key from the document, returning its previous value if any.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let previous = self.data.get(key).cloned();
        self.data = self.data.without(key);
        previous
    }

    /// Returns a copy of this document with the given key removed.
    pub fn without(&self, key: &str) -> Document {
        Document {
            data: self.data.without(key),
        }
    }

    /// Returns an iterator over the field names of this document.
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns the storage identifier of this document as a string, if present.
    pub fn id(&self) -> Option<String> {
        match self.data.get(DOC_ID) {
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }

    /// Returns the storage identifier, generating and storing a fresh one if absent.
    pub fn ensure_id(&mut self) -> DocliftResult<String> {
        if let Some(id) = self.id() {
            return Ok(id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.put(DOC_ID, id.as_str())?;
        Ok(id)
    }

    /// Checks whether the document carries the soft-delete marker.
    pub fn is_marked_deleted(&self) -> bool {
        matches!(self.data.get(DOC_DELETED), Some(Value::Bool(true)))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Document{}", self)
    }
}

/// Creates a [Document] from `key => value` pairs.
///
/// ```ignore
/// let doc = doc! {
///     "_id" => "1",
///     "name" => "Alice",
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::document::Document::new();
        $(
            document
                .put($key, $value)
                .expect("document key must not be empty");
        )+
        document
    }};
}

use crate::document::Document;
use crate::errors::DocliftResult;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Contract for implementing field codecs.
///
/// # Purpose
/// Defines the interface for decoding a document out of its storage
/// representation: expanding compressed field names and decrypting field
/// values. Migration consumes codecs through this narrow seam; the compression
/// and encryption algorithms themselves live elsewhere.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`, the batch fan-out decodes documents
/// from multiple threads at once.
pub trait FieldCodecProvider: Send + Sync {
    /// Returns the unique name of this codec.
    fn name(&self) -> String;

    /// Expands compressed field names into their full form.
    fn decompress_field_names(&self, doc: Document) -> DocliftResult<Document>;

    /// Decrypts encrypted field values.
    fn decrypt_fields(&self, doc: Document) -> DocliftResult<Document>;
}

/// Wraps a field codec implementation.
///
/// # Purpose
/// Provides a type-erased, cloneable wrapper around any [FieldCodecProvider]
/// implementation. Uses `Arc` for reference-counted sharing and polymorphic
/// dispatch.
#[derive(Clone)]
pub struct FieldCodec {
    inner: Arc<dyn FieldCodecProvider>,
}

impl FieldCodec {
    /// Creates a new codec from an implementation.
    pub fn new<T: FieldCodecProvider + 'static>(inner: T) -> Self {
        FieldCodec { inner: Arc::new(inner) }
    }

    /// Returns the codec's name.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Expands compressed field names into their full form.
    pub fn decompress_field_names(&self, doc: Document) -> DocliftResult<Document> {
        self.inner.decompress_field_names(doc)
    }

    /// Decrypts encrypted field values.
    pub fn decrypt_fields(&self, doc: Document) -> DocliftResult<Document> {
        self.inner.decrypt_fields(doc)
    }
}

impl Debug for FieldCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("name", &self.name())
            .finish()
    }
}

/// Identity codec for stores that neither compress field names nor encrypt
/// field values.
pub struct PlainCodec;

impl FieldCodecProvider for PlainCodec {
    fn name(&self) -> String {
        "plain".to_string()
    }

    fn decompress_field_names(&self, doc: Document) -> DocliftResult<Document> {
        Ok(doc)
    }

    fn decrypt_fields(&self, doc: Document) -> DocliftResult<Document> {
        Ok(doc)
    }
}

/// Table-driven field-name codec.
///
/// Expands compressed field names through a lookup table; names without a
/// table entry pass through unchanged. Values are not touched.
pub struct NameTableCodec {
    table: HashMap<String, String>,
}

impl NameTableCodec {
    /// Creates a codec from `(compressed, full)` name pairs.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        NameTableCodec {
            table: pairs
                .iter()
                .map(|(short, full)| (short.to_string(), full.to_string()))
                .collect(),
        }
    }
}

impl FieldCodecProvider for NameTableCodec {
    fn name(&self) -> String {
        "name-table".to_string()
    }

    fn decompress_field_names(&self, doc: Document) -> DocliftResult<Document> {
        let compressed: Vec<String> = doc
            .fields()
            .filter(|field| self.table.contains_key(*field))
            .cloned()
            .collect();

        let mut doc = doc;
        for short in compressed {
            if let Some(value) = doc.remove(&short) {
                // table membership checked above
                let full = &self.table[&short];
                doc.put(full.as_str(), value)?;
            }
        }
        Ok(doc)
    }

    fn decrypt_fields(&self, doc: Document) -> DocliftResult<Document> {
        Ok(doc)
    }
}

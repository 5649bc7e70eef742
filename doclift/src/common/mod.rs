pub mod value;

pub use value::Value;

/// Storage identifier field of a document.
pub const DOC_ID: &str = "_id";

/// Storage revision marker of a document. Stripped before a migrated document
/// is written into the newest collection so the write is a fresh insert.
pub const DOC_REVISION: &str = "_rev";

/// Soft-delete marker of a document. Documents carrying `_deleted: true` are
/// skipped by `count_undeleted` and `fetch_batch`.
pub const DOC_DELETED: &str = "_deleted";

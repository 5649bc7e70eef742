//! # Doclift - Schema Migration for Versioned Document Stores
//!
//! Doclift upgrades documents created under older schema generations into the
//! current schema, document by document, with progress reporting, bounded
//! concurrency and best-effort cleanup of obsolete storage generations.
//!
//! ## Key Features
//!
//! - **Generation-Aware**: Every old schema version keeps its own storage
//!   backing until its documents have been migrated out
//! - **Transform Chains**: User-supplied per-version functions carry a
//!   document from its original version to the newest, one step at a time
//! - **Observable**: A cold push-based progress stream reports either the
//!   aggregate [migration::MigrationState] or per-document
//!   [migration::DocumentAction] outcomes
//! - **Bounded Concurrency**: Documents are fetched in fixed-size batches;
//!   one batch fans out across threads, batches never overlap
//! - **Best-Effort Cleanup**: Old-store removals never fail a run; a drained
//!   generation's storage is destroyed exactly once
//! - **Clean API**: PIMPL pattern provides stable, encapsulated interfaces
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use doclift::migration::{MigrationOrchestrator, TransformRegistryBuilder, DEFAULT_BATCH_SIZE};
//! use doclift::schema::Schema;
//! use doclift::store::{GenerationCatalog, InMemoryStorage};
//!
//! # fn main() -> doclift::errors::DocliftResult<()> {
//! let transforms = TransformRegistryBuilder::new()
//!     .register(2, |doc| Ok(Some(doc)))
//!     .build(1, 2)?;
//!
//! let orchestrator = MigrationOrchestrator::new(
//!     "users",
//!     Schema::new(2, "key", &["name"])?,
//!     InMemoryStorage::create_with_id_field("users", "key"),
//!     transforms,
//!     catalog,
//! )?;
//!
//! let final_state = orchestrator.migrate_and_wait(DEFAULT_BATCH_SIZE)?;
//! assert!(final_state.done());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`codec`] - Field-name decompression and field decryption seam
//! - [`common`] - Common value types and reserved field names
//! - [`document`] - The document type and the `doc!` macro
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Orchestrator, per-generation migrator, progress stream
//! - [`schema`] - Schema versions and final validation
//! - [`store`] - Storage backend abstraction and the generation catalog

pub mod codec;
pub mod common;
pub mod document;
pub mod errors;
pub mod migration;
pub mod schema;
pub mod store;

use crate::document::Document;
use crate::errors::{DocliftError, DocliftResult, ErrorKind};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;

/// User-supplied transform carrying a document from one schema version to the
/// next.
///
/// Registered for a target version `v`, the function receives a document
/// shaped for version `v - 1` and returns the document reshaped for version
/// `v`, or `None` to drop the document from migration entirely.
pub trait TransformFn: Send + Sync + Fn(Document) -> DocliftResult<Option<Document>> {}

impl<F> TransformFn for F where F: Send + Sync + Fn(Document) -> DocliftResult<Option<Document>> {}

/// Builder for a [TransformRegistry].
///
/// Collects per-version transforms; [TransformRegistryBuilder::build] checks
/// them against the version range they must cover.
#[derive(Default)]
pub struct TransformRegistryBuilder {
    transforms: HashMap<u32, Arc<dyn TransformFn>>,
}

impl TransformRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        TransformRegistryBuilder::default()
    }

    /// Registers the transform producing documents of `target_version`.
    ///
    /// Registering the same target version twice keeps the last transform.
    pub fn register(
        mut self,
        target_version: u32,
        transform: impl TransformFn + 'static,
    ) -> Self {
        self.transforms.insert(target_version, Arc::new(transform));
        self
    }

    /// Validates coverage and builds the registry.
    ///
    /// Every version in `[oldest + 1, newest]` must have exactly one
    /// registered transform; gaps and out-of-range entries are construction
    /// errors, never runtime ones.
    ///
    /// # Errors
    /// Returns [ErrorKind::RegistryError] naming the missing or surplus
    /// versions.
    pub fn build(self, oldest: u32, newest: u32) -> DocliftResult<TransformRegistry> {
        if oldest >= newest {
            return Err(DocliftError::new(
                &format!(
                    "oldest version {} must be lower than newest version {}",
                    oldest, newest
                ),
                ErrorKind::RegistryError,
            ));
        }

        let missing = ((oldest + 1)..=newest)
            .filter(|version| !self.transforms.contains_key(version))
            .collect_vec();
        if !missing.is_empty() {
            log::error!("Transform registry has gaps: {:?}", missing);
            return Err(DocliftError::new(
                &format!(
                    "no transform registered for versions [{}]",
                    missing.iter().join(", ")
                ),
                ErrorKind::RegistryError,
            ));
        }

        let surplus = self
            .transforms
            .keys()
            .filter(|version| **version <= oldest || **version > newest)
            .sorted()
            .collect_vec();
        if !surplus.is_empty() {
            return Err(DocliftError::new(
                &format!(
                    "transforms registered outside version range ({}, {}]: [{}]",
                    oldest,
                    newest,
                    surplus.iter().join(", ")
                ),
                ErrorKind::RegistryError,
            ));
        }

        Ok(TransformRegistry {
            inner: Arc::new(TransformRegistryInner {
                transforms: self.transforms,
                oldest,
                newest,
            }),
        })
    }
}

/// Validated mapping from target version to transform function.
///
/// # Characteristics
/// - **Complete**: Covers every version step in `(oldest, newest]`
/// - **Immutable**: Fixed at build time
/// - **Thread-Safe**: Cloned and shared across batch workers
#[derive(Clone)]
pub struct TransformRegistry {
    inner: Arc<TransformRegistryInner>,
}

struct TransformRegistryInner {
    transforms: HashMap<u32, Arc<dyn TransformFn>>,
    oldest: u32,
    newest: u32,
}

impl TransformRegistry {
    /// Returns the oldest supported generation version.
    pub fn oldest_version(&self) -> u32 {
        self.inner.oldest
    }

    /// Returns the newest schema version, the chain's final target.
    pub fn newest_version(&self) -> u32 {
        self.inner.newest
    }

    /// Applies the single transform step producing `target_version`.
    ///
    /// The transform receives its own private copy of the input. An empty
    /// output document is normalized to `None`, dropping the document.
    ///
    /// # Errors
    /// A transform that fails is reported as [ErrorKind::TransformFailure]
    /// with the failing step in the message. A lookup miss cannot happen on a
    /// built registry and is reported as an internal error.
    pub fn apply_step(
        &self,
        target_version: u32,
        doc: &Document,
    ) -> DocliftResult<Option<Document>> {
        let transform = self.inner.transforms.get(&target_version).ok_or_else(|| {
            DocliftError::new(
                &format!("no transform registered for version {}", target_version),
                ErrorKind::InternalError,
            )
        })?;

        match transform(doc.clone()) {
            Ok(Some(output)) if output.is_empty() => Ok(None),
            Ok(output) => Ok(output),
            Err(cause) => Err(DocliftError::new_with_cause(
                &format!(
                    "transform to version {} failed: {}",
                    target_version,
                    cause.message()
                ),
                ErrorKind::TransformFailure,
                cause,
            )),
        }
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("oldest", &self.inner.oldest)
            .field("newest", &self.inner.newest)
            .field("steps", &self.inner.transforms.len())
            .finish()
    }
}

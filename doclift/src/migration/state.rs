use crate::document::Document;

/// Outcome kind of a single migrated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// The document was transformed, validated and written into the newest
    /// collection.
    Success,
    /// A transform dropped the document; nothing was written.
    Deleted,
}

/// Per-document migration outcome, emitted once per processed document.
///
/// Constructed through [DocumentAction::success] and
/// [DocumentAction::deleted], which enforce that `kind == Deleted` exactly
/// when there is no migrated document.
#[derive(Debug, Clone)]
pub struct DocumentAction {
    original: Document,
    migrated: Option<Document>,
    kind: ActionKind,
}

impl DocumentAction {
    /// Creates the outcome for a document written into the newest collection.
    pub fn success(original: Document, migrated: Document) -> Self {
        DocumentAction {
            original,
            migrated: Some(migrated),
            kind: ActionKind::Success,
        }
    }

    /// Creates the outcome for a document dropped by a transform.
    pub fn deleted(original: Document) -> Self {
        DocumentAction {
            original,
            migrated: None,
            kind: ActionKind::Deleted,
        }
    }

    /// Returns the document as it was stored in the old generation.
    pub fn original(&self) -> &Document {
        &self.original
    }

    /// Returns the migrated document, absent for [ActionKind::Deleted].
    pub fn migrated(&self) -> Option<&Document> {
        self.migrated.as_ref()
    }

    /// Returns the outcome kind.
    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }
}

/// Aggregate progress of one migration run.
///
/// The orchestrator is the single writer: it records one outcome at a time and
/// emits a fresh copy downstream after every update, so consumers observe
/// `handled == success + deleted` at every emission and a non-decreasing
/// `percent` that reaches exactly 100 only on the terminal `done` emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    done: bool,
    total: u64,
    handled: u64,
    success: u64,
    deleted: u64,
    percent: u8,
}

impl MigrationState {
    /// Creates the initial state for a run migrating `total` documents.
    pub fn new(total: u64) -> Self {
        MigrationState {
            done: false,
            total,
            handled: 0,
            success: 0,
            deleted: 0,
            percent: 0,
        }
    }

    /// True only after the last generation is fully drained and deleted.
    pub fn done(&self) -> bool {
        self.done
    }

    /// Total undeleted documents across all generations, fixed at start.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Documents for which an outcome has been produced.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Documents written into the newest collection.
    pub fn success(&self) -> u64 {
        self.success
    }

    /// Documents dropped by a transform.
    pub fn deleted(&self) -> u64 {
        self.deleted
    }

    /// Rounded progress percentage, capped at 99 until the run is done.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Records one per-document outcome and recomputes the percentage.
    pub(crate) fn record(&mut self, kind: &ActionKind) {
        self.handled += 1;
        match kind {
            ActionKind::Success => self.success += 1,
            ActionKind::Deleted => self.deleted += 1,
        }
        self.percent = self.rounded_percent().min(99);
    }

    /// Marks the run complete; the only way `percent` reaches 100.
    pub(crate) fn finish(&mut self) {
        self.done = true;
        self.percent = 100;
    }

    fn rounded_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.handled * 100 + self.total / 2) / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    // ==================== DocumentAction ====================

    #[test]
    fn test_success_action_carries_migrated_document() {
        let action = DocumentAction::success(doc! { "_id" => "1" }, doc! { "key" => "1" });
        assert_eq!(action.kind(), &ActionKind::Success);
        assert!(action.migrated().is_some());
    }

    #[test]
    fn test_deleted_action_has_no_migrated_document() {
        let action = DocumentAction::deleted(doc! { "_id" => "1" });
        assert_eq!(action.kind(), &ActionKind::Deleted);
        assert!(action.migrated().is_none());
        assert_eq!(action.original().id(), Some("1".to_string()));
    }

    // ==================== MigrationState ====================

    #[test]
    fn test_record_partitions_outcomes() {
        let mut state = MigrationState::new(4);
        state.record(&ActionKind::Success);
        state.record(&ActionKind::Deleted);
        state.record(&ActionKind::Success);

        assert_eq!(state.handled(), 3);
        assert_eq!(state.success(), 2);
        assert_eq!(state.deleted(), 1);
        assert_eq!(state.handled(), state.success() + state.deleted());
    }

    #[test]
    fn test_percent_is_rounded() {
        let mut state = MigrationState::new(3);
        state.record(&ActionKind::Success);
        // 1/3 rounds to 33
        assert_eq!(state.percent(), 33);
        state.record(&ActionKind::Success);
        // 2/3 rounds to 67
        assert_eq!(state.percent(), 67);
    }

    #[test]
    fn test_percent_caps_at_99_until_done() {
        let mut state = MigrationState::new(1);
        state.record(&ActionKind::Success);
        assert_eq!(state.percent(), 99);
        assert!(!state.done());

        state.finish();
        assert_eq!(state.percent(), 100);
        assert!(state.done());
    }

    #[test]
    fn test_zero_total_run() {
        let mut state = MigrationState::new(0);
        assert_eq!(state.percent(), 0);
        state.finish();
        assert_eq!(state.percent(), 100);
        assert!(state.done());
    }
}

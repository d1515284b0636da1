//! Aggregated outcome of one archive pass.
//!
//! Partial success is the expected result shape: the unit of meaningful
//! failure is one (entity, window) artifact, so outcomes are collected per
//! window and rolled up per entity instead of aborting the run.

use chrono::{DateTime, Utc};

use strata_core::{ArchiveRunId, ArtifactKey, Window};

/// Outcome of one window's compile-and-persist attempt.
#[derive(Debug)]
pub enum WindowOutcome {
    /// The artifact was persisted under the given key.
    Persisted {
        /// The window that was archived.
        window: Window,
        /// Key the artifact was stored under.
        key: ArtifactKey,
        /// True if records in the window disagreed on the owner id.
        owner_conflict: bool,
    },
    /// Compilation or persistence failed.
    Failed {
        /// The window that failed.
        window: Window,
        /// Single-line description of the failure.
        error: String,
    },
    /// The window was skipped because the pass was cancelled.
    Cancelled {
        /// The window that was not persisted.
        window: Window,
    },
}

impl WindowOutcome {
    /// Returns true if the window's artifact was persisted.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }

    /// Returns the window this outcome refers to.
    #[must_use]
    pub const fn window(&self) -> &Window {
        match self {
            Self::Persisted { window, .. }
            | Self::Failed { window, .. }
            | Self::Cancelled { window } => window,
        }
    }
}

/// Per-entity rollup of one archive pass.
#[derive(Debug)]
pub struct EntityReport {
    /// The entity this report covers.
    pub entity_id: String,
    /// Windows in the plan, empty ones included.
    pub windows_planned: usize,
    /// Non-empty windows submitted for compile-and-persist.
    pub windows_attempted: usize,
    /// Windows whose artifacts were persisted.
    pub windows_succeeded: usize,
    /// Outcome of every attempted window.
    pub outcomes: Vec<WindowOutcome>,
    /// Records rejected during validation (unparseable timestamps).
    pub records_rejected: usize,
    /// First rejection message, if any records were rejected.
    pub rejection_message: Option<String>,
    /// Set when planning itself failed and no windows were attempted.
    pub plan_error: Option<String>,
}

impl EntityReport {
    /// Returns true if every attempted window persisted and nothing was
    /// rejected or cancelled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.plan_error.is_none()
            && self.records_rejected == 0
            && self.windows_succeeded == self.windows_attempted
    }

    /// Number of windows that failed (cancellations not included).
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WindowOutcome::Failed { .. }))
            .count()
    }

    /// Number of windows skipped by cancellation.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, WindowOutcome::Cancelled { .. }))
            .count()
    }
}

/// The consolidated result of one archive pass.
#[derive(Debug)]
pub struct ArchiveResult {
    /// Unique ID of this pass.
    pub run_id: ArchiveRunId,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Per-entity reports, sorted by entity id for deterministic output.
    pub entities: Vec<EntityReport>,
}

impl ArchiveResult {
    /// Returns true if every entity archived completely.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entities.iter().all(EntityReport::is_complete)
    }

    /// Total windows persisted across all entities.
    #[must_use]
    pub fn persisted_count(&self) -> usize {
        self.entities.iter().map(|e| e.windows_succeeded).sum()
    }

    /// Total windows that failed across all entities.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entities.iter().map(EntityReport::failure_count).sum()
    }

    /// Total windows skipped by cancellation across all entities.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.entities.iter().map(EntityReport::cancelled_count).sum()
    }

    /// Looks up one entity's report.
    #[must_use]
    pub fn entity(&self, entity_id: &str) -> Option<&EntityReport> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }
}

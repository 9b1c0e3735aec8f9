//! Check execution engine.
//!
//! [`VigilEngine`] binds a [`CheckRegistry`] to a [`RecordStore`] and
//! executes [`Job`](crate::dispatch::Job)s against them. The execution
//! protocol itself lives in `executor`; this module holds the engine
//! handle and the outcome types it reports.

mod executor;

use std::sync::Arc;

use crate::identity::{CheckSlug, Identifier};
use crate::registry::CheckRegistry;
use crate::status::Status;
use crate::store::RecordStore;

/// Executes check jobs against a registry and a record store.
///
/// The engine is stateless beyond its two collaborators and is meant to
/// be shared behind an [`Arc`]: dispatchers, the runtime, and embedding
/// code all hold clones of the same engine.
pub struct VigilEngine {
    registry: Arc<CheckRegistry>,
    store: Arc<dyn RecordStore>,
}

impl VigilEngine {
    /// Creates an engine over the given registry and store.
    #[must_use]
    pub fn new(registry: Arc<CheckRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    /// The registry this engine resolves slugs against.
    #[must_use]
    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// The store this engine reads and writes records through.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

/// What a single subject evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    /// Slug of the evaluated check.
    pub slug: CheckSlug,
    /// Identifier of the evaluated subject.
    pub identifier: Identifier,
    /// Status stored before this evaluation, if a record existed.
    pub previous: Option<Status>,
    /// Status produced by this evaluation.
    pub status: Status,
    /// Whether this evaluation created the record.
    pub created: bool,
    /// Whether a standing acknowledgment was cleared.
    pub unacknowledged: bool,
}

/// One subject that failed during a bulk run.
#[derive(Debug)]
pub struct SubjectFailure {
    /// Identifier of the failed subject, when it could be derived.
    pub identifier: Option<Identifier>,
    /// Rendered error message.
    pub message: String,
}

/// Result of executing a [`Job`](crate::dispatch::Job).
#[derive(Debug)]
pub enum JobOutcome {
    /// A bulk run over every generated subject.
    Bulk {
        /// Subjects evaluated successfully.
        evaluated: usize,
        /// Subjects whose evaluation failed; siblings are unaffected.
        failures: Vec<SubjectFailure>,
    },
    /// A single-subject run.
    Subject(EvaluationOutcome),
}

//! Abstract record storage trait.
//!
//! The trait defines the contract a storage backend must implement for
//! the execution protocol to be correct under concurrent evaluation:
//! `get_or_create` and `update` are each atomic per record key, and an
//! update patch can change several fields (including clearing the
//! acknowledgment) in one step.

use thiserror::Error;

use crate::config::CheckConfig;
use crate::identity::{CheckSlug, Identifier};
use crate::record::{Acknowledgment, CheckRecord};
use crate::status::Status;

/// Errors that can occur during record storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the given key.
    #[error("Record not found: {slug}/{identifier}")]
    NotFound {
        /// Slug half of the missing key.
        slug: CheckSlug,
        /// Identifier half of the missing key.
        identifier: Identifier,
    },

    /// Backend error.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// A single-field change: keep the stored value or set a new one.
///
/// `Set(None)` on an optional field clears it, which `Option<T>` alone
/// cannot express without conflating "keep" and "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
}

impl<T> FieldPatch<T> {
    /// Applies the patch to a stored value.
    pub fn apply(self, target: &mut T) {
        if let Self::Set(value) = self {
            *target = value;
        }
    }
}

/// A partial update of one record.
///
/// Fields default to [`FieldPatch::Keep`]; builder methods mark fields
/// for replacement. The record key and `created_at` are immutable.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    /// New status, if changing.
    pub status: FieldPatch<Status>,
    /// New assigned user, if changing.
    pub assigned_user: FieldPatch<Option<String>>,
    /// New assigned group, if changing.
    pub assigned_group: FieldPatch<Option<String>>,
    /// New description, if changing.
    pub description: FieldPatch<String>,
    /// New per-subject configuration, if changing.
    pub config: FieldPatch<CheckConfig>,
    /// New acknowledgment state, if changing. `Set(None)` clears the
    /// whole triple at once.
    pub acknowledgment: FieldPatch<Option<Acknowledgment>>,
}

impl RecordPatch {
    /// Marks the status for replacement.
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = FieldPatch::Set(status);
        self
    }

    /// Marks the assigned user for replacement.
    #[must_use]
    pub fn assigned_user(mut self, user: Option<String>) -> Self {
        self.assigned_user = FieldPatch::Set(user);
        self
    }

    /// Marks the assigned group for replacement.
    #[must_use]
    pub fn assigned_group(mut self, group: Option<String>) -> Self {
        self.assigned_group = FieldPatch::Set(group);
        self
    }

    /// Marks the description for replacement.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = FieldPatch::Set(description.into());
        self
    }

    /// Marks the configuration for replacement.
    #[must_use]
    pub fn config(mut self, config: CheckConfig) -> Self {
        self.config = FieldPatch::Set(config);
        self
    }

    /// Marks the acknowledgment for replacement or clearing.
    #[must_use]
    pub fn acknowledgment(mut self, acknowledgment: Option<Acknowledgment>) -> Self {
        self.acknowledgment = FieldPatch::Set(acknowledgment);
        self
    }

    /// Applies every `Set` field to a record. Backends call this inside
    /// their per-key critical section.
    pub fn apply_to(self, record: &mut CheckRecord) {
        self.status.apply(&mut record.status);
        self.assigned_user.apply(&mut record.assigned_user);
        self.assigned_group.apply(&mut record.assigned_group);
        self.description.apply(&mut record.description);
        self.config.apply(&mut record.config);
        self.acknowledgment.apply(&mut record.acknowledgment);
    }
}

/// Storage backend for check records.
///
/// # Safety Considerations
/// - `get_or_create` and `update` must be atomic per record key
/// - Implementations must handle concurrent access safely; racing
///   evaluations of one subject resolve as last-write-wins
pub trait RecordStore: Send + Sync {
    /// Get the record under a key, if one exists.
    fn get(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
    ) -> Result<Option<CheckRecord>, StoreError>;

    /// Atomically get the existing record under the candidate's key or
    /// insert the candidate. Returns the stored record and whether it
    /// was created by this call; the candidate's fields are applied
    /// exactly once, at creation.
    fn get_or_create(&self, candidate: CheckRecord) -> Result<(CheckRecord, bool), StoreError>;

    /// Atomically apply a patch to an existing record, touching its
    /// `updated_at`. Returns the record after the patch.
    fn update(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
        patch: RecordPatch,
    ) -> Result<CheckRecord, StoreError>;

    /// All records of one check, sorted by identifier.
    fn for_check(&self, slug: &CheckSlug) -> Result<Vec<CheckRecord>, StoreError>;
}

//! Error types for vigil.
//!
//! All errors are strongly typed using thiserror. Registration-time
//! errors fail startup; execution-time errors are isolated to the job
//! or subject that raised them and reported through the dispatcher's
//! failure channel.

use thiserror::Error;

use crate::identity::{CheckSlug, Identifier};
use crate::store::StoreError;

/// Errors raised while registering checks.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two checks derived the same slug. Registration fails loudly
    /// rather than silently replacing the earlier check.
    #[error("A check is already registered under slug '{slug}'")]
    DuplicateSlug {
        /// The contested slug.
        slug: CheckSlug,
    },

    /// The check's declared naming cannot produce a usable slug.
    #[error("Invalid check metadata: {reason}")]
    InvalidMeta {
        /// What was wrong with the metadata.
        reason: String,
    },
}

/// Errors raised while executing check jobs.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A job referenced a slug that is not registered, e.g. a queue
    /// entry that outlived a deploy.
    #[error("Unknown check: {slug}")]
    UnknownCheck {
        /// The unregistered slug.
        slug: CheckSlug,
    },

    /// A single-subject job could not reconstruct its subject.
    #[error("No subject found for {slug}/{identifier}")]
    SubjectNotFound {
        /// Slug of the check.
        slug: CheckSlug,
        /// Identifier that no longer resolves to a subject.
        identifier: Identifier,
    },

    /// Check-author code failed while generating, evaluating, or
    /// identifying a subject.
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// What went wrong.
        message: String,
    },

    /// An acknowledgment request was malformed.
    #[error("Invalid acknowledgment: {reason}")]
    InvalidAcknowledgment {
        /// What was wrong with the request.
        reason: String,
    },
}

/// Errors raised while enqueueing jobs.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatch queue is at capacity; the job was not enqueued.
    #[error("Dispatch queue is full (capacity: {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The workers are gone; no job can be enqueued anymore.
    #[error("Dispatch queue is disconnected")]
    Disconnected,
}

/// Top-level error type for vigil.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Registration failure.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Execution failure.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Record storage failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Job dispatch failure.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Invariant violation inside the engine itself.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl VigilError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an evaluation error; the constructor check authors reach
    /// for when a subject cannot be processed.
    #[must_use]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::Evaluation {
            message: message.into(),
        })
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a store error.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is a dispatch error.
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(_) => false, // Registration errors won't change on retry
            Self::Execution(_) => false,
            Self::Store(e) => matches!(e, StoreError::Backend(_)),
            Self::Dispatch(e) => matches!(e, DispatchError::QueueFull { .. }),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for vigil operations.
pub type VigilResult<T> = Result<T, VigilError>;

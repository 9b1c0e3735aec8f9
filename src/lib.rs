//! # Vigil - Pluggable Status Checks
//!
//! Vigil is an engine for running health checks against the things a
//! host application cares about. Checks are small, self-describing
//! units of domain logic; the engine owns discovery, scheduling
//! plumbing, per-subject configuration, stored results, and
//! acknowledgment bookkeeping.
//!
//! ## Core Concepts
//!
//! - **Check**: One health question, applied to many subjects
//! - **Subject**: One thing a check evaluates, identified stably
//! - **CheckRecord**: The stored outcome of a `(check, subject)` pair
//! - **Trigger**: A declared interest in entity mutations that
//!   re-evaluates exactly the affected subject
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use vigil::{
//!     ChangeHub, CheckRegistry, InMemoryRecordStore, InlineDispatcher, VigilEngine,
//!     VigilRuntime,
//! };
//!
//! // Assemble the runtime once at startup.
//! let registry = Arc::new(CheckRegistry::new());
//! let store = Arc::new(InMemoryRecordStore::new());
//! let engine = Arc::new(VigilEngine::new(registry, store));
//! let dispatcher = Arc::new(InlineDispatcher::new(Arc::clone(&engine)));
//! let changes = Arc::new(ChangeHub::new());
//! let runtime = VigilRuntime::new(engine, dispatcher, changes);
//!
//! // Register checks; wired triggers subscribe to the change feed.
//! runtime.register(Arc::new(DiskSpace::default()))?;
//!
//! // Evaluate every subject of every check.
//! runtime.run_all()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod check;
pub mod config;
pub mod error;
pub mod identity;
pub mod record;
pub mod status;
pub mod value;

// Execution: registry, engine, dispatch, change feed
pub mod changes;
pub mod dispatch;
pub mod engine;
pub mod registry;
pub mod runtime;
pub mod store;

// Re-export primary types at crate root for convenience
pub use changes::{ChangeBus, ChangeHandler, ChangeHub, ChangeOp, EntityChange};
pub use check::{AssignmentAware, Check, CheckMeta, Reactor, Subject, TriggerSpec};
pub use config::CheckConfig;
pub use dispatch::{Dispatcher, DispatcherConfig, InlineDispatcher, Job, WorkerDispatcher};
pub use engine::{EvaluationOutcome, JobOutcome, SubjectFailure, VigilEngine};
pub use error::{
    DispatchError, ExecutionError, RegistryError, VigilError, VigilResult,
};
pub use identity::{ChangeId, CheckSlug, EntityKind, Identifier};
pub use record::{Acknowledgment, CheckRecord};
pub use registry::{CheckRegistry, RegisteredCheck};
pub use runtime::VigilRuntime;
pub use status::Status;
pub use store::{FieldPatch, InMemoryRecordStore, RecordPatch, RecordStore, StoreError};
pub use value::Value;

//! Entity-mutation notifications.
//!
//! The engine learns about data changes through a [`ChangeBus`]: the
//! host system publishes one [`EntityChange`] per committed mutation,
//! and the runtime subscribes exactly one handler per entity kind it
//! watches. [`ChangeHub`] is the bundled in-process implementation for
//! embedded use and tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VigilError, VigilResult};
use crate::identity::{ChangeId, EntityKind};
use crate::value::Value;

fn lock_err(context: &'static str) -> VigilError {
    VigilError::internal(format!("poisoned lock: {context}"))
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// The entity was created.
    Created,
    /// The entity was updated.
    Updated,
    /// The entity was deleted.
    Deleted,
}

/// One committed entity mutation.
///
/// Published after the owning transaction commits, so handlers observe
/// the post-mutation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityChange {
    /// Unique event ID, for correlation and de-duplication downstream.
    pub id: ChangeId,
    /// Kind of the mutated entity.
    pub kind: EntityKind,
    /// What happened.
    pub op: ChangeOp,
    /// Snapshot of the entity after the mutation.
    pub data: Value,
    /// When the mutation was committed.
    pub occurred_at: DateTime<Utc>,
}

impl EntityChange {
    /// Creates a change event with a fresh ID and the current time.
    #[must_use]
    pub fn new(kind: impl Into<EntityKind>, op: ChangeOp, data: impl Into<Value>) -> Self {
        Self {
            id: ChangeId::new(),
            kind: kind.into(),
            op,
            data: data.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Callback invoked for every published change of a subscribed kind.
pub type ChangeHandler = Arc<dyn Fn(&EntityChange) + Send + Sync>;

/// Subscription surface of the change feed.
pub trait ChangeBus: Send + Sync {
    /// Registers a handler for all future changes of `kind`.
    ///
    /// # Errors
    ///
    /// Fails when the feed cannot accept subscriptions.
    fn subscribe(&self, kind: &EntityKind, handler: ChangeHandler) -> VigilResult<()>;
}

/// In-process change feed.
///
/// Fan-out is synchronous: `publish` invokes every handler subscribed
/// to the change's kind on the calling thread, after the registration
/// lock is released, so handlers may themselves subscribe.
#[derive(Default)]
pub struct ChangeHub {
    handlers: RwLock<HashMap<EntityKind, Vec<ChangeHandler>>>,
}

impl ChangeHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a change to every handler subscribed to its kind.
    ///
    /// Returns the number of handlers invoked.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registration lock.
    pub fn publish(&self, change: &EntityChange) -> VigilResult<usize> {
        let matching: Vec<ChangeHandler> = {
            let handlers = self.handlers.read().map_err(|_| lock_err("hub.publish"))?;
            handlers.get(&change.kind).cloned().unwrap_or_default()
        };

        for handler in &matching {
            handler(change);
        }
        Ok(matching.len())
    }

    /// Returns how many handlers are subscribed to `kind`.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registration lock.
    pub fn handler_count(&self, kind: &EntityKind) -> VigilResult<usize> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| lock_err("hub.handler_count"))?;
        Ok(handlers.get(kind).map_or(0, Vec::len))
    }
}

impl ChangeBus for ChangeHub {
    fn subscribe(&self, kind: &EntityKind, handler: ChangeHandler) -> VigilResult<()> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| lock_err("hub.subscribe"))?;
        handlers.entry(kind.clone()).or_default().push(handler);
        Ok(())
    }
}

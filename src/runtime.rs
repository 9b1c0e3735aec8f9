//! The assembled system: registry, engine, dispatcher, change feed.
//!
//! [`VigilRuntime`] is the embedding surface. Host code builds one at
//! startup, registers its checks through it, and hands it mutation
//! events (directly or via a [`ChangeBus`] subscription). Everything
//! downstream of a mutation is fire-and-forget: the runtime maps the
//! event to jobs and enqueues them, and the dispatcher's workers do the
//! evaluation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::changes::{ChangeBus, ChangeHandler, EntityChange};
use crate::check::Check;
use crate::dispatch::{Dispatcher, Job};
use crate::engine::VigilEngine;
use crate::error::{ExecutionError, VigilError, VigilResult};
use crate::identity::{CheckSlug, EntityKind};
use crate::registry::RegisteredCheck;

/// Ties an engine to a dispatcher and a change feed.
pub struct VigilRuntime {
    engine: Arc<VigilEngine>,
    dispatcher: Arc<dyn Dispatcher>,
    changes: Arc<dyn ChangeBus>,
    watched: Mutex<HashSet<EntityKind>>,
}

impl VigilRuntime {
    /// Assembles a runtime.
    ///
    /// Returned behind an [`Arc`] because change-feed subscriptions
    /// hold weak references back to the runtime.
    #[must_use]
    pub fn new(
        engine: Arc<VigilEngine>,
        dispatcher: Arc<dyn Dispatcher>,
        changes: Arc<dyn ChangeBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            dispatcher,
            changes,
            watched: Mutex::new(HashSet::new()),
        })
    }

    /// The engine this runtime dispatches into.
    #[must_use]
    pub fn engine(&self) -> &VigilEngine {
        &self.engine
    }

    /// Registers a check and subscribes to the entity kinds its wired
    /// triggers listen to.
    ///
    /// # Errors
    ///
    /// Fails on slug collision, invalid naming, or when the change
    /// feed rejects a subscription.
    pub fn register(self: &Arc<Self>, check: Arc<dyn Check>) -> VigilResult<RegisteredCheck> {
        let registered = self.engine.registry().register(check)?;
        for kind in &registered.trigger_kinds {
            self.watch(kind)?;
        }
        Ok(registered)
    }

    // One subscription per entity kind no matter how many checks listen
    // to it; fan-out happens in entity_changed.
    fn watch(self: &Arc<Self>, kind: &EntityKind) -> VigilResult<()> {
        let mut watched = self
            .watched
            .lock()
            .map_err(|_| VigilError::internal("poisoned lock: runtime.watched"))?;
        if watched.contains(kind) {
            return Ok(());
        }

        // Weak, so an abandoned runtime does not keep itself alive
        // through the feed; a fired handler after drop is a no-op.
        let weak = Arc::downgrade(self);
        let handler: ChangeHandler = Arc::new(move |change: &EntityChange| {
            if let Some(runtime) = weak.upgrade() {
                runtime.entity_changed(change);
            }
        });
        self.changes.subscribe(kind, handler)?;
        watched.insert(kind.clone());
        Ok(())
    }

    /// Maps an entity mutation to single-subject jobs and enqueues
    /// them. Returns how many jobs were enqueued.
    ///
    /// Cost is one registry lookup plus one reactor call per listening
    /// check; a reactor returning `None` skips its check silently. All
    /// failures are logged and swallowed: a mutation event must never
    /// fail because a check misbehaved.
    pub fn entity_changed(&self, change: &EntityChange) -> usize {
        let bindings = match self.engine.registry().triggers_for_entity(&change.kind) {
            Ok(bindings) => bindings,
            Err(err) => {
                tracing::error!(kind = %change.kind, error = %err, "trigger lookup failed");
                return 0;
            }
        };

        let mut dispatched = 0;
        for (check, spec) in bindings {
            // The index only holds checks that had a reactor at
            // registration.
            let Some(reactor) = check.reactor() else { continue };
            let Some(subject) = reactor.payload(&spec, change) else {
                continue;
            };

            let slug = check.slug();
            match check.identifier(&subject) {
                Ok(identifier) => {
                    let job = Job::RunSubject {
                        slug: slug.clone(),
                        identifier,
                    };
                    match self.dispatcher.enqueue(job) {
                        Ok(()) => dispatched += 1,
                        Err(err) => {
                            tracing::error!(slug = %slug, error = %err, "trigger dispatch failed");
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(
                        slug = %slug,
                        error = %err,
                        "trigger identifier derivation failed"
                    );
                }
            }
        }
        dispatched
    }

    /// Enqueues a bulk run of one check.
    ///
    /// # Errors
    ///
    /// Fails when the slug is unregistered or the dispatcher refuses
    /// the job.
    pub fn run(&self, slug: &CheckSlug) -> VigilResult<()> {
        if self.engine.registry().get_check(slug)?.is_none() {
            return Err(VigilError::Execution(ExecutionError::UnknownCheck {
                slug: slug.clone(),
            }));
        }
        self.dispatcher.enqueue(Job::RunCheck { slug: slug.clone() })
    }

    /// Enqueues a bulk run of every registered check. Returns how many
    /// jobs were enqueued.
    ///
    /// # Errors
    ///
    /// Fails when the dispatcher refuses a job; earlier jobs stay
    /// enqueued.
    pub fn run_all(&self) -> VigilResult<usize> {
        let slugs = self.engine.registry().slugs()?;
        let count = slugs.len();
        for slug in slugs {
            self.dispatcher.enqueue(Job::RunCheck { slug })?;
        }
        Ok(count)
    }
}

//! The check contract.
//!
//! A check is a stateless, shareable implementation of one health
//! question ("is disk usage acceptable?", "are orders stuck?"). It
//! produces the subjects it applies to, evaluates each subject against a
//! configuration, and names each subject stably so results can be
//! stored and re-evaluated later.
//!
//! Optional behavior is expressed through capability traits reached via
//! accessor methods ([`Check::reactor`], [`Check::assignment`]) rather
//! than runtime probing: a check that returns `Some` has the
//! capability, one that returns `None` does not.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::changes::EntityChange;
use crate::config::CheckConfig;
use crate::error::VigilResult;
use crate::identity::{CheckSlug, EntityKind, Identifier};
use crate::status::Status;
use crate::value::Value;

/// One unit of work for a check: the payload describing what to
/// evaluate.
///
/// Payloads are opaque to the engine; only the owning check interprets
/// them. A payload can be as small as a hostname string or as rich as a
/// structured snapshot of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    payload: Value,
}

impl Subject {
    /// Creates a subject from a payload value.
    #[must_use]
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the subject and returns the payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // String payloads display unquoted; descriptions read better.
        match &self.payload {
            Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{other}"),
        }
    }
}

/// Declared naming of a check, from which its slug is derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckMeta {
    /// Namespace the check belongs to, e.g. a component or package name.
    pub namespace: String,
    /// Type name of the check, e.g. `"DiskSpace"`.
    pub name: String,
}

impl CheckMeta {
    /// Creates check metadata from a namespace and a name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derives the check's slug.
    #[must_use]
    pub fn slug(&self) -> CheckSlug {
        CheckSlug::derive(&self.namespace, &self.name)
    }
}

/// A declared interest in mutations of one entity kind.
///
/// The name distinguishes multiple triggers a check declares; the
/// check's [`Reactor`] receives it back when a matching mutation
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Trigger name, unique within the declaring check.
    pub name: String,
    /// Entity kind whose mutations this trigger listens to.
    pub entity: EntityKind,
}

impl TriggerSpec {
    /// Creates a trigger spec.
    #[must_use]
    pub fn new(name: impl Into<String>, entity: impl Into<EntityKind>) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
        }
    }
}

/// Trigger payload extraction capability.
///
/// A check that declares [`Check::triggers`] must expose a reactor; at
/// registration, declared triggers without one are warned about and
/// skipped. Returning `None` from [`Reactor::payload`] means the
/// mutation is irrelevant to this check and no evaluation is
/// dispatched; that is normal control flow, not an error.
pub trait Reactor: Send + Sync {
    /// Extracts the subject affected by an entity mutation, or `None`
    /// if the mutation does not concern this check.
    fn payload(&self, trigger: &TriggerSpec, change: &EntityChange) -> Option<Subject>;
}

/// Assignment computation capability.
///
/// Both fields are recomputed on every evaluation; a `None` return
/// clears any previously stored value.
pub trait AssignmentAware: Send + Sync {
    /// Who should look at this subject, given its freshly evaluated
    /// status.
    fn assigned_user(&self, subject: &Subject, status: Status) -> Option<String> {
        let _ = (subject, status);
        None
    }

    /// Which group should look at this subject.
    fn assigned_group(&self, subject: &Subject, status: Status) -> Option<String> {
        let _ = (subject, status);
        None
    }
}

/// A pluggable status check.
///
/// Implementations are `Send + Sync` and held behind `Arc<dyn Check>`
/// by the registry; all methods take `&self`.
///
/// `meta`, `generate`, `evaluate`, and `identifier` are mandatory. The
/// rest have defaults that suit most checks.
pub trait Check: Send + Sync {
    /// Declared naming, from which the slug is derived.
    fn meta(&self) -> CheckMeta;

    /// Produces the subjects this check currently applies to.
    ///
    /// The iterator must be finite. Each call starts a fresh pass, so a
    /// bulk run and a later re-run are independent.
    ///
    /// # Errors
    ///
    /// Fails when the subject source is unavailable; the bulk job
    /// reports the failure without touching any stored record.
    fn generate(&self) -> VigilResult<Box<dyn Iterator<Item = Subject> + '_>>;

    /// Evaluates one subject under the given configuration.
    ///
    /// Must be pure in `(subject, config)`: the engine resolves the
    /// effective configuration before calling, and evaluating the same
    /// subject twice with the same config must yield the same status.
    ///
    /// # Errors
    ///
    /// Fails when the subject cannot be evaluated; the failure is
    /// isolated to this subject.
    fn evaluate(&self, subject: &Subject, config: &CheckConfig) -> VigilResult<Status>;

    /// Derives the stable identifier of a subject.
    ///
    /// Equal subjects must map to equal identifiers across runs; the
    /// identifier is half of the stored record's natural key.
    ///
    /// # Errors
    ///
    /// Fails when the subject payload lacks the identifying fields.
    fn identifier(&self, subject: &Subject) -> VigilResult<Identifier>;

    /// The check's slug, derived from [`Check::meta`].
    fn slug(&self) -> CheckSlug {
        self.meta().slug()
    }

    /// Human-readable snapshot of a subject, stored on its record.
    ///
    /// Defaults to the payload's display form.
    fn describe(&self, subject: &Subject) -> String {
        subject.to_string()
    }

    /// Declared option defaults, applied wherever no per-subject
    /// configuration is stored.
    fn default_config(&self) -> CheckConfig {
        CheckConfig::new()
    }

    /// Reconstructs the subject behind an identifier, for
    /// single-subject jobs.
    ///
    /// The default scans [`Check::generate`]; checks with keyed access
    /// to their subjects should override with a direct lookup.
    ///
    /// # Errors
    ///
    /// Propagates `generate`/`identifier` failures.
    fn subject_for(&self, identifier: &Identifier) -> VigilResult<Option<Subject>> {
        for subject in self.generate()? {
            if self.identifier(&subject)? == *identifier {
                return Ok(Some(subject));
            }
        }
        Ok(None)
    }

    /// Entity kinds whose mutations should re-evaluate a subject of
    /// this check. Defaults to none.
    fn triggers(&self) -> Vec<TriggerSpec> {
        Vec::new()
    }

    /// The trigger payload extraction capability, if this check has it.
    fn reactor(&self) -> Option<&dyn Reactor> {
        None
    }

    /// The assignment computation capability, if this check has it.
    fn assignment(&self) -> Option<&dyn AssignmentAware> {
        None
    }
}

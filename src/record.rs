//! Stored check results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CheckConfig;
use crate::identity::{CheckSlug, Identifier};
use crate::status::Status;

/// A standing acknowledgment of a non-ok status.
///
/// The three fields travel together: an acknowledgment is either fully
/// present or fully absent, which is why [`CheckRecord`] stores it as a
/// single `Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// Who acknowledged, as an opaque reference into the host system.
    pub by: String,
    /// When the acknowledgment was made.
    pub at: DateTime<Utc>,
    /// When the acknowledgment expires.
    pub until: DateTime<Utc>,
}

impl Acknowledgment {
    /// Returns true if the acknowledgment is still in effect at `at`.
    #[must_use]
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.until > at
    }
}

/// The current evaluation state of one check subject.
///
/// Records are keyed by `(slug, identifier)`; at most one record exists
/// per key. They are created on a subject's first evaluation, mutated on
/// every subsequent one, and never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Slug of the check that produced this record.
    pub slug: CheckSlug,
    /// Identity of the evaluated subject.
    pub identifier: Identifier,
    /// Most recently evaluated status.
    pub status: Status,
    /// Stored per-subject configuration. Empty means the check's
    /// declared defaults apply.
    #[serde(default)]
    pub config: CheckConfig,
    /// Responsible user, recomputed on every evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<String>,
    /// Responsible group, recomputed on every evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_group: Option<String>,
    /// Human-readable snapshot of the subject at evaluation time.
    pub description: String,
    /// Standing acknowledgment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledgment: Option<Acknowledgment>,
    /// When the record was first created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl CheckRecord {
    /// Creates a fresh record with the given key and status.
    ///
    /// Configuration starts empty, assignment and acknowledgment start
    /// unset. Callers fill in the derived fields before persisting.
    #[must_use]
    pub fn new(slug: CheckSlug, identifier: Identifier, status: Status) -> Self {
        let now = Utc::now();
        Self {
            slug,
            identifier,
            status,
            config: CheckConfig::new(),
            assigned_user: None,
            assigned_group: None,
            description: String::new(),
            acknowledgment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the record's natural key.
    #[must_use]
    pub fn key(&self) -> (CheckSlug, Identifier) {
        (self.slug.clone(), self.identifier.clone())
    }

    /// Returns true if the record carries an acknowledgment still in
    /// effect at `at`.
    #[must_use]
    pub fn is_acknowledged(&self, at: DateTime<Utc>) -> bool {
        self.acknowledgment
            .as_ref()
            .map_or(false, |ack| ack.is_active(at))
    }
}

impl PartialEq for CheckRecord {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug && self.identifier == other.identifier
    }
}

impl Eq for CheckRecord {}

impl std::hash::Hash for CheckRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.slug.hash(state);
        self.identifier.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> CheckRecord {
        CheckRecord::new(
            CheckSlug::derive("checks", "DiskSpace"),
            Identifier::new("host-1"),
            Status::Critical,
        )
    }

    #[test]
    fn test_new_record_defaults() {
        let record = record();
        assert_eq!(record.status, Status::Critical);
        assert!(record.config.is_empty());
        assert!(record.assigned_user.is_none());
        assert!(record.assigned_group.is_none());
        assert!(record.description.is_empty());
        assert!(record.acknowledgment.is_none());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_record_key() {
        let record = record();
        let (slug, identifier) = record.key();
        assert_eq!(slug.as_str(), "checks.DiskSpace");
        assert_eq!(identifier.as_str(), "host-1");
    }

    #[test]
    fn test_is_acknowledged_window() {
        let now = Utc::now();
        let mut record = record();
        assert!(!record.is_acknowledged(now));

        record.acknowledgment = Some(Acknowledgment {
            by: "alice".to_string(),
            at: now,
            until: now + Duration::hours(1),
        });
        assert!(record.is_acknowledged(now));
        assert!(record.is_acknowledged(now + Duration::minutes(59)));
        assert!(!record.is_acknowledged(now + Duration::hours(2)));
    }

    #[test]
    fn test_record_equality_is_by_key() {
        let a = record();
        let mut b = record();
        b.status = Status::Ok;
        b.description = "different".to_string();

        // Records are equal if they describe the same (check, subject) pair
        assert_eq!(a, b);

        let other = CheckRecord::new(a.slug.clone(), Identifier::new("host-2"), Status::Ok);
        assert_ne!(a, other);
    }

    #[test]
    fn test_record_serialization() {
        let record = record();
        let json = serde_json::to_string(&record).unwrap();
        let deserialized: CheckRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.slug, deserialized.slug);
        assert_eq!(record.identifier, deserialized.identifier);
        assert_eq!(record.status, deserialized.status);

        // Unset optional fields are omitted from the wire form
        assert!(!json.contains("assigned_user"));
        assert!(!json.contains("acknowledgment"));
    }
}

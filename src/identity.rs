//! Identity types and slug resolution.
//!
//! Every check, subject, and data-entity type in vigil is addressed by a
//! stable string identity. Slugs are derived from declared naming, never
//! from registration order or memory addresses, so they survive restarts
//! and can be stored as foreign keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a check implementation.
///
/// A slug is derived from a namespace and a type name and has the form
/// `"<namespace>.<name>"`. It is the registry key and the persisted
/// foreign key of every [`crate::record::CheckRecord`].
///
/// # Examples
///
/// ```
/// use vigil::CheckSlug;
///
/// let slug = CheckSlug::derive("checks", "DiskSpace");
/// assert_eq!(slug.as_str(), "checks.DiskSpace");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckSlug(String);

impl CheckSlug {
    /// Derives a slug from a namespace and a check name.
    ///
    /// The derivation is pure and deterministic: equal inputs always
    /// produce equal slugs.
    #[must_use]
    pub fn derive(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}.{name}"))
    }

    /// Creates a slug from an already-composed string.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CheckSlug {
    fn from(slug: String) -> Self {
        Self(slug)
    }
}

impl From<&str> for CheckSlug {
    fn from(slug: &str) -> Self {
        Self(slug.to_string())
    }
}

/// Stable identity of a check subject.
///
/// Identifiers are application-defined opaque strings: a hostname, an
/// order number, a queue name. Together with a [`CheckSlug`] they form
/// the natural key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier from a string.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identifier {
    fn from(identifier: String) -> Self {
        Self(identifier)
    }
}

impl From<&str> for Identifier {
    fn from(identifier: &str) -> Self {
        Self(identifier.to_string())
    }
}

/// Stable identity of a data-entity type that mutations are reported
/// against, e.g. `"shop.Order"`.
///
/// Derived the same way as [`CheckSlug`]: a namespace plus a type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKind(String);

impl EntityKind {
    /// Derives an entity kind from a namespace and a type name.
    #[must_use]
    pub fn derive(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}.{name}"))
    }

    /// Creates an entity kind from an already-composed string.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

impl From<&str> for EntityKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_string())
    }
}

/// Unique identifier of a single entity mutation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(Uuid);

impl ChangeId {
    /// Creates a new random change ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a change ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ChangeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ChangeId> for Uuid {
    fn from(id: ChangeId) -> Self {
        id.0
    }
}

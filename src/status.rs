//! Check status levels.

use serde::{Deserialize, Serialize};

/// Severity of an evaluated check result.
///
/// The variants are ordered: `Ok < Warning < Critical`. [`Status::Ok`]
/// is the minimum, which is what makes "regressed to ok" a well-defined
/// transition for acknowledgment handling.
///
/// # Examples
///
/// ```
/// use vigil::Status;
///
/// assert!(Status::Ok < Status::Warning);
/// assert!(Status::Warning < Status::Critical);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Everything is fine.
    #[default]
    Ok,
    /// Something needs attention soon.
    Warning,
    /// Something needs attention now.
    Critical,
}

impl Status {
    /// Returns true if the status is [`Status::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns a lowercase label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

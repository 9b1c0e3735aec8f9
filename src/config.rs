//! Per-subject check configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A mapping of option name to value for one check subject.
///
/// An empty config means "no override": the check's declared defaults
/// apply. A non-empty stored config is used verbatim and is sticky for
/// its subject until explicitly re-saved, even if the check's defaults
/// change later.
///
/// # Examples
///
/// ```
/// use vigil::CheckConfig;
///
/// let config = CheckConfig::new()
///     .with("warning_percent", 80)
///     .with("critical_percent", 90);
/// assert_eq!(config.get("warning_percent").and_then(|v| v.as_int()), Some(80));
/// assert!(config.get("unset").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckConfig(BTreeMap<String, Value>);

impl CheckConfig {
    /// Creates an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of set options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the value of an option, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Sets an option, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Sets an option and returns the config, for chained construction.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Removes an option, returning its previous value if it was set.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Iterates over set options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for CheckConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

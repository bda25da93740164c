//! Dependency report entries

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// One resource in a dependency or dependant report.
///
/// Identity is the URI alone: two summaries for the same URI are equal whatever
/// their `transitive` flag, so a set keeps whichever was inserted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySummary {
    uri: String,
    transitive: bool,
}

impl DependencySummary {
    pub fn new(uri: impl Into<String>, transitive: bool) -> Self {
        Self {
            uri: uri.into(),
            transitive,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }
}

impl PartialEq for DependencySummary {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for DependencySummary {}

impl Hash for DependencySummary {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl PartialOrd for DependencySummary {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencySummary {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uri.cmp(&other.uri)
    }
}

impl std::fmt::Display for DependencySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

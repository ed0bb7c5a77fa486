//! Change set identifiers and batch requests.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConductorError;
use crate::model::route::ServiceRoute;

/// Caller-supplied id tying a batch of mutations to a reload outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeSetId(String);

impl ChangeSetId {
    /// Create an id. It is stored one per line, so it must be a single
    /// non-empty line without surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ConductorError> {
        let id = id.into();
        if id.is_empty() || id.contains(['\n', '\r']) || id.trim() != id {
            return Err(ConductorError::InvalidChangeSet(format!(
                "{:?} is not a valid change set id",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangeSetId {
    type Error = ConductorError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ChangeSetId> for String {
    fn from(id: ChangeSetId) -> Self {
        id.0
    }
}

impl fmt::Display for ChangeSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a successful mutation reaches the running proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Reload right away.
    #[default]
    Immediate,
    /// Queue the change set for the next scheduled reload cycle.
    Batched,
}

/// A batch of route mutations submitted in one call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteBatch {
    #[serde(default)]
    pub id: Option<ChangeSetId>,
    pub routes: Vec<ServiceRoute>,
    #[serde(default)]
    pub mode: ReloadMode,
}

/// Reload outcome reported for a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSetStatus {
    Pending,
    Success,
    Failed,
    NotFound,
}

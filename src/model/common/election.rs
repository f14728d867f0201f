use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle, in the order an election moves through them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Created, candidates may still be applying.
    #[serde(rename = "Not Started")]
    NotStarted,
    /// Opened by the organization; the candidate set is snapshotted for polling.
    Started,
    /// Voting is underway.
    Polling,
    /// Voting has closed.
    Completed,
    /// Results have been published.
    #[serde(rename = "Results Declared")]
    ResultsDeclared,
}

impl ElectionStatus {
    /// Is this election running, i.e. frozen against edits and deletion?
    pub fn is_active(self) -> bool {
        matches!(self, Self::Started | Self::Polling)
    }

    /// Statuses only ever move forward, and a new election must be started before anything
    /// else. Rewriting the current status is allowed.
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::NotStarted => next <= Self::Started,
            _ => next >= self,
        }
    }

    /// Does moving from `self` to `next` open the election?
    pub fn opens_polling(self, next: Self) -> bool {
        self < Self::Started && next >= Self::Started
    }
}

impl Default for ElectionStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotStarted => "Not Started",
            Self::Started => "Started",
            Self::Polling => "Polling",
            Self::Completed => "Completed",
            Self::ResultsDeclared => "Results Declared",
        };
        f.write_str(name)
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// A named office within an election that candidates apply for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    pub description: String,
}

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::{ElectionStatus, Position},
        time::{ClockTime, TimeWindow},
    },
    mongodb::Id,
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// The owning organization.
    pub organization: Id,
    pub name: String,
    /// Midnight UTC of the day the election is held.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: ElectionStatus,
    /// Offices candidates can apply for, in the order they were given.
    pub positions: Vec<Position>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// The window during which polling is open.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.date.date_naive(), self.start_time, self.end_time)
    }

    /// Does this election offer a position with the given name?
    pub fn has_position(&self, name: &str) -> bool {
        self.positions.iter().any(|position| position.name == name)
    }

    pub fn is_owned_by(&self, organization: Id) -> bool {
        self.organization == organization
    }

    /// Move to the `next` status, returning whether this opens the election for polling.
    pub fn transition(&mut self, next: ElectionStatus) -> Result<bool> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "Election cannot move from `{}` to `{}`",
                self.status, next
            )));
        }
        let opens = self.status.opens_polling(next);
        self.status = next;
        Ok(opens)
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{id::ApiId, require},
    common::{
        election::{ElectionStatus, Position},
        time::{start_of_day, ClockTime, TimeWindow},
    },
    db::election::{Election, ElectionCore, NewElection},
    mongodb::Id,
};

/// An election specification, as submitted by its organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub name: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub positions: Vec<Position>,
    /// Defaults to `Not Started`. Elections only start through a status change.
    #[serde(default)]
    pub status: Option<ElectionStatus>,
}

impl ElectionSpec {
    /// Convert this spec into an election owned by the given organization.
    pub fn into_election(self, organization: Id) -> Result<NewElection> {
        require("name", &self.name)?;
        check_window(&TimeWindow::new(self.date, self.start_time, self.end_time))?;
        let positions = normalize_positions(self.positions)?;
        let status = self.status.unwrap_or_default();
        if status.is_active() {
            return Err(Error::Validation(format!(
                "Elections cannot be created as `{status}`"
            )));
        }

        Ok(NewElection {
            organization,
            name: self.name,
            date: start_of_day(self.date),
            start_time: self.start_time,
            end_time: self.end_time,
            status,
            positions,
            created_at: Utc::now(),
        })
    }
}

fn check_window(window: &TimeWindow) -> Result<()> {
    if window.is_well_formed() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Election must start before it ends, got {} to {}",
            window.start, window.end
        )))
    }
}

/// Trim position names. Names are required and must be unique within an election.
fn normalize_positions(positions: Vec<Position>) -> Result<Vec<Position>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(positions.len());
    for mut position in positions {
        require("position name", &position.name)?;
        position.name = position.name.trim().to_string();
        if !seen.insert(position.name.clone()) {
            return Err(Error::Validation(format!(
                "Duplicate position `{}`",
                position.name
            )));
        }
        normalized.push(position);
    }
    Ok(normalized)
}

/// A partial update of an election. Absent fields are left unchanged.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ElectionUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub positions: Option<Vec<Position>>,
    pub status: Option<ElectionStatus>,
}

impl ElectionUpdate {
    /// Does this update touch anything other than the status?
    pub fn changes_details(&self) -> bool {
        self.name.is_some()
            || self.date.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
            || self.positions.is_some()
    }

    /// Apply every field except the status, which goes through [`ElectionCore::transition`].
    pub fn apply_details(&self, election: &mut ElectionCore) -> Result<()> {
        let mut window = election.window();
        if let Some(date) = self.date {
            window.date = date;
        }
        if let Some(start) = self.start_time {
            window.start = start;
        }
        if let Some(end) = self.end_time {
            window.end = end;
        }
        check_window(&window)?;
        let positions = self.positions.clone().map(normalize_positions).transpose()?;
        if let Some(name) = &self.name {
            require("name", name)?;
        }

        if let Some(name) = &self.name {
            election.name = name.clone();
        }
        election.date = start_of_day(window.date);
        election.start_time = window.start;
        election.end_time = window.end;
        if let Some(positions) = positions {
            election.positions = positions;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElectionStatusUpdate {
    pub status: ElectionStatus,
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub organization: ApiId,
    pub name: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: ElectionStatus,
    pub positions: Vec<Position>,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            organization: election.organization.into(),
            name: election.election.name,
            date: election.election.date.date_naive(),
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            status: election.election.status,
            positions: election.election.positions,
            created_at: election.election.created_at,
        }
    }
}

/// Just enough to pick an election from a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ApiId,
    pub name: String,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            name: election.election.name,
        }
    }
}

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        candidate::CandidateStatus,
        polling::PollingStatus,
        time::{ClockTime, TimeWindow},
    },
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
};

/// A candidate on the ballot, copied from the candidate record when polling was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominatedCandidate {
    pub candidate: Id,
    pub name: String,
    pub position: String,
    /// Never incremented: ballot casting is not implemented.
    pub vote_count: u32,
}

impl From<&Candidate> for NominatedCandidate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            candidate: candidate.id,
            name: candidate.name.clone(),
            position: candidate.applied_post.clone(),
            vote_count: 0,
        }
    }
}

/// Core polling data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingCore {
    pub organization: Id,
    pub election: Id,
    /// Midnight UTC of the polling day, copied from the election.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: PollingStatus,
    pub nominated: Vec<NominatedCandidate>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PollingCore {
    /// Snapshot the approved candidates of an election into a new polling record.
    ///
    /// Returns `None` if none of the given candidates are approved. The snapshot starts out
    /// `Not-Started`; call [`PollingCore::refresh_status`] to bring it up to date.
    pub fn snapshot(election: &Election, candidates: &[Candidate]) -> Option<NewPolling> {
        let nominated: Vec<NominatedCandidate> = candidates
            .iter()
            .filter(|candidate| {
                candidate.status == CandidateStatus::Approved && candidate.election == election.id
            })
            .map(NominatedCandidate::from)
            .collect();
        if nominated.is_empty() {
            return None;
        }

        Some(Self {
            organization: election.organization,
            election: election.id,
            date: election.date,
            start_time: election.start_time,
            end_time: election.end_time,
            status: PollingStatus::NotStarted,
            nominated,
            created_at: Utc::now(),
        })
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.date.date_naive(), self.start_time, self.end_time)
    }

    /// Re-derive the status at `now`, returning the new status iff it changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> Option<PollingStatus> {
        let status = self.window().status_at(now);
        if status == self.status {
            return None;
        }
        self.status = status;
        Some(status)
    }
}

/// A polling snapshot without an ID.
pub type NewPolling = PollingCore;

/// A polling snapshot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polling {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub polling: PollingCore,
}

impl Deref for Polling {
    type Target = PollingCore;

    fn deref(&self) -> &Self::Target {
        &self.polling
    }
}

impl DerefMut for Polling {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.polling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn snapshot_keeps_only_approved() {
        let org = Id::new();
        let election = Election::example(org);
        let approved = Candidate::example(org, election.id, CandidateStatus::Approved);
        let pending = Candidate::example(org, election.id, CandidateStatus::Pending);

        let polling = PollingCore::snapshot(&election, &[approved.clone(), pending]).unwrap();
        assert_eq!(polling.organization, org);
        assert_eq!(polling.election, election.id);
        assert_eq!(polling.status, PollingStatus::NotStarted);
        assert_eq!(
            polling.nominated,
            vec![NominatedCandidate {
                candidate: approved.id,
                name: approved.name.clone(),
                position: approved.applied_post.clone(),
                vote_count: 0,
            }]
        );
        assert_eq!(polling.window(), election.window());
    }

    #[test]
    fn no_snapshot_without_approved_candidates() {
        let org = Id::new();
        let election = Election::example(org);
        let rejected = Candidate::example(org, election.id, CandidateStatus::Rejected);
        let pending = Candidate::example(org, election.id, CandidateStatus::Pending);
        assert!(PollingCore::snapshot(&election, &[rejected, pending]).is_none());
        assert!(PollingCore::snapshot(&election, &[]).is_none());
    }

    #[test]
    fn other_elections_ignored() {
        let org = Id::new();
        let election = Election::example(org);
        let elsewhere = Candidate::example(org, Id::new(), CandidateStatus::Approved);
        assert!(PollingCore::snapshot(&election, &[elsewhere]).is_none());
    }

    #[test]
    fn status_refresh() {
        let org = Id::new();
        let election = Election::example(org);
        let approved = Candidate::example(org, election.id, CandidateStatus::Approved);
        let mut polling = PollingCore::snapshot(&election, &[approved]).unwrap();
        let window = polling.window();

        assert_eq!(
            polling.refresh_status(window.opens_at() - Duration::minutes(5)),
            None
        );
        assert_eq!(
            polling.refresh_status(window.opens_at()),
            Some(PollingStatus::Active)
        );
        assert_eq!(polling.refresh_status(window.closes_at()), None);
        assert_eq!(
            polling.refresh_status(window.closes_at() + Duration::minutes(1)),
            Some(PollingStatus::Completed)
        );
        assert_eq!(polling.status, PollingStatus::Completed);
    }
}

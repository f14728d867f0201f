use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateProfile, id::ApiId},
    common::{polling::PollingStatus, time::ClockTime},
    db::polling::{NominatedCandidate, Polling},
    mongodb::Id,
};

/// A request to open polling for one of the caller's elections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingRequest {
    #[serde(default)]
    pub election_id: Option<Id>,
}

/// A nominated candidate, with their public profile where the candidate still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeDescription {
    pub candidate: ApiId,
    pub name: String,
    pub position: String,
    pub vote_count: u32,
    pub profile: Option<CandidateProfile>,
}

impl NomineeDescription {
    pub fn new(nominee: NominatedCandidate, profile: Option<CandidateProfile>) -> Self {
        Self {
            candidate: nominee.candidate.into(),
            name: nominee.name,
            position: nominee.position,
            vote_count: nominee.vote_count,
            profile,
        }
    }
}

/// An API-friendly polling snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingDescription {
    pub id: ApiId,
    pub organization: ApiId,
    pub election: ApiId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub status: PollingStatus,
    pub nominated: Vec<NomineeDescription>,
}

impl PollingDescription {
    /// Describe the polling, looking up each nominee's profile with `profile_of`.
    pub fn new(
        polling: Polling,
        mut profile_of: impl FnMut(Id) -> Option<CandidateProfile>,
    ) -> Self {
        let core = polling.polling;
        Self {
            id: polling.id.into(),
            organization: core.organization.into(),
            election: core.election.into(),
            date: core.date.date_naive(),
            start_time: core.start_time,
            end_time: core.end_time,
            status: core.status,
            nominated: core
                .nominated
                .into_iter()
                .map(|nominee| {
                    let profile = profile_of(nominee.candidate);
                    NomineeDescription::new(nominee, profile)
                })
                .collect(),
        }
    }
}

impl From<Polling> for PollingDescription {
    fn from(polling: Polling) -> Self {
        Self::new(polling, |_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        common::candidate::CandidateStatus,
        db::{candidate::Candidate, election::Election, polling::PollingCore},
    };

    #[test]
    fn populated_nominees() {
        let org = Id::new();
        let election = Election::example(org);
        let approved = Candidate::example(org, election.id, CandidateStatus::Approved);
        let snapshot = PollingCore::snapshot(&election, &[approved.clone()]).unwrap();
        let polling = Polling {
            id: Id::new(),
            polling: snapshot,
        };

        let profile = CandidateProfile::from(approved.clone());
        let description = PollingDescription::new(polling.clone(), |id| {
            (id == approved.id).then(|| profile.clone())
        });
        assert_eq!(description.election, ApiId::from(election.id));
        assert_eq!(description.nominated.len(), 1);
        assert_eq!(description.nominated[0].profile, Some(profile));
        assert_eq!(description.nominated[0].vote_count, 0);

        let bare = PollingDescription::from(polling);
        assert_eq!(bare.nominated[0].profile, None);
        assert_eq!(bare.nominated[0].name, approved.name);
    }
}

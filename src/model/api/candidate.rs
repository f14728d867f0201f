use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{id::ApiId, require, require_email, set_text},
    auth::hash_password,
    common::candidate::CandidateStatus,
    db::{
        candidate::{Candidate, CandidateCore, NewCandidate},
        election::Election,
    },
    mongodb::Id,
};

/// A public application to stand in an election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateApplication {
    pub election: Id,
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    pub image: String,
    pub pay_image: String,
    pub gender: String,
    pub age: u32,
    pub applied_post: String,
    pub agenda: String,
}

impl CandidateApplication {
    /// Validate this application against the election it names, producing a pending candidate
    /// of that election's organization.
    pub fn into_candidate(self, election: &Election) -> Result<NewCandidate> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("address", &self.address)?;
        require("phone", &self.phone)?;
        require("image", &self.image)?;
        require("pay_image", &self.pay_image)?;
        require("gender", &self.gender)?;
        require("agenda", &self.agenda)?;
        check_post(election, &self.applied_post)?;

        Ok(NewCandidate {
            organization: election.organization,
            election: election.id,
            password_hash: hash_password(&self.password)?,
            name: self.name,
            email: self.email,
            address: self.address,
            phone: self.phone,
            image: self.image,
            pay_image: self.pay_image,
            gender: self.gender,
            age: self.age,
            status: CandidateStatus::Pending,
            applied_post: self.applied_post,
            agenda: self.agenda,
            created_at: Utc::now(),
        })
    }
}

fn check_post(election: &Election, post: &str) -> Result<()> {
    if election.has_position(post) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Election {} has no position `{post}`",
            election.id
        )))
    }
}

/// An organization registering a candidate directly, optionally pre-approving them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRegistration {
    #[serde(flatten)]
    pub application: CandidateApplication,
    #[serde(default)]
    pub status: Option<CandidateStatus>,
}

impl CandidateRegistration {
    pub fn into_candidate(self, election: &Election) -> Result<NewCandidate> {
        let mut candidate = self.application.into_candidate(election)?;
        candidate.status = self.status.unwrap_or_default();
        Ok(candidate)
    }
}

/// Fields a candidate may change on their own profile.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CandidateSelfUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub agenda: Option<String>,
}

impl CandidateSelfUpdate {
    pub fn apply_to(self, candidate: &mut CandidateCore) -> Result<()> {
        if let Some(password) = &self.password {
            candidate.password_hash = hash_password(password)?;
        }
        set_text("name", &mut candidate.name, self.name)?;
        set_text("address", &mut candidate.address, self.address)?;
        set_text("phone", &mut candidate.phone, self.phone)?;
        set_text("image", &mut candidate.image, self.image)?;
        set_text("gender", &mut candidate.gender, self.gender)?;
        set_text("agenda", &mut candidate.agenda, self.agenda)?;
        if let Some(age) = self.age {
            candidate.age = age;
        }
        Ok(())
    }
}

/// Fields an organization may change on one of its candidates.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub email: Option<String>,
    pub pay_image: Option<String>,
    pub applied_post: Option<String>,
    pub status: Option<CandidateStatus>,
    #[serde(flatten)]
    pub profile: CandidateSelfUpdate,
}

impl CandidateUpdate {
    /// Apply the update; a new post must exist in the candidate's election.
    pub fn apply_to(self, candidate: &mut CandidateCore, election: &Election) -> Result<()> {
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(post) = &self.applied_post {
            check_post(election, post)?;
        }
        set_text("email", &mut candidate.email, self.email)?;
        set_text("pay_image", &mut candidate.pay_image, self.pay_image)?;
        set_text("applied_post", &mut candidate.applied_post, self.applied_post)?;
        if let Some(status) = self.status {
            candidate.status = status;
        }
        self.profile.apply_to(candidate)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandidateStatusUpdate {
    pub status: CandidateStatus,
}

/// Set the status of all the caller's candidates, or only those of one election.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BulkStatusUpdate {
    pub status: CandidateStatus,
    #[serde(default)]
    pub election: Option<Id>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStatusResult {
    pub modified: u64,
}

/// A candidate record as seen by the candidate or their organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub organization: ApiId,
    pub election: ApiId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub image: String,
    pub pay_image: String,
    pub gender: String,
    pub age: u32,
    pub status: CandidateStatus,
    pub applied_post: String,
    pub agenda: String,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let id = candidate.id.into();
        let c = candidate.candidate;
        Self {
            id,
            organization: c.organization.into(),
            election: c.election.into(),
            name: c.name,
            email: c.email,
            address: c.address,
            phone: c.phone,
            image: c.image,
            pay_image: c.pay_image,
            gender: c.gender,
            age: c.age,
            status: c.status,
            applied_post: c.applied_post,
            agenda: c.agenda,
            created_at: c.created_at,
        }
    }
}

/// The public face of a candidate, shown to voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: ApiId,
    pub election: ApiId,
    pub name: String,
    pub image: String,
    pub gender: String,
    pub age: u32,
    pub applied_post: String,
    pub agenda: String,
}

impl From<Candidate> for CandidateProfile {
    fn from(candidate: Candidate) -> Self {
        let id = candidate.id.into();
        let c = candidate.candidate;
        Self {
            id,
            election: c.election.into(),
            name: c.name,
            image: c.image,
            gender: c.gender,
            age: c.age,
            applied_post: c.applied_post,
            agenda: c.agenda,
        }
    }
}

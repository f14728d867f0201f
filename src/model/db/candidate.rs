use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    auth::verify_password, common::candidate::CandidateStatus, mongodb::Id,
};

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub organization: Id,
    pub election: Id,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub phone: String,
    /// Profile picture URL on the external image host.
    pub image: String,
    /// Payment proof URL on the external image host.
    pub pay_image: String,
    pub gender: String,
    pub age: u32,
    pub status: CandidateStatus,
    /// Name of the election position applied for, copied at application time.
    pub applied_post: String,
    pub agenda: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl CandidateCore {
    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

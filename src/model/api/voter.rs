use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::{id::ApiId, require, require_email, set_text},
    auth::hash_password,
    db::voter::{NewVoter, Voter, VoterCore},
    mongodb::Id,
};

/// Voter details, as given to their organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterSpec {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    pub gender: String,
    pub age: u32,
    /// Voters registered by their organization may be activated straight away.
    #[serde(default)]
    pub status: bool,
}

impl VoterSpec {
    /// Validate the spec and hash the password. Nobody has voted yet.
    pub fn into_voter(self, organization: Id) -> Result<NewVoter> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("address", &self.address)?;
        require("phone", &self.phone)?;
        require("gender", &self.gender)?;

        Ok(NewVoter {
            organization,
            password_hash: hash_password(&self.password)?,
            name: self.name,
            email: self.email,
            address: self.address,
            phone: self.phone,
            gender: self.gender,
            age: self.age,
            status: self.status,
            voted: false,
            created_at: Utc::now(),
        })
    }
}

/// A public self-registration into an organization. Always starts inactive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterRegistration {
    pub organization: Id,
    #[serde(flatten)]
    pub voter: VoterSpec,
}

impl VoterRegistration {
    pub fn into_voter(self) -> Result<NewVoter> {
        let mut voter = self.voter.into_voter(self.organization)?;
        voter.status = false;
        Ok(voter)
    }
}

/// Fields a voter may change on their own profile.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VoterSelfUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
}

impl VoterSelfUpdate {
    pub fn apply_to(self, voter: &mut VoterCore) -> Result<()> {
        if let Some(password) = &self.password {
            voter.password_hash = hash_password(password)?;
        }
        set_text("name", &mut voter.name, self.name)?;
        set_text("address", &mut voter.address, self.address)?;
        set_text("phone", &mut voter.phone, self.phone)?;
        set_text("gender", &mut voter.gender, self.gender)?;
        if let Some(age) = self.age {
            voter.age = age;
        }
        Ok(())
    }
}

/// Fields an organization may change on one of its voters. Status has its own endpoint.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VoterUpdate {
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: VoterSelfUpdate,
}

impl VoterUpdate {
    pub fn apply_to(self, voter: &mut VoterCore) -> Result<()> {
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        set_text("email", &mut voter.email, self.email)?;
        self.profile.apply_to(voter)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoterStatusUpdate {
    pub status: bool,
}

/// A voter record as seen by the voter or their organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub id: ApiId,
    pub organization: ApiId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub gender: String,
    pub age: u32,
    pub status: bool,
    pub voted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        let id = voter.id.into();
        let v = voter.voter;
        Self {
            id,
            organization: v.organization.into(),
            name: v.name,
            email: v.email,
            address: v.address,
            phone: v.phone,
            gender: v.gender,
            age: v.age,
            status: v.status,
            voted: v.voted,
            created_at: v.created_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    #[test]
    fn registration_starts_inactive() {
        let org = Id::new();
        let registration = VoterRegistration {
            organization: org,
            voter: VoterSpec::example(),
        };
        let voter = registration.into_voter().unwrap();
        assert_eq!(voter.organization, org);
        assert!(!voter.status);
        assert!(!voter.voted);

        let voter = VoterSpec::example().into_voter(org).unwrap();
        assert!(voter.status);
    }

    #[test]
    fn self_update_allow_list() {
        let mut voter = VoterCore::example(Id::new());
        let update: VoterSelfUpdate = serde_json::from_value(json!({
            "email": "x@example.com",
            "status": false,
            "voted": true,
            "phone": "5559999999",
        }))
        .unwrap();
        update.apply_to(&mut voter).unwrap();
        assert_eq!(voter.phone, "5559999999");
        assert_eq!(voter.email, "sam@example.com");
        assert!(voter.status);
        assert!(!voter.voted);
    }

    #[test]
    fn organization_update() {
        let mut voter = VoterCore::example(Id::new());
        let update: VoterUpdate = serde_json::from_value(json!({
            "email": "samuel@example.com",
            "name": "Samuel Voter",
            "voted": true,
        }))
        .unwrap();
        update.apply_to(&mut voter).unwrap();
        assert_eq!(voter.email, "samuel@example.com");
        assert_eq!(voter.name, "Samuel Voter");
        assert!(!voter.voted);
    }
}

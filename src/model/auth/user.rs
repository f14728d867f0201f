use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{admin::Admin, candidate::Candidate, organization::Organization, voter::Voter},
    mongodb::{Id, MongoCollection},
};

/// A user of our application, having defined rights.
pub trait User: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// The rights of this user type.
    const RIGHTS: Rights;
    /// Get the user's ID.
    fn id(&self) -> Id;
}

/// Different principal types.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
    Organization = 2,
    Candidate = 3,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
                Self::Organization => "organization",
                Self::Candidate => "candidate",
            }
        )
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }
}

impl User for Organization {
    const RIGHTS: Rights = Rights::Organization;

    fn id(&self) -> Id {
        self.id
    }
}

impl User for Candidate {
    const RIGHTS: Rights = Rights::Candidate;

    fn id(&self) -> Id {
        self.id
    }
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn id(&self) -> Id {
        self.id
    }
}

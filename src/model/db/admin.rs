use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    auth::{hash_password, verify_password},
    mongodb::{Coll, Id},
};

pub const DEFAULT_ADMIN_NAME: &str = "Administrator";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-me-immediately";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Seed the default admin if there are no admins at all, so the portal can be bootstrapped.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>) -> Result<()> {
    let count = admins.count_documents(None, None).await?;
    if count == 0 {
        let admin = NewAdmin {
            name: DEFAULT_ADMIN_NAME.to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD)?,
        };
        admins.insert_one(admin, None).await?;
        warn!("No admins found; created default admin {DEFAULT_ADMIN_EMAIL}. Change its password!");
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        pub fn example() -> Self {
            Self {
                name: "Election Coordinator".to_string(),
                email: "coordinator@example.com".to_string(),
                password_hash: hash_password(Self::EXAMPLE_PASSWORD).unwrap(),
            }
        }

        pub const EXAMPLE_PASSWORD: &'static str = "coordinator-password";
    }
}

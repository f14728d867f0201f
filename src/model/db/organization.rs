use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{auth::verify_password, mongodb::Id};

/// Core organization data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCore {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub phone: String,
    /// URL of the logo on the external image host.
    pub logo: String,
    pub description: String,
    pub website: Option<String>,
    pub org_type: String,
    /// Set by an admin; inactive organizations cannot log in.
    pub status: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl OrganizationCore {
    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// An organization without an ID.
pub type NewOrganization = OrganizationCore;

/// An organization from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub org: OrganizationCore,
}

impl Deref for Organization {
    type Target = OrganizationCore;

    fn deref(&self) -> &Self::Target {
        &self.org
    }
}

impl DerefMut for Organization {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.org
    }
}

/// A placeholder logo showing the initials of the first two words of the name,
/// or the first letter twice for single-word names.
pub fn placeholder_logo(name: &str) -> String {
    let mut initials = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase);
    let first = initials.next().unwrap_or('?');
    let second = initials.next().unwrap_or(first);
    format!("https://placehold.co/100x100?text={first}{second}")
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::auth::hash_password;

    impl OrganizationCore {
        pub const EXAMPLE_PASSWORD: &'static str = "commission-password";

        pub fn example() -> Self {
            Self {
                name: "Election Commission".to_string(),
                email: "ec@example.com".to_string(),
                password_hash: hash_password(Self::EXAMPLE_PASSWORD).unwrap(),
                address: "123 Main St, City".to_string(),
                phone: "1234567890".to_string(),
                logo: placeholder_logo("Election Commission"),
                description: "Official Election Commission".to_string(),
                website: Some("https://ec.example.com".to_string()),
                org_type: "Government".to_string(),
                status: true,
                created_at: Utc::now(),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Local Elections Board".to_string(),
                email: "leb@example.com".to_string(),
                password_hash: hash_password(Self::EXAMPLE_PASSWORD).unwrap(),
                address: "456 Oak St, Town".to_string(),
                phone: "0987654321".to_string(),
                logo: placeholder_logo("Local Elections Board"),
                description: "Local Elections Board".to_string(),
                website: None,
                org_type: "Local Government".to_string(),
                status: true,
                created_at: Utc::now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_initials() {
        assert_eq!(
            placeholder_logo("election commission"),
            "https://placehold.co/100x100?text=EC"
        );
        assert_eq!(
            placeholder_logo("Board"),
            "https://placehold.co/100x100?text=BB"
        );
        assert_eq!(
            placeholder_logo("Local Elections Board"),
            "https://placehold.co/100x100?text=LE"
        );
    }
}

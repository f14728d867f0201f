use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::{id::ApiId, require, require_email, set_text},
    auth::hash_password,
    db::organization::{placeholder_logo, NewOrganization, Organization, OrganizationCore},
};

/// An admin's request to register an organization.
#[derive(Clone, Deserialize, Serialize)]
pub struct OrganizationSpec {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub description: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(rename = "type")]
    pub org_type: String,
    /// Organizations start out inactive unless stated otherwise.
    #[serde(default)]
    pub status: bool,
}

impl OrganizationSpec {
    /// Validate the spec and hash its password, defaulting the logo to the name's initials.
    pub fn into_organization(self) -> Result<NewOrganization> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("address", &self.address)?;
        require("phone", &self.phone)?;
        require("description", &self.description)?;
        require("type", &self.org_type)?;

        let logo = self
            .logo
            .filter(|logo| !logo.trim().is_empty())
            .unwrap_or_else(|| placeholder_logo(&self.name));
        Ok(NewOrganization {
            password_hash: hash_password(&self.password)?,
            name: self.name,
            email: self.email,
            address: self.address,
            phone: self.phone,
            logo,
            description: self.description,
            website: self.website.filter(|site| !site.trim().is_empty()),
            org_type: self.org_type,
            status: self.status,
            created_at: Utc::now(),
        })
    }
}

/// Profile fields an organization may change itself.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OrganizationSelfUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "type")]
    pub org_type: Option<String>,
}

impl OrganizationSelfUpdate {
    pub fn apply_to(self, org: &mut OrganizationCore) -> Result<()> {
        set_text("name", &mut org.name, self.name)?;
        set_text("address", &mut org.address, self.address)?;
        set_text("phone", &mut org.phone, self.phone)?;
        set_text("logo", &mut org.logo, self.logo)?;
        set_text("description", &mut org.description, self.description)?;
        set_text("type", &mut org.org_type, self.org_type)?;
        if let Some(website) = self.website {
            org.website = Some(website).filter(|site| !site.trim().is_empty());
        }
        Ok(())
    }
}

/// Fields an admin may change on any organization. Status has its own endpoint.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OrganizationUpdate {
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: OrganizationSelfUpdate,
}

impl OrganizationUpdate {
    pub fn apply_to(self, org: &mut OrganizationCore) -> Result<()> {
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        set_text("email", &mut org.email, self.email)?;
        self.profile.apply_to(org)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct OrganizationStatusUpdate {
    pub status: bool,
}

/// Request to (re)issue login credentials to an organization by email.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
}

/// An organization's public profile. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDescription {
    pub id: ApiId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub logo: String,
    pub description: String,
    pub website: Option<String>,
    #[serde(rename = "type")]
    pub org_type: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationDescription {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id.into(),
            name: org.org.name,
            email: org.org.email,
            address: org.org.address,
            phone: org.org.phone,
            logo: org.org.logo,
            description: org.org.description,
            website: org.org.website,
            org_type: org.org.org_type,
            status: org.org.status,
            created_at: org.org.created_at,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl OrganizationSpec {
        pub fn example() -> Self {
            Self {
                name: "Student Union".to_string(),
                email: "union@example.com".to_string(),
                password: "union-password".to_string(),
                address: "1 Campus Rd".to_string(),
                phone: "5551234567".to_string(),
                logo: None,
                description: "Student representation".to_string(),
                website: None,
                org_type: "Educational".to_string(),
                status: false,
            }
        }
    }
}

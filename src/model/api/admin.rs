use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{id::ApiId, require, require_email, set_text},
    auth::hash_password,
    db::admin::{Admin, AdminCore, NewAdmin},
};

/// A request to register another admin.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminSpec {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl TryFrom<AdminSpec> for NewAdmin {
    type Error = Error;

    /// Convert an [`AdminSpec`] to a new admin by hashing the password.
    /// This enforces that the name and email are present, and the password meets minimum length.
    fn try_from(spec: AdminSpec) -> Result<Self> {
        require("name", &spec.name)?;
        require_email(&spec.email)?;
        Ok(Self {
            name: spec.name,
            email: spec.email,
            password_hash: hash_password(&spec.password)?,
        })
    }
}

/// Fields an admin may change on their own profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AdminProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AdminProfileUpdate {
    pub fn apply_to(self, admin: &mut AdminCore) -> Result<()> {
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        set_text("name", &mut admin.name, self.name)?;
        set_text("email", &mut admin.email, self.email)
    }
}

/// An admin as shown to other admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDescription {
    pub id: ApiId,
    pub name: String,
    pub email: String,
}

impl From<Admin> for AdminDescription {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id.into(),
            name: admin.admin.name,
            email: admin.admin.email,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, auth::Rights};

/// Raw login credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Returned on successful login. The same token is also set as the session cookie,
/// for clients that prefer bearer authentication.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: ApiId,
    pub name: String,
    pub rights: Rights,
    pub token: String,
}

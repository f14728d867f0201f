use mongodb::{
    bson::{doc, Bson},
    options::FindOptions,
};
use rocket::http::CookieJar;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::auth::{LoginCredentials, LoginResponse},
    auth::{session_cookie, AuthToken, User},
    db::{candidate::Candidate, election::Election, polling::Polling, voter::Voter},
    mongodb::{Coll, Id, MongoCollection},
};

/// A record that belongs to exactly one organization.
pub(crate) trait Owned: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// Human-readable name of the record type, for error messages.
    const KIND: &'static str;

    fn owner(&self) -> Id;
}

impl Owned for Election {
    const KIND: &'static str = "Election";

    fn owner(&self) -> Id {
        self.organization
    }
}

impl Owned for Candidate {
    const KIND: &'static str = "Candidate";

    fn owner(&self) -> Id {
        self.organization
    }
}

impl Owned for Voter {
    const KIND: &'static str = "Voter";

    fn owner(&self) -> Id {
        self.organization
    }
}

impl Owned for Polling {
    const KIND: &'static str = "Polling";

    fn owner(&self) -> Id {
        self.organization
    }
}

/// Find a record by ID, checking it belongs to the given organization.
pub(crate) async fn find_owned<T: Owned>(items: &Coll<T>, id: Id, organization: Id) -> Result<T> {
    let item = items
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("{} {id}", T::KIND)))?;
    if item.owner() != organization {
        return Err(Error::not_owner(format!("{} {id}", T::KIND)));
    }
    Ok(item)
}

/// Fetch the user a token was issued to.
pub(crate) async fn load_user<U: User>(token: &AuthToken<U>, users: &Coll<U>) -> Result<U> {
    users
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::Unauthorized(format!("No {} with ID {}", U::RIGHTS, token.id)))
}

/// Find a user by email and check their password.
pub(crate) async fn authenticate<U: User>(
    credentials: &LoginCredentials,
    users: &Coll<U>,
    verify: impl FnOnce(&U, &str) -> bool,
) -> Result<U> {
    let with_email = doc! {
        "email": &credentials.email,
    };
    users
        .find_one(with_email, None)
        .await?
        .filter(|user| verify(user, &credentials.password))
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))
}

/// Log the user in: set the session cookie and hand the same token back.
pub(crate) fn start_session<U: User>(
    user: &U,
    name: &str,
    cookies: &CookieJar<'_>,
    config: &Config,
) -> LoginResponse {
    let token = AuthToken::new(user).encode(config);
    cookies.add(session_cookie(token.clone(), config));
    LoginResponse {
        id: user.id().into(),
        name: name.to_string(),
        rights: U::RIGHTS,
        token,
    }
}

/// Insert a new record and read it back in its stored form, with its ID.
/// A duplicate key on a unique index becomes a conflict.
pub(crate) async fn insert_new<N, T>(
    new_items: &Coll<N>,
    items: &Coll<T>,
    item: &N,
    what: &str,
) -> Result<T>
where
    N: Serialize,
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let inserted = new_items
        .insert_one(item, None)
        .await
        .map_err(|err| Error::conflict_on_duplicate(err, what))?;
    let with_id = doc! {
        "_id": inserted.inserted_id,
    };
    items
        .find_one(with_id, None)
        .await?
        .ok_or_else(|| Error::not_found(what))
}

/// Write back a modified record.
pub(crate) async fn save<T: Serialize>(items: &Coll<T>, id: Id, item: &T, what: &str) -> Result<()> {
    let result = items
        .replace_one(id.as_doc(), item, None)
        .await
        .map_err(|err| Error::conflict_on_duplicate(err, what))?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("{what} {id}")));
    }
    Ok(())
}

/// Sort newest records first.
pub(crate) fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build()
}

/// Filter on the owning organization.
pub(crate) fn owned_by(organization: Id) -> mongodb::bson::Document {
    doc! {
        "organization": Bson::from(organization),
    }
}

/// Report the failure of a best-effort side effect without failing the request.
pub(crate) fn log_side_effect<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{what} failed: {err}");
            None
        }
    }
}

use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    candidate::{Candidate, NewCandidate},
    election::{Election, NewElection},
    organization::{NewOrganization, Organization},
    polling::{NewPolling, Polling},
    voter::{NewVoter, Voter},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Admin collections
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Organization collections
const ORGANIZATIONS: &str = "organizations";
impl MongoCollection for Organization {
    const NAME: &'static str = ORGANIZATIONS;
}
impl MongoCollection for NewOrganization {
    const NAME: &'static str = ORGANIZATIONS;
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Voter collections
const VOTERS: &str = "voters";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}
impl MongoCollection for NewVoter {
    const NAME: &'static str = VOTERS;
}

// Polling collections
const POLLINGS: &str = "pollings";
impl MongoCollection for Polling {
    const NAME: &'static str = POLLINGS;
}
impl MongoCollection for NewPolling {
    const NAME: &'static str = POLLINGS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();
    let unique_email = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();

    // Principal collections: one account per email address.
    Coll::<Admin>::from_db(db)
        .create_index(unique_email.clone(), None)
        .await?;
    Coll::<Organization>::from_db(db)
        .create_index(unique_email.clone(), None)
        .await?;
    Coll::<Candidate>::from_db(db)
        .create_index(unique_email.clone(), None)
        .await?;
    Coll::<Voter>::from_db(db)
        .create_index(unique_email, None)
        .await?;

    // Polling collection: at most one snapshot per election.
    let polling_index = IndexModel::builder()
        .keys(doc! {"organization": 1, "election": 1})
        .options(unique)
        .build();
    Coll::<Polling>::from_db(db)
        .create_index(polling_index, None)
        .await?;

    Ok(())
}

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    Database,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    api::common::{find_owned, insert_new, load_user},
    error::{Error, Result},
    model::{
        api::{
            candidate::CandidateProfile,
            polling::{PollingDescription, PollingRequest},
        },
        auth::AuthToken,
        common::{candidate::CandidateStatus, time::start_of_day},
        db::{
            candidate::Candidate,
            election::Election,
            organization::Organization,
            polling::{NewPolling, Polling, PollingCore},
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create, current_for_organization, current_for_voter]
}

/// Open polling for one of an organization's elections, snapshotting its approved candidates.
///
/// Fails if the election is missing or foreign, if polling is already open for it, or if it has
/// no approved candidates. The new polling's status is brought up to date before returning.
pub(crate) async fn create_polling(db: &Database, organization: Id, election_id: Id) -> Result<Polling> {
    let election = find_owned(&Coll::<Election>::from_db(db), election_id, organization).await?;

    let pollings = Coll::<Polling>::from_db(db);
    let for_election = doc! {
        "organization": organization,
        "election": election_id,
    };
    if pollings.find_one(for_election, None).await?.is_some() {
        return Err(Error::Conflict(format!(
            "Polling for election {election_id} already exists"
        )));
    }

    let approved = doc! {
        "organization": organization,
        "election": election_id,
        "status": CandidateStatus::Approved,
    };
    let candidates: Vec<Candidate> = Coll::<Candidate>::from_db(db)
        .find(approved, None)
        .await?
        .try_collect()
        .await?;
    let snapshot = PollingCore::snapshot(&election, &candidates).ok_or_else(|| {
        Error::Validation(format!(
            "Election {election_id} has no approved candidates"
        ))
    })?;

    // The unique index catches a concurrent creation that slipped past the check above.
    let what = format!("Polling for election {election_id}");
    let polling = insert_new(&Coll::<NewPolling>::from_db(db), &pollings, &snapshot, &what).await?;
    info!(
        "Opened polling {} for election {election_id} with {} candidates",
        polling.id,
        polling.nominated.len()
    );
    refresh_status(&pollings, polling, Utc::now()).await
}

/// Re-derive a polling's status at `now`, persisting it if it changed.
async fn refresh_status(
    pollings: &Coll<Polling>,
    mut polling: Polling,
    now: DateTime<Utc>,
) -> Result<Polling> {
    if let Some(status) = polling.refresh_status(now) {
        let set_status = doc! {
            "$set": {
                "status": status,
            }
        };
        pollings
            .update_one(polling.id.as_doc(), set_status, None)
            .await?;
        debug!("Polling {} is now {status:?}", polling.id);
    }
    Ok(polling)
}

/// Filter for an organization's pollings held on the current UTC day.
fn held_today(organization: Id, now: DateTime<Utc>) -> Document {
    let today = start_of_day(now.date_naive());
    doc! {
        "organization": organization,
        "date": {
            "$gte": BsonDateTime::from_chrono(today),
            "$lt": BsonDateTime::from_chrono(today + Duration::days(1)),
        },
    }
}

/// Today's pollings for an organization, with up-to-date statuses and nominee profiles.
async fn current_pollings(db: &Database, organization: Id) -> Result<Vec<PollingDescription>> {
    let now = Utc::now();
    let pollings = Coll::<Polling>::from_db(db);
    let found: Vec<Polling> = pollings
        .find(held_today(organization, now), None)
        .await?
        .try_collect()
        .await?;

    let mut current = Vec::with_capacity(found.len());
    for polling in found {
        current.push(refresh_status(&pollings, polling, now).await?);
    }

    // Populate every nominee in one query.
    let nominee_ids: Vec<Id> = current
        .iter()
        .flat_map(|polling| polling.nominated.iter().map(|nominee| nominee.candidate))
        .collect();
    let with_ids = doc! {
        "_id": { "$in": nominee_ids },
    };
    let profiles: HashMap<Id, CandidateProfile> = Coll::<Candidate>::from_db(db)
        .find(with_ids, None)
        .await?
        .map_ok(|candidate| (candidate.id, CandidateProfile::from(candidate)))
        .try_collect()
        .await?;

    Ok(current
        .into_iter()
        .map(|polling| PollingDescription::new(polling, |id| profiles.get(&id).cloned()))
        .collect())
}

#[post("/api/polling/create", data = "<request>", format = "json")]
async fn create(
    token: AuthToken<Organization>,
    request: Json<PollingRequest>,
    db: &State<Database>,
) -> Result<Json<PollingDescription>> {
    let election_id = request
        .election_id
        .ok_or_else(|| Error::Validation("`election_id` is required".to_string()))?;
    let polling = create_polling(db, token.id, election_id).await?;
    Ok(Json(polling.into()))
}

#[get("/api/polling", rank = 1)]
async fn current_for_organization(
    token: AuthToken<Organization>,
    db: &State<Database>,
) -> Result<Json<Vec<PollingDescription>>> {
    Ok(Json(current_pollings(db, token.id).await?))
}

#[get("/api/polling", rank = 2)]
async fn current_for_voter(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    db: &State<Database>,
) -> Result<Json<Vec<PollingDescription>>> {
    let voter = load_user(&token, &voters).await?;
    Ok(Json(current_pollings(db, voter.organization).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };

    use crate::api::testing::{count_matches, insert, login_voter};
    use crate::model::{
        api::election::ElectionSpec,
        common::polling::PollingStatus,
        db::{
            candidate::{CandidateCore, NewCandidate},
            election::NewElection,
            organization::{NewOrganization, OrganizationCore},
        },
    };

    use super::*;

    async fn my_org(db: &Database) -> Id {
        Coll::<Organization>::from_db(db)
            .find_one(doc! { "email": "ec@example.com" }, None)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Insert an election with one approved and one pending candidate.
    async fn election_with_candidates(db: &Database, org: Id) -> (Id, Id) {
        let election = insert::<NewElection>(db, &NewElection::example(org)).await;
        let mut approved = CandidateCore::example(org, election);
        approved.status = CandidateStatus::Approved;
        let approved = insert::<NewCandidate>(db, &approved).await;
        let pending = CandidateCore::example2(org, election);
        insert::<NewCandidate>(db, &pending).await;
        (election, approved)
    }

    async fn create_expect_status<'c>(
        client: &'c Client,
        body: String,
        status: Status,
    ) -> LocalResponse<'c> {
        let response = client
            .post(uri!(create))
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        assert_eq!(status, response.status());
        response
    }

    fn request_for(election: Id) -> String {
        serde_json::to_string(&PollingRequest {
            election_id: Some(election),
        })
        .unwrap()
    }

    #[backend_test(organization)]
    async fn snapshot_contains_only_approved(client: Client, db: Database) {
        let org = my_org(&db).await;
        let (election, approved) = election_with_candidates(&db, org).await;

        let response = create_expect_status(&client, request_for(election), Status::Ok).await;
        let polling: PollingDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(polling.nominated.len(), 1);
        assert_eq!(*polling.nominated[0].candidate, approved);
        assert_eq!(polling.nominated[0].vote_count, 0);
        // The example election runs all day today.
        assert_eq!(polling.status, PollingStatus::Active);

        let stored = Coll::<Polling>::from_db(&db)
            .find_one(polling.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PollingStatus::Active);

        // Only one polling per election.
        create_expect_status(&client, request_for(election), Status::Conflict).await;
        assert_eq!(count_matches::<Polling>(&db, doc! {}).await, 1);
    }

    #[backend_test(organization)]
    async fn invalid_requests(client: Client, db: Database) {
        let org = my_org(&db).await;

        // Missing ID.
        create_expect_status(&client, "{}".to_string(), Status::BadRequest).await;

        // Unknown election.
        create_expect_status(&client, request_for(Id::new()), Status::NotFound).await;

        // No approved candidates.
        let election = insert::<NewElection>(&db, &NewElection::example(org)).await;
        insert::<NewCandidate>(&db, &CandidateCore::example(org, election)).await;
        create_expect_status(&client, request_for(election), Status::BadRequest).await;
        assert_eq!(count_matches::<Polling>(&db, doc! {}).await, 0);

        // Someone else's election.
        let other = insert::<NewOrganization>(&db, &OrganizationCore::example2()).await;
        let foreign = insert::<NewElection>(&db, &NewElection::example(other)).await;
        create_expect_status(&client, request_for(foreign), Status::Forbidden).await;
    }

    #[backend_test(organization)]
    async fn current_pollings_are_populated(client: Client, db: Database) {
        let org = my_org(&db).await;
        let (election, approved) = election_with_candidates(&db, org).await;
        create_expect_status(&client, request_for(election), Status::Ok).await;

        // A polling on another day is not current.
        let mut later = ElectionSpec::future_example().into_election(org).unwrap();
        later.name = "Later".to_string();
        let later = insert::<NewElection>(&db, &later).await;
        let mut candidate = CandidateCore::example(org, later);
        candidate.email = "later@example.com".to_string();
        candidate.applied_post = "Treasurer".to_string();
        candidate.status = CandidateStatus::Approved;
        insert::<NewCandidate>(&db, &candidate).await;
        create_expect_status(&client, request_for(later), Status::Ok).await;

        let response = client.get(uri!(current_for_organization)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let current: Vec<PollingDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(*current[0].election, election);
        let profile = current[0].nominated[0].profile.as_ref().unwrap();
        assert_eq!(*profile.id, approved);
        assert_eq!(profile.name, "Jane Doe");
    }

    #[backend_test]
    async fn voters_see_their_organizations_pollings(client: Client, db: Database) {
        login_voter(&client, &db).await;
        let org = my_org(&db).await;
        let (election, _) = election_with_candidates(&db, org).await;
        create_polling(&db, org, election).await.unwrap();

        let response = client.get(uri!(current_for_voter)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let current: Vec<PollingDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(current.len(), 1);

        // Voters cannot open polling.
        let response = client
            .post(uri!(create))
            .header(ContentType::JSON)
            .body(request_for(election))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}

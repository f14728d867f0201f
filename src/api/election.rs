use mongodb::{bson::doc, Client, Database};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    api::{
        common::{find_owned, insert_new, load_user, log_side_effect, newest_first, owned_by, save},
        polling::create_polling,
    },
    error::{Error, Result},
    model::{
        api::election::{ElectionDescription, ElectionSpec, ElectionStatusUpdate, ElectionUpdate},
        auth::AuthToken,
        common::election::ElectionStatus,
        db::{
            candidate::Candidate,
            election::{Election, NewElection},
            organization::Organization,
            polling::Polling,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        update_election,
        set_election_status,
        delete_election,
        get_elections,
        get_election,
        active_for_organization,
        active_for_candidate,
        active_for_voter,
    ]
}

/// Move an election to a new status, opening polling if it has just started.
///
/// The election must be saved before polling is opened, so this only updates it in memory;
/// the returned flag says whether [`open_polling`] is due.
fn apply_status(election: &mut Election, next: Option<ElectionStatus>) -> Result<bool> {
    match next {
        Some(next) => election.transition(next),
        None => Ok(false),
    }
}

/// Open polling for a freshly started election. Failure does not undo the status change.
async fn open_polling(db: &Database, election: &Election) {
    log_side_effect(
        "Opening polling",
        create_polling(db, election.organization, election.id).await,
    );
}

#[post("/api/election/create", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Organization>,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = spec.into_inner().into_election(token.id)?;
    let what = format!("Election {}", election.name);
    let election = insert_new(&new_elections, &elections, &election, &what).await?;
    info!("Organization {} created election {}", token.id, election.id);
    Ok(Json(election.into()))
}

#[put("/api/election/update/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    token: AuthToken<Organization>,
    election_id: Id,
    update: Json<ElectionUpdate>,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let mut election = find_owned(&elections, election_id, token.id).await?;
    let update = update.into_inner();
    if update.changes_details() {
        if election.status.is_active() {
            return Err(Error::InvalidState(format!(
                "Election {election_id} is `{}`; only its status can change",
                election.status
            )));
        }
        update.apply_details(&mut election)?;
    }
    let opens = apply_status(&mut election, update.status)?;

    save(&elections, election_id, &election, "Election").await?;
    if opens {
        open_polling(db, &election).await;
    }
    Ok(Json(election.into()))
}

#[put("/api/election/status/<election_id>", data = "<update>", format = "json")]
async fn set_election_status(
    token: AuthToken<Organization>,
    election_id: Id,
    update: Json<ElectionStatusUpdate>,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Json<ElectionDescription>> {
    let mut election = find_owned(&elections, election_id, token.id).await?;
    let opens = apply_status(&mut election, Some(update.status))?;

    let set_status = doc! {
        "$set": {
            "status": election.status,
        }
    };
    elections
        .update_one(election_id.as_doc(), set_status, None)
        .await?;
    if opens {
        open_polling(db, &election).await;
    }
    Ok(Json(election.into()))
}

#[delete("/api/election/delete/<election_id>")]
async fn delete_election(
    token: AuthToken<Organization>,
    election_id: Id,
    elections: Coll<Election>,
    pollings: Coll<Polling>,
    db_client: &State<Client>,
) -> Result<()> {
    let election = find_owned(&elections, election_id, token.id).await?;
    if election.status.is_active() {
        return Err(Error::InvalidState(format!(
            "Election {election_id} is `{}` and cannot be deleted",
            election.status
        )));
    }

    // The election and its polling go together.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;
    elections
        .delete_one_with_session(election_id.as_doc(), None, &mut session)
        .await?;
    let polling = doc! {
        "organization": token.id,
        "election": election_id,
    };
    pollings
        .delete_many_with_session(polling, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    info!("Organization {} deleted election {election_id}", token.id);
    Ok(())
}

#[get("/api/election/all")]
async fn get_elections(
    token: AuthToken<Organization>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = elections
        .find(owned_by(token.id), newest_first())
        .await?
        .map_ok(ElectionDescription::from)
        .try_collect()
        .await?;
    Ok(Json(elections))
}

#[get("/api/election/<election_id>", rank = 4)]
async fn get_election(
    token: AuthToken<Organization>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = find_owned(&elections, election_id, token.id).await?;
    Ok(Json(election.into()))
}

/// Elections of the given organization that are underway.
async fn active_elections(
    elections: &Coll<Election>,
    organization: Id,
) -> Result<Vec<ElectionDescription>> {
    let filter = doc! {
        "organization": organization,
        "status": {
            "$in": [ElectionStatus::Started, ElectionStatus::Polling],
        },
    };
    let active = elections
        .find(filter, newest_first())
        .await?
        .map_ok(ElectionDescription::from)
        .try_collect()
        .await?;
    Ok(active)
}

#[get("/api/election/active", rank = 1)]
async fn active_for_organization(
    token: AuthToken<Organization>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionDescription>>> {
    Ok(Json(active_elections(&elections, token.id).await?))
}

#[get("/api/election/active", rank = 2)]
async fn active_for_candidate(
    token: AuthToken<Candidate>,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let candidate = load_user(&token, &candidates).await?;
    Ok(Json(active_elections(&elections, candidate.organization).await?))
}

#[get("/api/election/active", rank = 3)]
async fn active_for_voter(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let voter = load_user(&token, &voters).await?;
    Ok(Json(active_elections(&elections, voter.organization).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };

    use crate::api::{
        polling::create_polling,
        testing::{count_matches, insert, login_candidate, login_voter},
    };
    use crate::model::{
        common::candidate::CandidateStatus,
        db::{
            candidate::{CandidateCore, NewCandidate},
            organization::{NewOrganization, OrganizationCore},
            polling::Polling,
        },
    };

    use super::*;

    async fn create_expect_status<'c>(
        client: &'c Client,
        spec: &ElectionSpec,
        status: Status,
    ) -> LocalResponse<'c> {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(serde_json::to_string(spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(status, response.status());
        response
    }

    async fn create(client: &Client) -> ElectionDescription {
        let response =
            create_expect_status(client, &ElectionSpec::current_example(), Status::Ok).await;
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn put_status(client: &Client, id: Id, status: ElectionStatus) -> Status {
        client
            .put(uri!(set_election_status(id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&ElectionStatusUpdate { status }).unwrap())
            .dispatch()
            .await
            .status()
    }

    async fn put_update(client: &Client, id: Id, update: &ElectionUpdate) -> Status {
        client
            .put(uri!(update_election(id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(update).unwrap())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(organization)]
    async fn create_and_fetch(client: Client, db: Database) {
        let created = create(&client).await;
        assert_eq!(created.status, ElectionStatus::NotStarted);
        assert_eq!(created.positions.len(), 2);

        let response = client.get(uri!(get_election(Id::from(created.id)))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fetched: ElectionDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(fetched, created);

        let mut later = ElectionSpec::future_example();
        later.name = "Later".to_string();
        create_expect_status(&client, &later, Status::Ok).await;

        let response = client.get(uri!(get_elections)).dispatch().await;
        let all: Vec<ElectionDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Later");

        assert_eq!(count_matches::<Election>(&db, doc! {}).await, 2);
    }

    #[backend_test(organization)]
    async fn create_invalid(client: Client, db: Database) {
        let mut backwards = ElectionSpec::current_example();
        std::mem::swap(&mut backwards.start_time, &mut backwards.end_time);
        create_expect_status(&client, &backwards, Status::BadRequest).await;

        let mut repeated = ElectionSpec::current_example();
        let first = repeated.positions[0].clone();
        repeated.positions.push(first);
        create_expect_status(&client, &repeated, Status::BadRequest).await;

        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(r#"{"name": "No date"}"#)
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        assert_eq!(count_matches::<Election>(&db, doc! {}).await, 0);
    }

    #[backend_test(organization)]
    async fn starting_opens_polling(client: Client, db: Database) {
        let election = create(&client).await;
        let id = Id::from(election.id);
        let org = Id::from(election.organization);
        let mut candidate = CandidateCore::example(org, id);
        candidate.status = CandidateStatus::Approved;
        insert::<NewCandidate>(&db, &candidate).await;

        assert_eq!(Status::Ok, put_status(&client, id, ElectionStatus::Started).await);
        let opened = doc! { "election": id };
        assert_eq!(count_matches::<Polling>(&db, opened.clone()).await, 1);

        // Restating the status does not open polling again.
        assert_eq!(Status::Ok, put_status(&client, id, ElectionStatus::Started).await);
        assert_eq!(count_matches::<Polling>(&db, opened).await, 1);

        // No going back.
        assert_eq!(
            Status::UnprocessableEntity,
            put_status(&client, id, ElectionStatus::NotStarted).await
        );

        // Running elections are frozen apart from their status.
        let rename = ElectionUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(Status::UnprocessableEntity, put_update(&client, id, &rename).await);
        let response = client.delete(uri!(delete_election(id))).dispatch().await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let advance = ElectionUpdate {
            status: Some(ElectionStatus::Polling),
            ..Default::default()
        };
        assert_eq!(Status::Ok, put_update(&client, id, &advance).await);
        let stored = Coll::<Election>::from_db(&db)
            .find_one(id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ElectionStatus::Polling);
        assert_eq!(stored.name, election.name);
    }

    #[backend_test(organization)]
    async fn starting_without_candidates(client: Client, db: Database) {
        let election = create(&client).await;
        let id = Id::from(election.id);

        // Opening polling fails, but the election still starts.
        assert_eq!(Status::Ok, put_status(&client, id, ElectionStatus::Started).await);
        assert_eq!(count_matches::<Polling>(&db, doc! {}).await, 0);
        let started = doc! { "status": ElectionStatus::Started };
        assert_eq!(count_matches::<Election>(&db, started).await, 1);
    }

    #[backend_test(organization)]
    async fn edit_and_delete(client: Client, db: Database) {
        let election = create(&client).await;
        let id = Id::from(election.id);

        let update = ElectionUpdate {
            name: Some("By-election".to_string()),
            positions: Some(vec![crate::model::common::election::Position::example("Chair")]),
            ..Default::default()
        };
        assert_eq!(Status::Ok, put_update(&client, id, &update).await);
        let stored = Coll::<Election>::from_db(&db)
            .find_one(id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "By-election");
        assert!(stored.has_position("Chair"));
        assert!(!stored.has_position("President"));

        let response = client.delete(uri!(delete_election(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(count_matches::<Election>(&db, doc! {}).await, 0);

        let response = client.delete(uri!(delete_election(id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(organization)]
    async fn starting_cannot_be_skipped(client: Client, db: Database) {
        let election = create(&client).await;
        let id = Id::from(election.id);
        let org = Id::from(election.organization);
        let mut candidate = CandidateCore::example(org, id);
        candidate.status = CandidateStatus::Approved;
        insert::<NewCandidate>(&db, &candidate).await;

        for status in [
            ElectionStatus::Polling,
            ElectionStatus::Completed,
            ElectionStatus::ResultsDeclared,
        ] {
            assert_eq!(
                Status::UnprocessableEntity,
                put_status(&client, id, status).await
            );
            let skip = ElectionUpdate {
                status: Some(status),
                ..Default::default()
            };
            assert_eq!(Status::UnprocessableEntity, put_update(&client, id, &skip).await);
        }
        let fresh = doc! { "status": ElectionStatus::NotStarted };
        assert_eq!(count_matches::<Election>(&db, fresh).await, 1);
        assert_eq!(count_matches::<Polling>(&db, doc! {}).await, 0);
    }

    #[backend_test(organization)]
    async fn running_statuses_cannot_be_created(client: Client, db: Database) {
        for status in [ElectionStatus::Started, ElectionStatus::Polling] {
            let mut spec = ElectionSpec::current_example();
            spec.status = Some(status);
            create_expect_status(&client, &spec, Status::BadRequest).await;
        }
        assert_eq!(count_matches::<Election>(&db, doc! {}).await, 0);

        let mut finished = ElectionSpec::current_example();
        finished.status = Some(ElectionStatus::Completed);
        let response = create_expect_status(&client, &finished, Status::Ok).await;
        let created: ElectionDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(created.status, ElectionStatus::Completed);
        assert_eq!(count_matches::<Polling>(&db, doc! {}).await, 0);
    }

    #[backend_test(organization)]
    async fn deleting_removes_polling(client: Client, db: Database) {
        let election = create(&client).await;
        let id = Id::from(election.id);
        let org = Id::from(election.organization);
        let mut candidate = CandidateCore::example(org, id);
        candidate.status = CandidateStatus::Approved;
        insert::<NewCandidate>(&db, &candidate).await;

        // A sibling election whose polling must survive.
        let sibling = create(&client).await;
        let sibling_id = Id::from(sibling.id);
        let mut other = CandidateCore::example2(org, sibling_id);
        other.status = CandidateStatus::Approved;
        insert::<NewCandidate>(&db, &other).await;
        create_polling(&db, org, sibling_id).await.unwrap();

        for status in [
            ElectionStatus::Started,
            ElectionStatus::Polling,
            ElectionStatus::Completed,
        ] {
            assert_eq!(Status::Ok, put_status(&client, id, status).await);
        }
        assert_eq!(count_matches::<Polling>(&db, doc! { "election": id }).await, 1);

        let response = client.delete(uri!(delete_election(id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(count_matches::<Election>(&db, id.as_doc()).await, 0);
        assert_eq!(count_matches::<Polling>(&db, doc! { "election": id }).await, 0);
        assert_eq!(
            count_matches::<Polling>(&db, doc! { "election": sibling_id }).await,
            1
        );
    }

    #[backend_test(organization)]
    async fn foreign_elections_forbidden(client: Client, db: Database) {
        let other = insert::<NewOrganization>(&db, &OrganizationCore::example2()).await;
        let foreign = insert::<NewElection>(&db, &NewElection::example(other)).await;

        let response = client.get(uri!(get_election(foreign))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(
            Status::Forbidden,
            put_status(&client, foreign, ElectionStatus::Started).await
        );
        let response = client.delete(uri!(delete_election(foreign))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.get(uri!(get_elections)).dispatch().await;
        let all: Vec<ElectionDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(all.is_empty());
    }

    async fn active_count(client: &Client) -> usize {
        let response = client.get(uri!(active_for_organization)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let active: Vec<ElectionDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        active.len()
    }

    async fn start_all(db: &Database) {
        Coll::<Election>::from_db(db)
            .update_many(
                doc! {},
                doc! { "$set": { "status": ElectionStatus::Started } },
                None,
            )
            .await
            .unwrap();
    }

    #[backend_test]
    async fn active_for_candidates(client: Client, db: Database) {
        login_candidate(&client, &db).await;
        assert_eq!(active_count(&client).await, 0);
        start_all(&db).await;
        assert_eq!(active_count(&client).await, 1);
    }

    #[backend_test]
    async fn active_for_voters(client: Client, db: Database) {
        let voter = login_voter(&client, &db).await;
        let org = Coll::<Voter>::from_db(&db)
            .find_one(voter.as_doc(), None)
            .await
            .unwrap()
            .unwrap()
            .organization;
        insert::<NewElection>(&db, &NewElection::example(org)).await;
        let other = insert::<NewOrganization>(&db, &OrganizationCore::example2()).await;
        insert::<NewElection>(&db, &NewElection::example(other)).await;
        start_all(&db).await;

        // Only the voter's own organization counts.
        assert_eq!(active_count(&client).await, 1);
    }

    #[backend_test]
    async fn active_requires_login(client: Client, _db: Database) {
        let response = client.get(uri!(active_for_organization)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}

use mongodb::bson::{doc, Document};
use rocket::{
    futures::TryStreamExt,
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    api::common::{
        authenticate, find_owned, insert_new, load_user, newest_first, owned_by, save,
        start_session,
    },
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{LoginCredentials, LoginResponse},
            candidate::{
                BulkStatusResult, BulkStatusUpdate, CandidateApplication, CandidateDescription,
                CandidateRegistration, CandidateSelfUpdate, CandidateStatusUpdate,
                CandidateUpdate,
            },
            election::ElectionSummary,
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            candidate::{Candidate, NewCandidate},
            election::Election,
            organization::Organization,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        apply,
        register,
        login,
        logout,
        update_self,
        update_candidate,
        set_candidate_status,
        set_bulk_status,
        delete_candidate,
        get_candidates,
        get_self,
        get_candidate,
        get_elections,
    ]
}

async fn insert_candidate(
    candidate: &NewCandidate,
    new_candidates: &Coll<NewCandidate>,
    candidates: &Coll<Candidate>,
) -> Result<Candidate> {
    let what = format!("Candidate with email {}", candidate.email);
    let candidate = insert_new(new_candidates, candidates, candidate, &what).await?;
    info!(
        "Candidate {} entered election {} for `{}`",
        candidate.id, candidate.election, candidate.applied_post
    );
    Ok(candidate)
}

#[post("/api/candidate/apply", data = "<application>", format = "json")]
async fn apply(
    application: Json<CandidateApplication>,
    elections: Coll<Election>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let election = elections
        .find_one(application.election.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {}", application.election)))?;
    let candidate = application.into_inner().into_candidate(&election)?;
    let candidate = insert_candidate(&candidate, &new_candidates, &candidates).await?;
    Ok(Json(candidate.into()))
}

#[post("/api/candidate/register", data = "<registration>", format = "json")]
async fn register(
    token: AuthToken<Organization>,
    registration: Json<CandidateRegistration>,
    elections: Coll<Election>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let election = find_owned(&elections, registration.application.election, token.id).await?;
    let candidate = registration.into_inner().into_candidate(&election)?;
    let candidate = insert_candidate(&candidate, &new_candidates, &candidates).await?;
    Ok(Json(candidate.into()))
}

#[post("/api/candidate/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    candidates: Coll<Candidate>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let candidate = authenticate(&credentials, &candidates, |candidate: &Candidate, password| {
        candidate.verify_password(password)
    })
    .await?;
    Ok(Json(start_session(&candidate, &candidate.name, cookies, config)))
}

#[post("/api/candidate/logout")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[put("/api/candidate/update", data = "<update>", format = "json")]
async fn update_self(
    token: AuthToken<Candidate>,
    update: Json<CandidateSelfUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let mut candidate = load_user(&token, &candidates).await?;
    update.into_inner().apply_to(&mut candidate)?;
    save(&candidates, candidate.id, &candidate, "Candidate").await?;
    Ok(Json(candidate.into()))
}

#[put("/api/candidate/update/<candidate_id>", data = "<update>", format = "json")]
async fn update_candidate(
    token: AuthToken<Organization>,
    candidate_id: Id,
    update: Json<CandidateUpdate>,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
) -> Result<Json<CandidateDescription>> {
    let mut candidate = find_owned(&candidates, candidate_id, token.id).await?;
    let election = find_owned(&elections, candidate.election, token.id).await?;
    update.into_inner().apply_to(&mut candidate, &election)?;
    save(&candidates, candidate_id, &candidate, "Candidate").await?;
    Ok(Json(candidate.into()))
}

#[put("/api/candidate/status/<candidate_id>", data = "<update>", format = "json")]
async fn set_candidate_status(
    token: AuthToken<Organization>,
    candidate_id: Id,
    update: Json<CandidateStatusUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let mut candidate = find_owned(&candidates, candidate_id, token.id).await?;
    candidate.status = update.status;
    let set_status = doc! {
        "$set": {
            "status": update.status,
        }
    };
    candidates
        .update_one(candidate_id.as_doc(), set_status, None)
        .await?;
    Ok(Json(candidate.into()))
}

/// Filter for the candidates a bulk status update applies to.
fn bulk_filter(organization: Id, election: Option<Id>) -> Document {
    let mut filter = owned_by(organization);
    if let Some(election) = election {
        filter.insert("election", election);
    }
    filter
}

#[put("/api/candidate/bulk-status", data = "<update>", format = "json")]
async fn set_bulk_status(
    token: AuthToken<Organization>,
    update: Json<BulkStatusUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<BulkStatusResult>> {
    let set_status = doc! {
        "$set": {
            "status": update.status,
        }
    };
    let result = candidates
        .update_many(bulk_filter(token.id, update.election), set_status, None)
        .await?;
    info!(
        "Organization {} set {} candidates to {:?}",
        token.id, result.modified_count, update.status
    );
    Ok(Json(BulkStatusResult {
        modified: result.modified_count,
    }))
}

#[delete("/api/candidate/<candidate_id>")]
async fn delete_candidate(
    token: AuthToken<Organization>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    find_owned(&candidates, candidate_id, token.id).await?;
    candidates.delete_one(candidate_id.as_doc(), None).await?;
    Ok(())
}

#[get("/api/candidate/all")]
async fn get_candidates(
    token: AuthToken<Organization>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = candidates
        .find(owned_by(token.id), newest_first())
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(candidates))
}

#[get("/api/candidate/<candidate_id>", rank = 1)]
async fn get_self(
    token: AuthToken<Candidate>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    if token.id != candidate_id {
        return Err(Error::Forbidden(format!(
            "Candidate {} cannot view candidate {candidate_id}",
            token.id
        )));
    }
    let candidate = load_user(&token, &candidates).await?;
    Ok(Json(candidate.into()))
}

#[get("/api/candidate/<candidate_id>", rank = 2)]
async fn get_candidate(
    token: AuthToken<Organization>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = find_owned(&candidates, candidate_id, token.id).await?;
    Ok(Json(candidate.into()))
}

#[get("/api/candidate/election/all")]
async fn get_elections(
    token: AuthToken<Candidate>,
    candidates: Coll<Candidate>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let candidate = load_user(&token, &candidates).await?;
    let elections = elections
        .find(owned_by(candidate.organization), newest_first())
        .await?
        .map_ok(ElectionSummary::from)
        .try_collect()
        .await?;
    Ok(Json(elections))
}

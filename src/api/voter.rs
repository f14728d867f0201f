use mongodb::bson::doc;
use rocket::{
    futures::TryStreamExt,
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    api::common::{authenticate, insert_new, load_user, save, start_session},
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{LoginCredentials, LoginResponse},
            candidate::CandidateProfile,
            voter::{VoterDescription, VoterRegistration, VoterSelfUpdate},
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        common::candidate::CandidateStatus,
        db::{
            candidate::Candidate,
            organization::Organization,
            voter::{NewVoter, Voter},
        },
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        register,
        login,
        logout,
        get_profile,
        update_profile,
        get_candidates
    ]
}

#[post("/api/voter/register", data = "<registration>", format = "json")]
async fn register(
    registration: Json<VoterRegistration>,
    organizations: Coll<Organization>,
    new_voters: Coll<NewVoter>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let org_id = registration.organization;
    let org = organizations
        .find_one(org_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Organization {org_id}")))?;
    if !org.status {
        return Err(Error::Forbidden(format!(
            "Organization {} is not accepting voters",
            org.name
        )));
    }

    let voter = registration.into_inner().into_voter()?;
    let what = format!("Voter with email {}", voter.email);
    let voter = insert_new(&new_voters, &voters, &voter, &what).await?;
    info!("Voter {} registered with organization {org_id}", voter.id);
    Ok(Json(voter.into()))
}

#[post("/api/voter/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let voter = authenticate(&credentials, &voters, |voter: &Voter, password| {
        voter.verify_password(password)
    })
    .await?;
    if !voter.status {
        return Err(Error::Forbidden(format!(
            "Voter {} has not been activated",
            voter.email
        )));
    }
    Ok(Json(start_session(&voter, &voter.name, cookies, config)))
}

#[post("/api/voter/logout")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/api/voter/profile")]
async fn get_profile(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let voter = load_user(&token, &voters).await?;
    Ok(Json(voter.into()))
}

#[put("/api/voter/profile", data = "<update>", format = "json")]
async fn update_profile(
    token: AuthToken<Voter>,
    update: Json<VoterSelfUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let mut voter = load_user(&token, &voters).await?;
    update.into_inner().apply_to(&mut voter)?;
    save(&voters, voter.id, &voter, "Voter").await?;
    Ok(Json(voter.into()))
}

#[get("/api/voter/candidates")]
async fn get_candidates(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateProfile>>> {
    let voter = load_user(&token, &voters).await?;
    let approved = doc! {
        "organization": voter.organization,
        "status": CandidateStatus::Approved,
    };
    let candidates = candidates
        .find(approved, None)
        .await?
        .map_ok(CandidateProfile::from)
        .try_collect()
        .await?;
    Ok(Json(candidates))
}

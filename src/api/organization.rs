use mongodb::bson::doc;
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
            organization::{OrganizationDescription, OrganizationSelfUpdate},
            voter::{VoterDescription, VoterSpec, VoterStatusUpdate, VoterUpdate},
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            organization::Organization,
            voter::{NewVoter, Voter},
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        login,
        logout,
        get_profile,
        update_profile,
        register_voter,
        get_voters,
        get_voter,
        update_voter,
        set_voter_status,
        delete_voter,
    ]
}

#[post("/api/org/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    organizations: Coll<Organization>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let org = authenticate(&credentials, &organizations, |org: &Organization, password| {
        org.verify_password(password)
    })
    .await?;
    if !org.status {
        return Err(Error::Forbidden(format!(
            "Organization {} has not been activated",
            org.email
        )));
    }
    Ok(Json(start_session(&org, &org.name, cookies, config)))
}

#[post("/api/org/logout")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/api/org")]
async fn get_profile(
    token: AuthToken<Organization>,
    organizations: Coll<Organization>,
) -> Result<Json<OrganizationDescription>> {
    let org = load_user(&token, &organizations).await?;
    Ok(Json(org.into()))
}

#[put("/api/org", data = "<update>", format = "json")]
async fn update_profile(
    token: AuthToken<Organization>,
    update: Json<OrganizationSelfUpdate>,
    organizations: Coll<Organization>,
) -> Result<Json<OrganizationDescription>> {
    let mut org = load_user(&token, &organizations).await?;
    update.into_inner().apply_to(&mut org)?;
    save(&organizations, org.id, &org, "Organization").await?;
    Ok(Json(org.into()))
}

#[post("/api/org/voter/register", data = "<spec>", format = "json")]
async fn register_voter(
    token: AuthToken<Organization>,
    spec: Json<VoterSpec>,
    new_voters: Coll<NewVoter>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let voter = spec.into_inner().into_voter(token.id)?;
    let what = format!("Voter with email {}", voter.email);
    let voter = insert_new(&new_voters, &voters, &voter, &what).await?;
    Ok(Json(voter.into()))
}

#[get("/api/org/voter/all")]
async fn get_voters(
    token: AuthToken<Organization>,
    voters: Coll<Voter>,
) -> Result<Json<Vec<VoterDescription>>> {
    let voters = voters
        .find(owned_by(token.id), newest_first())
        .await?
        .map_ok(VoterDescription::from)
        .try_collect()
        .await?;
    Ok(Json(voters))
}

#[get("/api/org/voter/<voter_id>")]
async fn get_voter(
    token: AuthToken<Organization>,
    voter_id: Id,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let voter = find_owned(&voters, voter_id, token.id).await?;
    Ok(Json(voter.into()))
}

#[put("/api/org/voter/update/<voter_id>", data = "<update>", format = "json")]
async fn update_voter(
    token: AuthToken<Organization>,
    voter_id: Id,
    update: Json<VoterUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let mut voter = find_owned(&voters, voter_id, token.id).await?;
    update.into_inner().apply_to(&mut voter)?;
    save(&voters, voter_id, &voter, "Voter").await?;
    Ok(Json(voter.into()))
}

#[put("/api/org/voter/status/<voter_id>", data = "<update>", format = "json")]
async fn set_voter_status(
    token: AuthToken<Organization>,
    voter_id: Id,
    update: Json<VoterStatusUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<VoterDescription>> {
    let mut voter = find_owned(&voters, voter_id, token.id).await?;
    voter.status = update.status;
    let set_status = doc! {
        "$set": {
            "status": update.status,
        }
    };
    voters.update_one(voter_id.as_doc(), set_status, None).await?;
    Ok(Json(voter.into()))
}

#[delete("/api/org/voter/<voter_id>")]
async fn delete_voter(
    token: AuthToken<Organization>,
    voter_id: Id,
    voters: Coll<Voter>,
) -> Result<()> {
    find_owned(&voters, voter_id, token.id).await?;
    voters.delete_one(voter_id.as_doc(), None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::api::testing::{assert_no_matches, insert};
    use crate::model::db::{
        organization::{NewOrganization, OrganizationCore},
        voter::VoterCore,
    };

    use super::*;

    #[backend_test]
    async fn inactive_cannot_login(client: Client, db: Database) {
        let mut org = OrganizationCore::example();
        org.status = false;
        insert::<NewOrganization>(&db, &org).await;

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&LoginCredentials::organization_example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }

    #[backend_test]
    async fn bearer_token_accepted(client: Client, db: Database) {
        insert::<NewOrganization>(&db, &OrganizationCore::example()).await;
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&LoginCredentials::organization_example()).unwrap())
            .dispatch()
            .await;
        let login: LoginResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        // Drop the cookie and use the header instead.
        client.post(uri!(logout)).dispatch().await;
        let response = client.get(uri!(get_profile)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .get(uri!(get_profile))
            .header(rocket::http::Header::new(
                "Authorization",
                format!("Bearer {}", login.token),
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test(organization)]
    async fn self_update(client: Client) {
        let response = client
            .put(uri!(update_profile))
            .header(ContentType::JSON)
            .body(r#"{"description": "Updated", "email": "x@example.com", "status": false}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let org: OrganizationDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(org.description, "Updated");
        assert_eq!(org.email, "ec@example.com");
        assert!(org.status);
    }

    #[backend_test(organization)]
    async fn manage_voters(client: Client, db: Database) {
        let response = client
            .post(uri!(register_voter))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&VoterSpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let voter: VoterDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(voter.status);
        assert!(!voter.voted);

        // Duplicate email.
        let response = client
            .post(uri!(register_voter))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&VoterSpec::example()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        // Update, then deactivate.
        let response = client
            .put(uri!(update_voter(*voter.id)))
            .header(ContentType::JSON)
            .body(r#"{"name": "Samuel", "voted": true}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .put(uri!(set_voter_status(*voter.id)))
            .header(ContentType::JSON)
            .body(r#"{"status": false}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(get_voter(*voter.id))).dispatch().await;
        let fetched: VoterDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(fetched.name, "Samuel");
        assert!(!fetched.status);
        assert!(!fetched.voted);

        let response = client.get(uri!(get_voters)).dispatch().await;
        let all: Vec<VoterDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(all, vec![fetched]);

        let response = client.delete(uri!(delete_voter(*voter.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_no_matches::<Voter>(&db, voter.id.as_doc()).await;
        let response = client.delete(uri!(delete_voter(*voter.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(organization)]
    async fn foreign_voters_forbidden(client: Client, db: Database) {
        let other_org = insert::<NewOrganization>(&db, &OrganizationCore::example2()).await;
        let mut foreign = VoterCore::example(other_org);
        foreign.email = "foreign@example.com".to_string();
        let foreign = insert::<NewVoter>(&db, &foreign).await;

        let response = client.get(uri!(get_voter(foreign))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client
            .put(uri!(set_voter_status(foreign)))
            .header(ContentType::JSON)
            .body(r#"{"status": false}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client.delete(uri!(delete_voter(foreign))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.get(uri!(get_voters)).dispatch().await;
        let all: Vec<VoterDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(all.is_empty());

        // Sanity check the login helper's organization is the caller.
        let me = login_organization_id(&db).await;
        assert_ne!(me, other_org);
    }

    async fn login_organization_id(db: &Database) -> Id {
        Coll::<Organization>::from_db(db)
            .find_one(doc! { "email": "ec@example.com" }, None)
            .await
            .unwrap()
            .unwrap()
            .id
    }
}

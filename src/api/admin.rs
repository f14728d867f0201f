use mongodb::{bson::doc, Client};
use rocket::{
    futures::TryStreamExt,
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    api::common::{
        authenticate, insert_new, load_user, log_side_effect, newest_first, owned_by, save,
        start_session,
    },
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminDescription, AdminProfileUpdate, AdminSpec},
            auth::{LoginCredentials, LoginResponse},
            organization::{
                CredentialsRequest, OrganizationDescription, OrganizationSpec,
                OrganizationStatusUpdate, OrganizationUpdate,
            },
        },
        auth::{generate_password, hash_password, AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            admin::{Admin, NewAdmin},
            candidate::Candidate,
            election::Election,
            organization::{NewOrganization, Organization},
            polling::Polling,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
    services::mail::{Mail, Mailer},
};

pub fn routes() -> Vec<Route> {
    routes![
        login,
        logout,
        get_profile,
        update_profile,
        register_admin,
        create_organization,
        get_organizations,
        get_organization,
        update_organization,
        set_organization_status,
        delete_organization,
        send_organization_credentials,
    ]
}

#[post("/api/admin/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let admin = authenticate(&credentials, &admins, |admin: &Admin, password| {
        admin.verify_password(password)
    })
    .await?;
    Ok(Json(start_session(&admin, &admin.name, cookies, config)))
}

#[post("/api/admin/logout")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/api/admin/profile")]
async fn get_profile(
    token: AuthToken<Admin>,
    admins: Coll<Admin>,
) -> Result<Json<AdminDescription>> {
    let admin = load_user(&token, &admins).await?;
    Ok(Json(admin.into()))
}

#[put("/api/admin/profile", data = "<update>", format = "json")]
async fn update_profile(
    token: AuthToken<Admin>,
    update: Json<AdminProfileUpdate>,
    admins: Coll<Admin>,
) -> Result<Json<AdminDescription>> {
    let mut admin = load_user(&token, &admins).await?;
    update.into_inner().apply_to(&mut admin)?;
    save(&admins, admin.id, &admin, "Admin").await?;
    Ok(Json(admin.into()))
}

#[post("/api/admin/register", data = "<spec>", format = "json")]
async fn register_admin(
    _token: AuthToken<Admin>,
    spec: Json<AdminSpec>,
    new_admins: Coll<NewAdmin>,
    admins: Coll<Admin>,
) -> Result<Json<AdminDescription>> {
    let admin = NewAdmin::try_from(spec.into_inner())?;
    let what = format!("Admin with email {}", admin.email);
    let admin = insert_new(&new_admins, &admins, &admin, &what).await?;
    Ok(Json(admin.into()))
}

#[post("/api/admin/org", data = "<spec>", format = "json")]
async fn create_organization(
    _token: AuthToken<Admin>,
    spec: Json<OrganizationSpec>,
    new_organizations: Coll<NewOrganization>,
    organizations: Coll<Organization>,
    mailer: &State<Mailer>,
) -> Result<Json<OrganizationDescription>> {
    let spec = spec.into_inner();
    let password = spec.password.clone();
    let org = spec.into_organization()?;
    let what = format!("Organization with email {}", org.email);
    let org = insert_new(&new_organizations, &organizations, &org, &what).await?;

    // Active organizations can log in straight away, so tell them how.
    if org.status {
        let mail = Mail::organization_credentials(&org.email, &password);
        log_side_effect("Credentials email", mailer.send(mail).await);
    }

    Ok(Json(org.into()))
}

#[get("/api/admin/org")]
async fn get_organizations(
    _token: AuthToken<Admin>,
    organizations: Coll<Organization>,
) -> Result<Json<Vec<OrganizationDescription>>> {
    let orgs = organizations
        .find(None, newest_first())
        .await?
        .map_ok(OrganizationDescription::from)
        .try_collect()
        .await?;
    Ok(Json(orgs))
}

async fn find_organization(organizations: &Coll<Organization>, id: Id) -> Result<Organization> {
    organizations
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Organization {id}")))
}

#[get("/api/admin/org/<org_id>")]
async fn get_organization(
    _token: AuthToken<Admin>,
    org_id: Id,
    organizations: Coll<Organization>,
) -> Result<Json<OrganizationDescription>> {
    let org = find_organization(&organizations, org_id).await?;
    Ok(Json(org.into()))
}

#[put("/api/admin/org/<org_id>", data = "<update>", format = "json")]
async fn update_organization(
    _token: AuthToken<Admin>,
    org_id: Id,
    update: Json<OrganizationUpdate>,
    organizations: Coll<Organization>,
) -> Result<Json<OrganizationDescription>> {
    let mut org = find_organization(&organizations, org_id).await?;
    update.into_inner().apply_to(&mut org)?;
    save(&organizations, org_id, &org, "Organization").await?;
    Ok(Json(org.into()))
}

#[patch("/api/admin/org/<org_id>", data = "<update>", format = "json")]
async fn set_organization_status(
    _token: AuthToken<Admin>,
    org_id: Id,
    update: Json<OrganizationStatusUpdate>,
    organizations: Coll<Organization>,
    mailer: &State<Mailer>,
) -> Result<Json<OrganizationDescription>> {
    let mut org = find_organization(&organizations, org_id).await?;
    let activated = !org.status && update.status;
    org.status = update.status;
    let set_status = doc! {
        "$set": {
            "status": update.status,
        }
    };
    organizations
        .update_one(org_id.as_doc(), set_status, None)
        .await?;

    if activated {
        let mail = Mail::organization_activated(&org.name, &org.email);
        log_side_effect("Activation email", mailer.send(mail).await);
    }

    Ok(Json(org.into()))
}

#[delete("/api/admin/org/<org_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_organization(
    _token: AuthToken<Admin>,
    org_id: Id,
    organizations: Coll<Organization>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    voters: Coll<Voter>,
    pollings: Coll<Polling>,
    db_client: &State<Client>,
) -> Result<()> {
    // Atomically delete the organization and everything it owns.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = organizations
        .delete_one_with_session(org_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found(format!("Organization {org_id}")));
    }

    let filter = owned_by(org_id);
    pollings
        .delete_many_with_session(filter.clone(), None, &mut session)
        .await?;
    candidates
        .delete_many_with_session(filter.clone(), None, &mut session)
        .await?;
    voters
        .delete_many_with_session(filter.clone(), None, &mut session)
        .await?;
    elections
        .delete_many_with_session(filter, None, &mut session)
        .await?;

    session.commit_transaction().await?;
    info!("Deleted organization {org_id} and all its records");
    Ok(())
}

#[post("/api/admin/send-org-credentials", data = "<request>", format = "json")]
async fn send_organization_credentials(
    _token: AuthToken<Admin>,
    request: Json<CredentialsRequest>,
    organizations: Coll<Organization>,
    mailer: &State<Mailer>,
) -> Result<()> {
    let password = generate_password();
    let with_email = doc! {
        "email": &request.email,
    };
    let set_password = doc! {
        "$set": {
            "password_hash": hash_password(&password)?,
        }
    };
    let result = organizations
        .update_one(with_email, set_password, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!(
            "Organization with email {}",
            request.email
        )));
    }

    // Unlike the notifications elsewhere, delivering the credentials is the whole point.
    mailer
        .send(Mail::organization_credentials(&request.email, &password))
        .await
}

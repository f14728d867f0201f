use rocket::Route;

mod admin;
mod candidate;
mod common;
mod election;
mod organization;
mod polling;
mod upload;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(organization::routes());
    routes.extend(election::routes());
    routes.extend(candidate::routes());
    routes.extend(voter::routes());
    routes.extend(polling::routes());
    routes.extend(upload::routes());
    routes
}

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, ImageHostFairing, MailerFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod services;

/// Assemble the server: every route, plus the fairings that load config and connect to
/// the database and third-party services during ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(MailerFairing)
        .attach(ImageHostFairing)
        .attach(LoggerFairing)
}

/// Connect to the database named in the test configuration.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .unwrap();
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// Assemble a test server against the named database, which the caller is
/// responsible for dropping afterwards.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    use rocket::fairing::AdHoc;

    let db_name = db_name.to_string();
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(AdHoc::try_on_ignite("Test database", move |rocket| async move {
            config::manage_database(rocket, client, &db_name).await
        }))
        .attach(MailerFairing)
        .attach(ImageHostFairing)
}

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};
use crate::services::{
    image_host::{ImageHost, ImageHostConfig},
    mail::{MailConfig, Mailer},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };

        manage_database(rocket, client, &get_database_name()).await
    }
}

/// Prepare the named database for use and place it into managed state.
pub(crate) async fn manage_database(
    rocket: Rocket<Build>,
    client: MongoClient,
    db_name: &str,
) -> rocket::fairing::Result {
    let db = client.database(db_name);

    // Ensure the required indexes exist and there is at least one admin user.
    let admins = Coll::from_db(&db);
    let prepared = async {
        ensure_indexes_exist(&db).await?;
        ensure_admin_exists(&admins).await
    };
    if let Err(e) = prepared.await {
        error!("Failed to prepare database: {e}");
        return Err(rocket);
    }
    info!("...database connection online!");

    Ok(rocket.manage(client).manage(db))
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "election_portal".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that loads the mail relay config and places a [`Mailer`] into
/// managed state.
pub struct MailerFairing;

#[rocket::async_trait]
impl Fairing for MailerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Mail relay",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<MailConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load mail relay config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded mail relay config");
        Ok(rocket.manage(Mailer::new(config)))
    }
}

/// A fairing that loads the image host config and places an [`ImageHost`]
/// into managed state.
pub struct ImageHostFairing;

#[rocket::async_trait]
impl Fairing for ImageHostFairing {
    fn info(&self) -> Info {
        Info {
            name: "Image host",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<ImageHostConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load image host config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded image host config");
        Ok(rocket.manage(ImageHost::new(config)))
    }
}

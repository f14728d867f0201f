use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Where "now" falls relative to a polling window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollingStatus {
    #[serde(rename = "Not-Started")]
    NotStarted,
    Active,
    Completed,
}

impl Default for PollingStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl From<PollingStatus> for Bson {
    fn from(status: PollingStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

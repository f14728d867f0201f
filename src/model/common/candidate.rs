use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Approval state of a candidate application.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for CandidateStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

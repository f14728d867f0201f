use serde::{Deserialize, Serialize};

/// Where an uploaded image can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

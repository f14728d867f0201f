use data_encoding::BASE64;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration for the third-party image host.
#[derive(Deserialize)]
pub struct ImageHostConfig {
    // non-secrets
    image_host_url: String,
    image_max_bytes: u64,
    // secrets
    image_host_key: String,
}

/// The part of the host's reply we care about.
#[derive(Debug, Deserialize)]
struct UploadReply {
    data: UploadedImage,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    url: String,
}

/// Forwards uploaded images to an external host and reports where they ended up.
/// Only the returned URL is ever stored by the portal.
pub struct ImageHost {
    http: HttpClient,
    config: ImageHostConfig,
}

impl ImageHost {
    pub fn new(config: ImageHostConfig) -> Self {
        Self {
            http: HttpClient::new(),
            config,
        }
    }

    /// Largest accepted upload.
    pub fn max_bytes(&self) -> u64 {
        self.config.image_max_bytes
    }

    /// Upload raw image bytes, returning the public URL.
    pub async fn upload(&self, image: &[u8]) -> Result<String> {
        if image.is_empty() {
            return Err(Error::Validation("Image upload is empty".to_string()));
        }

        let form = [
            ("key", self.config.image_host_key.clone()),
            ("image", BASE64.encode(image)),
        ];
        let reply: UploadReply = self
            .http
            .post(&self.config.image_host_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Image uploaded to {}", reply.data.url);
        Ok(reply.data.url)
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl ImageHostConfig {
        pub fn example() -> Self {
            Self {
                image_host_url: "http://localhost:9/upload".to_string(),
                image_max_bytes: 1024,
                image_host_key: "image-key".to_string(),
            }
        }
    }
}

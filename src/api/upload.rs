use rocket::{data::ByteUnit, serde::json::Json, Data, Route, State};

use crate::error::{Error, Result};
use crate::model::api::upload::UploadedImage;
use crate::services::image_host::ImageHost;

pub fn routes() -> Vec<Route> {
    routes![upload_image]
}

/// Forward raw image bytes to the image host.
///
/// Open to anyone, as candidates attach images to their application before they have an
/// account.
#[post("/api/upload/image", data = "<image>")]
async fn upload_image(image: Data<'_>, host: &State<ImageHost>) -> Result<Json<UploadedImage>> {
    let limit = ByteUnit::from(host.max_bytes());
    let bytes = image
        .open(limit)
        .into_bytes()
        .await
        .map_err(|e| Error::Validation(format!("Failed to read image: {e}")))?;
    if !bytes.is_complete() {
        return Err(Error::Validation(format!("Image is larger than {limit}")));
    }

    let url = host.upload(&bytes).await?;
    Ok(Json(UploadedImage { url }))
}

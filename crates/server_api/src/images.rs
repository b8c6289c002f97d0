use std::path::Path;

use shared::{
    domain::MedicineRef,
    error::{ApiError, ErrorCode},
    protocol::ImageUploadResponse,
};
use tracing::info;

use crate::{catalog::get_medicine, ApiContext};

pub const IMAGES_ROUTE: &str = "/images";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores an image under the upload directory and records its public URL on the medicine.
pub async fn store_medicine_image(
    ctx: &ApiContext,
    reference: MedicineRef,
    upload: ImageUpload,
) -> Result<ImageUploadResponse, ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::validation("image file is empty"));
    }
    let medicine = get_medicine(ctx, reference).await?;
    let is_image = upload
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(ApiError::validation("uploaded file is not an image"));
    }

    let extension = upload
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let file_name = format!("med_{}_{}{}", reference.0, uuid::Uuid::new_v4(), extension);

    let dir = &ctx.settings.upload_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| io_failure("create upload directory", err))?;
    tokio::fs::write(dir.join(&file_name), &upload.bytes)
        .await
        .map_err(|err| io_failure("write image", err))?;

    let image_url = format!("{IMAGES_ROUTE}/{file_name}");
    ctx.storage
        .set_medicine_image_url(reference, &image_url)
        .await
        .map_err(crate::internal)?;
    info!(medicine = reference.0, %image_url, bytes = upload.bytes.len(), "image stored");

    Ok(ImageUploadResponse {
        reference,
        name: medicine.summary.name,
        image_url,
    })
}

/// Only plain file names are served; anything that could escape the directory is refused.
pub fn is_safe_image_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn io_failure(action: &str, err: std::io::Error) -> ApiError {
    tracing::error!(error = %err, action, "image storage failed");
    ApiError::new(ErrorCode::Internal, format!("could not {action}: {err}"))
}

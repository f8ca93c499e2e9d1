use base64::{engine::general_purpose, Engine as _};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageData {
    pub data: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
}

#[derive(Debug)]
pub enum ImageUploadError {
    Base64DecodeError(String),
    GcsError(String),
    InvalidImageFormat(String),
    TooLarge(usize),
    EnvironmentError(String),
}

impl std::fmt::Display for ImageUploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageUploadError::Base64DecodeError(err) => write!(f, "Base64 decode error: {}", err),
            ImageUploadError::GcsError(err) => write!(f, "GCS upload error: {}", err),
            ImageUploadError::InvalidImageFormat(err) => write!(f, "Invalid image format: {}", err),
            ImageUploadError::TooLarge(size) => {
                write!(f, "Image is {} bytes; the limit is {} bytes", size, MAX_IMAGE_BYTES)
            }
            ImageUploadError::EnvironmentError(err) => write!(f, "Environment error: {}", err),
        }
    }
}

impl std::error::Error for ImageUploadError {}

pub fn file_extension(file_type: &str) -> Result<&'static str, ImageUploadError> {
    match file_type {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        _ => Err(ImageUploadError::InvalidImageFormat(format!(
            "Unsupported file type: {}",
            file_type
        ))),
    }
}

/// Decodes a plain or `data:` URL base64 payload.
pub fn decode_image(image: &ImageData) -> Result<Vec<u8>, ImageUploadError> {
    let base64_data = if image.data.starts_with("data:") {
        image.data.split(',').nth(1).ok_or_else(|| {
            ImageUploadError::InvalidImageFormat("Invalid base64 data format".to_string())
        })?
    } else {
        &image.data
    };

    let bytes = general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| ImageUploadError::Base64DecodeError(e.to_string()))?;

    if bytes.is_empty() {
        return Err(ImageUploadError::InvalidImageFormat("Image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageUploadError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}

pub fn object_name(tour_id: &str, extension: &str) -> String {
    format!(
        "tours/{}/{}-{}.{}",
        tour_id,
        chrono::Utc::now().timestamp(),
        Uuid::new_v4(),
        extension
    )
}

pub fn public_url(bucket: &str, object_name: &str) -> String {
    format!("https://storage.googleapis.com/{}/{}", bucket, object_name)
}

pub struct ImageService {
    client: Client,
    bucket_name: String,
}

impl ImageService {
    pub async fn new(config: &AppConfig) -> Result<Self, ImageUploadError> {
        let bucket_name = config.tour_image_bucket.clone().ok_or_else(|| {
            ImageUploadError::EnvironmentError("TOUR_IMAGE_BUCKET not set".to_string())
        })?;

        let gcs_config = ClientConfig::default().with_auth().await.map_err(|e| {
            ImageUploadError::GcsError(format!("Failed to create GCS client: {}", e))
        })?;

        Ok(Self {
            client: Client::new(gcs_config),
            bucket_name,
        })
    }

    /// Uploads one tour image and returns its public URL.
    pub async fn upload_tour_image(
        &self,
        image: &ImageData,
        tour_id: &str,
    ) -> Result<String, ImageUploadError> {
        let extension = file_extension(&image.file_type)?;
        let bytes = decode_image(image)?;
        let name = object_name(tour_id, extension);

        let mut media = Media::new(name.clone());
        media.content_type = image.file_type.clone().into();
        let upload_type = UploadType::Simple(media);
        let upload_request = UploadObjectRequest {
            bucket: self.bucket_name.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&upload_request, bytes, &upload_type)
            .await
            .map_err(|e| ImageUploadError::GcsError(format!("Failed to upload to GCS: {}", e)))?;

        info!("Uploaded {} for tour {}", name, tour_id);
        Ok(public_url(&self.bucket_name, &name))
    }
}

//! Image transport: encoded image → remote URI.

use crate::error::TransportError;
use async_trait::async_trait;
use dl_core::model::{ImageFormat, ImageReference, RasterImage};
use dl_core::wire::{Status, UploadRequest, UploadResponse};
use reqwest::Client;
use uuid::Uuid;

#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Upload `image` under `name`. `name` should be fresh per call.
    async fn upload(
        &self,
        image: &RasterImage,
        name: &str,
    ) -> Result<ImageReference, TransportError>;
}

/// A collision-free upload name, e.g. `drop-6f1c…e2.jpg`.
pub fn upload_name(format: ImageFormat) -> String {
    format!("drop-{}.{}", Uuid::new_v4(), format.extension())
}

/// JSON upload endpoint: `POST { base64, name } → { status, uri }`.
#[derive(Debug, Clone)]
pub struct HttpImageTransport {
    client: Client,
    upload_url: String,
}

impl HttpImageTransport {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), upload_url)
    }

    pub fn with_client(client: Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl ImageTransport for HttpImageTransport {
    async fn upload(
        &self,
        image: &RasterImage,
        name: &str,
    ) -> Result<ImageReference, TransportError> {
        if image.is_empty() {
            return Err(TransportError::EmptyPayload);
        }

        let body = UploadRequest::new(&image.data_uri(), name);
        log::debug!(
            "uploading {name} ({} base64 bytes) to {}",
            body.base64.len(),
            self.upload_url
        );

        let resp = self.client.post(&self.upload_url).json(&body).send().await?;
        let http_status = resp.status();
        if !http_status.is_success() {
            return Err(TransportError::Status(http_status.as_u16()));
        }

        let parsed: UploadResponse = resp.json().await?;
        if !parsed.status.is_success() {
            return Err(TransportError::Rejected {
                status: parsed.status,
                reason: "endpoint reported failure".to_string(),
            });
        }
        if parsed.uri.trim().is_empty() {
            return Err(TransportError::Rejected {
                status: parsed.status,
                reason: "no uri assigned".to_string(),
            });
        }

        Ok(ImageReference {
            status: parsed.status,
            uri: parsed.uri,
        })
    }
}

/// No network: the reference *is* the image, as a data URI. Only useful
/// with agents that never dereference it (see `CannedAgent`).
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTransport;

#[async_trait]
impl ImageTransport for InlineTransport {
    async fn upload(
        &self,
        image: &RasterImage,
        name: &str,
    ) -> Result<ImageReference, TransportError> {
        if image.is_empty() {
            return Err(TransportError::EmptyPayload);
        }
        log::debug!("keeping {name} inline ({} bytes)", image.bytes.len());
        Ok(ImageReference {
            status: Status::Code(200),
            uri: image.data_uri(),
        })
    }
}

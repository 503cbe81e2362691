use super::{CheckinId, CheckinPayload, UploadGateway};
use crate::error::UploadError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Posts check-ins as multipart forms to a REST endpoint
pub struct HttpUploadGateway {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckinResponse {
    id: serde_json::Value,
}

impl HttpUploadGateway {
    pub fn new(
        endpoint: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            auth_token: auth_token.filter(|token| !token.is_empty()),
        })
    }

    async fn build_form(payload: &CheckinPayload) -> Result<Form, UploadError> {
        let path = payload.photo.path();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::PhotoUnreadable {
                path: path.to_path_buf(),
                source: Arc::new(e),
            })?;

        let photo = Part::bytes(bytes)
            .file_name("checkin.jpg")
            .mime_str("image/jpeg")?;

        Ok(Form::new()
            .part("photo", photo)
            .text("description", payload.description.clone())
            .text("privacy", payload.privacy.as_str())
            .text("latitude", payload.location.latitude.to_string())
            .text("longitude", payload.location.longitude.to_string())
            .text("address", payload.location.address.clone()))
    }
}

#[async_trait]
impl UploadGateway for HttpUploadGateway {
    async fn submit_checkin(&self, payload: &CheckinPayload) -> Result<CheckinId, UploadError> {
        let form = Self::build_form(payload).await?;
        debug!("Posting check-in photo {} to {}", payload.photo.id(), self.endpoint);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<CheckinResponse>()
            .await
            .map_err(|e| UploadError::InvalidResponse {
                details: e.to_string(),
            })?;

        // Backends answer with either a string or a numeric id
        let id = match body.id {
            serde_json::Value::String(id) if !id.is_empty() => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => {
                return Err(UploadError::InvalidResponse {
                    details: format!("unexpected id {}", other),
                })
            }
        };

        info!("Check-in stored as {}", id);
        Ok(CheckinId(id))
    }
}

//! HTTP upload gateway client
//!
//! Uploads raw bytes with a single `POST` to the configured upload endpoint.
//! The content type travels as the `Content-Type` header and each tag as an
//! `X-Tag-<Name>` header. The gateway answers with `{"id": "...", "url": "..."}`;
//! `url` is optional and defaults to `<gateway_url>/<id>`.

use crate::error::StoreError;
use crate::store::{ObjectStore, StoreConfig, UploadOptions, UploadReceipt};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

fn map_http_error(error: reqwest::Error) -> StoreError {
    if let Some(status) = error.status() {
        StoreError::Http {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else if error.is_timeout() {
        StoreError::Unavailable(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        StoreError::Unavailable(format!("Connection error: {}", error))
    } else {
        StoreError::Unavailable(format!("HTTP error: {}", error))
    }
}

/// Object store reached over HTTP
pub struct HttpObjectStore {
    client: Client,
    upload_url: String,
    gateway_url: String,
    api_key: Option<String>,
}

impl HttpObjectStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn headers(&self, file_name: &str, options: &UploadOptions) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, header_value(&options.content_type)?);
        headers.insert("x-file-name", header_value(file_name)?);

        if let Some(key) = &self.api_key {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
        }

        for tag in &options.tags {
            let name = HeaderName::from_bytes(format!("x-tag-{}", tag.name).as_bytes())
                .map_err(|e| StoreError::Serialization(format!("Invalid tag name '{}': {}", tag.name, e)))?;
            headers.insert(name, header_value(&tag.value)?);
        }

        Ok(headers)
    }

    /// Public URL of an object in this store
    pub fn public_url(&self, content_id: &str) -> String {
        format!("{}/{}", self.gateway_url, content_id)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value)
        .map_err(|e| StoreError::Serialization(format!("Invalid header value '{}': {}", value, e)))
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt, StoreError> {
        let headers = self.headers(file_name, &options)?;
        let size = bytes.len();

        let response = self
            .client
            .post(&self.upload_url)
            .headers(headers)
            .body(bytes)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: GatewayResponse = response.json().await.map_err(map_http_error)?;
        if body.id.trim().is_empty() {
            return Err(StoreError::Serialization(
                "Gateway returned an empty content id".to_string(),
            ));
        }
        debug!(file = %file_name, size, content_id = %body.id, "Uploaded object");

        let public_url = body.url.unwrap_or_else(|| self.public_url(&body.id));
        Ok(UploadReceipt {
            content_id: body.id,
            public_url,
        })
    }
}

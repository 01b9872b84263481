// HTTP transport for the upload endpoints

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};

use crate::upload::client::UploadTransport;
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::id::ExternalContentId;
use crate::upload::types::{CompleteRequest, IdResponse, PartReceipt};

/// Talks to a server exposing `POST /upload/begin`,
/// `/upload/{id}/{part}`, `/upload/{id}/complete` and `/upload/{id}/abort`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a transport whose requests give up after `timeout`
    pub fn with_timeout<S: Into<String>>(base_url: S, timeout: Duration) -> UploadResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UploadError::transport)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/upload/{}", self.base_url, path)
    }

    fn check(response: Response, endpoint: &str) -> UploadResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(UploadError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            })
        }
    }

    async fn post(&self, path: &str, request: reqwest::RequestBuilder) -> UploadResult<Response> {
        debug!("POST {}", self.url(path));
        let response = request.send().await.map_err(UploadError::transport)?;
        Self::check(response, path)
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn begin(&self, content_type: &str) -> UploadResult<ExternalContentId> {
        let request = self
            .client
            .post(self.url("begin"))
            .header(CONTENT_TYPE, content_type);
        let response = self.post("begin", request).await?;

        let IdResponse { id } = response.json().await.map_err(UploadError::transport)?;
        Ok(ExternalContentId(id))
    }

    async fn upload_part(
        &self,
        id: ExternalContentId,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        let path = format!("{id}/{part_number}");
        let request = self.client.post(self.url(&path)).body(body);
        let response = self.post(&path, request).await?;

        // A body, when present, carries the storage receipt
        let body = response.bytes().await.map_err(UploadError::transport)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(PartReceipt::new(part_number, None));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn complete(
        &self,
        id: ExternalContentId,
        request: &CompleteRequest,
    ) -> UploadResult<ExternalContentId> {
        let path = format!("{id}/complete");
        let http_request = self.client.post(self.url(&path)).json(request);
        let response = self.post(&path, http_request).await?;

        let body = response.bytes().await.map_err(UploadError::transport)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(id);
        }
        let IdResponse { id } = serde_json::from_slice(&body)?;
        Ok(ExternalContentId(id))
    }

    async fn abort(&self, id: ExternalContentId) -> UploadResult<()> {
        let path = format!("{id}/abort");
        let request = self.client.post(self.url(&path));
        self.post(&path, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let transport = HttpTransport::new("http://localhost:8787/cmd/");
        assert_eq!(transport.base_url(), "http://localhost:8787/cmd");
        assert_eq!(transport.url("begin"), "http://localhost:8787/cmd/upload/begin");
        assert_eq!(transport.url("5/complete"), "http://localhost:8787/cmd/upload/5/complete");
    }
}

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sos_core::BlobId;
use url::Url;

use crate::api::{BlobApi, HTTP_ALIVE_ROUTE, HTTP_BLOBS_ROUTE, NodeResponse};

/// HTTP client for a single blob-server.
pub struct BlobApiClient {
    endpoint: String,
    client: Client,
}

impl BlobApiClient {
    pub fn new(endpoint: String) -> BlobApiClient {
        BlobApiClient::with_client(endpoint, Client::new())
    }

    /// Shares an existing client, and with it its connection pool and timeouts.
    pub fn with_client(endpoint: String, client: Client) -> BlobApiClient {
        BlobApiClient { endpoint, client }
    }

    /// Appends the given segments to the endpoint, escaping each one so a blob id can never
    /// address anything but a single segment below `/blob`.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if segments.iter().any(|segment| *segment == "." || *segment == "..") {
            bail!("dot segments are not allowed in blob-server urls");
        }
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid blob-server address {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("blob-server address {} can't be a base", self.endpoint))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn blob_url(&self, id: &str) -> Result<Url> {
        self.url(&[route_segment(HTTP_BLOBS_ROUTE), id])
    }

    async fn into_node_response(response: reqwest::Response) -> Result<NodeResponse> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .context("blob-server response body")?;
        Ok(NodeResponse {
            status,
            content_type,
            body,
        })
    }
}

fn route_segment(route: &str) -> &str {
    route.trim_start_matches('/')
}

#[async_trait]
impl BlobApi for BlobApiClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn alive(&self) -> Result<String> {
        let url = self.url(&[route_segment(HTTP_ALIVE_ROUTE)])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("alive request")?
            .error_for_status()
            .context("alive status")?
            .text()
            .await
            .context("alive response")?;
        Ok(response)
    }

    async fn get_blob(&self, id: &str) -> Result<NodeResponse> {
        let url = self.blob_url(id)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("get blob request")?;
        Self::into_node_response(response).await
    }

    async fn put_blob(&self, id: &str, content: Bytes) -> Result<NodeResponse> {
        let url = self.blob_url(id)?;
        let response = self
            .client
            .post(url)
            .body(content)
            .send()
            .await
            .context("put blob request")?;
        Self::into_node_response(response).await
    }

    async fn list_blobs(&self) -> Result<Vec<BlobId>> {
        let url = self.url(&[route_segment(HTTP_BLOBS_ROUTE)])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("list blobs request")?
            .error_for_status()
            .context("list blobs status")?
            .json::<Vec<BlobId>>()
            .await
            .context("list blobs response deserialization")?;
        Ok(response)
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::Client;
use sos_http_api::blocking::BlockingClient;
use sos_http_api::client::BlobApiClient;
use tokio::runtime::{Builder, Runtime};

pub fn test_runtime() -> Result<Arc<Runtime>> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("test runtime")?;
    Ok(Arc::new(runtime))
}

pub fn blob_client(endpoint: String, runtime: Arc<Runtime>) -> BlockingClient<BlobApiClient> {
    BlockingClient::new(BlobApiClient::new(endpoint), runtime)
}

/// Plain HTTP access for routes which are not part of the blob-server client.
pub struct BlockingHttp {
    client: Client,
    runtime: Arc<Runtime>,
}

impl BlockingHttp {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        BlockingHttp {
            client: Client::new(),
            runtime,
        }
    }

    pub fn get(&self, url: &str) -> Result<(StatusCode, Bytes)> {
        self.runtime.block_on(async {
            let response = self.client.get(url).send().await?;
            anyhow::Ok((response.status(), response.bytes().await?))
        })
    }

    pub fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<(StatusCode, Bytes)> {
        let body = body.into();
        self.runtime.block_on(async {
            let response = self.client.post(url).body(body).send().await?;
            anyhow::Ok((response.status(), response.bytes().await?))
        })
    }

    pub fn delete(&self, url: &str) -> Result<StatusCode> {
        self.runtime
            .block_on(async { anyhow::Ok(self.client.delete(url).send().await?.status()) })
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use reqwest::Client;
use sos_config::{NodeRegistry, ProxyConfig};
use sos_core::{ContentDigest, strip_extension};
use sos_http_api::api::{BlobApi, MAX_BLOB_SIZE, NodeResponse};
use sos_http_api::client::BlobApiClient;
use tracing::{debug, warn};

use crate::proxy::failover::Failover;

pub const HTTP_UPLOAD_ROUTE: &str = "/upload";
pub const HTTP_FETCH_ROUTE: &str = "/fetch/{id}";

pub const UPLOAD_FAILED_RESPONSE: &str = "Upload FAILED";
pub const OBJECT_NOT_FOUND_RESPONSE: &str = "Object not found.";

/// Shared by both proxy listeners: the ordered storage nodes and how to fail over between them.
#[derive(Clone)]
pub struct ProxyState {
    nodes: Arc<[Arc<dyn BlobApi>]>,
    failover: Failover,
}

impl ProxyState {
    pub fn new(nodes: Vec<Arc<dyn BlobApi>>, failover: Failover) -> Self {
        Self {
            nodes: nodes.into(),
            failover,
        }
    }

    /// One HTTP client per registered node, all sharing a connection pool.
    pub fn from_registry(registry: &NodeRegistry, config: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.node_timeout())
            .build()
            .context("blob-server http client")?;
        let nodes = registry
            .iter()
            .map(|endpoint| {
                Arc::new(BlobApiClient::with_client(endpoint.clone(), client.clone()))
                    as Arc<dyn BlobApi>
            })
            .collect();
        Ok(Self::new(
            nodes,
            Failover::new(config.failover, config.node_timeout()),
        ))
    }

    pub fn nodes(&self) -> &[Arc<dyn BlobApi>] {
        &self.nodes
    }
}

pub fn upload_router(state: ProxyState) -> Router {
    Router::new()
        .route(HTTP_UPLOAD_ROUTE, post(upload))
        .layer(DefaultBodyLimit::max(MAX_BLOB_SIZE))
        .with_state(state)
}

pub fn download_router(state: ProxyState) -> Router {
    Router::new()
        .route(HTTP_FETCH_ROUTE, get(fetch))
        .with_state(state)
}

async fn upload(State(state): State<ProxyState>, content: Bytes) -> Response {
    let id = ContentDigest::of(&content).to_blob_id();
    debug!(%id, bytes = content.len(), "routing upload");

    let response = state
        .failover
        .attempt(state.nodes(), |node| node.put_blob(id.as_str(), content.clone()))
        .await;

    match response {
        Some(response) => relay(response),
        None => {
            warn!(%id, "no blob-server accepted the upload");
            (StatusCode::BAD_GATEWAY, UPLOAD_FAILED_RESPONSE).into_response()
        }
    }
}

async fn fetch(
    State(state): State<ProxyState>,
    name: Result<Path<String>, PathRejection>,
) -> Response {
    // A name which doesn't even decode can't be held by any node.
    let Ok(Path(name)) = name else {
        debug!("refused to route download with undecodable name");
        return not_found();
    };
    let id = strip_extension(&name);
    debug!(%id, "routing download");

    let response = state
        .failover
        .attempt(state.nodes(), |node| node.get_blob(id))
        .await;

    match response {
        Some(response) => relay(response),
        None => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, OBJECT_NOT_FOUND_RESPONSE).into_response()
}

/// Hands the node's answer to the client unchanged.
fn relay(node_response: NodeResponse) -> Response {
    let mut response = (node_response.status, node_response.body).into_response();
    let content_type = node_response
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok());
    match content_type {
        Some(value) => {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        None => {
            response.headers_mut().remove(CONTENT_TYPE);
        }
    }
    response
}

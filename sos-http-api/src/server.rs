use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use sos_blobs::BlobStore;
use sos_core::BlobId;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error};

use crate::api::{
    ALIVE_RESPONSE, BLOB_NOT_FOUND_RESPONSE, HTTP_ALIVE_ROUTE, HTTP_BLOBS_ROUTE, HTTP_BLOB_ROUTE,
    INVALID_ID_RESPONSE, MAX_BLOB_SIZE, NOT_HOSTED_RESPONSE,
};
use crate::status::UploadStatus;

/// `BlobHttpServer` exposes a [`BlobStore`] over HTTP.
///
/// # Routes
/// - `GET /alive`: liveness probe, always answers `alive`.
/// - `GET /blob/{id}`: blob content, `404` when missing.
/// - `POST /blob/{id}`: stores the request body under `id`.
/// - `GET /blob`: JSON array with the ids of all stored blobs.
///
/// Ids which are not lowercase alphanumeric are refused with `500` before the store is touched.
/// Every other path or method answers `404`.
pub struct BlobHttpServer {
    listener: TcpListener,
    store: Arc<dyn BlobStore>,
}

impl BlobHttpServer {
    pub async fn bind<A: ToSocketAddrs>(addr: A, store: Arc<dyn BlobStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .context("TCP Listener binding")?;
        Ok(BlobHttpServer { listener, store })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<()> {
        debug!(
            "blob-server HTTP endpoint listening on {}",
            self.listener.local_addr()?
        );
        axum::serve(self.listener, router(self.store))
            .await
            .context("blob-server HTTP serving")?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn BlobStore>,
}

pub fn router(store: Arc<dyn BlobStore>) -> Router {
    Router::new()
        .route(HTTP_ALIVE_ROUTE, get(alive).fallback(missing))
        .route(HTTP_BLOBS_ROUTE, get(list_blobs).fallback(missing))
        .route(
            HTTP_BLOB_ROUTE,
            get(get_blob).post(put_blob).fallback(missing),
        )
        .fallback(missing)
        .layer(DefaultBodyLimit::max(MAX_BLOB_SIZE))
        .with_state(ServerState { store })
}

async fn alive() -> impl IntoResponse {
    (StatusCode::OK, ALIVE_RESPONSE)
}

async fn get_blob(
    State(state): State<ServerState>,
    id: Result<Path<String>, PathRejection>,
) -> Response {
    let Some(id) = blob_id(id) else {
        return invalid_id();
    };

    match state.store.get(&id).await {
        Ok(Some(content)) => {
            debug!(%id, bytes = content.len(), "serving blob");
            (StatusCode::OK, content).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, BLOB_NOT_FOUND_RESPONSE).into_response(),
        Err(err) => {
            error!(%id, "failed reading blob: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn put_blob(
    State(state): State<ServerState>,
    id: Result<Path<String>, PathRejection>,
    content: Bytes,
) -> Response {
    let Some(id) = blob_id(id) else {
        return invalid_id();
    };

    let size = content.len() as u64;
    match state.store.store(&id, content).await {
        Ok(()) => {
            debug!(%id, bytes = size, "stored blob");
            (StatusCode::OK, Json(UploadStatus::ok(id, size))).into_response()
        }
        Err(err) => {
            error!(%id, "failed storing blob: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn list_blobs(State(state): State<ServerState>) -> Response {
    match state.store.existing().await {
        Ok(ids) => (StatusCode::OK, Json(ids)).into_response(),
        Err(err) => {
            error!("failed listing blobs: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_HOSTED_RESPONSE)
}

/// Ids failing to percent-decode into UTF-8 are just as invalid as any other malformed id.
fn blob_id(id: Result<Path<String>, PathRejection>) -> Option<BlobId> {
    match id {
        Ok(Path(id)) => BlobId::from_str(&id)
            .inspect_err(|_| debug!(%id, "refused invalid blob id"))
            .ok(),
        Err(rejection) => {
            debug!("refused undecodable blob id: {rejection}");
            None
        }
    }
}

fn invalid_id() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INVALID_ID_RESPONSE).into_response()
}

use std::net::SocketAddr;

use anyhow::{Result, bail};
use sos_config::NodeConfig;
use sos_http_api::api::{HTTP_ALIVE_ROUTE, HTTP_BLOBS_ROUTE, HTTP_BLOB_ROUTE};
use tokio::runtime::Runtime;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A running blob-server.
pub struct NodeContext {
    config: NodeConfig,
    local_addr: SocketAddr,
    http_handle: JoinHandle<Result<()>>,
    cancellation_token: CancellationToken,
    runtime: Runtime,
}

impl NodeContext {
    pub fn new(
        config: NodeConfig,
        local_addr: SocketAddr,
        http_handle: JoinHandle<Result<()>>,
        cancellation_token: CancellationToken,
        runtime: Runtime,
    ) -> Self {
        NodeContext {
            config,
            local_addr,
            http_handle,
            cancellation_token,
            runtime,
        }
    }

    /// Base URL under which this blob-server is reachable.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn log_configuration(&self) {
        info!("‣ blob store:");
        info!("  - {}", self.config.store.display());
        info!("‣ blob-server endpoints:");
        for route in [HTTP_ALIVE_ROUTE, HTTP_BLOBS_ROUTE, HTTP_BLOB_ROUTE] {
            info!("  - {}{}", self.endpoint(), route);
        }
    }

    pub fn wait_for_termination(&self) -> Result<()> {
        let cloned_token = self.cancellation_token.clone();
        self.runtime.block_on(async move {
            tokio::select! {
                _ = cloned_token.cancelled() => bail!("blob-server HTTP listener terminated"),
                _ = signal::ctrl_c() => {},
            };
            Ok(())
        })
    }

    pub fn shutdown(self) -> Result<()> {
        self.http_handle.abort();
        self.runtime.shutdown_background();
        Ok(())
    }
}

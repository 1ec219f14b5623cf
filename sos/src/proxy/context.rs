use std::net::SocketAddr;

use anyhow::{Result, bail};
use sos_config::{NodeRegistry, ProxyConfig};
use tokio::runtime::Runtime;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::proxy::server::{HTTP_FETCH_ROUTE, HTTP_UPLOAD_ROUTE};

/// A running sos-server with its upload and download listeners.
pub struct ProxyContext {
    config: ProxyConfig,
    registry: NodeRegistry,
    upload_addr: SocketAddr,
    download_addr: SocketAddr,
    upload_handle: JoinHandle<Result<()>>,
    download_handle: JoinHandle<Result<()>>,
    cancellation_token: CancellationToken,
    runtime: Runtime,
}

impl ProxyContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ProxyConfig,
        registry: NodeRegistry,
        upload_addr: SocketAddr,
        download_addr: SocketAddr,
        upload_handle: JoinHandle<Result<()>>,
        download_handle: JoinHandle<Result<()>>,
        cancellation_token: CancellationToken,
        runtime: Runtime,
    ) -> Self {
        ProxyContext {
            config,
            registry,
            upload_addr,
            download_addr,
            upload_handle,
            download_handle,
            cancellation_token,
            runtime,
        }
    }

    pub fn upload_url(&self) -> String {
        format!("http://{}{}", self.upload_addr, HTTP_UPLOAD_ROUTE)
    }

    /// Download URL prefix, the object name is appended to it.
    pub fn download_url(&self) -> String {
        let prefix = HTTP_FETCH_ROUTE.trim_end_matches("{id}");
        format!("http://{}{}", self.download_addr, prefix)
    }

    pub fn log_configuration(&self) {
        info!("‣ sos-server endpoints:");
        info!("  - upload: {}", self.upload_url());
        info!("  - download: {}", self.download_url());
        info!(
            "‣ failover: {:?}, node timeout {:?}",
            self.config.failover,
            self.config.node_timeout()
        );
        if self.registry.is_empty() {
            warn!("‣ no blob-servers registered, every request will fail");
        } else {
            info!("‣ blob-servers:");
            for node in self.registry.iter() {
                info!("  - {node}");
            }
        }
    }

    pub fn wait_for_termination(&self) -> Result<()> {
        let cloned_token = self.cancellation_token.clone();
        self.runtime.block_on(async move {
            tokio::select! {
                _ = cloned_token.cancelled() => bail!("sos-server HTTP listener terminated"),
                _ = signal::ctrl_c() => {},
            };
            Ok(())
        })
    }

    pub fn shutdown(self) -> Result<()> {
        self.upload_handle.abort();
        self.download_handle.abort();
        self.runtime.shutdown_background();
        Ok(())
    }
}

use anyhow::{Context as AnyhowContext, Result};
use axum::Router;
use sos_config::{NodeRegistry, ProxyConfig, load_proxy_config};
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::proxy::ProxyContext;
use crate::proxy::server::{ProxyState, download_router, upload_router};
use crate::tracing::setup_tracing;

pub struct ProxyContextBuilder {
    config: ProxyConfig,
    registry: NodeRegistry,
}

impl ProxyContextBuilder {
    pub fn new(config: ProxyConfig) -> Self {
        setup_tracing(config.log_level.clone());
        let registry = NodeRegistry::from_config(&config);
        ProxyContextBuilder { config, registry }
    }

    /// Load the configuration from the environment and initializes context builder
    pub fn from_cli() -> Result<Self> {
        let config = load_proxy_config()?;
        Ok(ProxyContextBuilder::new(config))
    }

    /// Binds the upload and download listeners and starts serving both on a dedicated runtime.
    ///
    /// A failed bind of either listener is returned before anything is spawned. Once running,
    /// the first listener to terminate cancels the context.
    pub fn try_build_and_start(&self) -> Result<ProxyContext> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("sos-server")
            .build()
            .context("sos-server tokio runtime")?;

        let state = ProxyState::from_registry(&self.registry, &self.config)?;
        let host = self.config.host.as_str();

        let (upload_listener, download_listener) = runtime.block_on(async {
            let upload = TcpListener::bind((host, self.config.upload_port))
                .await
                .with_context(|| {
                    format!("failed to bind upload listener on {host}:{}", self.config.upload_port)
                })?;
            let download = TcpListener::bind((host, self.config.download_port))
                .await
                .with_context(|| {
                    format!(
                        "failed to bind download listener on {host}:{}",
                        self.config.download_port
                    )
                })?;
            anyhow::Ok((upload, download))
        })?;
        let upload_addr = upload_listener.local_addr()?;
        let download_addr = download_listener.local_addr()?;

        let cancellation_token = CancellationToken::new();
        let upload_handle = spawn_listener(
            &runtime,
            "upload",
            upload_listener,
            upload_router(state.clone()),
            cancellation_token.clone(),
        );
        let download_handle = spawn_listener(
            &runtime,
            "download",
            download_listener,
            download_router(state),
            cancellation_token.clone(),
        );

        Ok(ProxyContext::new(
            self.config.clone(),
            self.registry.clone(),
            upload_addr,
            download_addr,
            upload_handle,
            download_handle,
            cancellation_token,
            runtime,
        ))
    }
}

fn spawn_listener(
    runtime: &tokio::runtime::Runtime,
    name: &'static str,
    listener: TcpListener,
    router: Router,
    token: CancellationToken,
) -> JoinHandle<Result<()>> {
    runtime.spawn(async move {
        if let Ok(addr) = listener.local_addr() {
            debug!("sos-server {name} endpoint listening on {addr}");
        }
        let result = axum::serve(listener, router)
            .await
            .with_context(|| format!("sos-server {name} HTTP serving"))
            .inspect_err(|e| error!("sos-server {name} http result {}", e));
        token.cancel();
        result
    })
}

use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use sos_blobs::{BlobStore, FilesystemStore};
use sos_config::{NodeConfig, load_node_config};
use sos_http_api::server::BlobHttpServer;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::node::NodeContext;
use crate::tracing::setup_tracing;

pub struct NodeContextBuilder {
    config: NodeConfig,
    store: Option<Arc<dyn BlobStore>>,
}

impl NodeContextBuilder {
    pub fn new(config: NodeConfig) -> Self {
        setup_tracing(config.log_level.clone());
        NodeContextBuilder {
            config,
            store: None,
        }
    }

    /// Load the configuration from the environment and initializes context builder
    pub fn from_cli() -> Result<Self> {
        let config = load_node_config()?;
        Ok(NodeContextBuilder::new(config))
    }

    /// Serves the given store instead of a filesystem store at the configured path.
    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets up the blob store, binds the HTTP listener and starts serving on a dedicated runtime.
    ///
    /// Failing to create the store root or to bind the listener is reported right here, the
    /// server is only spawned once both succeeded.
    pub fn try_build_and_start(&self) -> Result<NodeContext> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("blob-server")
            .build()
            .context("blob-server tokio runtime")?;

        let server = runtime.block_on(async {
            let store: Arc<dyn BlobStore> = match &self.store {
                Some(store) => store.clone(),
                None => Arc::new(
                    FilesystemStore::setup(&self.config.store)
                        .await
                        .with_context(|| {
                            format!("failed to set up store at {}", self.config.store.display())
                        })?,
                ),
            };
            BlobHttpServer::bind((self.config.host.as_str(), self.config.port), store)
                .await
                .with_context(|| {
                    format!(
                        "failed to bind blob-server on {}:{}",
                        self.config.host, self.config.port
                    )
                })
        })?;
        let local_addr = server.local_addr()?;

        let cancellation_token = CancellationToken::new();
        let server_token = cancellation_token.clone();
        let http_handle = runtime.spawn(async move {
            let result = server
                .run()
                .await
                .inspect_err(|e| error!("blob-server http result {}", e));
            server_token.cancel();
            result
        });

        Ok(NodeContext::new(
            self.config.clone(),
            local_addr,
            http_handle,
            cancellation_token,
            runtime,
        ))
    }
}

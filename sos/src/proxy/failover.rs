use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sos_config::FailoverPolicy;
use sos_http_api::api::{BlobApi, NodeResponse};
use tokio::time::timeout;
use tracing::warn;

/// Ordered failover across storage nodes.
///
/// Nodes are tried strictly one after another in registry order, never in parallel. Every attempt
/// gets its own deadline, an attempt running past it counts as a transport failure.
#[derive(Clone, Copy, Debug)]
pub struct Failover {
    policy: FailoverPolicy,
    attempt_timeout: Duration,
}

impl Failover {
    pub fn new(policy: FailoverPolicy, attempt_timeout: Duration) -> Self {
        Self {
            policy,
            attempt_timeout,
        }
    }

    /// Returns the response of the first node accepting the operation, `None` if no node did.
    pub async fn attempt<'n, F, Fut>(
        &self,
        nodes: &'n [Arc<dyn BlobApi>],
        mut operation: F,
    ) -> Option<NodeResponse>
    where
        F: FnMut(&'n dyn BlobApi) -> Fut,
        Fut: Future<Output = Result<NodeResponse>>,
    {
        for node in nodes {
            let node = node.as_ref();
            match timeout(self.attempt_timeout, operation(node)).await {
                Ok(Ok(response)) if self.accepts(&response) => return Some(response),
                Ok(Ok(response)) => {
                    warn!(
                        node = node.endpoint(),
                        status = %response.status,
                        "node declined request, trying next"
                    );
                }
                Ok(Err(err)) => {
                    warn!(node = node.endpoint(), "node unreachable, trying next: {err:#}");
                }
                Err(_) => {
                    warn!(
                        node = node.endpoint(),
                        timeout = ?self.attempt_timeout,
                        "node timed out, trying next"
                    );
                }
            }
        }
        None
    }

    fn accepts(&self, response: &NodeResponse) -> bool {
        match self.policy {
            FailoverPolicy::Transport => true,
            FailoverPolicy::Status => response.is_success(),
        }
    }
}

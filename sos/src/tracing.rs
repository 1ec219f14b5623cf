use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const WORKSPACE_CRATES: [&str; 5] = ["sos", "sos_blobs", "sos_config", "sos_core", "sos_http_api"];

/// Installs the global subscriber, once per process.
///
/// A bare level like `debug` applies to the crates of this workspace only, anything else is used
/// as filter directive. Without a filter `RUST_LOG` is consulted, and when that is unset too the
/// workspace crates log at `info` while dependencies stay quiet.
pub fn setup_tracing(filter: Option<String>) {
    let directives = match filter {
        Some(filter) => match Level::from_str(&filter) {
            Ok(level) => workspace_directives(level),
            Err(_) => filter,
        },
        None => std::env::var(EnvFilter::DEFAULT_ENV)
            .unwrap_or_else(|_| workspace_directives(Level::INFO)),
    };

    tracing_subscriber::registry()
        .with(Layer::default())
        .with(EnvFilter::builder().parse_lossy(directives))
        .try_init()
        .ok();
}

fn workspace_directives(level: Level) -> String {
    WORKSPACE_CRATES
        .iter()
        .map(|name| format!("{name}={level}"))
        .collect::<Vec<String>>()
        .join(",")
}

use std::ffi::OsString;
use std::path::{PathBuf, absolute};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use directories::BaseDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE_HOST: &str = "127.0.0.1";
pub const DEFAULT_NODE_PORT: u16 = 3001;
pub const DEFAULT_STORE_PATH: &str = "data";

pub const DEFAULT_PROXY_HOST: &str = "0.0.0.0";
pub const DEFAULT_UPLOAD_PORT: u16 = 9991;
pub const DEFAULT_DOWNLOAD_PORT: u16 = 9992;
pub const DEFAULT_NODE_TIMEOUT_SECONDS: u64 = 30;

pub const SYSTEM_REGISTRY_PATH: &str = "/etc/sos.conf";
pub const USER_REGISTRY_FILE: &str = ".sos.conf";

pub const NODE_ENV_PREFIX: &str = "BLOB_SERVER_";
pub const PROXY_ENV_PREFIX: &str = "SOS_";

/// Decides when a storage node's answer ends the failover loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailoverPolicy {
    /// Only a 2xx answer is final, everything else moves on to the next node.
    #[default]
    Status,
    /// Any completed HTTP exchange is final, only transport failures move on.
    Transport,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub store: PathBuf,
    pub log_level: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_NODE_HOST.to_string(),
            port: DEFAULT_NODE_PORT,
            store: PathBuf::from(DEFAULT_STORE_PATH),
            log_level: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    pub host: String,
    pub upload_port: u16,
    pub download_port: u16,
    /// Storage nodes given directly, tried after the ones from the registry files.
    pub blob_servers: Vec<String>,
    pub system_registry: PathBuf,
    pub user_registry: Option<PathBuf>,
    pub node_timeout_seconds: u64,
    pub failover: FailoverPolicy,
    pub log_level: Option<String>,
}

impl ProxyConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_seconds)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROXY_HOST.to_string(),
            upload_port: DEFAULT_UPLOAD_PORT,
            download_port: DEFAULT_DOWNLOAD_PORT,
            blob_servers: Vec::new(),
            system_registry: PathBuf::from(SYSTEM_REGISTRY_PATH),
            user_registry: BaseDirs::new().map(|dirs| dirs.home_dir().join(USER_REGISTRY_FILE)),
            node_timeout_seconds: DEFAULT_NODE_TIMEOUT_SECONDS,
            failover: FailoverPolicy::default(),
            log_level: None,
        }
    }
}

#[derive(Parser, Serialize, Debug)]
#[command(
    name = "blob-server",
    about = "Storage node of the simple object store",
    long_about = None,
    version
)]
struct NodeCli {
    /// Path to an optional YAML configuration file.
    #[arg(short = 'c', long, value_name = "PATH")]
    #[serde(skip)]
    config: Option<PathBuf>,

    /// The IP to listen upon.
    #[arg(long, value_name = "HOST")]
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    /// The port to bind upon.
    #[arg(short = 'p', long, value_name = "PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,

    /// The directory blobs are written to.
    #[arg(short = 's', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<PathBuf>,

    #[arg(short = 'l', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

#[derive(Parser, Serialize, Debug)]
#[command(
    name = "sos-server",
    about = "Routing proxy of the simple object store",
    long_about = None,
    version
)]
struct ProxyCli {
    /// Path to an optional YAML configuration file.
    #[arg(short = 'c', long, value_name = "PATH")]
    #[serde(skip)]
    config: Option<PathBuf>,

    /// The IP to listen upon.
    #[arg(long, value_name = "HOST")]
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    /// Comma-separated list of blob-servers to contact.
    #[arg(short = 'b', long = "blob-server", value_name = "URL,...", value_delimiter = ',')]
    #[serde(skip_serializing_if = "Option::is_none")]
    blob_servers: Option<Vec<String>>,

    /// The port to bind upon for uploading objects.
    #[arg(short = 'u', long, value_name = "PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_port: Option<u16>,

    /// The port to bind upon for downloading objects.
    #[arg(short = 'd', long, value_name = "PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    download_port: Option<u16>,

    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    system_registry: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    user_registry: Option<PathBuf>,

    /// Timeout for every single request against a blob-server.
    #[arg(short = 't', long, value_name = "SECONDS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    node_timeout_seconds: Option<u64>,

    #[arg(short = 'f', long, value_enum, value_name = "POLICY")]
    #[serde(skip_serializing_if = "Option::is_none")]
    failover: Option<FailoverPolicy>,

    #[arg(short = 'l', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

/// Loads the storage node configuration from defaults, an optional YAML file, `BLOB_SERVER_*`
/// environment variables and the process arguments, in increasing order of precedence.
pub fn load_node_config() -> Result<NodeConfig> {
    load_node_config_from(std::env::args_os())
}

pub fn load_node_config_from<I, T>(args: I) -> Result<NodeConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = NodeCli::try_parse_from(args)?;

    let mut figment = Figment::new().merge(Serialized::defaults(NodeConfig::default()));
    if let Some(path) = &cli.config {
        figment = figment.merge(Yaml::file(path));
    }
    let mut config: NodeConfig = figment
        .merge(Env::prefixed(NODE_ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()
        .context("invalid blob-server configuration")?;

    config.store = absolute(&config.store).context("establish absolute store path")?;

    Ok(config)
}

/// Loads the proxy configuration from defaults, an optional YAML file, `SOS_*` environment
/// variables and the process arguments, in increasing order of precedence.
pub fn load_proxy_config() -> Result<ProxyConfig> {
    load_proxy_config_from(std::env::args_os())
}

pub fn load_proxy_config_from<I, T>(args: I) -> Result<ProxyConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = ProxyCli::try_parse_from(args)?;

    let mut figment = Figment::new().merge(Serialized::defaults(ProxyConfig::default()));
    if let Some(path) = &cli.config {
        figment = figment.merge(Yaml::file(path));
    }
    let config = figment
        .merge(Env::prefixed(PROXY_ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()
        .context("invalid sos-server configuration")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use figment::Jail;

    use super::{
        DEFAULT_DOWNLOAD_PORT, DEFAULT_NODE_PORT, FailoverPolicy, NodeConfig, ProxyConfig,
        load_node_config_from, load_proxy_config_from,
    };

    #[test]
    fn node_defaults() {
        Jail::expect_with(|_jail| {
            let config = load_node_config_from(["blob-server"]).map_err(|e| e.to_string())?;
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, DEFAULT_NODE_PORT);
            assert!(config.store.is_absolute());
            assert!(config.store.ends_with("data"));
            assert_eq!(config.log_level, None);
            Ok(())
        });
    }

    #[test]
    fn node_cli_overrides_env_which_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "node.yaml",
                "host: 0.0.0.0\nport: 4000\nstore: /srv/blobs\n",
            )?;
            jail.set_env("BLOB_SERVER_PORT", "5000");

            let config = load_node_config_from(["blob-server", "--config", "node.yaml"])
                .map_err(|e| e.to_string())?;
            assert_eq!(
                config,
                NodeConfig {
                    host: "0.0.0.0".to_string(),
                    port: 5000,
                    store: PathBuf::from("/srv/blobs"),
                    log_level: None,
                }
            );

            let config = load_node_config_from([
                "blob-server",
                "--config",
                "node.yaml",
                "--port",
                "6000",
                "--log-level",
                "debug",
            ])
            .map_err(|e| e.to_string())?;
            assert_eq!(config.port, 6000);
            assert_eq!(config.log_level, Some("debug".to_string()));
            Ok(())
        });
    }

    #[test]
    fn proxy_defaults() {
        Jail::expect_with(|_jail| {
            let config = load_proxy_config_from(["sos-server"]).map_err(|e| e.to_string())?;
            let default = ProxyConfig::default();
            assert_eq!(config, default);
            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.upload_port, 9991);
            assert_eq!(config.download_port, DEFAULT_DOWNLOAD_PORT);
            assert!(config.blob_servers.is_empty());
            assert_eq!(config.system_registry, PathBuf::from("/etc/sos.conf"));
            assert_eq!(config.failover, FailoverPolicy::Status);
            assert_eq!(config.node_timeout().as_secs(), 30);
            Ok(())
        });
    }

    #[test]
    fn proxy_comma_separated_blob_servers() {
        Jail::expect_with(|_jail| {
            let config = load_proxy_config_from([
                "sos-server",
                "--blob-server",
                "http://localhost:3001,http://localhost:3002",
                "--failover",
                "transport",
                "--upload-port",
                "8001",
            ])
            .map_err(|e| e.to_string())?;
            assert_eq!(
                config.blob_servers,
                vec![
                    "http://localhost:3001".to_string(),
                    "http://localhost:3002".to_string()
                ]
            );
            assert_eq!(config.failover, FailoverPolicy::Transport);
            assert_eq!(config.upload_port, 8001);
            assert_eq!(config.download_port, 9992);
            Ok(())
        });
    }

    #[test]
    fn proxy_env_and_file_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sos.yaml",
                concat!(
                    "download_port: 7002\n",
                    "node_timeout_seconds: 3\n",
                    "blob_servers:\n",
                    "  - http://from-file:3001\n",
                    "user_registry: /nonexistent/.sos.conf\n",
                ),
            )?;
            jail.set_env("SOS_FAILOVER", "transport");
            jail.set_env("SOS_DOWNLOAD_PORT", "7102");

            let config = load_proxy_config_from(["sos-server", "-c", "sos.yaml"])
                .map_err(|e| e.to_string())?;
            assert_eq!(config.download_port, 7102);
            assert_eq!(config.node_timeout_seconds, 3);
            assert_eq!(config.blob_servers, vec!["http://from-file:3001".to_string()]);
            assert_eq!(
                config.user_registry,
                Some(PathBuf::from("/nonexistent/.sos.conf"))
            );
            assert_eq!(config.failover, FailoverPolicy::Transport);
            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_failover_policy() {
        Jail::expect_with(|_jail| {
            assert!(load_proxy_config_from(["sos-server", "--failover", "random"]).is_err());
            Ok(())
        });
    }
}

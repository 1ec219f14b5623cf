use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::configuration::ProxyConfig;

/// Ordered list of storage node base addresses known to the proxy.
///
/// The order is the failover priority. Entries are not validated or deduplicated, an address
/// which can't be reached or parsed simply fails when a request is routed to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRegistry {
    nodes: Vec<String>,
}

impl NodeRegistry {
    /// Assembles the registry from the system-wide file, the user file and finally the nodes
    /// given in the configuration itself.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let mut nodes = read_registry_file(&config.system_registry);
        if let Some(path) = &config.user_registry {
            nodes.extend(read_registry_file(path));
        }
        nodes.extend(
            config
                .blob_servers
                .iter()
                .map(|entry| entry.trim())
                .filter(|entry| !entry.is_empty())
                .map(String::from),
        );
        Self { nodes }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }
}

impl fmt::Display for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.nodes.join(", "))
    }
}

/// Parses one node address per line, skipping blank lines.
pub fn parse_registry(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn read_registry_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_registry(&contents),
        Err(err) => {
            debug!(path = %path.display(), "skipping node registry file: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{NodeRegistry, parse_registry};
    use crate::configuration::ProxyConfig;

    fn proxy_config(system: PathBuf, user: Option<PathBuf>, cli: &[&str]) -> ProxyConfig {
        ProxyConfig {
            system_registry: system,
            user_registry: user,
            blob_servers: cli.iter().map(|entry| entry.to_string()).collect(),
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn parse_one_address_per_line() {
        let parsed = parse_registry("http://a:3001\n\n  http://b:3001  \r\nhttp://c:3001");
        assert_eq!(parsed, vec!["http://a:3001", "http://b:3001", "http://c:3001"]);
        assert!(parse_registry("").is_empty());
        assert!(parse_registry("\n \n").is_empty());
    }

    #[test]
    fn order_is_system_then_user_then_config() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("sos.conf");
        let user = dir.path().join(".sos.conf");
        std::fs::write(&system, "http://system-1\nhttp://system-2\n").unwrap();
        std::fs::write(&user, "http://user-1\n").unwrap();

        let registry = NodeRegistry::from_config(&proxy_config(
            system,
            Some(user),
            &["http://cli-1", "http://system-1"],
        ));

        assert_eq!(
            registry.nodes(),
            [
                "http://system-1",
                "http://system-2",
                "http://user-1",
                "http://cli-1",
                "http://system-1",
            ]
        );
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn missing_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let registry = NodeRegistry::from_config(&proxy_config(
            dir.path().join("absent.conf"),
            Some(dir.path().join("also-absent.conf")),
            &["http://cli-1"],
        ));
        assert_eq!(registry.nodes(), ["http://cli-1"]);
    }

    #[test]
    fn empty_sources_give_empty_registry() {
        let dir = TempDir::new().unwrap();
        let registry =
            NodeRegistry::from_config(&proxy_config(dir.path().join("absent.conf"), None, &[""]));
        assert!(registry.is_empty());
        assert_eq!(registry.to_string(), "[]");
    }

    #[test]
    fn directory_as_registry_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let registry = NodeRegistry::from_config(&proxy_config(
            dir.path().to_path_buf(),
            None,
            &["http://cli-1", " http://cli-2 "],
        ));
        assert_eq!(registry.nodes(), ["http://cli-1", "http://cli-2"]);
        assert_eq!(registry.to_string(), "[http://cli-1, http://cli-2]");
    }
}

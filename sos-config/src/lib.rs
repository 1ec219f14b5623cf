pub mod configuration;
pub mod registry;

pub use configuration::{
    FailoverPolicy, NodeConfig, ProxyConfig, load_node_config, load_node_config_from,
    load_proxy_config, load_proxy_config_from,
};
pub use registry::NodeRegistry;

mod context;
mod context_builder;
pub mod failover;
pub mod server;

pub use context::ProxyContext;
pub use context_builder::ProxyContextBuilder;

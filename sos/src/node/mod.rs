mod context;
mod context_builder;

pub use context::NodeContext;
pub use context_builder::NodeContextBuilder;

pub mod node;
pub mod proxy;
pub mod tracing;

#[cfg(test)]
mod tests;

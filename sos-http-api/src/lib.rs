pub mod api;
pub mod blocking;
pub mod client;
pub mod server;
pub mod status;

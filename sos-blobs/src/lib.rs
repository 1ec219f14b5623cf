mod filesystem;
mod memory;
mod store;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use store::{BlobStore, StoreError};

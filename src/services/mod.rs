//! Clients for the external services the backend calls out to.

/// AI-assist proxy and quiz generation
pub mod assistant;
/// Object storage uploads
pub mod storage;

pub use assistant::{ASSISTANT_UNAVAILABLE, AssistantClient};
pub use storage::StorageClient;

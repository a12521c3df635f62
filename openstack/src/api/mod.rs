//! Remote API boundary: identity, catalog, session and per-service clients

pub mod blockstorage;
pub mod catalog;
pub mod client;
pub mod common;
pub mod error;
pub mod identity;
pub mod networking;
pub mod pool;
pub mod session;
pub mod workflow;

pub use catalog::Catalog;
pub use client::{RetryConfig, ServiceClient};
pub use error::ApiError;
pub use identity::Token;
pub use session::Session;

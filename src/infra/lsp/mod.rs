//! LSP Infrastructure for symgate
//!
//! - JSON-RPC 2.0 protocol types
//! - Content-Length framed transport over sockets and child stdio
//! - Per-invocation session with guaranteed teardown

pub mod protocol;
pub mod session;
pub mod transport;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LspError;

pub use session::{Session, with_session};

/// The request half of a live language-server connection
#[async_trait]
pub trait LspBackend: Send + Sync {
    async fn request_value(&self, method: &str, params: Value) -> Result<Value, LspError>;
}

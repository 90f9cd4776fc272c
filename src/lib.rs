//! symgate - symbol-level code operations backed by a language server
//!
//! Locates named symbols through a language server, patches files with
//! offset-safe multi-edit application, and reports references, renames and
//! diagnostics. One session per invocation, always released.

pub mod app;
pub mod cli;
pub mod error;
pub mod infra;
pub mod models;
pub mod services;

pub use error::{ToolError, ToolResult};

//! Data models for symgate
//!
//! Core type definitions shared across the session, resolver and applier.

pub mod config;
pub mod diagnostic;
pub mod lsp;
pub mod symbol;

// Re-export commonly used types
pub use config::{BackendMode, SymgateConfig};
pub use diagnostic::Diagnostic;
pub use lsp::{FileEditSet, Position, Range, TextEdit, WorkspaceEdit};
pub use symbol::{SymbolKind, SymbolLocation};

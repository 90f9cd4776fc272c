//! Infrastructure layer for symgate
//!
//! Language-server plumbing and filesystem policies.

pub mod lsp;
pub mod path_policy;
pub mod project;

//! Service layer for symgate

pub mod config;
pub mod edit_applier;
pub mod resolver;
pub mod search_replace;
pub mod tools;

pub use config::{ConfigService, DefaultConfigService};
pub use tools::SymbolTools;

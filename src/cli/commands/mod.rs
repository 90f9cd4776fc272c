//! Command implementations for symgate
//!
//! Each command is implemented in its own module.

pub mod diagnostics;
pub mod edit;
pub mod read;
pub mod refs;
pub mod rename;
pub mod replace;

use std::path::PathBuf;

use clap::Args;

/// Arguments shared by the commands that look a symbol up by name
#[derive(Args, Debug, Clone)]
pub struct SymbolArgs {
    /// File containing the symbol
    pub file: PathBuf,

    /// Symbol name
    pub name: String,

    /// Symbol kind: function, method, class, interface, variable, constant,
    /// property, field
    #[arg(short = 't', long = "type", value_name = "KIND")]
    pub kind: String,
}

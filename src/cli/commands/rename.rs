//! Rename command - LSP-powered symbol renaming

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::ParsedLocation;

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// File path with position (file:line:column, one-based)
    pub location: String,

    /// New name for the symbol
    pub new_name: String,
}

pub async fn execute(args: RenameArgs, app: &App) -> Result<ExitCode> {
    let loc = ParsedLocation::parse(&args.location)?;
    tracing::debug!("Renaming symbol at {} to '{}'", loc, args.new_name);

    let result = app
        .tools
        .rename_symbol(&loc.file, loc.position(), &args.new_name)
        .await;
    Ok(app.output.report(result))
}

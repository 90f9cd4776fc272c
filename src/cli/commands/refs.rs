//! find-references command implementation

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::SymbolArgs;
use crate::app::App;

#[derive(Args, Debug)]
pub struct FindReferencesArgs {
    #[command(flatten)]
    pub symbol: SymbolArgs,
}

pub async fn execute(args: FindReferencesArgs, app: &App) -> Result<ExitCode> {
    let SymbolArgs { file, name, kind } = &args.symbol;
    let result = app.tools.find_references(file, name, kind).await;
    Ok(app.output.report(result))
}

//! read-symbol command implementation

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::SymbolArgs;
use crate::app::App;

#[derive(Args, Debug)]
pub struct ReadSymbolArgs {
    #[command(flatten)]
    pub symbol: SymbolArgs,
}

pub async fn execute(args: ReadSymbolArgs, app: &App) -> Result<ExitCode> {
    let SymbolArgs { file, name, kind } = &args.symbol;
    let result = app.tools.read_symbol(file, name, kind).await;
    Ok(app.output.report(result))
}

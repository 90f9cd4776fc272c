//! get-errors command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::App;

#[derive(Args, Debug)]
pub struct GetErrorsArgs {
    /// File path to check
    pub file: PathBuf,
}

pub async fn execute(args: GetErrorsArgs, app: &App) -> Result<ExitCode> {
    let result = app.tools.get_errors(&args.file).await;
    Ok(app.output.report(result))
}

//! search-replace command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::App;

#[derive(Args, Debug)]
pub struct SearchReplaceArgs {
    /// File to modify
    pub file: PathBuf,

    /// Text to look for; whitespace differences are ignored
    #[arg(long = "old", value_name = "TEXT")]
    pub old_content: String,

    /// Replacement text, inserted literally
    #[arg(long = "new", value_name = "TEXT")]
    pub new_content: String,
}

pub async fn execute(args: SearchReplaceArgs, app: &App) -> Result<ExitCode> {
    let result = app
        .tools
        .search_replace_file(&args.file, &args.old_content, &args.new_content)
        .await;
    Ok(app.output.report(result))
}

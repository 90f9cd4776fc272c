//! edit-symbol command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncReadExt;

use super::SymbolArgs;
use crate::app::App;

#[derive(Args, Debug)]
pub struct EditSymbolArgs {
    #[command(flatten)]
    pub symbol: SymbolArgs,

    /// Replacement text for the whole symbol
    #[arg(short, long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the replacement text from a file ("-" for stdin)
    #[arg(long, value_name = "PATH")]
    pub content_file: Option<PathBuf>,
}

pub async fn execute(args: EditSymbolArgs, app: &App) -> Result<ExitCode> {
    let content = new_content(&args).await?;
    let SymbolArgs { file, name, kind } = &args.symbol;

    let result = app.tools.edit_symbol(file, name, kind, &content).await;
    Ok(app.output.report(result))
}

async fn new_content(args: &EditSymbolArgs) -> Result<String> {
    if let Some(text) = &args.content {
        return Ok(text.clone());
    }

    match args.content_file.as_deref() {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read content file: {}", path.display())),
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read replacement content from stdin")?;
            Ok(buf)
        }
    }
}

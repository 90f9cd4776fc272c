//! symgate - symbol-level code operations backed by a language server
//!
//! Prints exactly one JSON document on stdout; logs go to stderr or a file.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use symgate::app::App;
use symgate::cli::output::EXIT_STARTUP_FAILURE;
use symgate::cli::{Cli, Commands, OutputContext};
use symgate::services::config::{ConfigService, DefaultConfigService};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = OutputContext::new();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            output.print_startup_failure(&format!("Failed to create runtime: {e}"));
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    match runtime.block_on(async_main(cli)) {
        Ok(code) => code,
        Err(e) => {
            // Everything on stdout stays JSON, including startup failures
            output.print_startup_failure(&format!("{e:#}"));
            ExitCode::from(EXIT_STARTUP_FAILURE)
        }
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<ExitCode> {
    let root = std::env::current_dir().context("Failed to get current directory")?;

    let mut config = DefaultConfigService::new(&root)
        .load()
        .await
        .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    init_tracing(cli.verbose, config.log.dir.as_deref());

    let app = App::new(config, root);
    execute_command(cli.command, &app).await
}

async fn execute_command(command: Commands, app: &App) -> anyhow::Result<ExitCode> {
    use symgate::cli::commands;

    match command {
        Commands::EditSymbol(args) => commands::edit::execute(args, app).await,
        Commands::ReadSymbol(args) => commands::read::execute(args, app).await,
        Commands::FindReferences(args) => commands::refs::execute(args, app).await,
        Commands::Rename(args) => commands::rename::execute(args, app).await,
        Commands::GetErrors(args) => commands::diagnostics::execute(args, app).await,
        Commands::SearchReplace(args) => commands::replace::execute(args, app).await,
    }
}

/// Quiet by default; `--verbose` or RUST_LOG=symgate=debug for detail
fn init_tracing(verbose: bool, log_dir: Option<&Path>) {
    let filter = if verbose {
        EnvFilter::new("symgate=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "symgate=warn".into())
    };

    let log_file = log_dir.and_then(|dir| match open_log_file(dir) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("symgate: cannot open log file in {}: {e}", dir.display());
            None
        }
    });

    let (stderr_layer, file_layer) = match log_file {
        Some(file) => (
            None,
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            ),
        ),
        None => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            ),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn open_log_file(dir: &Path) -> std::io::Result<File> {
    std::fs::create_dir_all(dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    File::create(dir.join(format!("symgate-{stamp}.log")))
}

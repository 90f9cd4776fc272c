//! CLI module for symgate
//!
//! Provides command-line interface using clap derive macros.

pub mod commands;
pub mod location;
pub mod output;

pub use location::ParsedLocation;
pub use output::OutputContext;

use clap::{Parser, Subcommand};

use crate::models::config::{BackendMode, SymgateConfig};
use commands::{
    diagnostics::GetErrorsArgs, edit::EditSymbolArgs, read::ReadSymbolArgs,
    refs::FindReferencesArgs, rename::RenameArgs, replace::SearchReplaceArgs,
};

const LONG_ABOUT: &str = r#"
symgate - symbol-level code operations backed by a language server

Each invocation opens one language-server session, performs one operation,
and prints a single JSON document on stdout.

EXAMPLES:
  symgate read-symbol src/app.ts render --type function
  symgate edit-symbol src/app.ts Config --type class --content-file new.ts
  symgate find-references src/app.ts parse --type function
  symgate rename src/app.ts:12:7 parseConfig
  symgate get-errors src/app.ts
  symgate search-replace src/app.ts --old "let x = 1;" --new "const x = 1;"

BACKENDS:
  socket  connect to an editor-hosted server (default 127.0.0.1:5870)
  stdio   spawn `npx typescript-language-server --stdio` per invocation
"#;

/// symgate - symbol-level code operations backed by a language server
#[derive(Parser, Debug)]
#[command(name = "symgate")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'symgate <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// How to reach the language server
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendMode>,

    /// Port of an editor-hosted server (socket backend)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Verbose output (debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line flags take precedence over files and environment
    pub fn apply_overrides(&self, config: &mut SymgateConfig) {
        if let Some(mode) = self.backend {
            config.lsp.mode = mode;
        }
        if let Some(port) = self.port {
            config.lsp.port = port;
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace a named symbol with new content
    EditSymbol(EditSymbolArgs),

    /// Print the source of a named symbol
    ReadSymbol(ReadSymbolArgs),

    /// List references to a named symbol
    FindReferences(FindReferencesArgs),

    /// Rename the symbol at a position across the project
    Rename(RenameArgs),

    /// Get diagnostics for a file
    GetErrors(GetErrorsArgs),

    /// Replace text in a file, ignoring whitespace differences
    SearchReplace(SearchReplaceArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "symgate",
            "get-errors",
            "src/app.ts",
            "--backend",
            "stdio",
            "--port",
            "6000",
        ])
        .unwrap();

        let mut config = SymgateConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.lsp.mode, BackendMode::Stdio);
        assert_eq!(config.lsp.port, 6000);
    }

    #[test]
    fn test_symbol_args() {
        let cli = Cli::try_parse_from([
            "symgate",
            "read-symbol",
            "src/app.ts",
            "render",
            "--type",
            "method",
        ])
        .unwrap();

        match cli.command {
            Commands::ReadSymbol(args) => {
                assert_eq!(args.symbol.name, "render");
                assert_eq!(args.symbol.kind, "method");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_edit_content_sources_conflict() {
        let err = Cli::try_parse_from([
            "symgate",
            "edit-symbol",
            "a.ts",
            "f",
            "-t",
            "function",
            "--content",
            "x",
            "--content-file",
            "b.ts",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_search_replace_args() {
        let cli = Cli::try_parse_from([
            "symgate",
            "search-replace",
            "src/app.ts",
            "--old",
            "let x = 1;",
            "--new",
            "const x = 1;",
        ])
        .unwrap();

        match cli.command {
            Commands::SearchReplace(args) => {
                assert_eq!(args.old_content, "let x = 1;");
                assert_eq!(args.new_content, "const x = 1;");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

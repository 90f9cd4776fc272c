//! Configuration model for symgate

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// symgate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SymgateConfig {
    #[serde(default)]
    pub lsp: LspConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// How the session reaches the language server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Connect to a server that is already listening (editor-hosted)
    Socket,
    /// Spawn a standalone server and talk over its stdin/stdout
    Stdio,
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket => write!(f, "socket"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

impl std::str::FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "socket" | "tcp" => Ok(Self::Socket),
            "stdio" | "process" => Ok(Self::Stdio),
            _ => Err(format!("Unknown backend mode: '{}'. Valid: socket, stdio", s)),
        }
    }
}

/// Language server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspConfig {
    #[serde(default = "defaults::mode")]
    pub mode: BackendMode,

    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Server executable for stdio mode
    #[serde(default = "defaults::command")]
    pub command: String,

    #[serde(default = "defaults::args")]
    pub args: Vec<String>,

    /// Wait between opening a document and pulling diagnostics.
    /// Unset means 1500ms for stdio and none for socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,

    #[serde(default = "defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            mode: defaults::mode(),
            host: defaults::host(),
            port: defaults::port(),
            command: defaults::command(),
            args: defaults::args(),
            settle_delay_ms: None,
            shutdown_grace_ms: defaults::shutdown_grace_ms(),
        }
    }
}

impl LspConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn settle_delay(&self) -> Duration {
        let ms = self.settle_delay_ms.unwrap_or(match self.mode {
            BackendMode::Stdio => defaults::STDIO_SETTLE_MS,
            BackendMode::Socket => 0,
        });
        Duration::from_millis(ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Filesystem policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directories tools may touch; empty means the working directory
    #[serde(default)]
    pub allowed_directories: Vec<PathBuf>,

    /// Files whose presence marks a project root
    #[serde(default = "defaults::project_markers")]
    pub project_markers: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            allowed_directories: Vec::new(),
            project_markers: defaults::project_markers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// Write logs to `symgate-<timestamp>.log` here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

mod defaults {
    use super::BackendMode;

    pub const STDIO_SETTLE_MS: u64 = 1500;

    pub fn mode() -> BackendMode {
        BackendMode::Socket
    }
    pub fn host() -> String {
        "127.0.0.1".to_string()
    }
    pub fn port() -> u16 {
        5870
    }
    pub fn command() -> String {
        "npx".to_string()
    }
    pub fn args() -> Vec<String> {
        vec![
            "typescript-language-server".to_string(),
            "--stdio".to_string(),
        ]
    }
    pub fn shutdown_grace_ms() -> u64 {
        2000
    }
    pub fn project_markers() -> Vec<String> {
        vec!["tsconfig.json".to_string(), "package.json".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SymgateConfig::default();
        assert_eq!(config.lsp.mode, BackendMode::Socket);
        assert_eq!(config.lsp.endpoint(), "127.0.0.1:5870");
        assert_eq!(config.lsp.args, vec!["typescript-language-server", "--stdio"]);
        assert_eq!(
            config.paths.project_markers,
            vec!["tsconfig.json", "package.json"]
        );
        assert!(config.log.dir.is_none());
    }

    #[test]
    fn test_settle_delay_depends_on_mode() {
        let mut lsp = LspConfig::default();
        assert_eq!(lsp.settle_delay(), Duration::ZERO);

        lsp.mode = BackendMode::Stdio;
        assert_eq!(lsp.settle_delay(), Duration::from_millis(1500));

        lsp.settle_delay_ms = Some(250);
        assert_eq!(lsp.settle_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_toml() {
        let config: SymgateConfig = toml::from_str(
            r#"
            [lsp]
            mode = "stdio"
            command = "typescript-language-server"
            args = ["--stdio"]
            "#,
        )
        .unwrap();
        assert_eq!(config.lsp.mode, BackendMode::Stdio);
        assert_eq!(config.lsp.port, 5870);
        assert_eq!(config.lsp.args, vec!["--stdio"]);
        assert_eq!(config.paths.project_markers.len(), 2);
    }

    #[test]
    fn test_backend_mode_from_str() {
        assert_eq!("stdio".parse::<BackendMode>(), Ok(BackendMode::Stdio));
        assert_eq!("TCP".parse::<BackendMode>(), Ok(BackendMode::Socket));
        assert!("pipe".parse::<BackendMode>().is_err());
    }
}

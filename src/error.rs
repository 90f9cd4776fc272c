//! Error types for symgate

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::infra::lsp::protocol::{ResponseError, error_codes};

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Failure of one tool invocation, as reported to the caller
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Symbol '{name}' of type '{kind}' not found in file {file}")]
    SymbolNotFound {
        name: String,
        kind: String,
        file: String,
    },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(
        "Content not found in file: {file}. The search is whitespace-insensitive, but the content must otherwise match exactly."
    )]
    ContentNotFound { file: String },

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Access denied: {path} is not within allowed directories: {allowed}")]
    AccessDenied { path: String, allowed: String },

    #[error("{0}")]
    Lsp(#[from] LspError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse error category surfaced in the JSON error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Protocol,
    Io,
    AccessDenied,
    Config,
    InvalidInput,
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SymbolNotFound { .. } | Self::FileNotFound(_) | Self::ContentNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Pattern(_) => ErrorKind::InvalidInput,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Lsp(LspError::Io(_)) | Self::Io(_) => ErrorKind::Io,
            Self::Lsp(_) => ErrorKind::Protocol,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn symbol_not_found(name: &str, kind: &str, file: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            name: name.to_string(),
            kind: kind.to_string(),
            file: file.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LspError {
    #[error("Failed to connect to language server at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start server: {0}")]
    ServerStart(String),

    #[error("Initialize handshake failed: {0}")]
    Handshake(String),

    #[error("Session is not connected")]
    NotConnected,

    #[error("Language server closed the connection")]
    ConnectionClosed,

    #[error("Server error [{code}]: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LspError {
    /// The connection itself is unusable; no further request can succeed.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectionClosed | Self::Io(_) | Self::Connect { .. }
        )
    }

    pub fn is_method_not_found(&self) -> bool {
        matches!(self, Self::ServerError { code, .. } if *code == error_codes::METHOD_NOT_FOUND)
    }

    pub fn server_error_friendly(code: i32, message: String) -> Self {
        let message = match code {
            error_codes::SERVER_NOT_INITIALIZED => {
                "Server initializing. Try again in a moment.".to_string()
            }
            error_codes::CONTENT_MODIFIED => "File changed during operation. Please retry.".into(),
            _ if message.trim().is_empty() => "Operation failed".to_string(),
            _ => message,
        };
        Self::ServerError { code, message }
    }
}

impl From<ResponseError> for LspError {
    fn from(err: ResponseError) -> Self {
        LspError::server_error_friendly(err.code, err.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

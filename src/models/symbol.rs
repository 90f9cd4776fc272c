//! Symbol model definitions

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lsp::Range;
use crate::infra::lsp::protocol::LspSymbolKind;

/// Symbol kinds a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Variable,
    Constant,
    Property,
    Field,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 8] = [
        Self::Function,
        Self::Method,
        Self::Class,
        Self::Interface,
        Self::Variable,
        Self::Constant,
        Self::Property,
        Self::Field,
    ];

    /// The server-side kind this maps to
    pub fn to_lsp(self) -> LspSymbolKind {
        match self {
            Self::Function => LspSymbolKind::Function,
            Self::Method => LspSymbolKind::Method,
            Self::Class => LspSymbolKind::Class,
            Self::Interface => LspSymbolKind::Interface,
            Self::Variable => LspSymbolKind::Variable,
            Self::Constant => LspSymbolKind::Constant,
            Self::Property => LspSymbolKind::Property,
            Self::Field => LspSymbolKind::Field,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Property => "property",
            Self::Field => "field",
        }
    }

    /// Lenient parse: unknown names yield `None` rather than an error,
    /// so an unsupported kind simply never matches.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "Unknown symbol kind: '{}'. Valid: function, method, class, interface, variable, constant, property, field",
                    s
                )
            })
    }
}

/// Where a resolved symbol lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLocation {
    pub uri: String,
    pub range: Range,
}

impl SymbolLocation {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }
}

/// Language identifier sent with `textDocument/didOpen`
pub fn language_id_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "html" | "htm" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        _ => "plaintext",
    }
}

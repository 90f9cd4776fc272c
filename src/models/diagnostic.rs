//! Diagnostic model for LSP integration

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lsp::{Range, uri_to_path};
use crate::infra::lsp::protocol::{LspDiagnostic, LspDiagnosticSeverity, LspDiagnosticTag};

/// Diagnostic record handed back to the caller, close to the server's shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosticSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DiagnosticTag>,
    #[serde(default)]
    pub related_information: Vec<DiagnosticRelatedInfo>,
}

impl From<LspDiagnostic> for Diagnostic {
    fn from(diag: LspDiagnostic) -> Self {
        Self {
            range: diag.range,
            severity: diag.severity.map(DiagnosticSeverity::from),
            code: diag.code,
            source: diag.source,
            message: diag.message,
            tags: diag.tags.into_iter().map(DiagnosticTag::from).collect(),
            related_information: diag
                .related_information
                .into_iter()
                .map(|info| DiagnosticRelatedInfo {
                    file_path: uri_to_path(&info.location.uri).display().to_string(),
                    range: info.location.range,
                    message: info.message,
                })
                .collect(),
        }
    }
}

/// Severity levels (matches LSP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl From<LspDiagnosticSeverity> for DiagnosticSeverity {
    fn from(value: LspDiagnosticSeverity) -> Self {
        match value {
            LspDiagnosticSeverity::Error => Self::Error,
            LspDiagnosticSeverity::Warning => Self::Warning,
            LspDiagnosticSeverity::Information => Self::Information,
            LspDiagnosticSeverity::Hint => Self::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "info"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticTag {
    Unnecessary = 1,
    Deprecated = 2,
}

impl From<LspDiagnosticTag> for DiagnosticTag {
    fn from(value: LspDiagnosticTag) -> Self {
        match value {
            LspDiagnosticTag::Unnecessary => Self::Unnecessary,
            LspDiagnosticTag::Deprecated => Self::Deprecated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRelatedInfo {
    pub file_path: String,
    pub range: Range,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lsp_diagnostic() {
        let raw = serde_json::json!({
            "range": { "start": { "line": 3, "character": 4 }, "end": { "line": 3, "character": 9 } },
            "severity": 1,
            "code": 2304,
            "source": "ts",
            "message": "Cannot find name 'foo'.",
            "tags": [1],
            "relatedInformation": [
                {
                    "location": {
                        "uri": "file:///proj/b.ts",
                        "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 3 } }
                    },
                    "message": "declared here"
                }
            ]
        });
        let lsp: LspDiagnostic = serde_json::from_value(raw).unwrap();
        let diag = Diagnostic::from(lsp);

        assert_eq!(diag.severity, Some(DiagnosticSeverity::Error));
        assert_eq!(diag.code, Some(serde_json::json!(2304)));
        assert_eq!(diag.tags, vec![DiagnosticTag::Unnecessary]);
        assert_eq!(diag.related_information[0].file_path, "/proj/b.ts");
        assert_eq!(diag.range.start.character, 4);
    }

    #[test]
    fn test_serialized_shape() {
        let lsp: LspDiagnostic = serde_json::from_value(serde_json::json!({
            "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 1 } },
            "message": "unused"
        }))
        .unwrap();
        let value = serde_json::to_value(Diagnostic::from(lsp)).unwrap();
        assert_eq!(value["message"], "unused");
        assert!(value.get("severity").is_none());
        assert_eq!(value["relatedInformation"], serde_json::json!([]));
    }
}

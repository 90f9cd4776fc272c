//! Tool orchestration
//!
//! Every tool follows the same pipeline: check the path against the policy,
//! read the file, infer the project root, open a session, announce the
//! document, do the work, dispose the session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{LspError, ToolError, ToolResult};
use crate::infra::lsp::protocol::{
    DocumentDiagnosticReport, LspLocation, TextDocumentIdentifier, parse_location_response,
};
use crate::infra::lsp::{Session, with_session};
use crate::infra::path_policy::PathPolicy;
use crate::infra::project::find_project_root;
use crate::models::config::{LspConfig, SymgateConfig};
use crate::models::diagnostic::Diagnostic;
use crate::models::lsp::{
    FileEditSet, Position, Range, TextEdit, WorkspaceEdit, path_to_uri, uri_to_path,
};
use crate::models::symbol::{SymbolLocation, language_id_for_path};
use crate::services::edit_applier::{ApplyResult, apply_file_edit_set, position_offset};
use crate::services::resolver::{SymbolQuery, resolve};
use crate::services::search_replace::replace_ignoring_whitespace;

pub const PULL_DIAGNOSTICS_SOURCE: &str = "lsp-diagnostic-request";
pub const PUSHED_DIAGNOSTICS_SOURCE: &str = "lsp-publish-diagnostics";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSymbolOutput {
    pub changed_files: Vec<String>,
    pub total_changes: usize,
    pub symbol_location: SymbolLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadSymbolOutput {
    pub file_path: String,
    pub symbol_name: String,
    pub symbol_type: String,
    pub symbol_content: String,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesOutput {
    pub symbol_name: String,
    pub symbol_type: String,
    pub symbol_location: ReferenceSite,
    pub references_count: usize,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSite {
    pub file_path: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub file_path: String,
    pub range: Range,
    /// `basename:line:column`, one-based
    pub location: String,
}

impl From<LspLocation> for Reference {
    fn from(loc: LspLocation) -> Self {
        let path = uri_to_path(&loc.uri);
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            location: format!("{}:{}", basename, one_based(loc.range.start)),
            file_path: path.display().to_string(),
            range: loc.range,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameOutput {
    /// Edits keyed by file path
    pub changes: BTreeMap<String, Vec<TextEdit>>,
    pub summary: ApplyResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsOutput {
    pub file_path: String,
    pub diagnostics: Vec<Diagnostic>,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReplaceOutput {
    pub file_path: String,
    pub replacement_count: usize,
}

/// A file that passed the policy and was read, ready to be opened
struct Document {
    path: PathBuf,
    uri: String,
    root: PathBuf,
    text: String,
}

impl Document {
    fn language_id(&self) -> &'static str {
        language_id_for_path(&self.path)
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    async fn open_in(&self, session: &Session) -> Result<(), LspError> {
        session
            .notify_document_open(&self.uri, self.language_id(), &self.text)
            .await
    }
}

pub struct SymbolTools {
    lsp: LspConfig,
    markers: Vec<String>,
    policy: PathPolicy,
}

impl SymbolTools {
    /// `base` anchors relative paths and is the default allowed directory
    pub fn new(config: &SymgateConfig, base: &Path) -> Self {
        Self {
            lsp: config.lsp.clone(),
            markers: config.paths.project_markers.clone(),
            policy: PathPolicy::new(base, &config.paths.allowed_directories),
        }
    }

    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    async fn prepare(&self, file: &Path) -> ToolResult<Document> {
        let path = self.policy.check(file)?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ToolError::FileNotFound(path));
        }

        let text = tokio::fs::read_to_string(&path).await?;
        let root = find_project_root(&path, &self.markers);
        let uri = path_to_uri(&path);

        tracing::debug!("Prepared {} (root {})", path.display(), root.display());
        Ok(Document {
            path,
            uri,
            root,
            text,
        })
    }

    async fn locate(
        session: &Session,
        doc: &Document,
        name: &str,
        kind: &str,
    ) -> ToolResult<SymbolLocation> {
        let query = SymbolQuery::new(&doc.uri, name, kind);
        resolve(session, &query)
            .await?
            .ok_or_else(|| ToolError::symbol_not_found(name, kind, doc.display()))
    }

    /// Replace the full range of a named symbol with `new_content`
    pub async fn edit_symbol(
        &self,
        file: &Path,
        name: &str,
        kind: &str,
        new_content: &str,
    ) -> ToolResult<EditSymbolOutput> {
        let doc = self.prepare(file).await?;

        let location = with_session(
            &doc.root,
            &self.lsp,
            async |session: &Session| -> ToolResult<SymbolLocation> {
                doc.open_in(session).await?;
                Self::locate(session, &doc, name, kind).await
            },
        )
        .await?;

        let edits = FileEditSet::single(
            location.uri.clone(),
            TextEdit::new(location.range, new_content),
        );
        let applied = apply_file_edit_set(&edits).await;

        tracing::info!(
            "Edited {} '{}' in {} ({} changes)",
            kind,
            name,
            doc.display(),
            applied.total_changes
        );
        Ok(EditSymbolOutput {
            changed_files: applied.changed_files,
            total_changes: applied.total_changes,
            symbol_location: location,
        })
    }

    /// Source text of a named symbol, as sent to the server
    pub async fn read_symbol(
        &self,
        file: &Path,
        name: &str,
        kind: &str,
    ) -> ToolResult<ReadSymbolOutput> {
        let doc = self.prepare(file).await?;

        let location = with_session(
            &doc.root,
            &self.lsp,
            async |session: &Session| -> ToolResult<SymbolLocation> {
                doc.open_in(session).await?;
                Self::locate(session, &doc, name, kind).await
            },
        )
        .await?;

        Ok(ReadSymbolOutput {
            file_path: file.display().to_string(),
            symbol_name: name.to_string(),
            symbol_type: kind.to_string(),
            symbol_content: extract_range(&doc.text, location.range),
            range: location.range,
        })
    }

    pub async fn find_references(
        &self,
        file: &Path,
        name: &str,
        kind: &str,
    ) -> ToolResult<ReferencesOutput> {
        let doc = self.prepare(file).await?;

        let (location, references) =
            with_session(&doc.root, &self.lsp, async |session: &Session| -> ToolResult<_> {
                doc.open_in(session).await?;
                let location = Self::locate(session, &doc, name, kind).await?;

                tracing::debug!("Finding references at {:?}", location.range.start);
                let response = session
                    .request_value(
                        "textDocument/references",
                        json!({
                            "textDocument": TextDocumentIdentifier::new(&doc.uri),
                            "position": location.range.start,
                            "context": { "includeDeclaration": true }
                        }),
                    )
                    .await?;
                let references: Vec<Reference> = parse_location_response(response)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Reference::from)
                    .collect();
                Ok((location, references))
            })
            .await?;

        tracing::debug!("Found {} references to '{}'", references.len(), name);
        Ok(ReferencesOutput {
            symbol_name: name.to_string(),
            symbol_type: kind.to_string(),
            symbol_location: ReferenceSite {
                file_path: file.display().to_string(),
                range: location.range,
            },
            references_count: references.len(),
            references,
        })
    }

    /// Rename whatever symbol sits at `position` and apply the edits
    pub async fn rename_symbol(
        &self,
        file: &Path,
        position: Position,
        new_name: &str,
    ) -> ToolResult<RenameOutput> {
        let doc = self.prepare(file).await?;

        let edit = with_session(
            &doc.root,
            &self.lsp,
            async |session: &Session| -> ToolResult<WorkspaceEdit> {
                doc.open_in(session).await?;
                let response = session
                    .request_value(
                        "textDocument/rename",
                        json!({
                            "textDocument": TextDocumentIdentifier::new(&doc.uri),
                            "position": position,
                            "newName": new_name
                        }),
                    )
                    .await?;
                parse_rename_response(response, position)
            },
        )
        .await?;

        let edit_set = edit.into_file_edit_set();
        let summary = apply_file_edit_set(&edit_set).await;

        let changes = edit_set
            .iter()
            .map(|(id, edits)| (uri_to_path(id).display().to_string(), edits.clone()))
            .collect();

        tracing::info!(
            "Renamed symbol at {} to '{}' ({} files changed)",
            one_based(position),
            new_name,
            summary.changed_files.len()
        );
        Ok(RenameOutput { changes, summary })
    }

    /// Diagnostics for one file, pulled when the server supports it and taken
    /// from pushed notifications otherwise
    pub async fn get_errors(&self, file: &Path) -> ToolResult<ErrorsOutput> {
        let doc = self.prepare(file).await?;
        let settle = self.lsp.settle_delay();

        let (diagnostics, source) =
            with_session(&doc.root, &self.lsp, async |session: &Session| -> ToolResult<_> {
                doc.open_in(session).await?;

                if !settle.is_zero() {
                    tracing::debug!("Waiting {:?} for the server to analyze", settle);
                    tokio::time::sleep(settle).await;
                }

                let pulled = session
                    .request_value(
                        "textDocument/diagnostic",
                        json!({ "textDocument": TextDocumentIdentifier::new(&doc.uri) }),
                    )
                    .await;

                match pulled {
                    Ok(value) => Ok((parse_diagnostic_report(value)?, PULL_DIAGNOSTICS_SOURCE)),
                    Err(e) if e.is_method_not_found() => {
                        tracing::debug!("Pull diagnostics unsupported, using pushed diagnostics");
                        let pushed = session.pushed_diagnostics(&doc.uri).await.unwrap_or_default();
                        let diagnostics = pushed.into_iter().map(Diagnostic::from).collect();
                        Ok((diagnostics, PUSHED_DIAGNOSTICS_SOURCE))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        Ok(ErrorsOutput {
            file_path: file.display().to_string(),
            diagnostics,
            source,
        })
    }

    /// Replace every whitespace-insensitive occurrence of `old_content`.
    /// Works on the file alone; no session is opened.
    pub async fn search_replace_file(
        &self,
        file: &Path,
        old_content: &str,
        new_content: &str,
    ) -> ToolResult<SearchReplaceOutput> {
        let path = self.policy.check(file)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ToolError::FileNotFound(path));
        }

        let original = tokio::fs::read_to_string(&path).await?;
        let (updated, replacement_count) =
            replace_ignoring_whitespace(&original, old_content, new_content)?;
        if replacement_count == 0 {
            return Err(ToolError::ContentNotFound {
                file: path.display().to_string(),
            });
        }

        tokio::fs::write(&path, updated).await?;
        tracing::info!(
            "Replaced {} occurrences in {}",
            replacement_count,
            path.display()
        );
        Ok(SearchReplaceOutput {
            file_path: path.display().to_string(),
            replacement_count,
        })
    }
}

fn one_based(position: Position) -> String {
    let (line, column) = position.to_display();
    format!("{}:{}", line, column)
}

/// Text between the two positions of `range`
pub fn extract_range(content: &str, range: Range) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = position_offset(&lines, range.start.line, range.start.character);
    let end = position_offset(&lines, range.end.line, range.end.character).max(start);
    content[start..end].to_string()
}

fn parse_rename_response(response: Value, position: Position) -> ToolResult<WorkspaceEdit> {
    if response.is_null() {
        return Err(LspError::Protocol(format!(
            "Symbol at {} cannot be renamed",
            one_based(position)
        ))
        .into());
    }
    serde_json::from_value(response)
        .map_err(|e| LspError::Protocol(format!("unexpected rename response: {}", e)).into())
}

fn parse_diagnostic_report(value: Value) -> ToolResult<Vec<Diagnostic>> {
    let report: DocumentDiagnosticReport = serde_json::from_value(value)
        .map_err(|e| LspError::Protocol(format!("unexpected diagnostic report: {}", e)))?;

    Ok(match report {
        DocumentDiagnosticReport::Full { items, .. } => {
            tracing::debug!("Full diagnostic report with {} items", items.len());
            items.into_iter().map(Diagnostic::from).collect()
        }
        DocumentDiagnosticReport::Unchanged { .. } => {
            tracing::debug!("Unchanged diagnostic report");
            Vec::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::config::BackendMode;
    use tempfile::TempDir;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    fn tools_for(dir: &Path) -> SymbolTools {
        let mut config = SymgateConfig::default();
        // Unroutable port: any test reaching the session would fail loudly
        config.lsp.mode = BackendMode::Socket;
        config.lsp.port = 1;
        SymbolTools::new(&config, dir)
    }

    #[test]
    fn test_extract_single_and_multi_line() {
        let content = "function add(a, b) {\n  return a + b;\n}\nexport {};";
        assert_eq!(extract_range(content, range(0, 9, 0, 12)), "add");
        assert_eq!(
            extract_range(content, range(0, 0, 2, 1)),
            "function add(a, b) {\n  return a + b;\n}"
        );
    }

    #[test]
    fn test_extract_clamps_out_of_range() {
        assert_eq!(extract_range("abc\ndef", range(1, 1, 9, 0)), "ef");
        assert_eq!(extract_range("abc", range(0, 2, 0, 1)), "");
    }

    #[test]
    fn test_reference_location_is_one_based() {
        let loc = LspLocation {
            uri: "file:///proj/src/util.ts".to_string(),
            range: range(9, 4, 9, 10),
        };
        let reference = Reference::from(loc);
        assert_eq!(reference.file_path, "/proj/src/util.ts");
        assert_eq!(reference.location, "util.ts:10:5");
    }

    #[test]
    fn test_null_rename_cannot_be_renamed() {
        let err = parse_rename_response(Value::Null, Position::new(2, 3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("cannot be renamed"));
    }

    #[test]
    fn test_rename_response_with_document_changes() {
        let edit = parse_rename_response(
            json!({
                "documentChanges": [{
                    "textDocument": { "uri": "file:///p/a.ts", "version": 1 },
                    "edits": [{ "range": range(0, 0, 0, 3), "newText": "bar" }]
                }]
            }),
            Position::new(0, 0),
        )
        .unwrap();
        let set = edit.into_file_edit_set();
        assert_eq!(set.edit_count(), 1);
    }

    #[test]
    fn test_diagnostic_reports() {
        let full = parse_diagnostic_report(json!({
            "kind": "full",
            "items": [
                { "range": range(0, 0, 0, 1), "severity": 1, "message": "bad", "code": 2304 },
                { "range": range(1, 0, 1, 1), "message": "meh" }
            ]
        }))
        .unwrap();
        assert_eq!(full.len(), 2);
        assert_eq!(full[0].message, "bad");

        let unchanged =
            parse_diagnostic_report(json!({ "kind": "unchanged", "resultId": "7" })).unwrap();
        assert!(unchanged.is_empty());

        let err = parse_diagnostic_report(json!({ "kind": "bogus" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_access_denied_before_any_session() {
        let dir = TempDir::new().unwrap();
        let tools = tools_for(dir.path());

        let err = tools
            .read_symbol(Path::new("/etc/hostname"), "x", "function")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let tools = tools_for(dir.path());

        let err = tools
            .get_errors(&dir.path().join("nope.ts"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_protocol_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        tokio::fs::write(&file, "export const a = 1;\n").await.unwrap();
        let tools = tools_for(dir.path());

        let err = tools
            .edit_symbol(&file, "a", "constant", "export const a = 2;")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            tokio::fs::read_to_string(&file).await.unwrap(),
            "export const a = 1;\n"
        );
    }

    #[tokio::test]
    async fn test_search_replace_without_a_server() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        tokio::fs::write(&file, "const a =\n    1;\nconst b = 1;\nconst a = 1;\n")
            .await
            .unwrap();
        let tools = tools_for(dir.path());

        let out = tools
            .search_replace_file(&file, "const a = 1;", "const a = 2;")
            .await
            .unwrap();
        assert_eq!(out.replacement_count, 2);
        assert_eq!(out.file_path, file.display().to_string());
        assert_eq!(
            tokio::fs::read_to_string(&file).await.unwrap(),
            "const a = 2;\nconst b = 1;\nconst a = 2;\n"
        );
    }

    #[tokio::test]
    async fn test_search_replace_missing_content_leaves_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        tokio::fs::write(&file, "let x = 1;\n").await.unwrap();
        let tools = tools_for(dir.path());

        let err = tools
            .search_replace_file(&file, "let y = 1;", "let y = 2;")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ContentNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(tokio::fs::read_to_string(&file).await.unwrap(), "let x = 1;\n");
    }

    #[tokio::test]
    async fn test_search_replace_respects_allowed_directories() {
        let dir = TempDir::new().unwrap();
        let tools = tools_for(dir.path());

        let err = tools
            .search_replace_file(Path::new("/etc/hostname"), "a", "b")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}

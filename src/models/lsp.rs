//! LSP Common Types
//!
//! Positions, ranges and edits shared by the session, the resolver and the
//! edit applier, plus `file://` URI helpers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Core LSP Types
// ============================================================================

/// Position within a document (0-indexed, `character` in UTF-16 code units)
///
/// Ordering is line-major, then character.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Convert 1-indexed CLI input to 0-indexed LSP position
    pub fn from_cli(line: u32, column: u32) -> Self {
        Self {
            line: line.saturating_sub(1),
            character: column.saturating_sub(1),
        }
    }

    /// Convert 0-indexed LSP position to 1-indexed display position
    pub fn to_display(&self) -> (u32, u32) {
        (self.line + 1, self.character + 1)
    }
}

/// Range within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

// ============================================================================
// Text Edit Types
// ============================================================================

/// Text edit unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Workspace-wide edit as returned by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEdit {
    /// URI to TextEdit[] mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<HashMap<String, Vec<TextEdit>>>,

    /// DocumentChange[] (TextDocumentEdit, CreateFile, RenameFile, DeleteFile)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_changes: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextDocumentEdit {
    text_document: EditedDocument,
    edits: Vec<TextEdit>,
}

#[derive(Debug, Deserialize)]
struct EditedDocument {
    uri: String,
}

impl WorkspaceEdit {
    /// Collect the text edits of this workspace edit.
    ///
    /// `documentChanges` takes precedence; `changes` is only read when it is
    /// absent. Resource operations (create/rename/delete) are not applied.
    pub fn into_file_edit_set(self) -> FileEditSet {
        let mut set = FileEditSet::default();

        let Some(document_changes) = self.document_changes else {
            for (uri, edits) in self.changes.unwrap_or_default() {
                set.extend(uri, edits);
            }
            return set;
        };

        for change in document_changes {
            if let Some(kind) = change.get("kind").and_then(Value::as_str) {
                tracing::warn!("Skipping unsupported resource operation: {}", kind);
                continue;
            }
            match serde_json::from_value::<TextDocumentEdit>(change) {
                Ok(doc_edit) => set.extend(doc_edit.text_document.uri, doc_edit.edits),
                Err(e) => tracing::warn!("Skipping malformed document change: {}", e),
            }
        }

        set
    }
}

/// Edits grouped by file identifier (URI or path). Edit order within a file
/// carries no meaning; the applier re-sorts before splicing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileEditSet {
    files: BTreeMap<String, Vec<TextEdit>>,
}

impl FileEditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(file_id: impl Into<String>, edit: TextEdit) -> Self {
        let mut set = Self::new();
        set.push(file_id, edit);
        set
    }

    pub fn push(&mut self, file_id: impl Into<String>, edit: TextEdit) {
        self.files.entry(file_id.into()).or_default().push(edit);
    }

    pub fn extend(&mut self, file_id: impl Into<String>, edits: Vec<TextEdit>) {
        self.files.entry(file_id.into()).or_default().extend(edits);
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn edit_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TextEdit>)> {
        self.files.iter()
    }
}

// ============================================================================
// URI Utilities
// ============================================================================

/// Convert a path to a `file://` URI, percent-encoding reserved characters
pub fn path_to_uri(path: &Path) -> String {
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let path_str = abs_path.to_string_lossy();
    let encoded: String = path_str
        .chars()
        .map(|c| match c {
            '/' | '.' | '-' | '_' | '~' => c.to_string(),
            c if c.is_ascii_alphanumeric() => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect();

    format!("file://{encoded}")
}

/// Convert a `file://` URI (or a bare path) to a PathBuf
pub fn uri_to_path(uri: &str) -> PathBuf {
    match uri.strip_prefix("file://") {
        Some(path) => PathBuf::from(percent_decode(path)),
        None => PathBuf::from(uri),
    }
}

/// Drop the `file://` scheme, leaving any percent-encoding untouched
pub fn strip_file_scheme(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

/// Whether two file identifiers name the same document, treating the
/// scheme-qualified and scheme-stripped forms as equivalent.
pub fn same_document(candidate: &str, uri: &str) -> bool {
    candidate == uri || strip_file_scheme(candidate) == strip_file_scheme(uri)
}

fn percent_decode(input: &str) -> String {
    let mut result = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();

    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let mut lookahead = bytes.clone();
            let high = lookahead.next().and_then(hex_value);
            let low = lookahead.next().and_then(hex_value);
            if let (Some(h), Some(l)) = (high, low) {
                result.push((h << 4) | l);
                bytes = lookahead;
                continue;
            }
        }
        result.push(byte);
    }

    String::from_utf8_lossy(&result).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

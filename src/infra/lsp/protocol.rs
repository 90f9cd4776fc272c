//! JSON-RPC 2.0 Protocol Implementation for LSP
//!
//! Envelope types plus the subset of LSP wire shapes symgate consumes.
//! Domain types (Position, Range, TextEdit, WorkspaceEdit) are in models/lsp.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

pub use crate::models::lsp::{Position, Range, TextEdit, WorkspaceEdit};

// ============================================================================
// JSON-RPC 2.0 Core Types
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: ResponseError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 Notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Request ID - can be number or string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: error_codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;

    // LSP-specific error codes
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const CONTENT_MODIFIED: i32 = -32801;
}

/// Incoming message from LSP server
#[derive(Debug, Clone)]
pub enum Message {
    Response(Response),
    Request(Request),
    Notification(Notification),
}

impl Message {
    /// Parse a JSON string into a Message
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let has_method = value.get("method").is_some();

        match (has_id, has_method) {
            (true, true) => Ok(Message::Request(serde_json::from_value(value)?)),
            (_, false) if value.get("result").is_some() || value.get("error").is_some() => {
                Ok(Message::Response(serde_json::from_value(value)?))
            }
            (false, true) => Ok(Message::Notification(serde_json::from_value(value)?)),
            _ => {
                use serde::de::Error;
                Err(serde_json::Error::custom("Invalid LSP message"))
            }
        }
    }
}

// ============================================================================
// LSP Request Params
// ============================================================================

/// Text document identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

impl TextDocumentIdentifier {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Full document content for `textDocument/didOpen`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: String,
    pub language_id: String,
    pub version: i32,
    pub text: String,
}

/// Text document position params
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

impl TextDocumentPositionParams {
    pub fn new(uri: &str, position: Position) -> Self {
        Self {
            text_document: TextDocumentIdentifier::new(uri),
            position,
        }
    }
}

/// Workspace folder announced at initialize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub uri: String,
    pub name: String,
}

/// Client info for identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Initialize params
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub process_id: Option<u32>,
    pub root_uri: Option<String>,
    pub capabilities: ClientCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
}

/// Client capabilities
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_document: Option<TextDocumentClientCapabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceClientCapabilities>,
}

/// Text document capabilities declared by the session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synchronization: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_symbol: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_diagnostics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Value>,
}

/// Workspace capabilities declared by the session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_edit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_edit: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_folders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<bool>,
}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub capabilities: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// LSP Symbol Types
// ============================================================================

/// Symbol kind (LSP standard - integer values)
#[derive(Debug, Clone, Copy, Serialize_repr, Deserialize_repr, PartialEq, Eq)]
#[repr(u8)]
pub enum LspSymbolKind {
    File = 1,
    Module = 2,
    Namespace = 3,
    Package = 4,
    Class = 5,
    Method = 6,
    Property = 7,
    Field = 8,
    Constructor = 9,
    Enum = 10,
    Interface = 11,
    Function = 12,
    Variable = 13,
    Constant = 14,
    String = 15,
    Number = 16,
    Boolean = 17,
    Array = 18,
    Object = 19,
    Key = 20,
    Null = 21,
    EnumMember = 22,
    Struct = 23,
    Event = 24,
    Operator = 25,
    TypeParameter = 26,
}

/// Location in a document (LSP wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspLocation {
    pub uri: String,
    #[serde(default)]
    pub range: Range,
}

/// LocationLink - returned instead of Location by servers with link support
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLink {
    pub target_uri: String,
    /// The full target range
    pub target_range: Range,
    pub target_selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_selection_range: Option<Range>,
}

impl LocationLink {
    pub fn to_location(&self) -> LspLocation {
        LspLocation {
            uri: self.target_uri.clone(),
            range: self.target_range,
        }
    }
}

/// Parse a response that may be `Location`, `Location[]` or `LocationLink[]`
pub fn parse_location_response(value: Value) -> Option<Vec<LspLocation>> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            if items.first().is_some_and(|v| v.get("targetUri").is_some()) {
                let links: Vec<LocationLink> =
                    serde_json::from_value(Value::Array(items)).ok()?;
                Some(links.iter().map(LocationLink::to_location).collect())
            } else {
                serde_json::from_value(Value::Array(items)).ok()
            }
        }
        single if single.get("targetUri").is_some() => {
            let link: LocationLink = serde_json::from_value(single).ok()?;
            Some(vec![link.to_location()])
        }
        single => serde_json::from_value::<LspLocation>(single)
            .ok()
            .map(|loc| vec![loc]),
    }
}

/// Document symbol (hierarchical outline node)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Raw kind number; servers may send kinds newer than [`LspSymbolKind`]
    pub kind: u8,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DocumentSymbol>>,
}

/// Location of a workspace symbol; the range may be deferred to a resolve call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolLocationRef {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Symbol information (workspace symbols and flat document symbols)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: LspSymbolKind,
    pub location: SymbolLocationRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

// ============================================================================
// LSP Diagnostic Types
// ============================================================================

/// Diagnostic severity (LSP standard - integer values)
#[derive(Debug, Clone, Copy, Serialize_repr, Deserialize_repr, PartialEq, Eq)]
#[repr(u8)]
pub enum LspDiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

/// Diagnostic tag (LSP standard - integer values)
#[derive(Debug, Clone, Copy, Serialize_repr, Deserialize_repr, PartialEq, Eq)]
#[repr(u8)]
pub enum LspDiagnosticTag {
    Unnecessary = 1,
    Deprecated = 2,
}

/// LSP Diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspDiagnostic {
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<LspDiagnosticSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<LspDiagnosticTag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<LspDiagnosticRelatedInformation>,
}

/// LSP Diagnostic Related Information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspDiagnosticRelatedInformation {
    pub location: LspLocation,
    pub message: String,
}

/// Result of a `textDocument/diagnostic` pull
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentDiagnosticReport {
    #[serde(rename_all = "camelCase")]
    Full {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_id: Option<String>,
        items: Vec<LspDiagnostic>,
    },
    #[serde(rename_all = "camelCase")]
    Unchanged { result_id: String },
}

/// `textDocument/publishDiagnostics` notification params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<LspDiagnostic>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = Request::new(1, "initialize", Some(json!({})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;
        let resp: Response = serde_json::from_str(json).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_error_response() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: Response = serde_json::from_str(json).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.into_result().unwrap_err().code, -32601);
    }

    #[test]
    fn test_null_result_is_success() {
        let json = r#"{"jsonrpc":"2.0","id":3,"result":null}"#;
        match Message::parse(json).unwrap() {
            Message::Response(resp) => assert_eq!(resp.into_result().unwrap(), Value::Null),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_message_classification() {
        let req = Message::parse(
            r#"{"jsonrpc":"2.0","id":"7","method":"workspace/configuration","params":{}}"#,
        )
        .unwrap();
        assert!(matches!(req, Message::Request(_)));

        let note = Message::parse(
            r#"{"jsonrpc":"2.0","method":"window/logMessage","params":{"type":3,"message":"hi"}}"#,
        )
        .unwrap();
        assert!(matches!(note, Message::Notification(_)));

        assert!(Message::parse(r#"{"jsonrpc":"2.0"}"#).is_err());
    }

    #[test]
    fn test_parse_location_variants() {
        let range = json!({ "start": { "line": 1, "character": 2 }, "end": { "line": 1, "character": 8 } });

        let single = parse_location_response(json!({ "uri": "file:///a.ts", "range": range }));
        assert_eq!(single.unwrap()[0].uri, "file:///a.ts");

        let many = parse_location_response(json!([
            { "uri": "file:///a.ts", "range": range },
            { "uri": "file:///b.ts", "range": range }
        ]))
        .unwrap();
        assert_eq!(many.len(), 2);

        let links = parse_location_response(json!([{
            "targetUri": "file:///c.ts",
            "targetRange": { "start": { "line": 0, "character": 0 }, "end": { "line": 4, "character": 1 } },
            "targetSelectionRange": range
        }]))
        .unwrap();
        assert_eq!(links[0].uri, "file:///c.ts");
        assert_eq!(links[0].range.end.line, 4);

        assert!(parse_location_response(Value::Null).is_none());
        assert!(parse_location_response(json!("nonsense")).is_none());
    }

    #[test]
    fn test_diagnostic_report_kinds() {
        let full: DocumentDiagnosticReport = serde_json::from_value(json!({
            "kind": "full",
            "items": [{
                "range": { "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 1 } },
                "severity": 2,
                "message": "unused"
            }]
        }))
        .unwrap();
        assert!(matches!(full, DocumentDiagnosticReport::Full { ref items, .. } if items.len() == 1));

        let unchanged: DocumentDiagnosticReport =
            serde_json::from_value(json!({ "kind": "unchanged", "resultId": "r1" })).unwrap();
        assert!(matches!(unchanged, DocumentDiagnosticReport::Unchanged { .. }));
    }

    #[test]
    fn test_workspace_symbol_without_range() {
        let info: SymbolInformation = serde_json::from_value(json!({
            "name": "foo",
            "kind": 12,
            "location": { "uri": "file:///a.ts" }
        }))
        .unwrap();
        assert_eq!(info.kind, LspSymbolKind::Function);
        assert!(info.location.range.is_none());
    }

    #[test]
    fn test_initialize_result_accepts_any_capabilities() {
        let result: InitializeResult = serde_json::from_value(json!({
            "capabilities": {
                "textDocumentSync": 2,
                "renameProvider": { "prepareProvider": true },
                "experimental": { "custom": [1, 2] }
            },
            "serverInfo": { "name": "typescript-language-server", "version": "4.3.3" }
        }))
        .unwrap();
        assert_eq!(result.capabilities["textDocumentSync"], json!(2));
        let info = result.server_info.unwrap();
        assert_eq!(info.name, "typescript-language-server");
        assert_eq!(info.version.as_deref(), Some("4.3.3"));
    }
}

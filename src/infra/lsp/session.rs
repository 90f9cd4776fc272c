//! One initialized connection to a language server, scoped to a single
//! tool invocation.
//!
//! A session is opened over TCP (a server hosted by an editor) or over the
//! stdio of a spawned server process. Both yield a boxed reader/writer pair;
//! a background task owns the reader and routes responses back to waiting
//! requests by id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::LspBackend;
use super::protocol::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, LspDiagnostic, Message,
    Notification, PublishDiagnosticsParams, Request, RequestId, Response, ResponseError,
    TextDocumentClientCapabilities, TextDocumentItem, WorkspaceClientCapabilities,
    WorkspaceFolder,
};
use super::transport::{
    BoxedReader, BoxedWriter, Transport, write_notification, write_request, write_response,
};
use crate::error::LspError;
use crate::models::config::{BackendMode, LspConfig};
use crate::models::lsp::path_to_uri;

type SharedWriter = Arc<Mutex<Option<BoxedWriter>>>;

/// State shared between the session and its reader task
#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
    diagnostics: RwLock<HashMap<String, Vec<LspDiagnostic>>>,
    closed: AtomicBool,
}

impl Shared {
    /// Mark the connection closed and drop every waiter.
    async fn close(&self) {
        let mut pending = self.pending.lock().await;
        self.closed.store(true, Ordering::Release);
        if !pending.is_empty() {
            tracing::debug!("Dropping {} pending requests", pending.len());
        }
        pending.clear();
    }
}

pub struct Session {
    mode: BackendMode,
    root: PathBuf,
    writer: SharedWriter,
    child: Mutex<Option<Child>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    initialized: AtomicBool,
    disposed: AtomicBool,
    server: std::sync::OnceLock<InitializeResult>,
    shutdown_grace: std::time::Duration,
}

impl Session {
    /// Connect to the server, perform the initialize handshake and return a
    /// ready session. Any failure is reported as an error and leaves nothing
    /// running.
    pub async fn open(root: &Path, config: &LspConfig) -> Result<Self, LspError> {
        let (reader, writer, child) = match config.mode {
            BackendMode::Socket => {
                let endpoint = config.endpoint();
                tracing::debug!("Connecting to language server at {}", endpoint);
                let stream = TcpStream::connect(&endpoint)
                    .await
                    .map_err(|source| LspError::Connect { endpoint, source })?;
                let (read_half, write_half) = stream.into_split();
                (
                    Box::new(read_half) as BoxedReader,
                    Box::new(write_half) as BoxedWriter,
                    None,
                )
            }
            BackendMode::Stdio => {
                let (reader, writer, child) = spawn_server(root, config)?;
                (reader, writer, Some(child))
            }
        };

        let session = Self::attach(root, config, reader, writer, child);
        match session.initialize().await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.dispose().await;
                Err(match e {
                    LspError::Handshake(_) => e,
                    other => LspError::Handshake(other.to_string()),
                })
            }
        }
    }

    /// Wrap an established byte stream and start the reader task.
    /// The returned session is not yet initialized.
    pub(crate) fn attach(
        root: &Path,
        config: &LspConfig,
        reader: BoxedReader,
        writer: BoxedWriter,
        mut child: Option<Child>,
    ) -> Self {
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
        let shared = Arc::new(Shared::default());
        let mut tasks = Vec::with_capacity(2);

        if let Some(stderr) = child.as_mut().and_then(|c| c.stderr.take()) {
            tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("LSP stderr: {}", line);
                }
            }));
        }

        tasks.push(tokio::spawn(read_loop(
            Transport::new(reader),
            Arc::clone(&shared),
            Arc::clone(&writer),
        )));

        Self {
            mode: config.mode,
            root: root.to_path_buf(),
            writer,
            child: Mutex::new(child),
            tasks: Mutex::new(tasks),
            shared,
            next_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            server: std::sync::OnceLock::new(),
            shutdown_grace: config.shutdown_grace(),
        }
    }

    async fn initialize(&self) -> Result<(), LspError> {
        let root_uri = path_to_uri(&self.root);
        let folder_name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string());

        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri: Some(root_uri.clone()),
            capabilities: client_capabilities(),
            client_info: Some(ClientInfo {
                name: "symgate".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: folder_name,
            }]),
        };

        tracing::debug!("Initializing session for {}", self.root.display());

        let response = self
            .send_request("initialize", Some(serde_json::to_value(params)?))
            .await
            .map_err(|e| match e {
                LspError::ServerError { code, message } => {
                    LspError::Handshake(format!("initialize rejected [{}]: {}", code, message))
                }
                other => other,
            })?;
        let result: InitializeResult = serde_json::from_value(response)
            .map_err(|e| LspError::Handshake(format!("malformed initialize result: {}", e)))?;

        if let Some(info) = &result.server_info {
            tracing::info!(
                "Connected to {} {}",
                info.name,
                info.version.as_deref().unwrap_or("")
            );
        }
        let _ = self.server.set(result);

        self.notify("initialized", Some(json!({}))).await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Still connected and not yet disposed
    pub fn is_alive(&self) -> bool {
        !self.disposed.load(Ordering::Acquire) && !self.shared.closed.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server.get()
    }

    /// Send a request and wait for its response. There is no client-side
    /// timeout: a hung server blocks the caller.
    pub async fn request_value(&self, method: &str, params: Value) -> Result<Value, LspError> {
        if !self.is_initialized() || self.disposed.load(Ordering::Acquire) {
            return Err(LspError::NotConnected);
        }
        self.send_request(method, Some(params)).await
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, LspError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.shared.pending.lock().await;
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(LspError::ConnectionClosed);
            }
            pending.insert(RequestId::Number(id), tx);
        }

        tracing::trace!("LSP request {}: {}", id, method);

        let write_result = {
            let mut writer = self.writer.lock().await;
            match writer.as_mut() {
                Some(w) => write_request(w, &Request::new(id, method, params))
                    .await
                    .map_err(LspError::from),
                None => Err(LspError::NotConnected),
            }
        };
        if let Err(e) = write_result {
            self.shared.pending.lock().await.remove(&RequestId::Number(id));
            return Err(e);
        }

        match rx.await {
            Ok(response) => response.into_result().map_err(LspError::from),
            Err(_) => Err(LspError::ConnectionClosed),
        }
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), LspError> {
        let mut writer = self.writer.lock().await;
        let w = writer.as_mut().ok_or(LspError::NotConnected)?;
        write_notification(w, &Notification::new(method, params)).await?;
        Ok(())
    }

    /// Tell the server about in-memory document content (version 1)
    pub async fn notify_document_open(
        &self,
        uri: &str,
        language_id: &str,
        text: &str,
    ) -> Result<(), LspError> {
        let item = TextDocumentItem {
            uri: uri.to_string(),
            language_id: language_id.to_string(),
            version: 1,
            text: text.to_string(),
        };
        self.notify(
            "textDocument/didOpen",
            Some(json!({ "textDocument": item })),
        )
        .await
    }

    /// Diagnostics the server pushed for `uri` so far
    pub async fn pushed_diagnostics(&self, uri: &str) -> Option<Vec<LspDiagnostic>> {
        self.shared.diagnostics.read().await.get(uri).cloned()
    }

    /// Close the connection and release the server. Safe to call repeatedly;
    /// only the first call does anything.
    pub async fn dispose(&self) {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let child = self.child.lock().await.take();

        if let Some(mut child) = child {
            if self.is_initialized() && !self.shared.closed.load(Ordering::Acquire) {
                let polite = timeout(self.shutdown_grace, async {
                    if self.send_request("shutdown", None).await.is_ok() {
                        let _ = self.notify("exit", None).await;
                    }
                })
                .await;
                if polite.is_err() {
                    tracing::debug!("Language server shutdown request timed out");
                }
            }

            // Closing stdin signals EOF to the server
            self.writer.lock().await.take();

            match timeout(self.shutdown_grace, child.wait()).await {
                Ok(Ok(status)) => tracing::debug!("Language server exited: {}", status),
                Ok(Err(e)) => tracing::warn!("Language server wait error: {}", e),
                Err(_) => {
                    tracing::warn!("Language server did not exit, killing");
                    let _ = child.kill().await;
                }
            }
        } else if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }

        self.shared.close().await;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        tracing::info!("Session for {} disposed", self.root.display());
    }
}

#[async_trait]
impl LspBackend for Session {
    async fn request_value(&self, method: &str, params: Value) -> Result<Value, LspError> {
        Session::request_value(self, method, params).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut guard) = self.child.try_lock()
            && let Some(child) = guard.as_mut()
        {
            let _ = child.start_kill();
            tracing::debug!("Session dropped without dispose, server killed");
        }
        if let Ok(mut tasks) = self.tasks.try_lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

/// Open a session, run `body` against it, and dispose the session on every
/// exit path.
pub async fn with_session<T, E, F>(root: &Path, config: &LspConfig, body: F) -> Result<T, E>
where
    F: AsyncFnOnce(&Session) -> Result<T, E>,
    E: From<LspError>,
{
    let session = Session::open(root, config).await?;
    let result = body(&session).await;
    session.dispose().await;
    result
}

fn spawn_server(
    root: &Path,
    config: &LspConfig,
) -> Result<(BoxedReader, BoxedWriter, Child), LspError> {
    tracing::info!("Starting language server: {} {:?}", config.command, config.args);

    let mut child = Command::new(&config.command)
        .args(&config.args)
        .current_dir(root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| LspError::ServerStart(format!("{}: {}", config.command, e)))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| LspError::ServerStart("Failed to get stdin".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| LspError::ServerStart("Failed to get stdout".to_string()))?;

    Ok((Box::new(stdout), Box::new(stdin), child))
}

fn client_capabilities() -> ClientCapabilities {
    let text_document = TextDocumentClientCapabilities {
        synchronization: Some(json!({
            "dynamicRegistration": false,
            "didSave": false
        })),
        definition: Some(json!({ "linkSupport": true })),
        type_definition: Some(json!({ "linkSupport": true })),
        implementation: Some(json!({ "linkSupport": true })),
        references: Some(json!({})),
        document_symbol: Some(json!({
            "symbolKind": { "valueSet": (1..=26).collect::<Vec<_>>() },
            "hierarchicalDocumentSymbolSupport": true
        })),
        rename: Some(json!({ "prepareSupport": true })),
        publish_diagnostics: Some(json!({ "relatedInformation": true })),
        diagnostic: Some(json!({ "relatedDocumentSupport": false })),
    };

    let workspace = WorkspaceClientCapabilities {
        apply_edit: Some(true),
        workspace_edit: Some(json!({ "documentChanges": true })),
        symbol: Some(json!({
            "symbolKind": { "valueSet": (1..=26).collect::<Vec<_>>() },
            "resolveSupport": { "properties": ["location.range"] }
        })),
        workspace_folders: Some(true),
        configuration: Some(true),
    };

    ClientCapabilities {
        text_document: Some(text_document),
        workspace: Some(workspace),
    }
}

/// Background task: read messages until the stream ends, then fail every
/// request still waiting.
async fn read_loop(mut transport: Transport<BoxedReader>, shared: Arc<Shared>, writer: SharedWriter) {
    loop {
        match transport.read_message().await {
            Ok(Some(message)) => handle_message(message, &shared, &writer).await,
            Ok(None) => {
                tracing::debug!("Language server closed the connection");
                break;
            }
            Err(e) => {
                if !shared.closed.load(Ordering::Acquire) {
                    tracing::error!("LSP read error: {}", e);
                }
                break;
            }
        }
    }
    shared.close().await;
}

async fn handle_message(message: Message, shared: &Shared, writer: &SharedWriter) {
    match message {
        Message::Response(response) => {
            let Some(id) = response.id.clone() else {
                tracing::warn!("Response without id: {:?}", response.error);
                return;
            };
            let mut pending = shared.pending.lock().await;
            // Some servers echo numeric ids back as strings
            let sender = pending.remove(&id).or_else(|| match &id {
                RequestId::String(s) => s
                    .parse::<u64>()
                    .ok()
                    .and_then(|n| pending.remove(&RequestId::Number(n))),
                RequestId::Number(_) => None,
            });
            match sender {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => tracing::debug!("Response for unknown request id {:?}", id),
            }
        }
        Message::Request(request) => {
            let response = match server_request_result(&request) {
                Ok(result) => Response::success(request.id, result),
                Err(error) => Response::failure(request.id, error),
            };
            let mut guard = writer.lock().await;
            if let Some(w) = guard.as_mut()
                && let Err(e) = write_response(w, &response).await
            {
                tracing::debug!("Failed to answer server request: {}", e);
            }
        }
        Message::Notification(notification) => {
            let params = notification.params.unwrap_or(Value::Null);
            match notification.method.as_str() {
                "textDocument/publishDiagnostics" => {
                    match serde_json::from_value::<PublishDiagnosticsParams>(params) {
                        Ok(published) => {
                            tracing::debug!(
                                "Cached {} diagnostics for {}",
                                published.diagnostics.len(),
                                published.uri
                            );
                            shared
                                .diagnostics
                                .write()
                                .await
                                .insert(published.uri, published.diagnostics);
                        }
                        Err(e) => tracing::debug!("Ignoring malformed diagnostics: {}", e),
                    }
                }
                "window/logMessage" | "window/showMessage" => {
                    let msg = params.get("message").and_then(Value::as_str).unwrap_or("");
                    // MessageType: 1=Error, 2=Warning, 3=Info, 4=Log
                    match params.get("type").and_then(Value::as_u64) {
                        Some(1) => tracing::warn!("LSP: {}", msg),
                        Some(2) | Some(3) => tracing::debug!("LSP: {}", msg),
                        _ => tracing::trace!("LSP: {}", msg),
                    }
                }
                other => tracing::trace!("Unhandled notification: {}", other),
            }
        }
    }
}

fn server_request_result(request: &Request) -> Result<Value, ResponseError> {
    match request.method.as_str() {
        "workspace/configuration" => {
            let items = request
                .params
                .as_ref()
                .and_then(|p| p.get("items"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            Ok(Value::Array(vec![Value::Null; items]))
        }
        "client/registerCapability"
        | "client/unregisterCapability"
        | "window/workDoneProgress/create" => Ok(Value::Null),
        "workspace/workspaceFolders" => Ok(Value::Null),
        "workspace/applyEdit" => Ok(json!({
            "applied": false,
            "failureReason": "symgate applies edits itself"
        })),
        other => {
            tracing::debug!("Unhandled server request: {}", other);
            Err(ResponseError::method_not_found(other))
        }
    }
}

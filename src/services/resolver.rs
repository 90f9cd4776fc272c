//! Symbol resolution: turn a name and kind into a range inside one file.
//!
//! Strategies run in a fixed order and the first hit wins:
//!
//! 1. `workspace/symbol` filtered by name, kind and file
//! 2. `textDocument/documentSymbol`, depth-first over the outline
//! 3. `textDocument/implementation` at (0,0), first location in the file
//!
//! The third strategy checks neither name nor kind, so it can land on an
//! unrelated symbol. It only runs when the first two find nothing and is
//! logged when it produces the answer.
//!
//! A malformed response or a server error ends that strategy only. A broken
//! connection ends the whole cascade.

use serde_json::{Value, json};

use crate::error::LspError;
use crate::infra::lsp::LspBackend;
use crate::infra::lsp::protocol::{
    DocumentSymbol, LspSymbolKind, SymbolInformation, TextDocumentIdentifier,
    TextDocumentPositionParams, parse_location_response,
};
use crate::models::lsp::{Position, Range, same_document};
use crate::models::symbol::{SymbolKind, SymbolLocation};

/// What to look for
#[derive(Debug, Clone, Copy)]
pub struct SymbolQuery<'a> {
    pub uri: &'a str,
    pub name: &'a str,
    /// `None` when the caller asked for a kind outside the supported set;
    /// such a query never matches by kind.
    pub kind: Option<SymbolKind>,
}

impl<'a> SymbolQuery<'a> {
    pub fn new(uri: &'a str, name: &'a str, kind: &str) -> Self {
        Self {
            uri,
            name,
            kind: SymbolKind::parse(kind),
        }
    }

    fn matches(&self, name: &str, kind: LspSymbolKind) -> bool {
        self.matches_raw(name, kind as u8)
    }

    fn matches_raw(&self, name: &str, kind: u8) -> bool {
        name == self.name && self.kind.is_some_and(|k| k.to_lsp() as u8 == kind)
    }
}

/// One step of the cascade: a request and a pure selector over its result
pub struct Strategy {
    pub name: &'static str,
    pub method: &'static str,
    params: fn(&SymbolQuery<'_>) -> Value,
    select: fn(&SymbolQuery<'_>, Value) -> Option<Range>,
    /// Result is not checked against name or kind
    unchecked: bool,
}

pub const CASCADE: [Strategy; 3] = [
    Strategy {
        name: "workspace-symbol",
        method: "workspace/symbol",
        params: |q| json!({ "query": q.name }),
        select: select_workspace_symbol,
        unchecked: false,
    },
    Strategy {
        name: "document-outline",
        method: "textDocument/documentSymbol",
        params: |q| json!({ "textDocument": TextDocumentIdentifier::new(q.uri) }),
        select: select_document_symbol,
        unchecked: false,
    },
    Strategy {
        name: "implementation-fallback",
        method: "textDocument/implementation",
        params: |q| json!(TextDocumentPositionParams::new(q.uri, Position::new(0, 0))),
        select: select_implementation,
        unchecked: true,
    },
];

/// Run the cascade. `Ok(None)` means every strategy came up empty.
pub async fn resolve(
    backend: &dyn LspBackend,
    query: &SymbolQuery<'_>,
) -> Result<Option<SymbolLocation>, LspError> {
    for strategy in &CASCADE {
        let response = match backend
            .request_value(strategy.method, (strategy.params)(query))
            .await
        {
            Ok(value) => value,
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                tracing::debug!("{} failed for '{}': {}", strategy.name, query.name, e);
                continue;
            }
        };

        if let Some(range) = (strategy.select)(query, response) {
            if strategy.unchecked {
                tracing::warn!(
                    "'{}' resolved by {} without name or kind verification",
                    query.name,
                    strategy.name
                );
            } else {
                tracing::debug!("'{}' resolved by {}", query.name, strategy.name);
            }
            return Ok(Some(SymbolLocation::new(query.uri, range)));
        }
        tracing::debug!("{} found nothing for '{}'", strategy.name, query.name);
    }

    Ok(None)
}

fn array_items(strategy: &str, value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Null => None,
        other => {
            tracing::debug!("{}: expected an array, got {}", strategy, other);
            None
        }
    }
}

fn select_workspace_symbol(query: &SymbolQuery<'_>, value: Value) -> Option<Range> {
    array_items("workspace/symbol", value)?
        .into_iter()
        .filter_map(|item| serde_json::from_value::<SymbolInformation>(item).ok())
        .find_map(|info| {
            let hit = query.matches(&info.name, info.kind)
                && same_document(&info.location.uri, query.uri);
            if hit { info.location.range } else { None }
        })
}

fn select_document_symbol(query: &SymbolQuery<'_>, value: Value) -> Option<Range> {
    let items = array_items("textDocument/documentSymbol", value)?;

    // Servers answer with either a flat SymbolInformation[] or a tree
    if items.first().is_some_and(|item| item.get("location").is_some()) {
        return items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<SymbolInformation>(item).ok())
            .find(|info| query.matches(&info.name, info.kind))
            .and_then(|info| info.location.range);
    }

    let outline: Vec<DocumentSymbol> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::debug!("Skipping malformed outline node: {}", e);
                None
            }
        })
        .collect();
    find_in_outline(&outline, query).map(|node| node.range)
}

/// Pre-order depth-first search: a node before its children, children in order
fn find_in_outline<'a>(
    nodes: &'a [DocumentSymbol],
    query: &SymbolQuery<'_>,
) -> Option<&'a DocumentSymbol> {
    for node in nodes {
        if query.matches_raw(&node.name, node.kind) {
            return Some(node);
        }
        if let Some(children) = &node.children
            && let Some(found) = find_in_outline(children, query)
        {
            return Some(found);
        }
    }
    None
}

fn select_implementation(query: &SymbolQuery<'_>, value: Value) -> Option<Range> {
    parse_location_response(value)?
        .into_iter()
        .find(|loc| same_document(&loc.uri, query.uri))
        .map(|loc| loc.range)
}

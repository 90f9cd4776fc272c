//! Output formatting for CLI commands
//!
//! stdout carries exactly one JSON document per invocation.

use std::process::ExitCode;

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{ToolError, ToolResult};

/// Exit status when a tool ran and failed
pub const EXIT_TOOL_FAILURE: u8 = 1;
/// Exit status when the invocation never reached a tool
pub const EXIT_STARTUP_FAILURE: u8 = 2;

/// Output context shared by all commands
#[derive(Debug, Clone, Default)]
pub struct OutputContext;

impl OutputContext {
    pub fn new() -> Self {
        Self
    }

    /// Print a successful response with data fields at top level
    pub fn print_success_flat<T: Serialize>(&self, data: T) {
        print_json(&success_envelope(data));
    }

    pub fn print_failure(&self, error: &ToolError) {
        tracing::debug!("Tool failed: {:?}", error);
        print_json(&failure_envelope(error));
    }

    /// Print an error that happened before any tool ran
    pub fn print_startup_failure(&self, message: &str) {
        print_json(&json!({
            "success": false,
            "error": message
        }));
    }

    /// Print the outcome of a tool and pick the exit status
    pub fn report<T: Serialize>(&self, result: ToolResult<T>) -> ExitCode {
        match result {
            Ok(data) => {
                self.print_success_flat(data);
                ExitCode::SUCCESS
            }
            Err(e) => {
                self.print_failure(&e);
                ExitCode::from(EXIT_TOOL_FAILURE)
            }
        }
    }
}

fn success_envelope<T: Serialize>(data: T) -> Value {
    let mut response = serde_json::to_value(data).unwrap_or_else(|_| json!({}));
    match response.as_object_mut() {
        Some(obj) => {
            obj.insert("success".to_string(), json!(true));
            response
        }
        None => json!({ "success": true, "data": response }),
    }
}

fn failure_envelope(error: &ToolError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "kind": error.kind()
    })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

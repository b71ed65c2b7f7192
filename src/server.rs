//! JSON-RPC (MCP) surface over stdio.
//!
//! Line-delimited requests on stdin, one JSON response per line on stdout.
//! The loop never dies on bad input: unparseable lines are logged and
//! skipped, and tool-level failures come back as structured error payloads
//! inside a successful JSON-RPC response.

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::aggregate::Aggregator;
use crate::git::WarrenError;
use crate::ops::{self, UpdateMethod};
use crate::workspace;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Serve requests from stdin until EOF.
pub fn serve(agg: Arc<Aggregator>) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(err) => {
                log::warn!("skipping unparseable request: {err}");
                continue;
            }
        };
        let response = handle_request(&agg, &request);
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Build the complete response for one request, id included.
pub fn handle_request(agg: &Aggregator, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    let body = match method {
        "initialize" => json!({
            "result": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "warren",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }
        }),
        "tools/list" => json!({ "result": { "tools": tool_schemas() } }),
        "tools/call" => call_tool(agg, request.get("params").unwrap_or(&Value::Null)),
        _ => json!({
            "error": { "code": -32601, "message": format!("method not found: {method}") }
        }),
    };

    let mut response = json!({ "jsonrpc": "2.0", "id": id });
    if let (Some(obj), Some(body)) = (response.as_object_mut(), body.as_object()) {
        for (k, v) in body {
            obj.insert(k.clone(), v.clone());
        }
    }
    response
}

/// Dispatch one tool call, wrapping the outcome in the MCP content
/// envelope. Domain errors are data, not protocol errors.
fn call_tool(agg: &Aggregator, params: &Value) -> Value {
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    let payload = match dispatch(agg, name, &args) {
        Ok(value) => value,
        Err(DispatchError::UnknownTool) => {
            return json!({
                "error": { "code": -32602, "message": format!("unknown tool: {name}") }
            });
        }
        Err(DispatchError::BadArguments(message)) => {
            return json!({
                "error": { "code": -32602, "message": message }
            });
        }
        Err(DispatchError::Tool(err)) => json!({
            "error": { "code": err.code(), "message": err.detail() }
        }),
    };

    let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    json!({
        "result": {
            "content": [ { "type": "text", "text": text } ]
        }
    })
}

enum DispatchError {
    UnknownTool,
    BadArguments(String),
    Tool(WarrenError),
}

impl From<WarrenError> for DispatchError {
    fn from(err: WarrenError) -> Self {
        DispatchError::Tool(err)
    }
}

fn dispatch(agg: &Aggregator, name: &str, args: &Value) -> Result<Value, DispatchError> {
    match name {
        "warren_list_workers" => {
            let snapshot = agg.refresh();
            Ok(serde_json::to_value(&*snapshot).map_err(to_parse_error)?)
        }
        "warren_worker_details" => {
            let branch = str_arg(args, "branch")?;
            let details = workspace::worker_details(agg, branch)?;
            Ok(serde_json::to_value(&details).map_err(to_parse_error)?)
        }
        "warren_cleanup_workers" => {
            let dry_run = bool_arg(args, "dry_run", true);
            let report = ops::cleanup(agg, dry_run);
            Ok(serde_json::to_value(&report).map_err(to_parse_error)?)
        }
        "warren_update_branches" => {
            let dry_run = bool_arg(args, "dry_run", false);
            let method = if bool_arg(args, "merge", false) {
                UpdateMethod::Merge
            } else {
                UpdateMethod::Rebase
            };
            let report = ops::update_branches(agg, method, dry_run)?;
            Ok(serde_json::to_value(&report).map_err(to_parse_error)?)
        }
        "warren_create_pr" => {
            let branch = str_arg(args, "branch")?;
            let title = opt_str_arg(args, "title");
            let body = opt_str_arg(args, "body");
            let auto_merge = bool_arg(args, "auto_merge", true);
            let report = ops::create_pull_request(agg, branch, title, body, auto_merge)?;
            Ok(serde_json::to_value(&report).map_err(to_parse_error)?)
        }
        "warren_read_file" => {
            let branch = str_arg(args, "branch")?;
            let path = str_arg(args, "path")?;
            let content = workspace::read_file(agg, branch, path)?;
            Ok(json!({ "branch": branch, "path": path, "content": content }))
        }
        "warren_get_diff" => {
            let branch = str_arg(args, "branch")?;
            let file = opt_str_arg(args, "file");
            let diff = workspace::diff(agg, branch, file)?;
            Ok(json!({ "branch": branch, "diff": diff }))
        }
        _ => Err(DispatchError::UnknownTool),
    }
}

fn to_parse_error(err: serde_json::Error) -> DispatchError {
    DispatchError::Tool(WarrenError::Parse {
        message: err.to_string(),
    })
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, DispatchError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::BadArguments(format!("missing required argument: {key}")))
}

fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn bool_arg(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn tool_schemas() -> Value {
    json!([
        {
            "name": "warren_list_workers",
            "description": "List all active workers with branch, directory, and review status",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "warren_worker_details",
            "description": "Full details for one worker: status, commits, and diff stats",
            "inputSchema": {
                "type": "object",
                "properties": { "branch": { "type": "string" } },
                "required": ["branch"]
            }
        },
        {
            "name": "warren_cleanup_workers",
            "description": "Remove workers whose branches are fully merged into the default branch",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "dry_run": { "type": "boolean", "default": true }
                }
            }
        },
        {
            "name": "warren_update_branches",
            "description": "Rebase or merge every worker branch onto the remote default branch",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "dry_run": { "type": "boolean", "default": false },
                    "merge": { "type": "boolean", "default": false }
                }
            }
        },
        {
            "name": "warren_create_pr",
            "description": "Push a worker branch and open a pull request",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "branch": { "type": "string" },
                    "title": { "type": "string" },
                    "body": { "type": "string" },
                    "auto_merge": { "type": "boolean", "default": true }
                },
                "required": ["branch"]
            }
        },
        {
            "name": "warren_read_file",
            "description": "Read a file from inside a worker's worktree",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "branch": { "type": "string" },
                    "path": { "type": "string" }
                },
                "required": ["branch", "path"]
            }
        },
        {
            "name": "warren_get_diff",
            "description": "Diff a worker branch against the default branch, optionally one file",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "branch": { "type": "string" },
                    "file": { "type": "string" }
                },
                "required": ["branch"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;

    fn test_aggregator() -> (tempfile::TempDir, Aggregator) {
        let dir = tempfile::tempdir().unwrap();
        let agg = Aggregator::new(Repository::at(dir.path()));
        (dir, agg)
    }

    #[test]
    fn initialize_reports_protocol_and_server() {
        let (_dir, agg) = test_aggregator();
        let request = json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" });
        let response = handle_request(&agg, &request);

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "warren");
    }

    #[test]
    fn tools_list_names_every_tool() {
        let (_dir, agg) = test_aggregator();
        let request = json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" });
        let response = handle_request(&agg, &request);

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 7);
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"warren_list_workers"));
        assert!(names.contains(&"warren_read_file"));
    }

    #[test]
    fn unknown_method_is_a_protocol_error() {
        let (_dir, agg) = test_aggregator();
        let request = json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" });
        let response = handle_request(&agg, &request);
        assert_eq!(response["error"]["code"], -32601);
    }

    #[test]
    fn unknown_tool_is_a_protocol_error() {
        let (_dir, agg) = test_aggregator();
        let request = json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": { "name": "warren_explode", "arguments": {} }
        });
        let response = handle_request(&agg, &request);
        assert_eq!(response["error"]["code"], -32602);
    }

    #[test]
    fn missing_argument_is_reported() {
        let (_dir, agg) = test_aggregator();
        let request = json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": { "name": "warren_worker_details", "arguments": {} }
        });
        let response = handle_request(&agg, &request);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("branch"));
    }

    #[test]
    fn invalid_branch_is_a_structured_tool_error() {
        let (_dir, agg) = test_aggregator();
        let request = json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {
                "name": "warren_read_file",
                "arguments": { "branch": "-rf", "path": "x" }
            }
        });
        let response = handle_request(&agg, &request);
        assert_eq!(response["result"]["content"][0]["type"], "text");

        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["error"]["code"], "invalid_branch");
    }

    #[test]
    fn missing_id_echoes_null() {
        let (_dir, agg) = test_aggregator();
        let request = json!({ "jsonrpc": "2.0", "method": "initialize" });
        let response = handle_request(&agg, &request);
        assert!(response["id"].is_null());
    }
}

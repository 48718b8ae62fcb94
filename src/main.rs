//! Rechenwerk stdio server - main entry point.
//!
//! Newline-delimited JSON over stdin/stdout: one request per line
//! (`{"op": "...", ...}`), one reply per line. The protocol core is
//! transport-agnostic; this binary is glue only.
//!
//! Operations:
//! - `{"op": "list_tools", "tags": ["all"]}`
//! - `{"op": "get_tool_details", "tool_name": "solve_kreis_umfang"}`
//! - `{"op": "execute_tool", "tool_name": "...", "parameters": {...}}`

use clap::Parser;
use rechenwerk_core::handlers::builtin_handlers;
use rechenwerk_core::protocol::Diagnostic;
use rechenwerk_core::{Config, DiscoveryProtocol, SessionContext, ToolRegistry};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "rechenwerk-server", about = "Formula tool server (stdio transport)")]
struct Args {
    /// Emit catalog size at startup and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let config = Config::default();

    rechenwerk_core::observability::init_tracing(&config.observability);

    let mut registry = ToolRegistry::new();
    let count = registry.discover(builtin_handlers());
    tracing::info!(tools = count, "registry built");

    if args.check {
        println!("{}", json!({ "tools": count }));
        return Ok(());
    }

    let protocol = DiscoveryProtocol::new(registry, config.limits.clone());
    // One stdio stream is one conversation.
    let mut session = SessionContext::with_window(config.limits.window);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = dispatch(&protocol, &mut session, &line).await;
        let mut out = reply.to_string();
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn dispatch(
    protocol: &DiscoveryProtocol,
    session: &mut SessionContext,
    line: &str,
) -> Value {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return error_reply(Diagnostic::usage(format!("request is not JSON: {}", e)));
        }
    };

    let op = request.get("op").and_then(Value::as_str).unwrap_or("");
    match op {
        "list_tools" => {
            let tags: Vec<String> = request
                .get("tags")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            match protocol.list(session, &tags) {
                Ok(reply) => ok_reply(&reply),
                Err(diagnostic) => error_reply(diagnostic),
            }
        }
        "get_tool_details" => {
            let tool_name = request
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or("");
            match protocol.get_details(session, tool_name) {
                Ok(reply) => ok_reply(&reply),
                Err(diagnostic) => error_reply(diagnostic),
            }
        }
        "execute_tool" => {
            let tool_name = request
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or("");
            let parameters = request.get("parameters").cloned().unwrap_or(Value::Null);
            match protocol.execute(session, tool_name, &parameters).await {
                Ok(reply) => ok_reply(&reply),
                Err(diagnostic) => error_reply(diagnostic),
            }
        }
        other => error_reply(Diagnostic::usage(format!(
            "unknown op '{}'; use list_tools, get_tool_details or execute_tool",
            other
        ))),
    }
}

fn ok_reply<T: serde::Serialize>(body: &T) -> Value {
    match serde_json::to_value(body) {
        Ok(value) => json!({ "ok": true, "body": value }),
        Err(e) => error_reply(Diagnostic::internal(e.to_string())),
    }
}

fn error_reply(diagnostic: Diagnostic) -> Value {
    match serde_json::to_value(&diagnostic) {
        Ok(value) => json!({ "ok": false, "error": value }),
        Err(_) => json!({ "ok": false, "error": { "kind": "internal" } }),
    }
}

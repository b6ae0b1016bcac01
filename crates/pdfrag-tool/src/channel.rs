//! Calling half of the tool protocol.
//!
//! Every `invoke` is a fresh process-bounded session: spawn the server
//! command, run the initialize handshake, send exactly one `tools/call`,
//! read exactly one response, tear the process down. A crashed or leaking
//! stage can only damage its own session, never the next call's. The public
//! API blocks; the suspended I/O runs on a private current-thread runtime,
//! the same facade the rest of the workspace uses for async internals.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use pdfrag_core::{Error, Result};

use crate::protocol::{
    ContentItem, JsonRpcRequest, JsonRpcResponse, ToolInfo, PROTOCOL_VERSION,
};

/// How to launch one tool-server process.
#[derive(Debug, Clone)]
pub struct ServerSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ServerSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), args: Vec::new(), env: HashMap::new() }
    }
}

pub struct ToolChannel {
    server: ServerSpec,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl ToolChannel {
    pub fn new(server: ServerSpec, timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::ToolInvocation(format!("failed to build runtime: {e}")))?;
        Ok(Self { server, timeout, runtime })
    }

    /// Invoke `tool_name` with `arguments` in a fresh server session and
    /// return the response content items. No retries happen here; a caller
    /// that wants recovery re-runs the whole operation.
    pub fn invoke(&self, tool_name: &str, arguments: Value) -> Result<Vec<ContentItem>> {
        self.runtime.block_on(self.invoke_async(tool_name, arguments))
    }

    /// Tool discovery over a fresh session.
    pub fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        self.runtime.block_on(self.list_tools_async())
    }

    async fn invoke_async(&self, tool_name: &str, arguments: Value) -> Result<Vec<ContentItem>> {
        let mut session = self.open_session(tool_name).await?;
        let result = self.call_tool(&mut session, tool_name, arguments).await;
        session.teardown().await;
        result
    }

    async fn list_tools_async(&self) -> Result<Vec<ToolInfo>> {
        let mut session = self.open_session("tools/list").await?;
        let result = self.request_tools(&mut session).await;
        session.teardown().await;
        result
    }

    async fn open_session(&self, tool_name: &str) -> Result<Session> {
        let mut cmd = Command::new(&self.server.command);
        cmd.args(&self.server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &self.server.env {
            cmd.env(key, value);
        }
        let mut child = cmd.spawn().map_err(|e| {
            Error::ToolInvocation(format!(
                "failed to spawn tool server '{}': {e}",
                self.server.command
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::ToolInvocation("failed to capture server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ToolInvocation("failed to capture server stdout".to_string()))?;
        let mut session =
            Session { child, stdin, stdout: BufReader::new(stdout), next_id: 1 };

        // Handshake: initialize, then the initialized notification.
        let init = JsonRpcRequest::new(
            session.take_id(),
            "initialize",
            Some(serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "pdfrag",
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
        );
        session.send(&init).await?;
        let response = self.read_bounded(&mut session, tool_name).await?;
        if let Some(error) = response.error {
            session.teardown().await;
            return Err(Error::ToolInvocation(format!(
                "initialize failed: [{}] {}",
                error.code, error.message
            )));
        }
        session
            .send(&JsonRpcRequest::notification("notifications/initialized"))
            .await?;
        Ok(session)
    }

    async fn call_tool(
        &self,
        session: &mut Session,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Vec<ContentItem>> {
        let request = JsonRpcRequest::new(
            session.take_id(),
            "tools/call",
            Some(serde_json::json!({ "name": tool_name, "arguments": arguments })),
        );
        session.send(&request).await?;
        let response = self.read_bounded(session, tool_name).await?;
        if let Some(error) = response.error {
            return Err(Error::ToolInvocation(format!(
                "tool '{tool_name}' failed: [{}] {}",
                error.code, error.message
            )));
        }
        let result = response.result.unwrap_or(Value::Null);
        let content = result
            .get("content")
            .cloned()
            .ok_or_else(|| Error::ToolInvocation(format!("tool '{tool_name}' returned no content")))?;
        serde_json::from_value(content)
            .map_err(|e| Error::ToolInvocation(format!("tool '{tool_name}' content malformed: {e}")))
    }

    async fn request_tools(&self, session: &mut Session) -> Result<Vec<ToolInfo>> {
        let request = JsonRpcRequest::new(session.take_id(), "tools/list", None);
        session.send(&request).await?;
        let response = self.read_bounded(session, "tools/list").await?;
        if let Some(error) = response.error {
            return Err(Error::ToolInvocation(format!(
                "tools/list failed: [{}] {}",
                error.code, error.message
            )));
        }
        let tools = response
            .result
            .and_then(|r| r.get("tools").cloned())
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(tools)
            .map_err(|e| Error::ToolInvocation(format!("tools/list malformed: {e}")))
    }

    /// Read the next JSON-RPC response, skipping blank and non-JSON lines
    /// (stage logs share the pipe). The wait is bounded; on expiry the
    /// session is abandoned and the caller tears it down.
    async fn read_bounded(&self, session: &mut Session, tool_name: &str) -> Result<JsonRpcResponse> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = tokio::time::timeout(self.timeout, session.stdout.read_line(&mut line))
                .await
                .map_err(|_| Error::ToolTimeout {
                    tool: tool_name.to_string(),
                    seconds: self.timeout.as_secs(),
                })?
                .map_err(|e| Error::ToolInvocation(format!("failed to read server stdout: {e}")))?;
            if read == 0 {
                return Err(Error::ToolInvocation(
                    "tool server closed stdout (process may have crashed)".to_string(),
                ));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(response) => return Ok(response),
                Err(_) => continue,
            }
        }
    }
}

impl Session {
    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn send(&mut self, request: &JsonRpcRequest) -> Result<()> {
        let msg = serde_json::to_string(request)
            .map_err(|e| Error::ToolInvocation(format!("failed to encode request: {e}")))?;
        self.stdin
            .write_all(msg.as_bytes())
            .await
            .map_err(|e| Error::ToolInvocation(format!("failed to write server stdin: {e}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| Error::ToolInvocation(format!("failed to write newline: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| Error::ToolInvocation(format!("failed to flush stdin: {e}")))?;
        Ok(())
    }

    async fn teardown(mut self) {
        let _ = self.stdin.shutdown().await;
        let _ = self.child.kill().await;
    }
}

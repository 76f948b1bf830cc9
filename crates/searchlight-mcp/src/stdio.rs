//! Single-session server over newline-delimited JSON-RPC.
//!
//! Used by `searchlight stdio`: one message per line on the reader, one
//! response or notification per line on the writer. The session closes when
//! the reader reaches EOF.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{JsonRpcResponse, Payload};
use crate::service::SharedService;
use crate::transport::{SessionTransport, TransportReply};

/// Serve one session until the reader is exhausted.
pub async fn serve_stdio<R, W>(service: SharedService, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let transport = Arc::new(SessionTransport::new());
    transport.connect(service)?;
    let mut subscription = transport.subscribe();
    let mut lines = reader.lines();

    info!("Serving MCP over stdio");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let reply = match Payload::parse(line.as_bytes()) {
                    Ok(payload) => transport.handle_payload(payload).await?,
                    Err(error) => {
                        debug!(error = %error, "Rejected malformed message");
                        TransportReply::Single(JsonRpcResponse::error(None, error))
                    }
                };
                if reply.has_body() {
                    write_line(&mut writer, &reply).await?;
                }
            }
            Some(notification) = subscription.next() => {
                write_line(&mut writer, &notification).await?;
            }
        }
    }

    transport.close();
    info!("stdio session ended");
    Ok(())
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    if let Err(e) = writer.write_all(&bytes).await {
        warn!(error = %e, "Failed to write to stdout");
        return Err(e.into());
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::io::BufReader;

    use super::*;
    use crate::error::McpError;
    use crate::protocol::{CallToolResult, Implementation, JsonRpcError, ToolInfo};
    use crate::service::McpService;

    struct Quiet;

    #[async_trait]
    impl McpService for Quiet {
        fn server_info(&self) -> Implementation {
            Implementation::new("quiet", "1.0.0")
        }

        async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
            Ok(Vec::new())
        }

        async fn call_tool(&self, name: &str, _arguments: Option<Value>) -> Result<CallToolResult> {
            Err(McpError::UnknownTool(name.to_string()))
        }
    }

    async fn run(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        serve_stdio(
            Arc::new(Quiet),
            BufReader::new(input.as_bytes()),
            &mut output,
        )
        .await
        .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stdio_session() {
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "cli", "version": "0.1"}
            }}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ]
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n");

        let responses = run(&input).await;
        let replies: Vec<_> = responses.iter().filter(|r| r.get("id").is_some()).collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "quiet");
        assert_eq!(replies[1]["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn test_stdio_malformed_line() {
        let responses = run("{oops\n\n").await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
    }
}

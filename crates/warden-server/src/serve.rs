//! Newline-delimited JSON request loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::Connection;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::dispatch::Dispatcher;

#[derive(Debug, Deserialize)]
struct Request {
    command: String,
    #[serde(default)]
    payload: Value,
}

/// One output line: `{"ok": value}` or `{"error": message}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Response {
    Ok(Value),
    Error(String),
}

impl<C: Connection> Dispatcher<C> {
    async fn respond(&self, line: &str) -> Response {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                return Response::Error(format!("malformed request: {e}"));
            }
        };

        match self.dispatch(&request.command, request.payload).await {
            Ok(value) => Response::Ok(value),
            Err(e) => {
                warn!(command = %request.command, error = %e, "Command failed");
                Response::Error(e.to_string())
            }
        }
    }
}

/// Serve requests from `reader` until end of input, one response line per
/// non-blank request line.
pub async fn serve<C, R, W>(dispatcher: &Dispatcher<C>, reader: R, mut writer: W) -> std::io::Result<()>
where
    C: Connection,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = dispatcher.respond(&line).await;
        let mut out = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }

    info!(handled, "Input closed");
    Ok(())
}

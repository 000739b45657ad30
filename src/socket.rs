//! Client for the control socket exposed by a running hub or bridge.
//!
//! Messages are single-line JSON. The channel is presence-gated: when no
//! runtime is listening, `emit` and `fetch` quietly do nothing.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Message<'a> {
    Emit {
        event: &'a str,
        data: &'a Value,
    },
    Fetch {
        path: &'a str,
        params: &'a Value,
        body: &'a Value,
    },
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
pub struct ControlSocket {
    path: PathBuf,
}

impl ControlSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a runtime has published its socket file
    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    /// Fire-and-forget notification
    pub fn emit(&self, event: &str, payload: &Value) -> Result<()> {
        let message = Message::Emit {
            event,
            data: payload,
        };
        self.exchange(&message, false).map(|_| ())
    }

    /// Request/response call; `Ok(None)` when no runtime is listening
    pub fn fetch(&self, path: &str, params: &Value, body: &Value) -> Result<Option<Value>> {
        let message = Message::Fetch { path, params, body };
        self.exchange(&message, true)
    }

    /// Emit and swallow every failure; used after a mutation has committed
    pub fn notify(&self, event: &str, payload: Value) {
        if let Err(e) = self.emit(event, &payload) {
            tracing::warn!(event, error = %e, "control socket notification failed");
        }
    }

    #[cfg(unix)]
    fn exchange(&self, message: &Message<'_>, await_reply: bool) -> Result<Option<Value>> {
        use std::io::{BufRead, BufReader, ErrorKind, Write};
        use std::os::unix::net::UnixStream;

        if !self.is_present() {
            tracing::debug!(socket = %self.path.display(), "no runtime listening");
            return Ok(None);
        }

        let mut stream = match UnixStream::connect(&self.path) {
            Ok(stream) => stream,
            Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
                tracing::debug!(socket = %self.path.display(), "stale socket, runtime not running");
                return Ok(None);
            }
            Err(e) => return Err(HubError::io(&self.path, e)),
        };
        stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        stream.write_all(&line)?;
        stream.flush()?;

        if !await_reply {
            return Ok(None);
        }

        let mut reply = String::new();
        BufReader::new(&stream).read_line(&mut reply)?;
        if reply.trim().is_empty() {
            return Ok(None);
        }
        let reply: Reply = serde_json::from_str(reply.trim())?;
        Ok(Some(reply.data))
    }

    #[cfg(not(unix))]
    fn exchange(&self, _message: &Message<'_>, _await_reply: bool) -> Result<Option<Value>> {
        Ok(None)
    }
}

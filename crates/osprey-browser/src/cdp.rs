//! Chrome DevTools Protocol plumbing.
//!
//! Two halves: the HTTP discovery endpoint (`/json/list`, `/json/version`,
//! target lifecycle) and a raw WebSocket command channel per attached target.
//! Commands against one target are strictly sequential; a browser tab has no
//! notion of concurrent independent command streams.

use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(800);
const EVENT_BUFFER_LIMIT: usize = 256;

/// One controllable target (tab) from `/json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub url: String,
    /// Absent when another debugger client is already attached.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .no_proxy()
        .build()
        .map_err(|e| Error::Connect(format!("Failed to build HTTP client: {}", e)))
}

/// Targets currently exposed by the browser on `port`.
pub async fn list_targets(port: u16) -> Result<Vec<TargetInfo>> {
    let url = format!("http://127.0.0.1:{}/json/list", port);
    let response = http_client()?
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Connect(format!("No debugging endpoint on port {}: {}", port, e)))?;

    if !response.status().is_success() {
        return Err(Error::Connect(format!(
            "Unexpected status {} from {}",
            response.status(),
            url
        )));
    }

    response
        .json::<Vec<TargetInfo>>()
        .await
        .map_err(|e| Error::Protocol(format!("Bad target list from {}: {}", url, e)))
}

/// Whether a debugging endpoint answers on `port`.
///
/// Profile lease diagnostics use this to tell a leased browser apart from an
/// unrelated process squatting on the port.
pub async fn probe_endpoint(port: u16) -> bool {
    let url = format!("http://127.0.0.1:{}/json/version", port);
    match http_client() {
        Ok(client) => match client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        },
        Err(_) => false,
    }
}

/// Opens a new tab at `url` and returns its target descriptor.
pub async fn open_target(port: u16, url: &str) -> Result<TargetInfo> {
    // Chrome 111+ requires PUT for /json/new.
    let endpoint = format!("http://127.0.0.1:{}/json/new?{}", port, url);
    let response = http_client()?
        .put(&endpoint)
        .send()
        .await
        .map_err(|e| Error::Connect(format!("Failed to open target on port {}: {}", port, e)))?;

    response
        .json::<TargetInfo>()
        .await
        .map_err(|e| Error::Protocol(format!("Bad new-target response: {}", e)))
}

/// Brings an existing target to the foreground.
pub async fn activate_target(port: u16, id: &str) -> Result<()> {
    let endpoint = format!("http://127.0.0.1:{}/json/activate/{}", port, id);
    http_client()?
        .get(&endpoint)
        .send()
        .await
        .map_err(|e| Error::Connect(format!("Failed to activate target {}: {}", id, e)))?;
    Ok(())
}

/// Sequential command channel over one target's WebSocket.
pub struct CdpTransport {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    /// Event frames observed while waiting for a command response.
    events: VecDeque<Value>,
}

impl CdpTransport {
    pub async fn connect(ws_url: &str) -> Result<Self> {
        tracing::debug!(%ws_url, "connecting CDP command channel");
        let (socket, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Connect(format!("WebSocket connect to {} failed: {}", ws_url, e)))?;

        Ok(Self {
            socket,
            next_id: 0,
            events: VecDeque::new(),
        })
    }

    /// Sends one command and reads frames until its response arrives.
    ///
    /// Event frames seen in the meantime are buffered for later
    /// [`wait_for_event`](Self::wait_for_event) calls.
    pub async fn send(&mut self, method: &str, params: Value) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let frame = json!({ "id": id, "method": method, "params": params });

        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| Error::Transport(format!("Send of {} failed: {}", method, e)))?;

        loop {
            let value = self.next_frame().await?;
            let Some(value) = value else { continue };

            if value.get("id").and_then(Value::as_u64) == Some(id) {
                if let Some(error) = value.get("error") {
                    return Err(Error::Protocol(format!("{} failed: {}", method, error)));
                }
                return Ok(value.get("result").cloned().unwrap_or(Value::Null));
            }
            self.buffer_event(value);
        }
    }

    /// Waits for a protocol event by method name, draining buffered frames
    /// first.
    pub async fn wait_for_event(&mut self, method: &str, timeout: Duration) -> Result<Value> {
        if let Some(pos) = self
            .events
            .iter()
            .position(|e| e.get("method").and_then(Value::as_str) == Some(method))
        {
            // remove() cannot miss: pos came from this deque.
            return Ok(self.events.remove(pos).unwrap_or(Value::Null));
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Transport(format!("Timed out waiting for {}", method)));
            }

            let value = tokio::time::timeout(remaining, self.next_frame())
                .await
                .map_err(|_| Error::Transport(format!("Timed out waiting for {}", method)))??;
            let Some(value) = value else { continue };

            if value.get("method").and_then(Value::as_str) == Some(method) {
                return Ok(value);
            }
            self.buffer_event(value);
        }
    }

    /// Reads one frame; `None` for non-text messages (pings, binary).
    async fn next_frame(&mut self) -> Result<Option<Value>> {
        let msg = self
            .socket
            .next()
            .await
            .ok_or_else(|| Error::Transport("Connection closed by browser".to_string()))?
            .map_err(|e| Error::Transport(e.to_string()))?;

        let Message::Text(text) = msg else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(text.as_str())
            .map_err(|e| Error::Protocol(format!("Unparseable frame: {}", e)))?;
        Ok(Some(value))
    }

    fn buffer_event(&mut self, value: Value) {
        // Frames without a method are stray responses; nothing waits on them.
        if value.get("method").is_none() {
            return;
        }
        if self.events.len() >= EVENT_BUFFER_LIMIT {
            self.events.pop_front();
        }
        self.events.push_back(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_info_deserializes_discovery_shape() {
        let raw = r#"{
            "id": "A1B2",
            "title": "Example",
            "type": "page",
            "url": "https://example.com/",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/A1B2"
        }"#;

        let target: TargetInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(target.id, "A1B2");
        assert_eq!(target.target_type, "page");
        assert!(target.web_socket_debugger_url.is_some());
    }

    #[test]
    fn test_target_info_tolerates_missing_ws_url() {
        let raw = r#"{ "id": "A1B2", "type": "page" }"#;

        let target: TargetInfo = serde_json::from_str(raw).unwrap();
        assert!(target.web_socket_debugger_url.is_none());
        assert!(target.url.is_empty());
    }

    #[tokio::test]
    async fn test_probe_endpoint_without_browser_is_false() {
        // Port 1 never hosts a debugging endpoint.
        assert!(!probe_endpoint(1).await);
    }
}

//! One automation session against one browser target.

use crate::cdp::{self, CdpTransport, TargetInfo};
use crate::{Error, Result};
use osprey_core::AutomationConfig;
use serde_json::{Value, json};

/// Exclusive handle on one tab's command channel.
///
/// Owned by a single orchestrator for its lifetime; all commands are issued
/// strictly sequentially.
pub struct Session {
    target: TargetInfo,
    transport: CdpTransport,
    origin_host: String,
    config: AutomationConfig,
}

impl Session {
    /// Attaches to the first page target exposed on `port`, opening a blank
    /// tab when the browser has none.
    pub async fn attach(port: u16, config: AutomationConfig) -> Result<Self> {
        let targets = cdp::list_targets(port).await?;
        let target = match targets.into_iter().find(|t| t.target_type == "page") {
            Some(target) => target,
            // A headless browser can come up without any page target.
            None => cdp::open_target(port, "about:blank").await?,
        };
        cdp::activate_target(port, &target.id).await?;
        Self::attach_target(target, config).await
    }

    /// Attaches to a specific target descriptor.
    pub async fn attach_target(target: TargetInfo, config: AutomationConfig) -> Result<Self> {
        let ws_url = target.web_socket_debugger_url.clone().ok_or_else(|| {
            Error::Connect(format!(
                "Target {} exposes no WebSocket URL; another debugger client may be attached",
                target.id
            ))
        })?;

        let mut transport = CdpTransport::connect(&ws_url).await?;
        transport.send("Page.enable", json!({})).await?;
        transport.send("Runtime.enable", json!({})).await?;

        let origin_host = host_of(&target.url);
        tracing::debug!(target = %target.id, host = %origin_host, "session attached");

        Ok(Self {
            target,
            transport,
            origin_host,
            config,
        })
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn origin_host(&self) -> &str {
        &self.origin_host
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Navigates and resolves once the page-load event fires.
    ///
    /// Times out with [`Error::NavigationTimeout`] after the configured
    /// navigation window; callers decide whether that is fatal.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::info!(%url, "navigate");
        let result = self
            .transport
            .send("Page.navigate", json!({ "url": url }))
            .await?;

        if let Some(text) = result.get("errorText").and_then(Value::as_str) {
            if !text.is_empty() {
                return Err(Error::Connect(format!(
                    "Navigation to '{}' refused: {}",
                    url, text
                )));
            }
        }

        let timeout = self.config.navigation_timeout;
        self.transport
            .wait_for_event("Page.loadEventFired", timeout)
            .await
            .map_err(|_| Error::NavigationTimeout {
                url: url.to_string(),
                ms: timeout.as_millis() as u64,
            })?;

        self.origin_host = host_of(url);
        Ok(())
    }

    /// Runs `expression` in page context and returns its JSON value.
    ///
    /// The script executes in the real page, so it can click, type, and
    /// otherwise mutate page state; no sandboxing happens here. Callers must
    /// not assume the shape of the returned value.
    pub async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        let result = self
            .transport
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = exception
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("Script threw")
                .to_string();
            let detail = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(Error::Evaluation { message, detail });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Current document URL as the page itself reports it.
    pub async fn current_url(&mut self) -> Result<String> {
        match self.evaluate("window.location.href").await? {
            Value::String(href) => Ok(href),
            other => Err(Error::Protocol(format!(
                "Unexpected location value: {}",
                other
            ))),
        }
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of_extracts_host() {
        assert_eq!(host_of("https://example.com/a/b"), "example.com");
        assert_eq!(host_of("about:blank"), "");
        assert_eq!(host_of("not a url"), "");
    }

    #[tokio::test]
    async fn test_attach_without_browser_is_connect_error() {
        let result = Session::attach(1, AutomationConfig::default()).await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }
}

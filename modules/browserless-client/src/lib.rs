pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

/// Fixed render viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub is_mobile: bool,
}

/// Desktop capture viewport (full-page).
pub const DESKTOP_VIEWPORT: Viewport = Viewport {
    width: 1920,
    height: 1080,
    is_mobile: false,
};

/// Mobile capture viewport (full-page).
pub const MOBILE_VIEWPORT: Viewport = Viewport {
    width: 375,
    height: 667,
    is_mobile: true,
};

/// Delay after navigation before capture, to let dynamic content settle.
const SETTLE_DELAY_MS: u64 = 3_000;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        // Per-request timeouts are set at call sites; no global timeout here.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BrowserlessError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint. Navigation waits for domcontentloaded plus a settle delay.
    pub async fn content(&self, url: &str, timeout: Duration) -> Result<String> {
        let timeout_ms = timeout.as_millis() as u64;
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "domcontentloaded",
                "timeout": timeout_ms,
            },
            "waitForTimeout": SETTLE_DELAY_MS,
        });

        debug!(url, "Browserless content request");

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserlessError::from_reqwest(e, timeout_ms))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.text()
            .await
            .map_err(|e| BrowserlessError::from_reqwest(e, timeout_ms))
    }

    /// Capture a full-page PNG screenshot at the given viewport via the
    /// Browserless /screenshot endpoint.
    pub async fn screenshot(
        &self,
        url: &str,
        viewport: Viewport,
        timeout: Duration,
    ) -> Result<Bytes> {
        let timeout_ms = timeout.as_millis() as u64;
        let body = serde_json::json!({
            "url": url,
            "options": {
                "fullPage": true,
                "type": "png",
            },
            "viewport": {
                "width": viewport.width,
                "height": viewport.height,
                "isMobile": viewport.is_mobile,
            },
            "gotoOptions": {
                "waitUntil": "domcontentloaded",
                "timeout": timeout_ms,
            },
            "waitForTimeout": SETTLE_DELAY_MS,
        });

        debug!(
            url,
            width = viewport.width,
            height = viewport.height,
            "Browserless screenshot request"
        );

        let resp = self
            .client
            .post(self.endpoint("/screenshot"))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserlessError::from_reqwest(e, timeout_ms))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.bytes()
            .await
            .map_err(|e| BrowserlessError::from_reqwest(e, timeout_ms))
    }
}

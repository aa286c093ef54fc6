//! Concurrent page data collection.
//!
//! Four independent tasks run under one `tokio::join!`: desktop screenshot,
//! mobile screenshot, rendered-HTML fetch (feeding element extraction), and
//! an optional performance audit. Each task carries its own deadline and
//! failure default; a failed sibling never aborts the others.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use browserless_client::{Viewport, DESKTOP_VIEWPORT, MOBILE_VIEWPORT};
use croscope_common::{ElementData, PerformanceMetrics};

use crate::elements;
use crate::traits::{PageRenderer, PerformanceAuditor};

/// Everything gathered from one page visit.
#[derive(Debug, Default)]
pub struct CollectedData {
    pub desktop_screenshot: Bytes,
    pub mobile_screenshot: Bytes,
    pub html: String,
    pub elements: ElementData,
    pub performance: Option<PerformanceMetrics>,
}

pub struct Collector {
    renderer: Arc<dyn PageRenderer>,
    auditor: Option<Arc<dyn PerformanceAuditor>>,
    timeout: Duration,
}

impl Collector {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        auditor: Option<Arc<dyn PerformanceAuditor>>,
        timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            auditor,
            timeout,
        }
    }

    /// Gather all page data. Never fails: each sub-task degrades to its
    /// default on error or timeout.
    pub async fn collect(&self, url: &str) -> CollectedData {
        let (desktop, mobile, html, performance) = tokio::join!(
            self.screenshot(url, DESKTOP_VIEWPORT),
            self.screenshot(url, MOBILE_VIEWPORT),
            self.content(url),
            self.audit(url),
        );

        let elements = elements::extract(&html);
        debug!(
            url,
            desktop_bytes = desktop.len(),
            mobile_bytes = mobile.len(),
            html_bytes = html.len(),
            has_performance = performance.is_some(),
            "Page data collected"
        );

        CollectedData {
            desktop_screenshot: desktop,
            mobile_screenshot: mobile,
            html,
            elements,
            performance,
        }
    }

    async fn screenshot(&self, url: &str, viewport: Viewport) -> Bytes {
        let label = if viewport.is_mobile { "mobile" } else { "desktop" };
        match tokio::time::timeout(
            self.timeout,
            self.renderer.capture(url, viewport, self.timeout),
        )
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(url, viewport = label, error = %e, "Screenshot capture failed");
                Bytes::new()
            }
            Err(_) => {
                warn!(url, viewport = label, "Screenshot capture timed out");
                Bytes::new()
            }
        }
    }

    async fn content(&self, url: &str) -> String {
        match tokio::time::timeout(self.timeout, self.renderer.content(url, self.timeout)).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                warn!(url, error = %e, "Rendered HTML fetch failed");
                String::new()
            }
            Err(_) => {
                warn!(url, "Rendered HTML fetch timed out");
                String::new()
            }
        }
    }

    async fn audit(&self, url: &str) -> Option<PerformanceMetrics> {
        let auditor = self.auditor.as_ref()?;
        match tokio::time::timeout(self.timeout, auditor.audit(url)).await {
            Ok(metrics) => metrics,
            Err(_) => {
                warn!(url, "Performance audit timed out");
                None
            }
        }
    }
}

// Trait abstractions for the analysis pipeline's external collaborators.
//
// PageRenderer — screenshot capture and rendered-HTML fetch.
// VisionAnalyzer — pluggable AI analyzers behind the pool.
// PerformanceAuditor — optional performance audit feeding the framework scorer.
// PersistenceSink — best-effort report storage.
//
// These enable deterministic testing with the mocks in `testing`:
// no network, no database, no browser.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use browserless_client::{BrowserlessClient, Viewport};
use croscope_common::{AnalysisReport, ElementData, Insight, PerformanceMetrics};
use vision_client::ClaudeVision;

// ---------------------------------------------------------------------------
// PageRenderer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Capture a full-page screenshot at the given viewport.
    async fn capture(&self, url: &str, viewport: Viewport, timeout: Duration) -> Result<Bytes>;

    /// Fetch fully-rendered HTML for a URL. One fetch feeds both element
    /// extraction and the framework scorer.
    async fn content(&self, url: &str, timeout: Duration) -> Result<String>;
}

#[async_trait]
impl PageRenderer for BrowserlessClient {
    async fn capture(&self, url: &str, viewport: Viewport, timeout: Duration) -> Result<Bytes> {
        Ok(self.screenshot(url, viewport, timeout).await?)
    }

    async fn content(&self, url: &str, timeout: Duration) -> Result<String> {
        Ok(self.content(url, timeout).await?)
    }
}

// ---------------------------------------------------------------------------
// VisionAnalyzer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyze a desktop screenshot plus extracted elements into an Insight.
    async fn analyze(
        &self,
        screenshot: &Bytes,
        elements: &ElementData,
        timeout: Duration,
    ) -> Result<Insight>;

    fn is_enabled(&self) -> bool;

    fn name(&self) -> &str;
}

#[async_trait]
impl VisionAnalyzer for ClaudeVision {
    async fn analyze(
        &self,
        screenshot: &Bytes,
        elements: &ElementData,
        timeout: Duration,
    ) -> Result<Insight> {
        ClaudeVision::analyze(self, screenshot.as_ref(), elements, timeout).await
    }

    fn is_enabled(&self) -> bool {
        ClaudeVision::is_enabled(self)
    }

    fn name(&self) -> &str {
        ClaudeVision::name(self)
    }
}

// ---------------------------------------------------------------------------
// PerformanceAuditor
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PerformanceAuditor: Send + Sync {
    /// Audit a page. `None` means the auditor is unavailable or the audit
    /// failed — never an error.
    async fn audit(&self, url: &str) -> Option<PerformanceMetrics>;
}

// ---------------------------------------------------------------------------
// PersistenceSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store a finished report. Errors are the caller's to log; they never
    /// fail an analysis.
    async fn store(&self, report: &AnalysisReport) -> Result<()>;
}

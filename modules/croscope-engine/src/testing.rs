// Test mocks for the analysis pipeline.
//
// One mock per trait boundary:
// - MockRenderer (PageRenderer) — fixed HTML/screenshot with call counters
// - MockAnalyzer (VisionAnalyzer) — fixed Insight or forced failure
// - MockAuditor (PerformanceAuditor) — fixed metrics or unavailable
// - MockSink (PersistenceSink) — records stored reports in memory
//
// Plus helpers for constructing Insights, Recommendations and reports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use browserless_client::Viewport;
use croscope_common::{
    AnalysisReport, CategoryScores, ElementData, Insight, PerformanceMetrics, Priority,
    Recommendation,
};

use crate::traits::{PageRenderer, PerformanceAuditor, PersistenceSink, VisionAnalyzer};

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Fixed-response renderer. Counts capture/content calls so tests can assert
/// on coalescing and cache behavior.
pub struct MockRenderer {
    html: String,
    screenshot: Bytes,
    fail_capture: bool,
    fail_content: bool,
    captures: AtomicUsize,
    content_fetches: AtomicUsize,
}

impl MockRenderer {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            screenshot: Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
            fail_capture: false,
            fail_content: false,
            captures: AtomicUsize::new(0),
            content_fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    pub fn failing_content(mut self) -> Self {
        self.fail_content = true;
        self
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn content_fetches(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn capture(&self, url: &str, _viewport: Viewport, _timeout: Duration) -> Result<Bytes> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail_capture {
            bail!("MockRenderer: capture forced failure for {url}");
        }
        Ok(self.screenshot.clone())
    }

    async fn content(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_content {
            bail!("MockRenderer: content forced failure for {url}");
        }
        Ok(self.html.clone())
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

/// Returns a fixed Insight, or fails, or never resolves within its deadline.
pub struct MockAnalyzer {
    name: String,
    insight: Insight,
    enabled: bool,
    fail: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(name: &str, insight: Insight) -> Self {
        Self {
            name: name.to_string(),
            insight,
            enabled: true,
            fail: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep past any reasonable per-analyzer deadline.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _screenshot: &Bytes,
        _elements: &ElementData,
        timeout: Duration,
    ) -> Result<Insight> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(timeout + Duration::from_secs(60)).await;
        }
        if self.fail {
            bail!("MockAnalyzer: {} forced failure", self.name);
        }
        Ok(self.insight.clone())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// MockAuditor
// ---------------------------------------------------------------------------

/// Fixed performance metrics, or None when constructed unavailable.
pub struct MockAuditor {
    metrics: Option<PerformanceMetrics>,
}

impl MockAuditor {
    pub fn with_metrics(metrics: PerformanceMetrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    pub fn unavailable() -> Self {
        Self { metrics: None }
    }
}

#[async_trait]
impl PerformanceAuditor for MockAuditor {
    async fn audit(&self, _url: &str) -> Option<PerformanceMetrics> {
        self.metrics.clone()
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Records every stored report. Thread-safe via interior Mutex.
pub struct MockSink {
    stored: Mutex<Vec<AnalysisReport>>,
    fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }

    pub fn stored_urls(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceSink for MockSink {
    async fn store(&self, report: &AnalysisReport) -> Result<()> {
        if self.fail {
            bail!("MockSink: store forced failure");
        }
        self.stored.lock().unwrap().push(report.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

/// Minimal valid report for cache and sink tests.
pub fn sample_report(url: &str) -> AnalysisReport {
    AnalysisReport {
        id: Uuid::new_v4(),
        url: url.to_string(),
        overall_score: 75,
        category_scores: CategoryScores {
            product_page: 75,
            cart_page: 75,
            mobile: 75,
            trust_signals: 75,
            coupons: 75,
            delivery: 75,
        },
        visual_analysis: Insight {
            source: "test".to_string(),
            overall_score: 75,
            ..Insight::default()
        },
        element_analysis: ElementData::default(),
        recommendations: Vec::new(),
        models_used: vec!["test".to_string()],
        created_at: Utc::now(),
    }
}

/// Insight scoring the five framework categories, as the framework scorer
/// would produce.
pub fn framework_insight(scores: [i64; 5]) -> Insight {
    let mut insight = Insight {
        source: "cro-framework".to_string(),
        overall_score: scores.iter().sum::<i64>() / 5,
        ..Insight::default()
    };
    for (category, score) in croscope_common::FRAMEWORK_CATEGORIES.iter().zip(scores) {
        insight.category_scores.insert(category.to_string(), score);
    }
    insight
}

/// AI-style insight with freeform category scores.
pub fn ai_insight(source: &str, overall: i64, categories: &[(&str, i64)]) -> Insight {
    let mut insight = Insight {
        source: source.to_string(),
        overall_score: overall,
        ..Insight::default()
    };
    for (category, score) in categories {
        insight
            .category_scores
            .insert(category.to_string(), *score);
    }
    insight
}

pub fn recommendation(category: &str, priority: Priority, issue: &str) -> Recommendation {
    Recommendation {
        category: category.to_string(),
        priority,
        issue: issue.to_string(),
        solution: format!("Fix: {issue}"),
        impact: "Conversion uplift".to_string(),
        source: "test".to_string(),
    }
}

//! Analyzer pool: concurrent fan-out over the configured vision analyzers.
//!
//! Every configured slot yields exactly one Insight. A disabled analyzer, a
//! timeout, or an error produces that slot's mock insight instead, so the
//! merger downstream never sees a hole.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use tracing::{info, warn};

use croscope_common::{Config, ElementData, EngineConfig, Insight, Priority, Recommendation};
use vision_client::{ClaudeVision, CLAUDE_VISION};

use crate::traits::VisionAnalyzer;

/// Placeholder score for an analyzer that produced no real analysis.
const MOCK_OVERALL_SCORE: i64 = 70;

pub struct AnalyzerPool {
    analyzers: Vec<Arc<dyn VisionAnalyzer>>,
    timeout: Duration,
}

impl AnalyzerPool {
    pub fn new(analyzers: Vec<Arc<dyn VisionAnalyzer>>, timeout: Duration) -> Self {
        Self { analyzers, timeout }
    }

    /// Build the pool from configuration. Unknown analyzer names are logged
    /// and skipped.
    pub fn from_config(config: &Config, engine: &EngineConfig) -> Self {
        let mut analyzers: Vec<Arc<dyn VisionAnalyzer>> = Vec::new();
        for name in &engine.enabled_analyzers {
            match name.as_str() {
                CLAUDE_VISION => {
                    analyzers.push(Arc::new(ClaudeVision::new(
                        config.anthropic_api_key.as_deref(),
                    )));
                }
                other => warn!(analyzer = other, "Unknown analyzer name, skipping"),
            }
        }
        info!(count = analyzers.len(), "Analyzer pool built");
        Self::new(analyzers, engine.analyzer_timeout)
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Names of all configured analyzers, enabled or not.
    pub fn names(&self) -> Vec<String> {
        self.analyzers
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Run every analyzer against the same screenshot and elements. Returns
    /// one Insight per configured analyzer, mock-substituted on any failure.
    pub async fn run(&self, screenshot: &Bytes, elements: &ElementData) -> Vec<Insight> {
        let calls = self.analyzers.iter().map(|analyzer| async move {
            let name = analyzer.name().to_string();
            if !analyzer.is_enabled() {
                info!(analyzer = %name, "Analyzer disabled, substituting mock insight");
                return mock_insight(&name);
            }

            match tokio::time::timeout(
                self.timeout,
                analyzer.analyze(screenshot, elements, self.timeout),
            )
            .await
            {
                Ok(Ok(insight)) => {
                    info!(analyzer = %name, score = insight.overall_score, "Analyzer completed");
                    insight
                }
                Ok(Err(e)) => {
                    warn!(analyzer = %name, error = %e, "Analyzer failed, substituting mock insight");
                    mock_insight(&name)
                }
                Err(_) => {
                    warn!(analyzer = %name, timeout_ms = self.timeout.as_millis() as u64, "Analyzer timed out, substituting mock insight");
                    mock_insight(&name)
                }
            }
        });

        join_all(calls).await
    }
}

/// Deterministic stand-in for an unavailable analyzer. Carries no category
/// scores so it can never claim the framework merge base.
pub fn mock_insight(analyzer_name: &str) -> Insight {
    Insight {
        source: analyzer_name.to_string(),
        overall_score: MOCK_OVERALL_SCORE,
        recommendations: vec![Recommendation {
            category: "system".to_string(),
            priority: Priority::Medium,
            issue: format!("{analyzer_name} unavailable"),
            solution: format!("Configure the {analyzer_name} analyzer for AI-powered analysis"),
            impact: "Could provide AI-powered UI analysis and CRO recommendations".to_string(),
            source: analyzer_name.to_string(),
        }],
        ..Insight::default()
    }
}

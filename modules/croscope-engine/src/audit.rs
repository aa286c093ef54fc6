//! Performance auditing via the Lighthouse CLI.
//!
//! Availability is probed once at construction with `lighthouse --version`.
//! Audits run as a subprocess with a hard deadline and parse the JSON output
//! for category scores and core web vitals. Every failure path yields `None`;
//! a missing audit only costs the framework scorer its performance findings.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use croscope_common::PerformanceMetrics;

use crate::traits::PerformanceAuditor;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const AUDIT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct LighthouseAuditor {
    available: bool,
}

impl LighthouseAuditor {
    /// Probe the CLI once. An unavailable Lighthouse still constructs a
    /// working auditor; it just answers `None` to every audit.
    pub async fn new() -> Self {
        let available = Self::probe().await;
        if available {
            info!("Lighthouse CLI detected");
        } else {
            info!("Lighthouse CLI not available, performance audits disabled");
        }
        Self { available }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    async fn probe() -> bool {
        let probe = Command::new("lighthouse").arg("--version").output();
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, probe).await,
            Ok(Ok(output)) if output.status.success()
        )
    }

    async fn run_lighthouse(&self, url: &str) -> Option<PerformanceMetrics> {
        let command = Command::new("lighthouse")
            .arg(url)
            .arg("--output=json")
            .arg("--chrome-flags=--headless --no-sandbox")
            .arg("--only-categories=performance,accessibility,best-practices,seo")
            .arg("--quiet")
            .output();

        let output = match tokio::time::timeout(AUDIT_TIMEOUT, command).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(url, error = %e, "Lighthouse execution failed");
                return None;
            }
            Err(_) => {
                warn!(url, "Lighthouse audit timed out");
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                url,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Lighthouse exited with failure"
            );
            return None;
        }

        match parse_lighthouse_json(&output.stdout) {
            Some(metrics) => {
                info!(
                    url,
                    performance = ?metrics.performance_score,
                    "Lighthouse audit completed"
                );
                Some(metrics)
            }
            None => {
                warn!(url, "Lighthouse output could not be parsed");
                None
            }
        }
    }
}

#[async_trait]
impl PerformanceAuditor for LighthouseAuditor {
    async fn audit(&self, url: &str) -> Option<PerformanceMetrics> {
        if !self.available {
            return None;
        }
        self.run_lighthouse(url).await
    }
}

fn parse_lighthouse_json(raw: &[u8]) -> Option<PerformanceMetrics> {
    let value: serde_json::Value = serde_json::from_slice(raw).ok()?;

    let category_score = |name: &str| -> Option<i64> {
        value["categories"][name]["score"]
            .as_f64()
            .map(|s| (s * 100.0) as i64)
    };
    let audit_value = |name: &str| -> Option<f64> { value["audits"][name]["numericValue"].as_f64() };

    Some(PerformanceMetrics {
        performance_score: category_score("performance"),
        accessibility_score: category_score("accessibility"),
        best_practices_score: category_score("best-practices"),
        seo_score: category_score("seo"),
        first_contentful_paint_ms: audit_value("first-contentful-paint"),
        largest_contentful_paint_ms: audit_value("largest-contentful-paint"),
        total_blocking_time_ms: audit_value("total-blocking-time"),
        cumulative_layout_shift: audit_value("cumulative-layout-shift"),
        available: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lighthouse_report_json() {
        let raw = serde_json::json!({
            "categories": {
                "performance": { "score": 0.87 },
                "accessibility": { "score": 0.92 },
                "best-practices": { "score": 1.0 },
                "seo": { "score": 0.78 }
            },
            "audits": {
                "first-contentful-paint": { "numericValue": 1432.5 },
                "largest-contentful-paint": { "numericValue": 2710.0 },
                "total-blocking-time": { "numericValue": 120.0 },
                "cumulative-layout-shift": { "numericValue": 0.04 }
            }
        })
        .to_string();

        let metrics = parse_lighthouse_json(raw.as_bytes()).unwrap();
        assert_eq!(metrics.performance_score, Some(87));
        assert_eq!(metrics.accessibility_score, Some(92));
        assert_eq!(metrics.best_practices_score, Some(100));
        assert_eq!(metrics.seo_score, Some(78));
        assert_eq!(metrics.first_contentful_paint_ms, Some(1432.5));
        assert_eq!(metrics.cumulative_layout_shift, Some(0.04));
        assert!(metrics.available);
    }

    #[test]
    fn malformed_output_yields_none() {
        assert!(parse_lighthouse_json(b"not json").is_none());
        assert!(parse_lighthouse_json(b"").is_none());
    }

    #[test]
    fn missing_categories_degrade_to_none_fields() {
        let raw = br#"{"categories": {}, "audits": {}}"#;
        let metrics = parse_lighthouse_json(raw).unwrap();
        assert!(metrics.performance_score.is_none());
        assert!(metrics.first_contentful_paint_ms.is_none());
        assert!(metrics.available);
    }
}

//! The analysis engine: URL validation, cache-first lookup, singleflight
//! computation, and the collect → score → merge → build pipeline.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use url::Url;

use croscope_common::{
    AnalysisReport, AnalysisRequest, CroscopeError, EngineConfig, Insight, Priority,
    Recommendation,
};

use crate::cache::ReportCache;
use crate::collector::{CollectedData, Collector};
use crate::framework::{self, FRAMEWORK_SOURCE};
use crate::merge::merge_insights;
use crate::pool::AnalyzerPool;
use crate::report::build_report;
use crate::traits::{PageRenderer, PerformanceAuditor, PersistenceSink};

pub struct AnalysisEngine {
    collector: Collector,
    pool: AnalyzerPool,
    cache: ReportCache,
    sink: Option<Arc<dyn PersistenceSink>>,
    config: EngineConfig,
}

impl AnalysisEngine {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        auditor: Option<Arc<dyn PerformanceAuditor>>,
        pool: AnalyzerPool,
        cache: ReportCache,
        sink: Option<Arc<dyn PersistenceSink>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            collector: Collector::new(renderer, auditor, config.collector_timeout),
            pool,
            cache,
            sink,
            config,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        self.analyze_website(&request.url, request.client_name.as_deref())
            .await
    }

    /// Analyze a page, serving from cache when possible. Concurrent calls for
    /// the same URL coalesce into a single computation.
    pub async fn analyze_website(
        &self,
        url: &str,
        client_name: Option<&str>,
    ) -> Result<AnalysisReport> {
        let url = normalize_url(url)?;
        info!(url = %url, client = client_name.unwrap_or("-"), "Analysis requested");

        if let Some(report) = self.cache.get(&url).await {
            info!(url = %url, "Serving cached report");
            return Ok(report);
        }

        let run = self
            .cache
            .get_or_compute(&url, || self.run_analysis(url.clone()));

        match self.config.overall_deadline {
            Some(deadline) => tokio::time::timeout(deadline, run).await.map_err(|_| {
                anyhow::Error::from(CroscopeError::DeadlineExceeded(deadline.as_millis() as u64))
            })?,
            None => run.await,
        }
    }

    pub async fn get_cached_report(&self, url: &str) -> Result<Option<AnalysisReport>> {
        let url = normalize_url(url)?;
        Ok(self.cache.get(&url).await)
    }

    pub async fn invalidate_cache(&self, url: &str) -> Result<()> {
        let url = normalize_url(url)?;
        self.cache.invalidate(&url).await;
        Ok(())
    }

    /// Analysis methods that contribute to reports under the current
    /// configuration.
    pub fn models_used(&self) -> Vec<String> {
        let mut models = Vec::new();
        if self.config.framework_enabled {
            models.push(FRAMEWORK_SOURCE.to_string());
        }
        models.extend(self.pool.names());
        models
    }

    async fn run_analysis(&self, url: String) -> Result<AnalysisReport> {
        let data = self.collector.collect(&url).await;

        let mut insights = Vec::new();
        if self.config.framework_enabled {
            insights.push(framework::score_page(
                &data.html,
                &url,
                &data.elements,
                data.performance.as_ref(),
            ));
        }
        insights.extend(
            self.pool
                .run(&data.desktop_screenshot, &data.elements)
                .await,
        );

        if insights.is_empty() {
            warn!(url = %url, "No analysis source available, using fallback insight");
            insights.push(fallback_insight(&data));
        }

        let merged = merge_insights(insights);
        let report = build_report(
            &url,
            merged,
            data.elements,
            self.models_used(),
            self.config.max_recommendations,
        );

        self.cache.put(&url, &report).await;

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.store(&report).await {
                warn!(url = %url, error = %e, "Report persistence failed");
            }
        }

        info!(url = %url, score = report.overall_score, "Analysis completed");
        Ok(report)
    }
}

/// Validate and normalize a URL. Only http and https pages are analyzable.
fn normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| CroscopeError::Validation(format!("invalid URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        scheme => {
            Err(CroscopeError::Validation(format!("unsupported URL scheme {scheme:?}")).into())
        }
    }
}

/// Element-informed default insight for a fully degraded run: no framework,
/// no analyzers. Carries fixed conservative scores and flags the degradation
/// as a top-level issue.
fn fallback_insight(data: &CollectedData) -> Insight {
    let mut recommendations = Vec::new();

    if data.elements.trust_signals.is_empty() {
        recommendations.push(Recommendation {
            category: "psychological".to_string(),
            priority: Priority::High,
            issue: "No trust signals detected".to_string(),
            solution: "Add security badges, testimonials, or guarantees above the fold".to_string(),
            impact: "Could increase conversions by 15-20%".to_string(),
            source: "fallback".to_string(),
        });
    }
    if data.elements.cta_buttons.len() < 2 {
        recommendations.push(Recommendation {
            category: "information".to_string(),
            priority: Priority::High,
            issue: "Insufficient call-to-action buttons".to_string(),
            solution: "Add more prominent CTA buttons with action-oriented text".to_string(),
            impact: "Could increase conversions by 10-15%".to_string(),
            source: "fallback".to_string(),
        });
    }
    if data.elements.product_images.len() < 2 {
        recommendations.push(Recommendation {
            category: "information".to_string(),
            priority: Priority::Medium,
            issue: "Limited product images".to_string(),
            solution: "Add multiple high-quality product images with alt text".to_string(),
            impact: "Could improve engagement by 8-12%".to_string(),
            source: "fallback".to_string(),
        });
    }

    let mut insight = Insight {
        source: "fallback".to_string(),
        overall_score: 70,
        recommendations,
        issues: vec!["No analysis source available".to_string()],
        ..Insight::default()
    };
    for (category, score) in [
        ("navigation", 65),
        ("display", 70),
        ("information", 60),
        ("technical", 75),
        ("psychological", 70),
        ("product_page", 65),
        ("cart_page", 70),
        ("mobile", 65),
        ("trust_signals", 70),
        ("coupons", 55),
        ("delivery", 75),
    ] {
        insight.category_scores.insert(category.to_string(), score);
    }
    insight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_and_https_urls_are_accepted() {
        assert!(normalize_url("https://shop.example/page").is_ok());
        assert!(normalize_url("http://shop.example").is_ok());
        assert!(normalize_url("ftp://shop.example").is_err());
        assert!(normalize_url("file:///etc/passwd").is_err());
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("shop.example/page").is_err());
    }

    #[test]
    fn normalization_is_stable() {
        let a = normalize_url("https://shop.example/page").unwrap();
        let b = normalize_url("  https://shop.example/page  ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_insight_flags_missing_elements() {
        let insight = fallback_insight(&CollectedData::default());

        assert_eq!(insight.overall_score, 70);
        assert!(insight.issues.contains(&"No analysis source available".to_string()));
        let categories: Vec<&str> = insight
            .recommendations
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert!(categories.contains(&"psychological"));
        assert!(categories.contains(&"information"));
    }
}

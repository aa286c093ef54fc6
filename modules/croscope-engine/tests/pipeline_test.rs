//! End-to-end pipeline tests over mock collaborators: no network, no
//! database, no browser.

use std::sync::Arc;
use std::time::Duration;

use croscope_common::{CroscopeError, EngineConfig, Priority};
use croscope_engine::cache::ReportCache;
use croscope_engine::pool::AnalyzerPool;
use croscope_engine::testing::{ai_insight, recommendation, MockAnalyzer, MockRenderer, MockSink};
use croscope_engine::traits::{PageRenderer, VisionAnalyzer};
use croscope_engine::AnalysisEngine;

const SHOP_PAGE: &str = r#"
    <html><head><meta name="viewport" content="width=device-width"></head><body>
    <nav class="breadcrumb"><a href="/">Home</a></nav>
    <h1>Blue Widget</h1>
    <div class="product-description">Sturdy widget, 30-day guarantee.</div>
    <img src="/product-1.jpg" alt="front" class="product-photo">
    <img src="/product-2.jpg" alt="back" class="product-photo">
    <button class="btn primary">Buy now</button>
    <div class="trust-badge">Verified secure checkout</div>
    <span class="testimonial">Great shop!</span>
    </body></html>
"#;

fn engine_config() -> EngineConfig {
    EngineConfig {
        collector_timeout: Duration::from_secs(2),
        analyzer_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    }
}

fn build_engine(
    renderer: Arc<MockRenderer>,
    analyzers: Vec<MockAnalyzer>,
    sink: Option<Arc<MockSink>>,
    config: EngineConfig,
) -> AnalysisEngine {
    let pool = AnalyzerPool::new(
        analyzers
            .into_iter()
            .map(|a| Arc::new(a) as Arc<dyn VisionAnalyzer>)
            .collect(),
        config.analyzer_timeout,
    );
    let cache = ReportCache::new(None, config.cache_ttl);
    AnalysisEngine::new(
        renderer as Arc<dyn PageRenderer>,
        None,
        pool,
        cache,
        sink.map(|s| s as _),
        config,
    )
}

#[tokio::test]
async fn framework_only_analysis_produces_full_report() {
    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(renderer.clone(), vec![], None, engine_config());

    let report = engine
        .analyze_website("https://shop.example/widget", Some("acme"))
        .await
        .unwrap();

    assert_eq!(report.url, "https://shop.example/widget");
    assert!(report.overall_score >= 70 && report.overall_score <= 100);
    assert!(report.visual_analysis.is_framework_like());
    assert_eq!(report.element_analysis.cta_buttons.len(), 1);
    assert_eq!(report.models_used, vec!["cro-framework".to_string()]);
    // desktop + mobile screenshots, one HTML fetch
    assert_eq!(renderer.captures(), 2);
    assert_eq!(renderer.content_fetches(), 1);
}

#[tokio::test]
async fn concurrent_requests_for_same_url_compute_once() {
    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = Arc::new(build_engine(
        renderer.clone(),
        vec![],
        None,
        engine_config(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .analyze_website("https://shop.example/", None)
                .await
                .unwrap()
        }));
    }
    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.unwrap());
    }

    assert!(reports.iter().all(|r| r.id == reports[0].id));
    assert_eq!(renderer.content_fetches(), 1);
    assert_eq!(renderer.captures(), 2);
}

#[tokio::test]
async fn second_sequential_request_is_served_from_cache() {
    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(renderer.clone(), vec![], None, engine_config());

    let first = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();
    let second = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(renderer.content_fetches(), 1);
}

#[tokio::test]
async fn invalidation_forces_a_fresh_analysis() {
    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(renderer.clone(), vec![], None, engine_config());

    let first = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();
    engine.invalidate_cache("https://shop.example/").await.unwrap();
    assert!(engine
        .get_cached_report("https://shop.example/")
        .await
        .unwrap()
        .is_none());

    let second = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(renderer.content_fetches(), 2);
}

#[tokio::test]
async fn fully_degraded_run_still_returns_a_report() {
    // Framework disabled, no analyzers, renderer failing everything.
    let renderer = Arc::new(MockRenderer::new("").failing_capture().failing_content());
    let config = EngineConfig {
        framework_enabled: false,
        ..engine_config()
    };
    let engine = build_engine(renderer, vec![], None, config);

    let report = engine
        .analyze_website("https://down.example/", None)
        .await
        .unwrap();

    assert!(report
        .visual_analysis
        .issues
        .contains(&"No analysis source available".to_string()));
    assert!(report.overall_score >= 0 && report.overall_score <= 100);
    assert_eq!(report.category_scores.product_page, 65);
    assert_eq!(report.category_scores.cart_page, 70);
    assert_eq!(report.category_scores.mobile, 65);
    assert_eq!(report.category_scores.trust_signals, 70);
    assert_eq!(report.category_scores.coupons, 55);
    assert_eq!(report.category_scores.delivery, 75);
    assert!(report.element_analysis.is_empty());
}

#[tokio::test]
async fn out_of_range_analyzer_scores_are_clamped() {
    let config = EngineConfig {
        framework_enabled: false,
        ..engine_config()
    };

    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(
        renderer,
        vec![MockAnalyzer::new(
            "wild",
            ai_insight("wild", 250, &[("layout", 250)]),
        )],
        None,
        config.clone(),
    );
    let report = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();
    assert_eq!(report.overall_score, 100);

    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(
        renderer,
        vec![MockAnalyzer::new(
            "gloomy",
            ai_insight("gloomy", -50, &[("layout", -50)]),
        )],
        None,
        config,
    );
    let report = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();
    assert_eq!(report.overall_score, 0);
}

#[tokio::test]
async fn recommendations_are_ranked_high_first_then_category() {
    let mut insight = ai_insight("claude-vision", 70, &[("layout", 70)]);
    insight.recommendations.extend([
        recommendation("delta", Priority::Low, "minor polish"),
        recommendation("beta", Priority::High, "broken checkout"),
        recommendation("gamma", Priority::Medium, "weak copy"),
        recommendation("alpha", Priority::High, "no trust signals"),
    ]);
    let config = EngineConfig {
        framework_enabled: false,
        ..engine_config()
    };
    let engine = build_engine(
        Arc::new(MockRenderer::new(SHOP_PAGE)),
        vec![MockAnalyzer::new("claude-vision", insight)],
        None,
        config,
    );

    let report = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();

    let order: Vec<(&str, Priority)> = report
        .recommendations
        .iter()
        .map(|r| (r.category.as_str(), r.priority))
        .collect();
    assert_eq!(
        order,
        vec![
            ("alpha", Priority::High),
            ("beta", Priority::High),
            ("gamma", Priority::Medium),
            ("delta", Priority::Low),
        ]
    );
}

#[tokio::test]
async fn framework_base_absorbs_analyzer_issues() {
    let mut insight = ai_insight("claude-vision", 55, &[("layout", 55)]);
    insight.issues.push("Cluttered hero section".to_string());
    let engine = build_engine(
        Arc::new(MockRenderer::new(SHOP_PAGE)),
        vec![MockAnalyzer::new("claude-vision", insight)],
        None,
        engine_config(),
    );

    let report = engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();

    assert!(report.visual_analysis.is_framework_like());
    assert!(report
        .visual_analysis
        .issues
        .contains(&"Cluttered hero section".to_string()));
    assert_eq!(
        report.visual_analysis.issues[0],
        "Comprehensive analysis using 2 methods"
    );
    assert_eq!(
        report.models_used,
        vec!["cro-framework".to_string(), "claude-vision".to_string()]
    );
}

#[tokio::test]
async fn reports_flow_to_the_sink_and_sink_failure_is_tolerated() {
    let sink = Arc::new(MockSink::new());
    let engine = build_engine(
        Arc::new(MockRenderer::new(SHOP_PAGE)),
        vec![],
        Some(sink.clone()),
        engine_config(),
    );
    engine
        .analyze_website("https://shop.example/", None)
        .await
        .unwrap();
    assert_eq!(sink.stored_count(), 1);
    assert_eq!(sink.stored_urls(), vec!["https://shop.example/".to_string()]);

    let failing = Arc::new(MockSink::new().failing());
    let engine = build_engine(
        Arc::new(MockRenderer::new(SHOP_PAGE)),
        vec![],
        Some(failing.clone()),
        engine_config(),
    );
    let report = engine
        .analyze_website("https://shop.example/", None)
        .await;
    assert!(report.is_ok());
    assert_eq!(failing.stored_count(), 0);
}

#[tokio::test]
async fn exceeded_deadline_fails_the_call_and_caches_nothing() {
    let config = EngineConfig {
        framework_enabled: false,
        analyzer_timeout: Duration::from_secs(30),
        overall_deadline: Some(Duration::from_millis(100)),
        ..engine_config()
    };
    let engine = build_engine(
        Arc::new(MockRenderer::new(SHOP_PAGE)),
        vec![MockAnalyzer::new("slow", ai_insight("slow", 80, &[])).hanging()],
        None,
        config,
    );

    let err = engine
        .analyze_website("https://slow.example/", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CroscopeError>(),
        Some(CroscopeError::DeadlineExceeded(100))
    ));
    assert!(engine
        .get_cached_report("https://slow.example/")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn invalid_urls_are_rejected_before_any_work() {
    let renderer = Arc::new(MockRenderer::new(SHOP_PAGE));
    let engine = build_engine(renderer.clone(), vec![], None, engine_config());

    assert!(engine.analyze_website("ftp://shop.example/", None).await.is_err());
    assert!(engine.analyze_website("not a url", None).await.is_err());
    assert_eq!(renderer.captures(), 0);
    assert_eq!(renderer.content_fetches(), 0);
}

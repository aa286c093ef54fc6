//! Rule-based 5-category CRO framework scorer.
//!
//! Each category starts at 100 and deducts per finding. The result is a
//! framework-like Insight: its category scores use the framework taxonomy,
//! which makes it the authoritative merge base downstream.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use croscope_common::{
    ElementData, FrameworkFeedback, Insight, PerformanceMetrics, Priority, Recommendation,
    FRAMEWORK_CATEGORIES,
};

pub const FRAMEWORK_SOURCE: &str = "cro-framework";

const MAX_FEEDBACK_LINES: usize = 4;
const MAX_ISSUES: usize = 10;
const MAX_MOBILE_ISSUES: usize = 5;

static BREADCRUMB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class\s*=\s*["'][^"']*breadcrumb[^"']*["']"#).unwrap()
});

static NAV_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:nav|header)\b[^>]*>(.*?)</(?:nav|header)>").unwrap()
});

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<a\b").unwrap());

static FONT_FAMILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)font-family:\s*([^;}]+)").unwrap());

static POSITIONED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)position:\s*(?:absolute|fixed)").unwrap());

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)color:\s*(#[0-9a-f]{6}|#[0-9a-f]{3}|rgb\([^)]+\))").unwrap()
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").unwrap());

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class\s*=\s*["'][^"']*(description|product-details|product-info)[^"']*["']"#)
        .unwrap()
});

static OFFER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class\s*=\s*["'][^"']*(offer|discount|coupon|promo|sale)[^"']*["']"#).unwrap()
});

static VIEWPORT_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*name\s*=\s*["']viewport["'][^>]*>"#).unwrap()
});

static RETURN_POLICY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)return|refund|guarantee").unwrap());

static FAQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)faq|frequently.{0,10}asked").unwrap());

static CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contact|support|help@|phone").unwrap());

static TAG_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Default)]
struct CategoryAnalysis {
    score: i64,
    issues: Vec<String>,
    recommendations: Vec<Recommendation>,
    strengths: Vec<String>,
    improvements: Vec<String>,
}

impl CategoryAnalysis {
    fn new() -> Self {
        Self {
            score: 100,
            ..Self::default()
        }
    }

    fn recommend(&mut self, category: &str, priority: Priority, issue: &str, solution: &str, impact: &str) {
        self.recommendations.push(Recommendation {
            category: category.to_string(),
            priority,
            issue: issue.to_string(),
            solution: solution.to_string(),
            impact: impact.to_string(),
            source: FRAMEWORK_SOURCE.to_string(),
        });
    }
}

/// Score a page against the five framework categories. Pure over its inputs.
pub fn score_page(
    html: &str,
    url: &str,
    elements: &ElementData,
    performance: Option<&PerformanceMetrics>,
) -> Insight {
    let analyses = [
        analyze_navigation(html, url),
        analyze_display(html),
        analyze_information(html, elements),
        analyze_technical(html, url, performance),
        analyze_psychological(html, elements),
    ];

    let overall = analyses.iter().map(|a| a.score).sum::<i64>() / analyses.len() as i64;

    let mut insight = Insight {
        source: FRAMEWORK_SOURCE.to_string(),
        overall_score: overall,
        performance: performance.cloned(),
        ..Insight::default()
    };

    let mut feedback = Vec::with_capacity(FRAMEWORK_CATEGORIES.len());
    for (category, analysis) in FRAMEWORK_CATEGORIES.iter().zip(analyses) {
        insight
            .category_scores
            .insert(category.to_string(), analysis.score.clamp(0, 100));

        feedback.push(FrameworkFeedback {
            category: category.to_string(),
            score: analysis.score.clamp(0, 100),
            strengths: cap(analysis.strengths, MAX_FEEDBACK_LINES),
            improvements: cap(analysis.improvements, MAX_FEEDBACK_LINES),
        });

        if *category == "technical" {
            insight.mobile_issues.extend(
                analysis
                    .issues
                    .iter()
                    .filter(|i| {
                        let lower = i.to_lowercase();
                        lower.contains("mobile") || lower.contains("viewport")
                    })
                    .cloned(),
            );
        }
        insight.issues.extend(analysis.issues);
        insight.recommendations.extend(analysis.recommendations);
    }

    insight.issues.truncate(MAX_ISSUES);
    insight.mobile_issues.truncate(MAX_MOBILE_ISSUES);
    insight.framework_feedback = Some(feedback);
    insight
}

fn cap(mut lines: Vec<String>, max: usize) -> Vec<String> {
    lines.truncate(max);
    lines
}

fn stripped_text(html: &str) -> String {
    TAG_STRIP_RE.replace_all(html, " ").into_owned()
}

// 1. NAVIGATIONAL: complexity, breadcrumbs, depth.
fn analyze_navigation(html: &str, url: &str) -> CategoryAnalysis {
    let mut a = CategoryAnalysis::new();

    if BREADCRUMB_RE.is_match(html) {
        a.strengths
            .push("Breadcrumb navigation present".to_string());
    } else {
        a.score -= 20;
        a.issues.push("No breadcrumb navigation found".to_string());
        a.improvements
            .push("Add breadcrumb navigation to improve user orientation".to_string());
        a.recommend(
            "navigation",
            Priority::Medium,
            "Missing breadcrumb navigation",
            "Add breadcrumb navigation to help users understand their location",
            "Could reduce bounce rate by 5-10%",
        );
    }

    let nav_count: usize = NAV_LINK_RE
        .captures_iter(html)
        .map(|cap| ANCHOR_RE.find_iter(&cap[1]).count())
        .sum();

    if nav_count <= 15 {
        a.strengths
            .push(format!("Navigation menu is manageable with {nav_count} links"));
    } else {
        a.score -= 15;
        a.issues
            .push(format!("Too many navigation links ({nav_count})"));
        a.improvements
            .push(format!("Reduce navigation from {nav_count} to 10-12 main links"));
        a.recommend(
            "navigation",
            Priority::Medium,
            &format!("Navigation has {nav_count} links"),
            "Simplify navigation to 7-12 main links, use dropdown menus for sub-items",
            "Could improve user experience and reduce cognitive load",
        );
    }

    let path_depth = Url::parse(url)
        .map(|u| u.path().split('/').filter(|s| !s.is_empty()).count())
        .unwrap_or(0);
    if path_depth <= 3 {
        a.strengths
            .push(format!("Page depth is {path_depth} levels"));
    } else {
        a.score -= 10;
        a.issues.push(format!("Page is {path_depth} levels deep"));
        a.improvements
            .push(format!("Reduce page depth from {path_depth} to 3 levels maximum"));
    }

    a
}

// 2. DISPLAY: fonts, positioning, color palette.
fn analyze_display(html: &str) -> CategoryAnalysis {
    let mut a = CategoryAnalysis::new();

    let generic = ["serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui"];
    let mut fonts = std::collections::HashSet::new();
    for cap in FONT_FAMILY_RE.captures_iter(html) {
        for family in cap[1].split(',').take(2) {
            let family = family.trim().trim_matches(['"', '\'']).to_lowercase();
            if !family.is_empty() && !generic.contains(&family.as_str()) {
                fonts.insert(family);
            }
        }
    }
    let font_count = fonts.len();
    if font_count <= 2 {
        a.strengths
            .push(format!("Font usage is consistent with {font_count} font families"));
    } else {
        a.score -= 20;
        a.issues.push(format!("Too many fonts used ({font_count})"));
        a.improvements
            .push(format!("Reduce fonts from {font_count} to 1-2 families"));
        a.recommend(
            "display",
            Priority::High,
            &format!("Using {font_count} different fonts"),
            "Limit to 1-2 font families for consistent design",
            "Could improve visual hierarchy and brand consistency",
        );
    }

    let positioned = POSITIONED_RE.find_iter(html).count();
    if positioned <= 5 {
        a.strengths
            .push("Layout uses minimal absolute positioning".to_string());
    } else {
        a.score -= 15;
        a.issues
            .push("Many absolutely positioned elements detected".to_string());
        a.improvements
            .push("Reduce absolute positioning to improve mobile compatibility".to_string());
    }

    let colors: std::collections::HashSet<String> = COLOR_RE
        .captures_iter(html)
        .map(|c| c[1].to_lowercase())
        .collect();
    if colors.len() <= 8 {
        a.strengths
            .push(format!("Color palette is cohesive with {} main colors", colors.len()));
    } else {
        a.score -= 10;
        a.improvements.push(format!(
            "Simplify color palette from {} to 4-6 main colors",
            colors.len()
        ));
    }

    a
}

// 3. INFORMATIONAL: titles, descriptions, images, offers.
fn analyze_information(html: &str, elements: &ElementData) -> CategoryAnalysis {
    let mut a = CategoryAnalysis::new();

    let titles: Vec<String> = TITLE_RE
        .captures_iter(html)
        .map(|c| stripped_text(&c[1]).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if !titles.is_empty() {
        let sampled = titles.iter().take(3).collect::<Vec<_>>();
        let avg_len = sampled.iter().map(|t| t.len()).sum::<usize>() / sampled.len();
        if avg_len <= 60 {
            a.strengths
                .push("Product titles are concise and readable".to_string());
        } else {
            a.score -= 10;
            a.improvements
                .push("Shorten product titles to under 60 characters".to_string());
        }
    }

    if DESCRIPTION_RE.is_match(html) {
        a.strengths
            .push("Product descriptions present".to_string());
    } else {
        a.score -= 25;
        a.issues.push("No product descriptions found".to_string());
        a.improvements
            .push("Add detailed product descriptions to build trust".to_string());
        a.recommend(
            "information",
            Priority::High,
            "Missing product descriptions",
            "Add detailed product descriptions (150-300 words) highlighting features and benefits",
            "Could increase conversions by 15-20%",
        );
    }

    let image_count = elements.product_images.len();
    if image_count >= 2 {
        a.strengths
            .push(format!("Good visual representation with {image_count} product images"));
    } else {
        a.score -= 20;
        a.issues
            .push(format!("Only {image_count} product image(s) found"));
        a.improvements.push(format!(
            "Increase product images from {image_count} to at least 4 high-quality images"
        ));
    }

    if OFFER_RE.is_match(html) {
        a.strengths
            .push("Promotional offers visible".to_string());
    } else {
        a.score -= 15;
        a.improvements
            .push("Add promotional offers or discount codes to incentivize purchase".to_string());
    }

    a
}

// 4. TECHNICAL: performance audit when available, static checks otherwise.
fn analyze_technical(
    html: &str,
    url: &str,
    performance: Option<&PerformanceMetrics>,
) -> CategoryAnalysis {
    let mut a = CategoryAnalysis::new();

    if let Some(metrics) = performance.filter(|m| m.available) {
        apply_performance(&mut a, metrics);
    }

    if VIEWPORT_META_RE.is_match(html) {
        a.strengths
            .push("Mobile viewport properly configured".to_string());
    } else {
        a.score -= 20;
        a.issues.push("No mobile viewport meta tag".to_string());
        a.improvements
            .push("Add viewport meta tag for mobile responsiveness".to_string());
        a.recommend(
            "technical",
            Priority::High,
            "No mobile viewport meta tag",
            "Add a viewport meta tag so the page renders correctly on mobile devices",
            "Mobile users currently see a desktop layout",
        );
    }

    if url.starts_with("https://") {
        a.strengths.push("Page is served over HTTPS".to_string());
    } else {
        a.score -= 15;
        a.issues.push("Page is not served over HTTPS".to_string());
        a.improvements
            .push("Serve the page over HTTPS to avoid browser warnings".to_string());
    }

    a
}

fn apply_performance(a: &mut CategoryAnalysis, metrics: &PerformanceMetrics) {
    if let Some(perf) = metrics.performance_score {
        if perf >= 90 {
            a.strengths
                .push(format!("Excellent performance score: {perf}/100"));
        } else if perf >= 75 {
            a.score -= 10;
            a.strengths
                .push(format!("Good performance score: {perf}/100"));
        } else if perf >= 50 {
            a.score -= 20;
            a.issues
                .push(format!("Average performance score: {perf}/100"));
            a.improvements
                .push("Optimize page performance to achieve a 90+ score".to_string());
        } else {
            a.score -= 30;
            a.issues.push(format!("Poor performance score: {perf}/100"));
            a.improvements
                .push("Critical performance issues need immediate attention".to_string());
        }
    }

    if let Some(fcp) = metrics.first_contentful_paint_ms {
        let fcp_s = fcp / 1000.0;
        if fcp_s < 1.8 {
            a.strengths
                .push(format!("Fast First Contentful Paint: {fcp_s:.2}s"));
        } else if fcp_s >= 3.0 {
            a.improvements.push(format!(
                "Reduce First Contentful Paint from {fcp_s:.2}s to under 1.8s"
            ));
        }
    }

    if let Some(lcp) = metrics.largest_contentful_paint_ms {
        let lcp_s = lcp / 1000.0;
        if lcp_s < 2.5 {
            a.strengths
                .push(format!("Good Largest Contentful Paint: {lcp_s:.2}s"));
        } else {
            a.improvements.push(format!(
                "Optimize Largest Contentful Paint from {lcp_s:.2}s to under 2.5s"
            ));
        }
    }

    if let Some(cls) = metrics.cumulative_layout_shift {
        if cls < 0.1 {
            a.strengths
                .push("Excellent visual stability (low layout shift)".to_string());
        } else if cls >= 0.25 {
            a.improvements.push(
                "Reduce layout shifts by specifying image dimensions and reserving ad space"
                    .to_string(),
            );
        }
    }
}

// 5. PSYCHOLOGICAL: trust, return policy, FAQ, contact.
fn analyze_psychological(html: &str, elements: &ElementData) -> CategoryAnalysis {
    let mut a = CategoryAnalysis::new();
    let text = stripped_text(html);

    let trust_count = elements.trust_signals.len();
    if trust_count >= 2 {
        a.strengths
            .push(format!("Trust signals present ({trust_count} found)"));
    } else {
        a.score -= 20;
        a.issues.push("Insufficient trust signals".to_string());
        a.improvements
            .push("Add security badges, payment icons, and trust seals".to_string());
        a.improvements
            .push("Display customer testimonials or reviews prominently".to_string());
    }

    if RETURN_POLICY_RE.is_match(&text) {
        a.strengths
            .push("Return/refund policy is mentioned".to_string());
    } else {
        a.score -= 15;
        a.improvements
            .push("Make return/refund policy clearly visible to build confidence".to_string());
    }

    if FAQ_RE.is_match(&text) {
        a.strengths.push("FAQ section present".to_string());
    } else {
        a.score -= 10;
        a.improvements
            .push("Add FAQ section to address common questions and concerns".to_string());
    }

    if CONTACT_RE.find_iter(&text).count() > 3 {
        a.strengths
            .push("Contact information is accessible".to_string());
    }

    a
}

//! Final report assembly from a merged insight.

use chrono::Utc;
use uuid::Uuid;

use croscope_common::{clamp_score, AnalysisReport, CategoryScores, ElementData, Insight};

const DEFAULT_LEGACY_SCORE: i64 = 75;

/// Framework category weights for the overall score. Missing categories are
/// excluded and the remaining weights re-normalized.
const CATEGORY_WEIGHTS: [(&str, f64); 5] = [
    ("navigation", 0.20),
    ("display", 0.15),
    ("information", 0.25),
    ("technical", 0.20),
    ("psychological", 0.20),
];

pub fn build_report(
    url: &str,
    merged: Insight,
    elements: ElementData,
    models_used: Vec<String>,
    max_recommendations: usize,
) -> AnalysisReport {
    let category_scores = map_legacy_scores(&merged);
    let overall_score = clamp_score(overall_score(&merged));

    let mut recommendations = merged.recommendations.clone();
    recommendations.sort_by(|a, b| {
        (a.priority.rank(), a.category.as_str()).cmp(&(b.priority.rank(), b.category.as_str()))
    });
    recommendations.truncate(max_recommendations);

    AnalysisReport {
        id: Uuid::new_v4(),
        url: url.to_string(),
        overall_score,
        category_scores,
        visual_analysis: merged,
        element_analysis: elements,
        recommendations,
        models_used,
        created_at: Utc::now(),
    }
}

/// Map whichever taxonomy the merged insight carries onto the fixed 6-key
/// legacy schema. Framework categories map through the rule table; any legacy
/// key present verbatim in the insight overrides the mapped value.
fn map_legacy_scores(merged: &Insight) -> CategoryScores {
    let scores = &merged.category_scores;
    let mut product_page = DEFAULT_LEGACY_SCORE;
    let mut cart_page = DEFAULT_LEGACY_SCORE;
    let mut mobile = DEFAULT_LEGACY_SCORE;
    let mut trust_signals = DEFAULT_LEGACY_SCORE;
    let mut coupons = DEFAULT_LEGACY_SCORE;
    let mut delivery = DEFAULT_LEGACY_SCORE;

    if let Some(&s) = scores.get("information") {
        product_page = s;
    }
    if let Some(&s) = scores.get("psychological") {
        trust_signals = s;
    }
    if let Some(&s) = scores.get("technical") {
        mobile = s;
    }
    // Navigation affects the purchase path, display affects both page views:
    // blended 50/50 with integer floor, in this order.
    if let Some(&s) = scores.get("navigation") {
        cart_page = (cart_page + s) / 2;
    }
    if let Some(&s) = scores.get("display") {
        product_page = (product_page + s) / 2;
        cart_page = (cart_page + s) / 2;
    }

    if let Some(&s) = scores.get("product_page") {
        product_page = s;
    }
    if let Some(&s) = scores.get("cart_page") {
        cart_page = s;
    }
    if let Some(&s) = scores.get("mobile") {
        mobile = s;
    }
    if let Some(&s) = scores.get("trust_signals") {
        trust_signals = s;
    }
    if let Some(&s) = scores.get("coupons") {
        coupons = s;
    }
    if let Some(&s) = scores.get("delivery") {
        delivery = s;
    }

    CategoryScores {
        product_page: clamp_score(product_page),
        cart_page: clamp_score(cart_page),
        mobile: clamp_score(mobile),
        trust_signals: clamp_score(trust_signals),
        coupons: clamp_score(coupons),
        delivery: clamp_score(delivery),
    }
}

/// Weighted over the framework categories when any are present, the merged
/// insight's own overall score otherwise.
fn overall_score(merged: &Insight) -> i64 {
    let present: Vec<(f64, i64)> = CATEGORY_WEIGHTS
        .iter()
        .filter_map(|(category, weight)| {
            merged
                .category_scores
                .get(*category)
                .map(|&score| (*weight, score))
        })
        .collect();

    if present.is_empty() {
        return merged.overall_score;
    }

    let weight_sum: f64 = present.iter().map(|(w, _)| w).sum();
    let weighted: f64 = present.iter().map(|(w, s)| w * *s as f64).sum();
    (weighted / weight_sum).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ai_insight, framework_insight, recommendation};
    use croscope_common::Priority;

    #[test]
    fn framework_categories_map_onto_legacy_schema() {
        // navigation 80, display 60, information 90, technical 70, psychological 85
        let merged = framework_insight([80, 60, 90, 70, 85]);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);

        // information 90, then display blend: (90 + 60) / 2
        assert_eq!(report.category_scores.product_page, 75);
        // navigation blend (75 + 80) / 2 = 77, then display blend (77 + 60) / 2
        assert_eq!(report.category_scores.cart_page, 68);
        assert_eq!(report.category_scores.mobile, 70);
        assert_eq!(report.category_scores.trust_signals, 85);
        assert_eq!(report.category_scores.coupons, 75);
        assert_eq!(report.category_scores.delivery, 75);
    }

    #[test]
    fn verbatim_legacy_keys_override_mapping() {
        let mut merged = framework_insight([80, 60, 90, 70, 85]);
        merged.category_scores.insert("coupons".to_string(), 40);
        merged.category_scores.insert("product_page".to_string(), 97);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);

        assert_eq!(report.category_scores.coupons, 40);
        assert_eq!(report.category_scores.product_page, 97);
    }

    #[test]
    fn overall_is_weighted_when_framework_present() {
        let merged = framework_insight([80, 60, 90, 70, 85]);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);

        // 80*.20 + 60*.15 + 90*.25 + 70*.20 + 85*.20 = 78.5 → 79
        assert_eq!(report.overall_score, 79);
    }

    #[test]
    fn weights_renormalize_over_present_subset() {
        let mut merged = ai_insight("a", 10, &[]);
        merged.category_scores.insert("navigation".to_string(), 80);
        merged.category_scores.insert("information".to_string(), 90);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);

        // (80*.20 + 90*.25) / .45 = 85.55… → 86
        assert_eq!(report.overall_score, 86);
    }

    #[test]
    fn overall_falls_back_to_merged_score_without_framework() {
        let merged = ai_insight("a", 64, &[("layout", 64)]);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);
        assert_eq!(report.overall_score, 64);
    }

    #[test]
    fn scores_clamp_to_valid_range() {
        let mut merged = ai_insight("a", 250, &[]);
        merged.category_scores.insert("information".to_string(), 180);
        merged.category_scores.insert("psychological".to_string(), -30);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 15);

        assert_eq!(report.category_scores.product_page, 100);
        assert_eq!(report.category_scores.trust_signals, 0);
        assert!(report.overall_score <= 100 && report.overall_score >= 0);
    }

    #[test]
    fn recommendations_sort_by_priority_then_category_and_truncate() {
        let mut merged = ai_insight("a", 70, &[]);
        merged.recommendations.extend([
            recommendation("zeta", Priority::Low, "low issue"),
            recommendation("beta", Priority::High, "second high"),
            recommendation("gamma", Priority::Medium, "medium issue"),
            recommendation("alpha", Priority::High, "first high"),
        ]);
        let report = build_report("https://shop.example/", merged, ElementData::default(), vec![], 3);

        let order: Vec<&str> = report
            .recommendations
            .iter()
            .map(|r| r.category.as_str())
            .collect();
        assert_eq!(order, ["alpha", "beta", "gamma"]);
    }
}

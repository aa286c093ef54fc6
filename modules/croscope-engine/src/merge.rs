//! Insight combination.
//!
//! A framework-like insight (category scores touching the framework taxonomy)
//! is authoritative: its scores pass through verbatim and AI insights only
//! enrich issues and recommendations around it. Without one, AI insights are
//! averaged per category. All dedup is order-preserving so output is
//! deterministic for a given input order.

use std::collections::BTreeMap;

use croscope_common::{Insight, Priority, Recommendation};

/// Coverage note per framework category, appended after merging.
const COVERAGE_NOTES: [(&str, &str); 5] = [
    ("navigation", "Navigation structure analyzed"),
    ("display", "Visual design elements checked"),
    ("information", "Content completeness verified"),
    ("technical", "Technical performance assessed"),
    ("psychological", "User psychology factors evaluated"),
];

/// Merge insights from all sources into one. A single insight passes through
/// unchanged. Callers guarantee at least one insight.
pub fn merge_insights(mut insights: Vec<Insight>) -> Insight {
    if insights.len() == 1 {
        return insights.remove(0);
    }
    let source_count = insights.len();

    // First framework-like insight is the base; any others fold in as AI-like.
    let mut framework: Option<Insight> = None;
    let mut ai: Vec<Insight> = Vec::new();
    for insight in insights {
        if framework.is_none() && insight.is_framework_like() {
            framework = Some(insight);
        } else {
            ai.push(insight);
        }
    }

    let mut combined = match framework {
        Some(base) => enhance_framework(base, ai),
        None => combine_ai(ai),
    };

    add_meta_issues(&mut combined, source_count);
    combined
}

/// Framework scores stay verbatim; AI insights contribute issues and
/// selectively recommendations.
fn enhance_framework(mut base: Insight, ai: Vec<Insight>) -> Insight {
    for insight in ai {
        base.issues.extend(insight.issues);
        base.mobile_issues.extend(insight.mobile_issues);

        for rec in insight.recommendations {
            let category_covered = base
                .recommendations
                .iter()
                .any(|r| r.category == rec.category);
            if !category_covered || rec.priority == Priority::High {
                base.recommendations.push(rec);
            }
        }
    }

    dedup_strings(&mut base.issues);
    dedup_strings(&mut base.mobile_issues);
    base
}

/// Integer-floor averaging per category over the insights that define it,
/// and for the overall score.
fn combine_ai(ai: Vec<Insight>) -> Insight {
    if ai.len() == 1 {
        let mut only = ai;
        return only.remove(0);
    }

    let mut combined = Insight {
        source: "combined".to_string(),
        ..Insight::default()
    };

    let mut totals: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    let mut overall_total = 0;
    for insight in &ai {
        overall_total += insight.overall_score;
        for (category, score) in &insight.category_scores {
            let entry = totals.entry(category.clone()).or_insert((0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    combined.overall_score = overall_total / ai.len() as i64;
    for (category, (total, count)) in totals {
        combined.category_scores.insert(category, total / count);
    }

    for insight in ai {
        for rec in insight.recommendations {
            merge_recommendation(&mut combined.recommendations, rec);
        }
        combined.issues.extend(insight.issues);
        combined.mobile_issues.extend(insight.mobile_issues);
        if combined.performance.is_none() {
            combined.performance = insight.performance;
        }
    }

    dedup_strings(&mut combined.issues);
    dedup_strings(&mut combined.mobile_issues);
    combined
}

/// Dedup by (category, issue), first occurrence wins its text; a later High
/// duplicate raises the kept recommendation's priority.
fn merge_recommendation(recs: &mut Vec<Recommendation>, rec: Recommendation) {
    match recs
        .iter_mut()
        .find(|r| r.category == rec.category && r.issue == rec.issue)
    {
        Some(existing) => {
            if rec.priority == Priority::High {
                existing.priority = Priority::High;
            }
        }
        None => recs.push(rec),
    }
}

fn dedup_strings(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Summary line at the front when multiple sources contributed, coverage
/// notes for every framework category actually analyzed at the end.
fn add_meta_issues(insight: &mut Insight, source_count: usize) {
    if source_count >= 2 {
        insight.issues.insert(
            0,
            format!("Comprehensive analysis using {source_count} methods"),
        );
    }
    for (category, note) in COVERAGE_NOTES {
        if insight.category_scores.contains_key(category) {
            insight.issues.push(note.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ai_insight, framework_insight, recommendation};

    #[test]
    fn single_insight_passes_through_unchanged() {
        let insight = ai_insight("claude-vision", 82, &[("layout", 70)]);
        let merged = merge_insights(vec![insight.clone()]);
        assert_eq!(merged.overall_score, 82);
        assert_eq!(merged.source, "claude-vision");
        assert!(merged.issues.is_empty());
    }

    #[test]
    fn ai_scores_floor_average_per_category() {
        let a = ai_insight("a", 80, &[("layout", 80), ("copy", 90)]);
        let b = ai_insight("b", 60, &[("layout", 60)]);
        let merged = merge_insights(vec![a, b]);

        assert_eq!(merged.overall_score, 70);
        assert_eq!(merged.category_scores["layout"], 70);
        // only one insight defines "copy"
        assert_eq!(merged.category_scores["copy"], 90);

        let c = ai_insight("a", 81, &[("layout", 81)]);
        let d = ai_insight("b", 60, &[("layout", 60)]);
        let merged = merge_insights(vec![c, d]);
        assert_eq!(merged.overall_score, 70);
        assert_eq!(merged.category_scores["layout"], 70);
    }

    #[test]
    fn framework_scores_survive_verbatim() {
        let fw = framework_insight([90, 85, 80, 75, 70]);
        let ai = ai_insight("claude-vision", 20, &[("layout", 10)]);
        let merged = merge_insights(vec![ai, fw.clone()]);

        assert_eq!(merged.overall_score, fw.overall_score);
        assert_eq!(merged.category_scores["navigation"], 90);
        assert!(!merged.category_scores.contains_key("layout"));
    }

    #[test]
    fn ai_recommendations_join_only_for_uncovered_categories_or_high() {
        let mut fw = framework_insight([90, 85, 80, 75, 70]);
        fw.recommendations
            .push(recommendation("navigation", Priority::Medium, "Deep menus"));

        let mut ai = ai_insight("claude-vision", 60, &[("layout", 60)]);
        ai.recommendations.extend([
            recommendation("navigation", Priority::Low, "Confusing labels"),
            recommendation("navigation", Priority::High, "Broken back button"),
            recommendation("copy", Priority::Low, "Vague headline"),
        ]);

        let merged = merge_insights(vec![fw, ai]);
        let issues: Vec<&str> = merged
            .recommendations
            .iter()
            .map(|r| r.issue.as_str())
            .collect();

        assert!(issues.contains(&"Deep menus"));
        assert!(issues.contains(&"Broken back button")); // high joins covered category
        assert!(issues.contains(&"Vague headline")); // uncovered category joins
        assert!(!issues.contains(&"Confusing labels")); // low into covered category drops
    }

    #[test]
    fn duplicate_recommendation_raises_to_high() {
        let mut a = ai_insight("a", 70, &[("layout", 70)]);
        a.recommendations
            .push(recommendation("layout", Priority::Low, "Cluttered hero"));
        let mut b = ai_insight("b", 70, &[("layout", 70)]);
        b.recommendations
            .push(recommendation("layout", Priority::High, "Cluttered hero"));

        let merged = merge_insights(vec![a, b]);
        assert_eq!(merged.recommendations.len(), 1);
        assert_eq!(merged.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn issues_dedup_exact_text_and_gain_meta_lines() {
        let mut fw = framework_insight([90, 85, 80, 75, 70]);
        fw.issues.push("Low contrast CTA".to_string());
        let mut ai = ai_insight("claude-vision", 60, &[("layout", 60)]);
        ai.issues.push("Low contrast CTA".to_string());
        ai.issues.push("Missing alt text".to_string());

        let merged = merge_insights(vec![fw, ai]);

        assert_eq!(merged.issues[0], "Comprehensive analysis using 2 methods");
        assert_eq!(
            merged
                .issues
                .iter()
                .filter(|i| i.as_str() == "Low contrast CTA")
                .count(),
            1
        );
        // one coverage note per framework category
        for (_, note) in COVERAGE_NOTES {
            assert!(merged.issues.iter().any(|i| i == note));
        }
    }

    #[test]
    fn score_merge_is_order_independent() {
        let a = ai_insight("a", 80, &[("layout", 80)]);
        let b = ai_insight("b", 61, &[("layout", 61)]);
        let ab = merge_insights(vec![a.clone(), b.clone()]);
        let ba = merge_insights(vec![b, a]);

        assert_eq!(ab.overall_score, ba.overall_score);
        assert_eq!(ab.category_scores, ba.category_scores);
    }
}

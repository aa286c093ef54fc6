//! Response parsing for vision analyzer output.
//!
//! Primary path: the model is asked for a strict JSON envelope; we extract
//! the outermost JSON object and deserialize it. Fallback path: when strict
//! parsing fails, a line-scanning extractor salvages recommendation- and
//! issue-flavored lines so a malformed response still yields an insight.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use croscope_common::{Insight, Priority, Recommendation};

/// Conservative score used when the response could not be parsed strictly.
const FALLBACK_SCORE: i64 = 70;

const FALLBACK_MAX_RECOMMENDATIONS: usize = 5;
const FALLBACK_MAX_ISSUES: usize = 5;
const FALLBACK_MAX_MOBILE_ISSUES: usize = 3;

// --- Strict JSON envelope ---

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_overall")]
    overall_score: i64,
    #[serde(default)]
    category_scores: BTreeMap<String, i64>,
    #[serde(default)]
    recommendations: Vec<EnvelopeRecommendation>,
    #[serde(default)]
    visual_issues: Vec<String>,
    #[serde(default)]
    mobile_issues: Vec<String>,
}

fn default_overall() -> i64 {
    75
}

#[derive(Debug, Deserialize)]
struct EnvelopeRecommendation {
    #[serde(default = "default_category")]
    category: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    solution: String,
    #[serde(default)]
    impact: String,
}

fn default_category() -> String {
    "general".to_string()
}

/// Parse an analyzer response into an [`Insight`] tagged with `source`.
/// Never fails: falls back to text scanning when strict parsing does.
pub fn parse_insight(response: &str, source: &str) -> Insight {
    match parse_strict(response, source) {
        Ok(insight) => insight,
        Err(e) => {
            warn!(source, error = %e, "Strict JSON parse failed, using text fallback");
            parse_fallback(response, source)
        }
    }
}

/// Strict path: outermost JSON object, deserialized as the envelope.
fn parse_strict(response: &str, source: &str) -> anyhow::Result<Insight> {
    let start = response
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("no JSON object in response"))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| anyhow::anyhow!("no JSON object in response"))?;
    if end < start {
        anyhow::bail!("no JSON object in response");
    }

    let envelope: Envelope = serde_json::from_str(&response[start..=end])?;

    let recommendations = envelope
        .recommendations
        .into_iter()
        .map(|rec| Recommendation {
            category: rec.category,
            priority: rec.priority.unwrap_or(Priority::Medium),
            issue: rec.issue,
            solution: rec.solution,
            impact: rec.impact,
            source: source.to_string(),
        })
        .collect();

    Ok(Insight {
        source: source.to_string(),
        overall_score: envelope.overall_score,
        category_scores: envelope.category_scores,
        recommendations,
        issues: envelope.visual_issues,
        mobile_issues: envelope.mobile_issues,
        framework_feedback: None,
        performance: None,
    })
}

/// Fallback path: scan lines for recommendation and issue patterns.
fn parse_fallback(response: &str, source: &str) -> Insight {
    let mut recommendations = Vec::new();
    let mut issues = Vec::new();
    let mut mobile_issues = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();

        if ["recommend", "should", "could", "improve"]
            .iter()
            .any(|w| lower.contains(w))
        {
            recommendations.push(Recommendation {
                category: "general".to_string(),
                priority: Priority::Medium,
                issue: "Identified improvement opportunity".to_string(),
                solution: line.to_string(),
                impact: "Could improve conversion rate".to_string(),
                source: source.to_string(),
            });
        }

        if ["issue", "problem", "missing", "unclear"]
            .iter()
            .any(|w| lower.contains(w))
        {
            if lower.contains("mobile") {
                mobile_issues.push(line.to_string());
            } else {
                issues.push(line.to_string());
            }
        }
    }

    recommendations.truncate(FALLBACK_MAX_RECOMMENDATIONS);
    issues.truncate(FALLBACK_MAX_ISSUES);
    mobile_issues.truncate(FALLBACK_MAX_MOBILE_ISSUES);

    Insight {
        source: source.to_string(),
        overall_score: FALLBACK_SCORE,
        category_scores: BTreeMap::new(),
        recommendations,
        issues,
        mobile_issues,
        framework_feedback: None,
        performance: None,
    }
}

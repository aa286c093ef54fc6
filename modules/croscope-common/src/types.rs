use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five framework categories. An insight whose category scores touch any
/// of these is treated as the authoritative merge base.
pub const FRAMEWORK_CATEGORIES: [&str; 5] = [
    "navigation",
    "display",
    "information",
    "technical",
    "psychological",
];

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub url: String,
    pub client_name: Option<String>,
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

// --- Extracted page elements ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementPosition {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageElement {
    pub kind: String,
    pub text: String,
    pub position: ElementPosition,
    pub visible: bool,
    /// 0-100 heuristic sub-score for this element.
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSignal {
    pub kind: String,
    pub text: String,
    pub position: ElementPosition,
    pub visible: bool,
    pub effectiveness: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtaButton {
    pub text: String,
    pub position: ElementPosition,
    pub prominent: bool,
    pub persuasiveness: i64,
}

/// Heuristic element extraction for one rendered page. Every list defaults
/// to empty so a failed extraction degrades to `ElementData::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementData {
    pub trust_signals: Vec<TrustSignal>,
    pub cta_buttons: Vec<CtaButton>,
    pub forms: Vec<PageElement>,
    pub cart_elements: Vec<PageElement>,
    pub product_images: Vec<PageElement>,
    pub coupon_fields: Vec<PageElement>,
    pub delivery_info: Vec<PageElement>,
}

impl ElementData {
    pub fn is_empty(&self) -> bool {
        self.trust_signals.is_empty()
            && self.cta_buttons.is_empty()
            && self.forms.is_empty()
            && self.cart_elements.is_empty()
            && self.product_images.is_empty()
            && self.coupon_fields.is_empty()
            && self.delivery_info.is_empty()
    }
}

// --- Insights ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub priority: Priority,
    pub issue: String,
    pub solution: String,
    pub impact: String,
    pub source: String,
}

/// Detailed feedback for one framework category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkFeedback {
    pub category: String,
    pub score: i64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// Performance audit results (Lighthouse when available).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub performance_score: Option<i64>,
    pub accessibility_score: Option<i64>,
    pub best_practices_score: Option<i64>,
    pub seo_score: Option<i64>,
    pub first_contentful_paint_ms: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub total_blocking_time_ms: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub available: bool,
}

/// One source's scored, partial analysis of a page.
///
/// `category_scores` is an open key set: the framework scorer uses the five
/// framework categories, AI analyzers may emit anything (including the
/// legacy keys). A `BTreeMap` keeps iteration deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Insight {
    pub source: String,
    pub overall_score: i64,
    pub category_scores: BTreeMap<String, i64>,
    pub recommendations: Vec<Recommendation>,
    pub issues: Vec<String>,
    pub mobile_issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_feedback: Option<Vec<FrameworkFeedback>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
}

impl Insight {
    /// True if the category scores intersect the framework taxonomy.
    pub fn is_framework_like(&self) -> bool {
        FRAMEWORK_CATEGORIES
            .iter()
            .any(|c| self.category_scores.contains_key(*c))
    }
}

// --- Final report ---

/// Fixed legacy category schema kept for downstream compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub product_page: i64,
    pub cart_page: i64,
    pub mobile: i64,
    pub trust_signals: i64,
    pub coupons: i64,
    pub delivery: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub url: String,
    pub overall_score: i64,
    pub category_scores: CategoryScores,
    pub visual_analysis: Insight,
    pub element_analysis: ElementData,
    pub recommendations: Vec<Recommendation>,
    pub models_used: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Clamp a score into the 0-100 range.
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(0, 100)
}

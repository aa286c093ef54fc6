//! Heuristic CRO element extraction from rendered HTML.
//!
//! Static analysis only: positions are not derivable without layout, so every
//! element carries a zeroed rectangle and `visible: true`. Sub-scores come
//! from text and attribute heuristics.

use std::sync::LazyLock;

use regex::Regex;

use croscope_common::{CtaButton, ElementData, ElementPosition, PageElement, TrustSignal};

const MAX_TEXT_LEN: usize = 200;
const MAX_BUTTON_TEXT_LEN: usize = 100;
/// Cap per element list so a pathological page cannot balloon the report.
const MAX_ELEMENTS_PER_KIND: usize = 50;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static BUTTON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(button|a)\b([^>]*)>(.*?)</(?:button|a)>"#).unwrap()
});

static SUBMIT_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input\b[^>]*type\s*=\s*["']submit["'][^>]*>"#).unwrap()
});

static VALUE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)value\s*=\s*["']([^"']*)["']"#).unwrap());

static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class\s*=\s*["']([^"']*)["']"#).unwrap());

static TRUST_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(div|span|section|p)\b[^>]*class\s*=\s*["'][^"']*(trust|security|verified|guarantee|testimonial|review|ssl)[^"']*["'][^>]*>(.*?)</(?:div|span|section|p)>"#,
    )
    .unwrap()
});

static FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b[^>]*>(.*?)</form>").unwrap());

static FORM_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(input|select|textarea)\b").unwrap());

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<label\b").unwrap());

static CART_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(div|section|aside)\b[^>]*(?:class|id)\s*=\s*["'][^"']*(cart|basket|checkout)[^"']*["'][^>]*>(.*?)</(?:div|section|aside)>"#,
    )
    .unwrap()
});

static IMG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

static ALT_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)alt\s*=\s*["']([^"']*)["']"#).unwrap());

static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src\s*=\s*["']([^"']*)["']"#).unwrap());

static PRODUCT_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product|item|gallery|catalog").unwrap());

static COUPON_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<input\b[^>]*(?:name|id|placeholder)\s*=\s*["'][^"']*(coupon|promo|discount|voucher)[^"']*["'][^>]*>"#,
    )
    .unwrap()
});

static DELIVERY_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(div|span|p|li)\b[^>]*class\s*=\s*["'][^"']*(shipping|delivery)[^"']*["'][^>]*>(.*?)</(?:div|span|p|li)>"#,
    )
    .unwrap()
});

/// Extract all CRO-relevant elements from rendered HTML. Empty input yields
/// empty data — the collector's failure default.
pub fn extract(html: &str) -> ElementData {
    if html.trim().is_empty() {
        return ElementData::default();
    }

    ElementData {
        trust_signals: extract_trust_signals(html),
        cta_buttons: extract_cta_buttons(html),
        forms: extract_forms(html),
        cart_elements: extract_cart_elements(html),
        product_images: extract_product_images(html),
        coupon_fields: extract_coupon_fields(html),
        delivery_info: extract_delivery_info(html),
    }
}

fn strip_tags(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

fn default_position() -> ElementPosition {
    ElementPosition::default()
}

// --- Trust signals ---

fn extract_trust_signals(html: &str) -> Vec<TrustSignal> {
    TRUST_BLOCK_RE
        .captures_iter(html)
        .take(MAX_ELEMENTS_PER_KIND)
        .map(|cap| {
            let kind = cap[2].to_lowercase();
            let text = truncate(&strip_tags(&cap[3]), MAX_TEXT_LEN);
            let effectiveness = trust_effectiveness(&text);
            TrustSignal {
                kind,
                text,
                position: default_position(),
                visible: true,
                effectiveness,
            }
        })
        .collect()
}

fn trust_effectiveness(text: &str) -> i64 {
    let mut score = 60;
    let lower = text.to_lowercase();
    let trusted_brands = ["norton", "mcafee", "verisign", "paypal", "visa", "mastercard"];
    if trusted_brands.iter().any(|b| lower.contains(b)) {
        score += 20;
    }
    if !text.is_empty() {
        score += 10;
    }
    score.min(100)
}

// --- CTA buttons ---

fn extract_cta_buttons(html: &str) -> Vec<CtaButton> {
    let mut buttons: Vec<CtaButton> = BUTTON_RE
        .captures_iter(html)
        .filter_map(|cap| {
            let tag = cap[1].to_lowercase();
            let attrs = &cap[2];
            let text = truncate(&strip_tags(&cap[3]), MAX_BUTTON_TEXT_LEN);

            // Anchors only count as CTAs when their class says so.
            if tag == "a" && !has_cta_class(attrs) {
                return None;
            }
            if text.is_empty() {
                return None;
            }

            Some(CtaButton {
                prominent: is_prominent(attrs),
                persuasiveness: persuasiveness(&text),
                text,
                position: default_position(),
            })
        })
        .collect();

    for m in SUBMIT_INPUT_RE.find_iter(html) {
        let text = VALUE_ATTR_RE
            .captures(m.as_str())
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "Submit".to_string());
        buttons.push(CtaButton {
            prominent: is_prominent(m.as_str()),
            persuasiveness: persuasiveness(&text),
            text: truncate(&text, MAX_BUTTON_TEXT_LEN),
            position: default_position(),
        });
    }

    buttons.truncate(MAX_ELEMENTS_PER_KIND);
    buttons
}

fn has_cta_class(attrs: &str) -> bool {
    CLASS_ATTR_RE
        .captures(attrs)
        .map(|c| {
            let classes = c[1].to_lowercase();
            ["btn", "cta", "button", "add-to-cart", "buy", "purchase"]
                .iter()
                .any(|k| classes.contains(k))
        })
        .unwrap_or(false)
}

fn is_prominent(attrs: &str) -> bool {
    CLASS_ATTR_RE
        .captures(attrs)
        .map(|c| {
            let classes = c[1].to_lowercase();
            ["primary", "main", "prominent", "hero"]
                .iter()
                .any(|k| classes.contains(k))
        })
        .unwrap_or(false)
}

fn persuasiveness(text: &str) -> i64 {
    let mut score = 50;
    let lower = text.to_lowercase();

    let positive = ["buy", "get", "save", "free", "now", "today", "limited", "exclusive"];
    let action = ["add", "shop", "order", "purchase", "subscribe"];

    for word in positive {
        if lower.contains(word) {
            score += 10;
        }
    }
    for word in action {
        if lower.contains(word) {
            score += 5;
        }
    }
    score.min(100)
}

// --- Forms ---

fn extract_forms(html: &str) -> Vec<PageElement> {
    FORM_RE
        .captures_iter(html)
        .take(MAX_ELEMENTS_PER_KIND)
        .map(|cap| {
            let body = &cap[1];
            let field_count = FORM_FIELD_RE.find_iter(body).count() as i64;
            let mut score = 70;
            if field_count > 5 {
                score -= (field_count - 5) * 5;
            }
            if LABEL_RE.is_match(body) {
                score += 10;
            }
            PageElement {
                kind: "form".to_string(),
                text: format!("{field_count} fields"),
                position: default_position(),
                visible: true,
                score: score.clamp(0, 100),
            }
        })
        .collect()
}

// --- Cart elements ---

fn extract_cart_elements(html: &str) -> Vec<PageElement> {
    CART_BLOCK_RE
        .captures_iter(html)
        .take(MAX_ELEMENTS_PER_KIND)
        .map(|cap| {
            let text = strip_tags(&cap[3]);
            let lower = text.to_lowercase();
            let mut score = 60;
            if ["$", "price", "total"].iter().any(|k| lower.contains(k)) {
                score += 15;
            }
            if ["checkout", "buy"].iter().any(|k| lower.contains(k)) {
                score += 15;
            }
            if ["quantity", "qty"].iter().any(|k| lower.contains(k)) {
                score += 10;
            }
            PageElement {
                kind: cap[2].to_lowercase(),
                text: truncate(&text, MAX_TEXT_LEN),
                position: default_position(),
                visible: true,
                score: score.min(100),
            }
        })
        .collect()
}

// --- Product images ---

fn extract_product_images(html: &str) -> Vec<PageElement> {
    IMG_RE
        .find_iter(html)
        .filter_map(|m| {
            let tag = m.as_str();
            let src = SRC_ATTR_RE
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let classes = CLASS_ATTR_RE
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();

            if !PRODUCT_HINT_RE.is_match(&src) && !PRODUCT_HINT_RE.is_match(&classes) {
                return None;
            }

            let alt = ALT_ATTR_RE.captures(tag).map(|c| c[1].to_string());
            let mut score = 50;
            if alt.as_deref().is_some_and(|a| !a.is_empty()) {
                score += 20;
            }
            if ["large", "hd", "high"].iter().any(|k| src.contains(k)) {
                score += 15;
            }

            Some(PageElement {
                kind: "product_image".to_string(),
                text: alt.unwrap_or_default(),
                position: default_position(),
                visible: true,
                score,
            })
        })
        .take(MAX_ELEMENTS_PER_KIND)
        .collect()
}

// --- Coupon fields ---

fn extract_coupon_fields(html: &str) -> Vec<PageElement> {
    COUPON_INPUT_RE
        .captures_iter(html)
        .take(MAX_ELEMENTS_PER_KIND)
        .map(|cap| {
            let tag = cap.get(0).map(|m| m.as_str()).unwrap_or_default();
            let mut score = 40;
            let classes = CLASS_ATTR_RE
                .captures(tag)
                .map(|c| c[1].to_lowercase())
                .unwrap_or_default();
            if ["visible", "prominent"].iter().any(|k| classes.contains(k)) {
                score += 30;
            }
            score += 20;
            PageElement {
                kind: cap[1].to_lowercase(),
                text: String::new(),
                position: default_position(),
                visible: true,
                score: score.min(100),
            }
        })
        .collect()
}

// --- Delivery info ---

fn extract_delivery_info(html: &str) -> Vec<PageElement> {
    DELIVERY_BLOCK_RE
        .captures_iter(html)
        .take(MAX_ELEMENTS_PER_KIND)
        .map(|cap| {
            let text = strip_tags(&cap[3]);
            let lower = text.to_lowercase();
            let mut score = 60;
            if ["day", "hour"].iter().any(|k| lower.contains(k)) {
                score += 20;
            }
            if lower.contains("free") {
                score += 15;
            }
            if ["express", "fast", "next"].iter().any(|k| lower.contains(k)) {
                score += 10;
            }
            PageElement {
                kind: cap[2].to_lowercase(),
                text: truncate(&text, MAX_TEXT_LEN),
                position: default_position(),
                visible: true,
                score: score.min(100),
            }
        })
        .collect()
}

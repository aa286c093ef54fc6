use croscope_common::ElementData;

/// Build the CRO analysis prompt for a screenshot, embedding a summary of the
/// heuristically extracted elements so the model can cross-check what the DOM
/// claims against what it actually sees.
pub(crate) fn analysis_prompt(elements: &ElementData) -> String {
    let context = format!(
        "HTML analysis context:\n\
         - CTA buttons detected: {}\n\
         - Trust signals found: {}\n\
         - Forms present: {}\n\
         - Product images: {}\n\
         - Coupon fields: {}\n\
         - Delivery info blocks: {}\n",
        elements.cta_buttons.len(),
        elements.trust_signals.len(),
        elements.forms.len(),
        elements.product_images.len(),
        elements.coupon_fields.len(),
        elements.delivery_info.len(),
    );

    format!(
        r#"You are a conversion rate optimization expert analyzing this website screenshot.

{context}
Analyze the screenshot for conversion optimization and respond with JSON in exactly this format:

{{
  "overall_score": 85,
  "category_scores": {{
    "navigation": 78,
    "display": 85,
    "information": 80,
    "technical": 90,
    "psychological": 87
  }},
  "recommendations": [
    {{
      "category": "navigation",
      "priority": "high",
      "issue": "Missing breadcrumb navigation",
      "solution": "Add a breadcrumb trail to improve user orientation",
      "impact": "Could reduce bounce rate by 5-10%"
    }}
  ],
  "visual_issues": [
    "Primary CTA button lacks visual prominence"
  ],
  "mobile_issues": [
    "Touch targets appear too small for mobile users"
  ]
}}

Score each of the five areas 0-100:

1. NAVIGATION: breadcrumbs, menu clarity, user orientation and flow.
2. DISPLAY: visual hierarchy, font consistency, whitespace, prominence of CTAs and product info.
3. INFORMATION: completeness of product information, image quality, value proposition, visibility of offers.
4. TECHNICAL: mobile optimization, touch target sizing, visible performance issues.
5. PSYCHOLOGICAL: trust signals, social proof, guarantees, contact options, overall credibility.

Provide specific, actionable recommendations with priority levels (high/medium/low) and estimated impact, based only on what is visible in the screenshot. Return only the JSON response, no additional text."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_element_counts() {
        let mut elements = ElementData::default();
        elements.forms.push(croscope_common::PageElement {
            kind: "form".into(),
            text: String::new(),
            position: Default::default(),
            visible: true,
            score: 50,
        });

        let prompt = analysis_prompt(&elements);
        assert!(prompt.contains("Forms present: 1"));
        assert!(prompt.contains("overall_score"));
    }
}

//! Claude vision analyzer for CRO screenshot analysis.
//!
//! Sends a page screenshot plus an element-data summary to the Anthropic
//! messages API and parses the response into an [`Insight`]. The engine
//! wraps this type behind its `VisionAnalyzer` trait.

mod client;
mod parse;
mod prompt;
mod types;

pub use parse::parse_insight;

use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::Engine;
use tracing::info;

use croscope_common::{ElementData, Insight};

use client::VisionApiClient;
use types::{ChatRequest, ImageSource, WireMessage};

/// Analyzer slot name. Referenced by `EngineConfig::enabled_analyzers`.
pub const CLAUDE_VISION: &str = "claude-vision";

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

pub struct ClaudeVision {
    client: Option<VisionApiClient>,
    model: String,
}

impl ClaudeVision {
    /// Construct the analyzer. A missing API key yields a disabled analyzer
    /// rather than an error — the pool substitutes its mock insight.
    pub fn new(api_key: Option<&str>) -> Self {
        let client = api_key
            .filter(|k| !k.is_empty())
            .map(VisionApiClient::new);
        if client.is_none() {
            info!("Claude vision disabled (no API key)");
        }
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn name(&self) -> &str {
        CLAUDE_VISION
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Analyze a page screenshot. The screenshot must be a PNG; the element
    /// data is summarized into the prompt for cross-checking.
    pub async fn analyze(
        &self,
        screenshot: &[u8],
        elements: &ElementData,
        timeout: Duration,
    ) -> Result<Insight> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow!("Claude vision is not configured"))?;

        if screenshot.is_empty() {
            anyhow::bail!("Empty screenshot buffer");
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(screenshot);
        let source = ImageSource {
            source_type: "base64".to_string(),
            media_type: "image/png".to_string(),
            data: encoded,
        };

        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user_with_image(
                source,
                prompt::analysis_prompt(elements),
            ))
            .temperature(0.0);

        let response = client.chat(&request, timeout).await?;
        let text = response
            .text()
            .ok_or_else(|| anyhow!("No text response from Claude vision"))?;

        Ok(parse::parse_insight(&text, CLAUDE_VISION))
    }
}

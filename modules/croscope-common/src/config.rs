use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Rendering service
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // AI providers
    pub anthropic_api_key: Option<String>,

    // Persistence (optional — absence degrades to memory-only cache, no sink)
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            browserless_url: required_env("BROWSERLESS_URL"),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            database_url: env::var("DATABASE_URL").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

/// Explicit engine options. Constructed by the caller and passed into the
/// engine — never read from globals, so tests can run different
/// configurations in parallel.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Names of vision analyzers to run (e.g. "claude-vision").
    pub enabled_analyzers: HashSet<String>,
    /// Run the rule-based framework scorer.
    pub framework_enabled: bool,
    /// Cache entry lifetime.
    pub cache_ttl: Duration,
    /// Per-collector-task deadline (navigation + render).
    pub collector_timeout: Duration,
    /// Per-analyzer-call deadline.
    pub analyzer_timeout: Duration,
    /// Cap on recommendations in the final report.
    pub max_recommendations: usize,
    /// Optional deadline for a whole analyze call. Exceeding it cancels all
    /// in-flight child tasks and caches nothing.
    pub overall_deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_analyzers: HashSet::new(),
            framework_enabled: true,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            collector_timeout: Duration::from_secs(60),
            analyzer_timeout: Duration::from_secs(45),
            max_recommendations: 15,
            overall_deadline: None,
        }
    }
}

impl EngineConfig {
    pub fn with_analyzer(mut self, name: &str) -> Self {
        self.enabled_analyzers.insert(name.to_string());
        self
    }

    pub fn analyzer_enabled(&self, name: &str) -> bool {
        self.enabled_analyzers.contains(name)
    }
}

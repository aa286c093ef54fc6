use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use croscope_common::{AnalysisRequest, Config, EngineConfig};
use croscope_engine::audit::LighthouseAuditor;
use croscope_engine::cache::ReportCache;
use croscope_engine::persist::PostgresSink;
use croscope_engine::pool::AnalyzerPool;
use croscope_engine::traits::{PageRenderer, PerformanceAuditor, PersistenceSink};
use croscope_engine::AnalysisEngine;

#[derive(Parser)]
#[command(name = "croscope", about = "CRO analysis for web pages")]
struct Cli {
    /// Vision analyzers to enable (e.g. claude-vision). Repeatable.
    #[arg(long = "analyzer", global = true)]
    analyzers: Vec<String>,

    /// Disable the rule-based CRO framework scorer.
    #[arg(long, global = true)]
    no_framework: bool,

    /// Overall deadline for one analysis, in seconds.
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a page and print the report as JSON.
    Analyze {
        url: String,
        /// Client name recorded with the request.
        #[arg(long)]
        client: Option<String>,
    },
    /// Print the cached report for a URL, if any.
    Cached { url: String },
    /// Drop any cached report for a URL.
    Invalidate { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("croscope=info".parse()?))
        .init();

    let cli = Cli::parse();

    info!("Croscope starting...");
    let config = Config::from_env();

    let mut engine_config = EngineConfig {
        framework_enabled: !cli.no_framework,
        overall_deadline: cli.deadline_secs.map(Duration::from_secs),
        ..EngineConfig::default()
    };
    for analyzer in &cli.analyzers {
        engine_config = engine_config.with_analyzer(analyzer);
    }

    // A renderer is non-negotiable; without it there is nothing to analyze.
    let renderer: Arc<dyn PageRenderer> = Arc::new(BrowserlessClient::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
    )?);

    let pool = match &config.database_url {
        Some(url) => match sqlx::PgPool::connect(url).await {
            Ok(pool) => {
                ReportCache::migrate(&pool).await?;
                PostgresSink::migrate(&pool).await?;
                Some(pool)
            }
            Err(e) => {
                warn!(error = %e, "Database unavailable, running with memory cache only");
                None
            }
        },
        None => None,
    };

    let auditor = LighthouseAuditor::new().await;
    let auditor: Option<Arc<dyn PerformanceAuditor>> = if auditor.is_available() {
        Some(Arc::new(auditor))
    } else {
        None
    };

    let analyzers = AnalyzerPool::from_config(&config, &engine_config);
    let cache = ReportCache::new(pool.clone(), engine_config.cache_ttl);
    let sink: Option<Arc<dyn PersistenceSink>> =
        pool.map(|p| Arc::new(PostgresSink::new(p)) as Arc<dyn PersistenceSink>);

    let engine = AnalysisEngine::new(renderer, auditor, analyzers, cache, sink, engine_config);
    info!(models = ?engine.models_used(), "Engine ready");

    match cli.command {
        Command::Analyze { url, client } => {
            let request = AnalysisRequest {
                url,
                client_name: client,
            };
            let report = engine.analyze(&request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Cached { url } => match engine.get_cached_report(&url).await? {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => info!(url = %url, "No cached report"),
        },
        Command::Invalidate { url } => {
            engine.invalidate_cache(&url).await?;
            info!(url = %url, "Cache invalidated");
        }
    }

    Ok(())
}

mod analyzer;
mod config;
mod model;
mod normalizer;
mod pipeline;
mod provider;
mod resolver;
mod storage;
mod utils;

use analyzer::AnalyzerImpl;
use chrono::Local;
use config::{AppConfig, ProviderKind, load_config};
use model::{ConfigError, RankedResult};
use provider::{EastmoneyProvider, HistoryFetcher, LocalCsvProvider, PriceProvider, YahooProvider};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use utils::format_opt_f64;

const CONFIG_PATH: &str = "config.json";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) IndexSniper/0.1";

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config = match load_config(CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            std::process::exit(1);
        }
    };

    let plan = match config.plan(Local::now().date_naive()) {
        Ok(plan) => plan,
        Err(e) => {
            error!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    let fetcher = match build_fetcher(&config) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to initialize providers: {}", e);
            std::process::exit(1);
        }
    };
    info!("Providers in priority order: {:?}", fetcher.provider_names());

    let analyzer = AnalyzerImpl::new();
    let results = pipeline::run(&plan, &fetcher, &analyzer).await;
    log_summary(&results);

    match pipeline::write_outputs(&plan, &results) {
        Ok(path) => info!("All done. Report: {}", path.display()),
        Err(e) => {
            error!("❌ Failed to write report: {}", e);
            std::process::exit(1);
        }
    }
}

/// Builds the shared HTTP client and the providers in configured order.
fn build_fetcher(config: &AppConfig) -> Result<HistoryFetcher, ConfigError> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))?;

    let mut providers: Vec<Arc<dyn PriceProvider>> = Vec::with_capacity(config.providers.len());
    for kind in &config.providers {
        let provider: Arc<dyn PriceProvider> = match kind {
            ProviderKind::Eastmoney => Arc::new(EastmoneyProvider::new(client.clone())),
            ProviderKind::Yahoo => Arc::new(YahooProvider::new(client.clone())),
            ProviderKind::LocalCsv => {
                let dir = config.local_csv_dir.clone().ok_or_else(|| {
                    ConfigError::Invalid("local_csv provider needs local_csv_dir".into())
                })?;
                Arc::new(LocalCsvProvider::new(dir))
            }
        };
        providers.push(provider);
    }

    Ok(HistoryFetcher::new(
        providers,
        Duration::from_millis(config.backoff_ms),
    ))
}

fn log_summary(results: &[RankedResult]) {
    info!("Ranked results:");
    for r in results {
        let trend = r.trend_state.as_ref();
        info!(
            "#{} {} ({}) | {} | close {} | ma20 {} | dev {}% | cross {} {}",
            r.rank,
            r.index_spec.display_name,
            r.index_spec.code,
            pipeline::describe_state(trend.and_then(|t| t.above_ma20)),
            format_opt_f64(trend.map(|t| t.current_close)),
            format_opt_f64(trend.and_then(|t| t.current_ma20)),
            format_opt_f64(r.deviation_pct),
            trend
                .and_then(|t| t.cross_date)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            r.note
        );
    }
}

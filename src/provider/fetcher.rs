use crate::model::{DateWindow, FetchError, PriceSeries, ProviderError, SeriesSource};
use crate::provider::traits::PriceProvider;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// A series together with where it came from and what failed first.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub series: PriceSeries,
    pub source: SeriesSource,
    /// One note per failed attempt before the successful one.
    pub notes: Vec<String>,
}

/// Tries every candidate symbol against every provider, in order, until
/// one returns a non-empty series.
pub struct HistoryFetcher {
    providers: Vec<Arc<dyn PriceProvider>>,
    backoff: Duration,
}

impl HistoryFetcher {
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>, backoff: Duration) -> Self {
        Self { providers, backoff }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Waits `backoff` after each failed attempt that has another attempt
    /// after it, so a fully failing index costs at most
    /// `candidates * providers * backoff` of sleeping.
    pub async fn fetch(
        &self,
        candidates: &[String],
        window: &DateWindow,
    ) -> Result<FetchedSeries, FetchError> {
        let total = candidates.len() * self.providers.len();
        let mut attempt = 0;
        let mut notes: Vec<String> = Vec::new();

        for symbol in candidates {
            for provider in &self.providers {
                attempt += 1;
                let error = match provider.fetch_daily_series(symbol, window).await {
                    Ok(series) if !series.is_empty() => {
                        info!(
                            "✅ {} returned {} rows for {}",
                            provider.name(),
                            series.len(),
                            symbol
                        );
                        return Ok(FetchedSeries {
                            series,
                            source: SeriesSource {
                                provider: provider.name().to_string(),
                                symbol: symbol.clone(),
                            },
                            notes,
                        });
                    }
                    Ok(_) => ProviderError::Empty,
                    Err(e) => e,
                };

                let note = format!("{}({}): {}", provider.name(), symbol, error);
                warn!("⚠️ attempt {}/{} failed: {}", attempt, total, note);
                notes.push(note);

                if attempt < total && !self.backoff.is_zero() {
                    sleep(self.backoff).await;
                }
            }
        }

        Err(FetchError::AllCandidatesFailed {
            attempted: candidates.to_vec(),
            last_note: notes.pop(),
        })
    }
}

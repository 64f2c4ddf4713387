use crate::model::{DateWindow, PriceSeries, ProviderError};

/// A source of daily closes for a provider-specific symbol.
#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short identifier used in notes, logs and the report.
    fn name(&self) -> &str;

    async fn fetch_daily_series(
        &self,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<PriceSeries, ProviderError>;
}

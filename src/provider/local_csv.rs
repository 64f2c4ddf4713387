// Offline provider: one CSV export per symbol in a directory
use crate::model::{DateWindow, PriceSeries, ProviderError};
use crate::normalizer::{RawTable, normalize_table};
use crate::provider::traits::PriceProvider;

use std::path::PathBuf;

pub struct LocalCsvProvider {
    dir: PathBuf,
}

impl LocalCsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> Result<PathBuf, ProviderError> {
        let symbol = symbol.trim();
        if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.starts_with('.') {
            return Err(ProviderError::UnsupportedSymbol(symbol.to_string()));
        }
        Ok(self.dir.join(format!("{}.csv", symbol)))
    }
}

#[async_trait::async_trait]
impl PriceProvider for LocalCsvProvider {
    fn name(&self) -> &str {
        "local_csv"
    }

    async fn fetch_daily_series(
        &self,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<PriceSeries, ProviderError> {
        let path = self.path_for(symbol)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ProviderError::Io(format!("{}: {}", path.display(), e)))?;

        let table = read_table(&bytes)?;
        if table.rows.is_empty() {
            return Err(ProviderError::Empty);
        }

        let series = normalize_table(&table)?.within(window);
        if series.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(series)
    }
}

/// Reads CSV bytes into a table, keeping headers exactly as exported.
pub fn read_table(bytes: &[u8]) -> Result<RawTable, ProviderError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ProviderError::Payload(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut table = RawTable::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| ProviderError::Payload(e.to_string()))?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

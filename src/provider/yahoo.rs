// Yahoo Finance chart endpoint (global indices, commodities)
use crate::model::{DateWindow, PriceSeries, ProviderError};
use crate::normalizer::{RawTable, normalize_table};
use crate::provider::traits::PriceProvider;

use chrono::{DateTime, Duration, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: CHART_URL.to_string(),
        }
    }

    /// Exchange-prefixed A-share codes use Yahoo's suffix form.
    fn yahoo_symbol(symbol: &str) -> String {
        let trimmed = symbol.trim();
        let lower = trimmed.to_ascii_lowercase();
        let digits_after = |prefix: &str| {
            lower
                .strip_prefix(prefix)
                .filter(|rest| rest.len() == 6 && rest.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string)
        };

        if let Some(digits) = digits_after("sh") {
            format!("{}.SS", digits)
        } else if let Some(digits) = digits_after("sz") {
            format!("{}.SZ", digits)
        } else {
            trimmed.to_string()
        }
    }

    fn unix_start_of(date: NaiveDate) -> i64 {
        date.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_daily_series(
        &self,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<PriceSeries, ProviderError> {
        let yahoo_symbol = Self::yahoo_symbol(symbol);
        let url = format!("{}/{}", self.base_url, yahoo_symbol);
        let period1 = Self::unix_start_of(window.start);
        let period2 = Self::unix_start_of(window.end + Duration::days(1));
        debug!("yahoo request {} period1={} period2={}", url, period1, period2);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let table = parse_chart_payload(&body)?;
        let series = normalize_table(&table)?.within(window);
        if series.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(series)
    }
}

/// Turns a chart JSON body into a `Date`/`Close` table. Timestamps are
/// shifted by the exchange's GMT offset so each bar lands on its local day.
pub fn parse_chart_payload(body: &str) -> Result<RawTable, ProviderError> {
    let parsed: ChartResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Payload(e.to_string()))?;

    if let Some(err) = parsed.chart.error {
        return Err(ProviderError::Payload(format!("{}: {}", err.code, err.description)));
    }

    let data = parsed
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or(ProviderError::Empty)?;
    if data.timestamp.is_empty() {
        return Err(ProviderError::Empty);
    }

    let offset = data.meta.map(|m| m.gmtoffset).unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut table = RawTable::new(vec!["Date".to_string(), "Close".to_string()]);
    for (i, ts) in data.timestamp.iter().enumerate() {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let close = closes
            .get(i)
            .copied()
            .flatten()
            .map(|c| c.to_string())
            .unwrap_or_default();
        table.push_row(vec![date, close]);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_mapping() {
        assert_eq!(YahooProvider::yahoo_symbol("sh000300"), "000300.SS");
        assert_eq!(YahooProvider::yahoo_symbol("sz399006"), "399006.SZ");
        assert_eq!(YahooProvider::yahoo_symbol("^HSI"), "^HSI");
        assert_eq!(YahooProvider::yahoo_symbol("shHSI"), "shHSI");
        assert_eq!(YahooProvider::yahoo_symbol("GC=F"), "GC=F");
    }

    #[test]
    fn chart_payload_drops_null_closes() {
        // 2024-01-02 01:30 UTC and 2024-01-03 01:30 UTC, offset +8h
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":28800},
            "timestamp":[1704159000,1704245400],
            "indicators":{"quote":[{"close":[16788.55,null]}]}
        }],"error":null}}"#;

        let table = parse_chart_payload(body).unwrap();
        assert_eq!(table.rows[0], vec!["2024-01-02".to_string(), "16788.55".to_string()]);
        assert_eq!(table.rows[1][1], "");

        let series = normalize_table(&table).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].close, 16788.55);
    }

    #[test]
    fn chart_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart_payload(body) {
            Err(ProviderError::Payload(msg)) => assert!(msg.starts_with("Not Found")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_result_is_empty() {
        let body = r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[]}}],"error":null}}"#;
        assert_eq!(parse_chart_payload(body), Err(ProviderError::Empty));
    }
}

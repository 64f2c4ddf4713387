// Eastmoney daily kline endpoint (A-share indices)
use crate::model::{DateWindow, PriceSeries, ProviderError};
use crate::normalizer::{RawTable, normalize_table};
use crate::provider::traits::PriceProvider;
use crate::utils::to_compact_date;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Market ids in fall-through order: Shanghai, Shenzhen, CSI.
const MARKETS: [&str; 3] = ["1", "0", "2"];

/// Column order of `fields2=f51..f57`.
const KLINE_HEADERS: [&str; 7] = ["日期", "开盘", "收盘", "最高", "最低", "成交量", "成交额"];

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

pub struct EastmoneyProvider {
    client: Client,
    base_url: String,
}

impl EastmoneyProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: KLINE_URL.to_string(),
        }
    }

    /// Secids to try for a symbol, most likely market first. Eastmoney
    /// files indices under market 1 (Shanghai), 0 (Shenzhen) or 2 (CSI),
    /// and the exchange prefix does not always agree with it: `932000` is
    /// only served as `2.932000`. The remaining markets follow the
    /// preferred one so an empty answer can fall through.
    fn secids(symbol: &str) -> Result<Vec<String>, ProviderError> {
        let lower = symbol.trim().to_ascii_lowercase();
        let (preferred, digits) = if let Some(rest) = lower.strip_prefix("sh") {
            ("1", rest)
        } else if let Some(rest) = lower.strip_prefix("sz") {
            ("0", rest)
        } else if lower.starts_with("399") {
            ("0", lower.as_str())
        } else if lower.starts_with("93") {
            ("2", lower.as_str())
        } else {
            ("1", lower.as_str())
        };

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProviderError::UnsupportedSymbol(symbol.to_string()));
        }

        let mut markets = vec![preferred];
        markets.extend(MARKETS.iter().copied().filter(|m| *m != preferred));
        Ok(markets
            .into_iter()
            .map(|market| format!("{}.{}", market, digits))
            .collect())
    }

    async fn fetch_secid(
        &self,
        secid: &str,
        window: &DateWindow,
    ) -> Result<PriceSeries, ProviderError> {
        let beg = to_compact_date(window.start);
        let end = to_compact_date(window.end);
        debug!("eastmoney request secid={} beg={} end={}", secid, beg, end);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("secid", secid),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", "101"),
                ("fqt", "0"),
                ("beg", beg.as_str()),
                ("end", end.as_str()),
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

        let table = parse_kline_payload(&body)?;
        let series = normalize_table(&table)?.within(window);
        if series.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(series)
    }
}

#[async_trait::async_trait]
impl PriceProvider for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    async fn fetch_daily_series(
        &self,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<PriceSeries, ProviderError> {
        // Only an empty answer moves on to the next market.
        for secid in Self::secids(symbol)? {
            match self.fetch_secid(&secid, window).await {
                Err(ProviderError::Empty) => debug!("eastmoney {} has no rows", secid),
                other => return other,
            }
        }
        Err(ProviderError::Empty)
    }
}

/// Turns a kline JSON body into a table with the localized column names.
pub fn parse_kline_payload(body: &str) -> Result<RawTable, ProviderError> {
    let parsed: KlineResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Payload(e.to_string()))?;

    let klines = match parsed.data {
        Some(data) if !data.klines.is_empty() => data.klines,
        _ => return Err(ProviderError::Empty),
    };

    let mut table = RawTable::new(KLINE_HEADERS.iter().map(|h| h.to_string()).collect());
    for line in klines {
        table.push_row(line.split(',').map(|f| f.trim().to_string()).collect());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_secid(symbol: &str) -> String {
        EastmoneyProvider::secids(symbol).unwrap().remove(0)
    }

    #[test]
    fn secid_mapping() {
        assert_eq!(first_secid("sh000300"), "1.000300");
        assert_eq!(first_secid("SZ399006"), "0.399006");
        assert_eq!(first_secid("399006"), "0.399006");
        assert_eq!(first_secid("000905"), "1.000905");
        assert_eq!(
            EastmoneyProvider::secids("^HSI"),
            Err(ProviderError::UnsupportedSymbol("^HSI".into()))
        );
        assert!(EastmoneyProvider::secids("000300.SH").is_err());
    }

    #[test]
    fn csi_indices_reach_market_two() {
        assert_eq!(
            EastmoneyProvider::secids("932000").unwrap(),
            vec!["2.932000", "1.932000", "0.932000"]
        );
        assert_eq!(
            EastmoneyProvider::secids("sh932000").unwrap(),
            vec!["1.932000", "0.932000", "2.932000"]
        );
        assert_eq!(
            EastmoneyProvider::secids("sz932000").unwrap(),
            vec!["0.932000", "1.932000", "2.932000"]
        );
    }

    #[test]
    fn kline_payload_becomes_series() {
        let body = r#"{"rc":0,"data":{"code":"000300","klines":[
            "2024-01-03,3400.00,3410.50,3420.00,3390.00,100,200",
            "2024-01-02,3380.00,3390.25,3400.00,3370.00,100,200"
        ]}}"#;

        let table = parse_kline_payload(body).unwrap();
        assert_eq!(table.rows.len(), 2);

        let series = normalize_table(&table).unwrap();
        assert_eq!(series.points()[0].close, 3390.25);
        assert_eq!(series.points()[1].close, 3410.5);
    }

    #[test]
    fn missing_data_is_empty() {
        assert_eq!(parse_kline_payload(r#"{"rc":0,"data":null}"#), Err(ProviderError::Empty));
        assert_eq!(
            parse_kline_payload(r#"{"data":{"klines":[]}}"#),
            Err(ProviderError::Empty)
        );
        assert!(matches!(parse_kline_payload("<html>"), Err(ProviderError::Payload(_))));
    }
}

use crate::model::{MalformedSeriesError, PricePoint, PriceSeries};
use crate::utils::parse_trade_date;

/// Header names accepted for the trading date, in priority order.
pub const DATE_SYNONYMS: [&str; 6] = ["date", "日期", "trade_date", "交易日期", "datetime", "time"];

/// Header names accepted for the closing price, in priority order.
pub const CLOSE_SYNONYMS: [&str; 5] = ["close", "收盘", "收盘价", "close_price", "closing_price"];

/// Tabular payload as a provider returned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Maps a raw table onto `date`/`close` and builds a sorted series.
///
/// Rows with an unparseable date, an unparseable close, or a negative
/// close are dropped. A table with no recognised column fails.
pub fn normalize_table(table: &RawTable) -> Result<PriceSeries, MalformedSeriesError> {
    let date_col = find_column(&table.headers, &DATE_SYNONYMS).ok_or_else(|| {
        MalformedSeriesError::MissingColumn {
            field: "date",
            headers: table.headers.clone(),
        }
    })?;
    let close_col = find_column(&table.headers, &CLOSE_SYNONYMS).ok_or_else(|| {
        MalformedSeriesError::MissingColumn {
            field: "close",
            headers: table.headers.clone(),
        }
    })?;

    let points: Vec<PricePoint> = table
        .rows
        .iter()
        .filter_map(|row| {
            let date = parse_trade_date(row.get(date_col)?)?;
            let close = row.get(close_col)?.trim().parse::<f64>().ok()?;
            (close.is_finite() && close >= 0.0).then_some(PricePoint { date, close })
        })
        .collect();

    if points.is_empty() {
        return Err(MalformedSeriesError::NoUsableRows);
    }

    Ok(PriceSeries::new(points))
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    synonyms.iter().find_map(|synonym| {
        headers
            .iter()
            .position(|h| h.trim().to_lowercase() == *synonym)
    })
}

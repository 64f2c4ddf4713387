// Core structs: IndexSpec, PriceSeries, TrendState, RankedResult
use chrono::NaiveDate;
use thiserror::Error;

/// One monitored index as configured by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub code: String,
    pub display_name: String,
    /// Extra provider symbols tried after the resolved candidates.
    pub aliases: Vec<String>,
}

impl IndexSpec {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            aliases: Vec::new(),
        }
    }
}

/// Inclusive calendar window for history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes, ascending by date with unique dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Sorts by date and keeps the last row seen for a repeated date.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self { points: deduped }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_ascending(&self) -> bool {
        self.points.windows(2).all(|w| w[0].date < w[1].date)
    }

    /// Drops rows outside `window`.
    pub fn within(self, window: &DateWindow) -> Self {
        Self {
            points: self
                .points
                .into_iter()
                .filter(|p| window.contains(p.date))
                .collect(),
        }
    }
}

/// Per-row MA20 classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub ma20: f64,
    pub above_ma20: bool,
}

/// Current MA20 state of one index.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendState {
    pub current_close: f64,
    pub current_ma20: Option<f64>,
    pub above_ma20: Option<bool>,
    /// Most recent date on which `above_ma20` flipped.
    pub cross_date: Option<NaiveDate>,
    /// Date of the last row.
    pub as_of: NaiveDate,
    /// Last close vs previous close, in percent.
    pub change_pct: Option<f64>,
}

/// Which provider and symbol produced a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSource {
    pub provider: String,
    pub symbol: String,
}

/// Result of processing one index, before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOutcome {
    pub spec: IndexSpec,
    pub trend: Option<TrendState>,
    pub source: Option<SeriesSource>,
    pub note: String,
}

impl IndexOutcome {
    pub fn unresolved(spec: IndexSpec, note: impl Into<String>) -> Self {
        Self {
            spec,
            trend: None,
            source: None,
            note: note.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub index_spec: IndexSpec,
    pub trend_state: Option<TrendState>,
    pub deviation_pct: Option<f64>,
    pub rank: u32,
    pub source: Option<SeriesSource>,
    pub note: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedSeriesError {
    #[error("no {field} column among headers {headers:?}")]
    MissingColumn {
        field: &'static str,
        headers: Vec<String>,
    },
    #[error("no usable rows")]
    NoUsableRows,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("empty result")]
    Empty,
    #[error("bad payload: {0}")]
    Payload(String),
    #[error("malformed series: {0}")]
    Malformed(#[from] MalformedSeriesError),
    #[error("unsupported symbol {0}")]
    UnsupportedSymbol(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("all candidates failed")]
    AllCandidatesFailed {
        attempted: Vec<String>,
        last_note: Option<String>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no data")]
    NoData,
    #[error("series is not in ascending date order")]
    Unordered,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("cannot build http client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn series_is_sorted_and_keeps_last_duplicate() {
        let series = PriceSeries::new(vec![
            PricePoint { date: day(3), close: 3.0 },
            PricePoint { date: day(1), close: 1.0 },
            PricePoint { date: day(3), close: 30.0 },
            PricePoint { date: day(2), close: 2.0 },
        ]);

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(series.points()[2].close, 30.0);
        assert!(series.is_ascending());
    }

    #[test]
    fn within_clips_to_window() {
        let series = PriceSeries::new((1..=5).map(|d| PricePoint { date: day(d), close: d as f64 }).collect());
        let window = DateWindow { start: day(2), end: day(4) };

        let clipped = series.within(&window);
        assert_eq!(clipped.len(), 3);
        assert_eq!(clipped.points()[0].date, day(2));
    }

    #[test]
    fn all_candidates_failed_has_fixed_message() {
        let err = FetchError::AllCandidatesFailed {
            attempted: vec!["sh000300".into()],
            last_note: Some("eastmoney(sh000300): empty result".into()),
        };
        assert_eq!(err.to_string(), "all candidates failed");
    }
}

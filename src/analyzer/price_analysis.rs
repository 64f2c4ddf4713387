use crate::analyzer::market_indicators::MarketIndicators;
use crate::model::{AnalysisError, PriceSeries, TrendPoint, TrendState};

/// Moving-average window used for the above/below classification.
pub const MA_WINDOW: usize = 20;

/// Trait defining the interface for a trend analyzer.
pub trait Analyzer {
    /// Per-row close, moving average and above/below flag.
    fn trend_points(&self, series: &PriceSeries) -> Result<Vec<TrendPoint>, AnalysisError>;

    /// Current state plus the date of the latest state change.
    fn analyze(&self, series: &PriceSeries) -> Result<TrendState, AnalysisError>;
}

/// Implementation of the MA20 trend analyzer.
pub struct AnalyzerImpl {
    window: usize,
}

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self { window: MA_WINDOW }
    }
}

impl Analyzer for AnalyzerImpl {
    fn trend_points(&self, series: &PriceSeries) -> Result<Vec<TrendPoint>, AnalysisError> {
        if series.is_empty() {
            return Err(AnalysisError::NoData);
        }
        if !series.is_ascending() {
            return Err(AnalysisError::Unordered);
        }

        let closes: Vec<f64> = series.points().iter().map(|p| p.close).collect();
        let averages = MarketIndicators::rolling_mean(&closes, self.window);
        let flags = MarketIndicators::above_flags(&closes, &averages);

        Ok(series
            .points()
            .iter()
            .zip(averages.iter().zip(flags))
            .map(|(point, (&ma20, above_ma20))| TrendPoint {
                date: point.date,
                close: point.close,
                ma20,
                above_ma20,
            })
            .collect())
    }

    fn analyze(&self, series: &PriceSeries) -> Result<TrendState, AnalysisError> {
        let points = self.trend_points(series)?;
        let last = points.last().ok_or(AnalysisError::NoData)?;

        let flags: Vec<bool> = points.iter().map(|p| p.above_ma20).collect();
        let cross_date = MarketIndicators::last_transition(&flags).map(|i| points[i].date);

        let change_pct = match points.len() {
            n if n >= 2 => MarketIndicators::pct_change(points[n - 2].close, last.close),
            _ => None,
        };

        Ok(TrendState {
            current_close: last.close,
            current_ma20: Some(last.ma20),
            above_ma20: Some(last.above_ma20),
            cross_date,
            as_of: last.date,
            change_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PricePoint;
    use chrono::{Duration, NaiveDate};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
    }

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint { date: day(i), close })
                .collect(),
        )
    }

    #[test]
    fn twenty_flat_rows_then_a_rise_crosses_on_the_rise() {
        let mut closes = vec![10.0; 20];
        closes.push(12.0);
        let s = series(&closes);
        let analyzer = AnalyzerImpl::new();

        let points = analyzer.trend_points(&s).unwrap();
        assert!(!points[19].above_ma20);
        assert!(points[20].above_ma20);
        assert!((points[20].ma20 - 10.1).abs() < 1e-9);

        let state = analyzer.analyze(&s).unwrap();
        assert_eq!(state.current_close, 12.0);
        assert!((state.current_ma20.unwrap() - 10.1).abs() < 1e-9);
        assert_eq!(state.above_ma20, Some(true));
        assert_eq!(state.cross_date, Some(day(20)));
        assert_eq!(state.as_of, day(20));
        assert!((state.change_pct.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn single_row_has_ma_equal_to_close_and_no_cross() {
        let state = AnalyzerImpl::new().analyze(&series(&[42.0])).unwrap();
        assert_eq!(state.current_ma20, Some(42.0));
        assert_eq!(state.above_ma20, Some(false));
        assert_eq!(state.cross_date, None);
        assert_eq!(state.change_pct, None);
    }

    #[test]
    fn first_row_average_is_its_own_close() {
        let points = AnalyzerImpl::new().trend_points(&series(&[7.5, 8.0, 3.0])).unwrap();
        assert_eq!(points[0].ma20, 7.5);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn cross_date_is_the_latest_flip() {
        // above from day 1, back below on day 3, above again on day 5
        let closes = [10.0, 12.0, 13.0, 5.0, 5.0, 20.0, 21.0];
        let s = series(&closes);
        let analyzer = AnalyzerImpl::new();

        let points = analyzer.trend_points(&s).unwrap();
        let state = analyzer.analyze(&s).unwrap();
        let cross = state.cross_date.unwrap();

        let idx = points.iter().position(|p| p.date == cross).unwrap();
        assert_ne!(points[idx].above_ma20, points[idx - 1].above_ma20);
        assert!(points[idx + 1..]
            .windows(2)
            .all(|w| w[0].above_ma20 == w[1].above_ma20));
        assert_eq!(cross, day(5));
    }

    #[test]
    fn never_changing_state_has_no_cross() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let state = AnalyzerImpl::new().analyze(&series(&closes)).unwrap();
        assert_eq!(state.above_ma20, Some(false));
        assert_eq!(state.cross_date, None);
    }

    #[test]
    fn window_slides_after_twenty_rows() {
        let closes: Vec<f64> = (1..=25).map(|i| i as f64).collect();
        let points = AnalyzerImpl::new().trend_points(&series(&closes)).unwrap();
        // mean of 6..=25
        assert!((points[24].ma20 - 15.5).abs() < 1e-9);
    }

    #[test]
    fn empty_series_is_no_data() {
        assert_eq!(
            AnalyzerImpl::new().analyze(&PriceSeries::default()),
            Err(AnalysisError::NoData)
        );
    }
}

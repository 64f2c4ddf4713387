pub struct MarketIndicators;

impl MarketIndicators {
    /// Rolling mean over `[i + 1 - window, i]`, clipped at the start, so the
    /// first rows average whatever history exists instead of being undefined.
    pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
        let window = window.max(1);
        (0..data.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(window);
                let slice = &data[start..=i];
                slice.iter().sum::<f64>() / slice.len() as f64
            })
            .collect()
    }

    /// `close > ma`, strictly; equal counts as not above.
    pub fn above_flags(closes: &[f64], averages: &[f64]) -> Vec<bool> {
        closes
            .iter()
            .zip(averages)
            .map(|(close, ma)| close > ma)
            .collect()
    }

    /// Index of the most recent row whose flag differs from the row before.
    pub fn last_transition(flags: &[bool]) -> Option<usize> {
        flags
            .windows(2)
            .rposition(|w| w[0] != w[1])
            .map(|i| i + 1)
    }

    /// Signed percentage distance of `value` from `reference`.
    pub fn pct_change(reference: f64, value: f64) -> Option<f64> {
        if reference == 0.0 || !reference.is_finite() || !value.is_finite() {
            return None;
        }
        Some(100.0 * (value - reference) / reference)
    }
}

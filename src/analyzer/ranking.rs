use crate::analyzer::market_indicators::MarketIndicators;
use crate::model::{IndexOutcome, RankedResult, TrendState};

pub struct DeviationRanker;

impl DeviationRanker {
    /// Percent distance of the current close from its MA20; undefined when
    /// the average is missing or zero.
    pub fn deviation_pct(state: &TrendState) -> Option<f64> {
        let ma20 = state.current_ma20?;
        MarketIndicators::pct_change(ma20, state.current_close)
    }

    /// Dense rank, largest deviation first. Entries without a deviation share
    /// the rank after the last defined one. Output is ordered by rank, then
    /// by input position.
    pub fn rank(outcomes: Vec<IndexOutcome>) -> Vec<RankedResult> {
        let deviations: Vec<Option<f64>> = outcomes
            .iter()
            .map(|o| o.trend.as_ref().and_then(Self::deviation_pct))
            .collect();

        let mut defined: Vec<(usize, f64)> = deviations
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (i, d)))
            .collect();
        // stable: equal deviations keep input order
        defined.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut ranks = vec![0u32; outcomes.len()];
        let mut current_rank = 0u32;
        let mut previous: Option<f64> = None;
        for &(i, deviation) in &defined {
            if previous != Some(deviation) {
                current_rank += 1;
                previous = Some(deviation);
            }
            ranks[i] = current_rank;
        }

        let unresolved_rank = current_rank + 1;
        for (i, deviation) in deviations.iter().enumerate() {
            if deviation.is_none() {
                ranks[i] = unresolved_rank;
            }
        }

        let mut ranked: Vec<(usize, RankedResult)> = outcomes
            .into_iter()
            .enumerate()
            .map(|(i, outcome)| {
                (
                    i,
                    RankedResult {
                        index_spec: outcome.spec,
                        trend_state: outcome.trend,
                        deviation_pct: deviations[i],
                        rank: ranks[i],
                        source: outcome.source,
                        note: outcome.note,
                    },
                )
            })
            .collect();
        ranked.sort_by_key(|(i, r)| (r.rank, *i));

        ranked.into_iter().map(|(_, r)| r).collect()
    }
}

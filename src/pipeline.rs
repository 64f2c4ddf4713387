// One run: resolve -> fetch -> analyze for every index, then rank and persist.
use crate::analyzer::{Analyzer, DeviationRanker};
use crate::config::RunPlan;
use crate::model::{DateWindow, FetchError, IndexOutcome, IndexSpec, OutputError, RankedResult};
use crate::provider::HistoryFetcher;
use crate::resolver::candidates_for;
use crate::storage::{HistorySnapshot, ReportWriter};

use std::path::PathBuf;
use tracing::{info, warn};

/// Processes a single index. Never fails: every error becomes a note on an
/// unresolved outcome.
pub async fn process_index<A: Analyzer>(
    spec: &IndexSpec,
    fetcher: &HistoryFetcher,
    analyzer: &A,
    window: &DateWindow,
) -> IndexOutcome {
    let candidates = candidates_for(spec);
    info!(
        "Processing {} ({}), candidates: {:?}",
        spec.display_name, spec.code, candidates
    );

    let fetched = match fetcher.fetch(&candidates, window).await {
        Ok(fetched) => fetched,
        Err(err) => {
            let FetchError::AllCandidatesFailed {
                attempted,
                last_note,
            } = &err;
            warn!(
                "❌ {} ({}) unresolved, tried {:?}, last note: {}",
                spec.display_name,
                spec.code,
                attempted,
                last_note.as_deref().unwrap_or("-")
            );
            return IndexOutcome::unresolved(spec.clone(), err.to_string());
        }
    };

    match analyzer.analyze(&fetched.series) {
        Ok(trend) => {
            info!(
                "Finished {}: close {:.2}, ma20 {:.2}, cross {:?}",
                spec.display_name,
                trend.current_close,
                trend.current_ma20.unwrap_or_default(),
                trend.cross_date
            );
            IndexOutcome {
                spec: spec.clone(),
                trend: Some(trend),
                source: Some(fetched.source),
                note: fetched.notes.join("; "),
            }
        }
        Err(e) => {
            warn!("❌ Analysis failed for {}: {}", spec.display_name, e);
            IndexOutcome {
                spec: spec.clone(),
                trend: None,
                source: Some(fetched.source),
                note: e.to_string(),
            }
        }
    }
}

/// Processes every configured index sequentially and ranks the results.
pub async fn run<A: Analyzer>(
    plan: &RunPlan,
    fetcher: &HistoryFetcher,
    analyzer: &A,
) -> Vec<RankedResult> {
    info!(
        "Indices to process: {} ({} .. {})",
        plan.indices.len(),
        plan.window.start,
        plan.window.end
    );

    let mut outcomes = Vec::with_capacity(plan.indices.len());
    for spec in &plan.indices {
        outcomes.push(process_index(spec, fetcher, analyzer, &plan.window).await);
    }

    DeviationRanker::rank(outcomes)
}

/// Writes the report and replaces the history snapshot. Returns the report path.
pub fn write_outputs(plan: &RunPlan, results: &[RankedResult]) -> Result<PathBuf, OutputError> {
    let previous = match HistorySnapshot::load(&plan.history_path) {
        Ok(previous) => previous,
        Err(e) => {
            warn!(
                "Ignoring unreadable history {}: {}",
                plan.history_path.display(),
                e
            );
            None
        }
    };

    let current = HistorySnapshot::from_results(results);
    if let Some(previous) = &previous {
        for change in current.changes_since(previous) {
            info!(
                "🔁 {} state changed: {} -> {}",
                change.code,
                describe_state(change.previous),
                describe_state(change.current)
            );
        }
    }

    let report_path = ReportWriter::new(&plan.output_dir).write_report(
        results,
        previous.as_ref(),
        plan.run_date,
    )?;
    info!("📄 Report saved: {}", report_path.display());

    current.save(&plan.history_path)?;
    info!(
        "📘 History updated: {} ({} entries)",
        plan.history_path.display(),
        current.entries().len()
    );

    Ok(report_path)
}

pub fn describe_state(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "above",
        Some(false) => "below",
        None => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerImpl;
    use crate::model::ProviderError;
    use crate::provider::fetcher::tests::{FakeProvider, series, shared, window};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn plan(indices: Vec<IndexSpec>, output_dir: PathBuf) -> RunPlan {
        RunPlan {
            indices,
            window: window(),
            run_date: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            history_path: output_dir.join("history.csv"),
            output_dir,
        }
    }

    #[tokio::test]
    async fn later_candidate_success_is_not_unresolved() {
        let provider = Arc::new(
            FakeProvider::new("fake")
                .with("sh000300", Err(ProviderError::Http("timeout".into())))
                .with("000300", Ok(series(&[10.0, 11.0]))),
        );
        let fetcher = HistoryFetcher::new(vec![shared(&provider)], Duration::ZERO);

        let outcome = process_index(
            &IndexSpec::new("000300", "沪深300"),
            &fetcher,
            &AnalyzerImpl::new(),
            &window(),
        )
        .await;

        assert!(outcome.trend.is_some());
        assert_eq!(outcome.source.unwrap().symbol, "000300");
        assert_eq!(
            outcome.note,
            "fake(sh000300): http error: timeout; fake(sz000300): empty result"
        );
    }

    #[tokio::test]
    async fn failing_index_is_ranked_last_with_null_fields() {
        let provider = Arc::new(
            FakeProvider::new("fake")
                .with("sh000300", Ok(series(&[10.0, 10.0, 12.0])))
                .with("sz399006", Ok(series(&[10.0, 10.0, 9.0]))),
        );
        let fetcher = HistoryFetcher::new(vec![shared(&provider)], Duration::ZERO);
        let dir = tempdir().unwrap();
        let plan = plan(
            vec![
                IndexSpec::new("HSI", "恒生指数"),
                IndexSpec::new("399006", "创业板指"),
                IndexSpec::new("000300", "沪深300"),
            ],
            dir.path().to_path_buf(),
        );

        let results = run(&plan, &fetcher, &AnalyzerImpl::new()).await;

        let codes: Vec<_> = results.iter().map(|r| r.index_spec.code.as_str()).collect();
        assert_eq!(codes, vec!["000300", "399006", "HSI"]);
        let ranks: Vec<_> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);

        let hsi = &results[2];
        assert!(hsi.trend_state.is_none());
        assert!(hsi.deviation_pct.is_none());
        assert!(hsi.source.is_none());
        assert_eq!(hsi.note, "all candidates failed");
    }

    #[tokio::test]
    async fn outputs_are_written_and_history_is_replaced() {
        let dir = tempdir().unwrap();
        let plan = plan(
            vec![IndexSpec::new("000300", "沪深300")],
            dir.path().join("reports"),
        );

        let stale = plan.output_dir.join("history.csv");
        std::fs::create_dir_all(&plan.output_dir).unwrap();
        std::fs::write(&stale, "code,above_ma20,cross_date\n000300,false,\nOLD,true,\n").unwrap();

        let provider = Arc::new(
            FakeProvider::new("fake").with("sh000300", Ok(series(&[10.0, 10.0, 12.0]))),
        );
        let fetcher = HistoryFetcher::new(vec![shared(&provider)], Duration::ZERO);
        let results = run(&plan, &fetcher, &AnalyzerImpl::new()).await;

        let report = write_outputs(&plan, &results).unwrap();
        assert!(report.ends_with("index_report_2024-06-28.csv"));
        let text = std::fs::read_to_string(&report).unwrap();
        assert!(text.contains(",Yes,"));
        assert!(text.contains(",No,fake,sh000300,"));

        let history = HistorySnapshot::load(&plan.history_path).unwrap().unwrap();
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.entries()[0].above_ma20, Some(true));
        assert_eq!(history.entries()[0].cross_date, NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[test]
    fn unreadable_history_is_ignored() {
        let dir = tempdir().unwrap();
        let plan = plan(vec![], dir.path().to_path_buf());
        std::fs::write(&plan.history_path, "code,above_ma20\nX,maybe\n").unwrap();

        let report = write_outputs(&plan, &[]).unwrap();
        assert!(report.exists());
        assert!(HistorySnapshot::load(&plan.history_path).unwrap().unwrap().entries().is_empty());
    }
}

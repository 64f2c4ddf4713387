// Ranked deviation report as a spreadsheet-friendly CSV
use crate::model::{OutputError, RankedResult};
use crate::storage::history::HistorySnapshot;
use crate::utils::format_opt_f64;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REPORT_HEADERS: [&str; 14] = [
    "rank",
    "code",
    "display_name",
    "above_ma20",
    "close",
    "ma20",
    "deviation_pct",
    "cross_date",
    "as_of",
    "change_pct",
    "prev_above_ma20",
    "provider",
    "symbol",
    "note",
];

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn report_path(&self, run_date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("index_report_{}.csv", run_date.format("%Y-%m-%d")))
    }

    /// Writes the ranked table, replacing any report from the same day.
    /// A UTF-8 BOM is prepended so spreadsheet tools detect the encoding.
    pub fn write_report(
        &self,
        results: &[RankedResult],
        previous: Option<&HistorySnapshot>,
        run_date: NaiveDate,
    ) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.report_path(run_date);
        write_report_to(&path, results, previous)?;
        Ok(path)
    }
}

fn write_report_to(
    path: &Path,
    results: &[RankedResult],
    previous: Option<&HistorySnapshot>,
) -> Result<(), OutputError> {
    let mut file = File::create(path)?;
    file.write_all("\u{feff}".as_bytes())?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(REPORT_HEADERS)?;

    for result in results {
        let trend = result.trend_state.as_ref();
        let source = result.source.as_ref();
        let prev_state = previous
            .and_then(|p| p.get(&result.index_spec.code))
            .and_then(|e| e.above_ma20);

        writer.write_record([
            result.rank.to_string(),
            result.index_spec.code.clone(),
            result.index_spec.display_name.clone(),
            format_state(trend.and_then(|t| t.above_ma20)),
            format_opt_f64(trend.map(|t| t.current_close)),
            format_opt_f64(trend.and_then(|t| t.current_ma20)),
            format_opt_f64(result.deviation_pct),
            format_opt_date(trend.and_then(|t| t.cross_date)),
            format_opt_date(trend.map(|t| t.as_of)),
            format_opt_f64(trend.and_then(|t| t.change_pct)),
            format_state(prev_state),
            source.map(|s| s.provider.clone()).unwrap_or_default(),
            source.map(|s| s.symbol.clone()).unwrap_or_default(),
            result.note.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn format_state(state: Option<bool>) -> String {
    match state {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => String::new(),
    }
}

fn format_opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

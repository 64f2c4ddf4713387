pub mod history;
pub mod report;

pub use history::HistorySnapshot;
pub use report::ReportWriter;

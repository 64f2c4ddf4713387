// Analyzer module: aggregates submodules for different aspects of analysis.

pub mod price_analysis;
pub mod market_indicators;
pub mod ranking;

// Re-export the main implementations for ease of use.
pub use price_analysis::{Analyzer, AnalyzerImpl};
pub use ranking::DeviationRanker;

// Data providers and the multi-candidate fetcher built on top of them.

pub mod traits;
pub mod eastmoney;
pub mod yahoo;
pub mod local_csv;
pub mod fetcher;

pub use eastmoney::EastmoneyProvider;
pub use fetcher::HistoryFetcher;
pub use local_csv::LocalCsvProvider;
pub use traits::PriceProvider;
pub use yahoo::YahooProvider;

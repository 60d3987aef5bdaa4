//! Market data crate.
//!
//! Clients for every upstream the cache is built from, each paired with a
//! parser for its wire format:
//!
//! - MOEX ISS JSON: trading dates, candles, history, board securities
//! - MOEX register-closing listing: Windows-1251 CSV
//! - Rosstat CPI: XLSX workbook
//! - close-registers site: HTML table
//! - NASDAQ dividends: JSON
//!
//! All network access goes through [`HttpGetter`], so one connection pool
//! is shared and tests can serve canned payloads.

pub mod errors;
pub mod http;
pub mod models;
pub mod provider;

pub use errors::MarketDataError;
pub use http::{HttpGetter, HttpResponse, ReqwestGetter, DEFAULT_MAX_CONNECTIONS};
pub use models::{
    BoardSecurity, Candle, ClosingRecord, DividendCurrency, MarketDates, MonthlyCpi,
    SourceDividend,
};

pub use provider::close_reestry::CloseReestryClient;
pub use provider::iss::IssClient;
pub use provider::moex_listing::{Listing, MoexListingClient};
pub use provider::nasdaq::NasdaqClient;
pub use provider::rosstat::RosstatClient;

//! Market data cache: scrapers, their payloads and the dividend reconciler.

mod check_raw_service;
mod cpi_service;
mod data_constants;
mod dividend_sources_service;
mod dividends_service;
mod index_service;
mod market_model;
mod quotes_service;
mod raw_edit_service;
mod raw_model;
mod securities_model;
mod securities_service;
pub mod series;
mod status_service;
mod trading_dates_service;
mod usd_service;

pub use check_raw_service::{raw_id, CheckRawService};
pub use cpi_service::{cpi_id, CpiService};
pub use data_constants::*;
pub use dividend_sources_service::{DividendSourceService, DividendSourceTrait};
pub use dividends_service::{convert, div_id, Dividend, DividendsService};
pub use index_service::{index_id, IndexService};
pub use market_model::{Candle, Cpi};
pub use quotes_service::{quote_id, QuotesService};
pub use raw_edit_service::RawEditService;
pub use raw_model::{
    compare_with_source, Currency, DividendCompareRow, DividendState, RawDividend, RawTable, Status,
};
pub use securities_model::{SecuritiesTable, Security};
pub use securities_service::{
    securities_id, SecuritiesEditService, SecuritiesService, SelectedTicker,
};
pub use status_service::{status_id, StatusService, DEFAULT_STATUS_LOOKBACK_DAYS};
pub use trading_dates_service::{trading_date_id, TradingDatesService};
pub use usd_service::{usd_id, UsdService};

/// Last trading date.
pub const TRADING_DATE_GROUP: &str = "trading_date";

/// Monthly consumer price index.
pub const CPI_GROUP: &str = "cpi";

/// Index history, one aggregate per index.
pub const INDEXES_GROUP: &str = "indexes";

/// USD/RUB candles.
pub const USD_GROUP: &str = "usd";

/// Traded securities with user selection.
pub const SECURITIES_GROUP: &str = "securities";

/// Share candles, one aggregate per ticker.
pub const QUOTES_GROUP: &str = "quotes";

/// Upcoming register closings of selected tickers.
pub const STATUS_GROUP: &str = "status";

/// User-entered dividends, one aggregate per ticker.
pub const RAW_DIV_GROUP: &str = "raw_div";

/// Dividends scraped from the close-registers site.
pub const CLOSE_REESTRY_GROUP: &str = "close_reestry";

/// Dividends scraped from NASDAQ.
pub const NASDAQ_GROUP: &str = "nasdaq";

/// Dividends converted to roubles.
pub const DIV_GROUP: &str = "div";

/// Indexes kept in the cache.
pub const INDEXES: [&str; 4] = ["MCFTRR", "MEOGTRR", "IMOEX", "RVI"];

/// ISS ticker of the USD/RUB rate.
pub const USD_TICKER: &str = "USD000UTSTOM";

/// Dividends before this date are not tracked.
pub const DATA_START_DATE: (i32, u32, u32) = (2015, 1, 1);

/// Format of dates in ids and messages.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

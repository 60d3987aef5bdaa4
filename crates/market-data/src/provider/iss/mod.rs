//! Moscow Exchange ISS client.
//!
//! # API Endpoints
//!
//! - Trading dates: `/iss/history/engines/{engine}/markets/{market}/dates.json`
//! - Candles: `/iss/engines/{engine}/markets/{market}/securities/{security}/candles.json`
//! - History: `/iss/history/engines/{engine}/markets/{market}/securities/{security}.json`
//! - Board securities: `/iss/engines/{engine}/markets/{market}/boards/{board}/securities.json`
//!
//! # Response Format
//!
//! Every block is an object with a `columns` array and a `data` array of
//! rows, each row positionally matching `columns`. Long series are paged
//! with the `start` parameter until an empty page comes back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::MarketDataError;
use crate::http::{get_ok, HttpGetter};
use crate::models::{BoardSecurity, Candle, MarketDates};

const BASE_URL: &str = "https://iss.moex.com/iss";
const PROVIDER_ID: &str = "ISS";

/// Daily candles.
pub const INTERVAL_DAY: u32 = 24;

pub const ENGINE_STOCK: &str = "stock";
pub const ENGINE_CURRENCY: &str = "currency";

pub const MARKET_SHARES: &str = "shares";
pub const MARKET_FOREIGN_SHARES: &str = "foreign_shares";
pub const MARKET_INDEX: &str = "index";
pub const MARKET_SELT: &str = "selt";

pub const BOARD_TQBR: &str = "TQBR";
pub const BOARD_TQTF: &str = "TQTF";
pub const BOARD_FQBR: &str = "FQBR";

/// Guards against an upstream that never returns an empty page.
const MAX_PAGES: usize = 1_000;

#[derive(Debug, Deserialize)]
struct Block {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

/// A block row addressed by column name.
struct Row<'a> {
    index: &'a HashMap<&'a str, usize>,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    fn value(&self, column: &str) -> Result<&'a Value, MarketDataError> {
        self.index
            .get(column)
            .and_then(|pos| self.values.get(*pos))
            .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, format!("no column {column}")))
    }

    fn str(&self, column: &str) -> Result<String, MarketDataError> {
        match self.value(column)? {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    fn f64(&self, column: &str) -> Result<f64, MarketDataError> {
        match self.value(column)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                MarketDataError::parse(PROVIDER_ID, format!("bad number in {column}"))
            }),
            Value::Null => Ok(0.0),
            other => Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("{column} is not a number: {other}"),
            )),
        }
    }

    fn i64(&self, column: &str) -> Result<i64, MarketDataError> {
        let value = self.f64(column)?;
        if value.fract() != 0.0 {
            return Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("{column} is not an integer: {value}"),
            ));
        }

        Ok(value as i64)
    }

    fn date(&self, column: &str) -> Result<NaiveDate, MarketDataError> {
        let raw = self.str(column)?;
        let day = raw.get(..10).unwrap_or(&raw);

        NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
            MarketDataError::parse(PROVIDER_ID, format!("bad date {raw} in {column}: {e}"))
        })
    }
}

/// Decodes `name` from an ISS JSON document and maps every row.
fn parse_block<T>(
    body: &[u8],
    name: &str,
    mut convert: impl FnMut(&Row<'_>) -> Result<T, MarketDataError>,
) -> Result<Vec<T>, MarketDataError> {
    let mut doc: HashMap<String, Value> = serde_json::from_slice(body)
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, e.to_string()))?;
    let raw = doc
        .remove(name)
        .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, format!("no block {name}")))?;
    let block: Block = serde_json::from_value(raw)
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("block {name}: {e}")))?;

    let index: HashMap<&str, usize> = block
        .columns
        .iter()
        .enumerate()
        .map(|(pos, column)| (column.as_str(), pos))
        .collect();

    block
        .data
        .iter()
        .map(|values| {
            convert(&Row {
                index: &index,
                values,
            })
        })
        .collect()
}

fn date_param(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Client for the public ISS endpoints.
#[derive(Clone)]
pub struct IssClient {
    getter: Arc<dyn HttpGetter>,
    base_url: String,
}

impl IssClient {
    pub fn new(getter: Arc<dyn HttpGetter>) -> Self {
        Self {
            getter,
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MarketDataError> {
        get_ok(self.getter.as_ref(), PROVIDER_ID, url, &[]).await
    }

    /// Collects every page of a `start`-paged block.
    async fn fetch_paged<T>(
        &self,
        url: &str,
        block: &str,
        convert: impl Fn(&Row<'_>) -> Result<T, MarketDataError> + Copy,
    ) -> Result<Vec<T>, MarketDataError> {
        let mut rows = Vec::new();

        for _ in 0..MAX_PAGES {
            let page_url = format!("{url}&start={}", rows.len());
            let body = self.fetch(&page_url).await?;
            let page = parse_block(&body, block, convert)?;
            if page.is_empty() {
                return Ok(rows);
            }
            rows.extend(page);
        }

        Err(MarketDataError::provider(
            PROVIDER_ID,
            format!("too many pages for {url}"),
        ))
    }

    /// First and last trading dates of a market.
    pub async fn market_dates(
        &self,
        engine: &str,
        market: &str,
    ) -> Result<Vec<MarketDates>, MarketDataError> {
        let url = format!(
            "{}/history/engines/{engine}/markets/{market}/dates.json?iss.meta=off",
            self.base_url
        );
        let body = self.fetch(&url).await?;

        parse_block(&body, "dates", |row| {
            Ok(MarketDates {
                from: row.date("from")?,
                till: row.date("till")?,
            })
        })
    }

    /// Candles of a security between `from` and `till` inclusive.
    ///
    /// An absent `from` requests the whole history.
    pub async fn market_candles(
        &self,
        engine: &str,
        market: &str,
        security: &str,
        from: Option<NaiveDate>,
        till: NaiveDate,
        interval: u32,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!(
            "{}/engines/{engine}/markets/{market}/securities/{security}/candles.json?iss.meta=off&from={}&till={}&interval={interval}",
            self.base_url,
            date_param(from),
            date_param(Some(till)),
        );

        self.fetch_paged(&url, "candles", |row| {
            Ok(Candle {
                date: row.date("begin")?,
                open: row.f64("open")?,
                close: row.f64("close")?,
                high: row.f64("high")?,
                low: row.f64("low")?,
                value: row.f64("value")?,
            })
        })
        .await
    }

    /// End-of-day history of a security between `from` and `till` inclusive.
    pub async fn market_history(
        &self,
        engine: &str,
        market: &str,
        security: &str,
        from: Option<NaiveDate>,
        till: NaiveDate,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!(
            "{}/history/engines/{engine}/markets/{market}/securities/{security}.json?iss.meta=off&iss.only=history&from={}&till={}",
            self.base_url,
            date_param(from),
            date_param(Some(till)),
        );

        self.fetch_paged(&url, "history", |row| {
            Ok(Candle {
                date: row.date("TRADEDATE")?,
                open: row.f64("OPEN")?,
                close: row.f64("CLOSE")?,
                high: row.f64("HIGH")?,
                low: row.f64("LOW")?,
                value: row.f64("VALUE")?,
            })
        })
        .await
    }

    /// Securities currently listed on a board.
    pub async fn board_securities(
        &self,
        engine: &str,
        market: &str,
        board: &str,
    ) -> Result<Vec<BoardSecurity>, MarketDataError> {
        let url = format!(
            "{}/engines/{engine}/markets/{market}/boards/{board}/securities.json?iss.meta=off&iss.only=securities&securities.columns=SECID,LOTSIZE,ISIN,BOARDID,SECTYPE,INSTRID",
            self.base_url
        );
        let body = self.fetch(&url).await?;

        parse_block(&body, "securities", |row| {
            Ok(BoardSecurity {
                ticker: row.str("SECID")?,
                lot: row.i64("LOTSIZE")?,
                isin: row.str("ISIN")?,
                board: row.str("BOARDID")?,
                sec_type: row.str("SECTYPE")?,
                instrument: row.str("INSTRID")?,
            })
        })
    }
}

//! NASDAQ dividend history for foreign shares.
//!
//! # API Endpoints
//!
//! - Dividends: `https://api.nasdaq.com/api/quote/{ticker}/dividends?assetclass=stocks`
//!
//! The API rejects requests without a browser User-Agent.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::http::{get_ok, HttpGetter};
use crate::models::{DividendCurrency, SourceDividend};

const BASE_URL: &str = "https://api.nasdaq.com/api/quote";
const PROVIDER_ID: &str = "NASDAQ";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.4 Safari/605.1.15";
const NO_DATE: &str = "N/A";
const DATE_FORMAT: &str = "%m/%d/%Y";
const CURRENCY_PREFIX: &str = "$";

#[derive(Debug, Default, Deserialize)]
struct DividendsResponse {
    #[serde(default)]
    data: Option<DataBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct DataBlock {
    #[serde(default)]
    dividends: Option<DividendsBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct DividendsBlock {
    #[serde(default)]
    rows: Option<Vec<DividendRow>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendRow {
    record_date: String,
    amount: String,
}

#[derive(Clone)]
pub struct NasdaqClient {
    getter: Arc<dyn HttpGetter>,
}

impl NasdaqClient {
    pub fn new(getter: Arc<dyn HttpGetter>) -> Self {
        Self { getter }
    }

    pub async fn dividends(&self, ticker: &str) -> Result<Vec<SourceDividend>, MarketDataError> {
        let url = format!(
            "{BASE_URL}/{}/dividends?assetclass=stocks",
            urlencoding::encode(ticker)
        );
        let body = get_ok(
            self.getter.as_ref(),
            PROVIDER_ID,
            &url,
            &[("User-Agent", USER_AGENT)],
        )
        .await?;

        parse_dividends(&body)
    }
}

/// Parses the dividends JSON. Rows without a record date are skipped.
pub fn parse_dividends(body: &[u8]) -> Result<Vec<SourceDividend>, MarketDataError> {
    let response: DividendsResponse = serde_json::from_slice(body)
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("can't decode json -> {e}")))?;

    let rows = response
        .data
        .and_then(|data| data.dividends)
        .and_then(|dividends| dividends.rows)
        .unwrap_or_default();

    let mut dividends = Vec::with_capacity(rows.len());
    for row in rows {
        if row.record_date == NO_DATE {
            continue;
        }

        let date = NaiveDate::parse_from_str(&row.record_date, DATE_FORMAT).map_err(|e| {
            MarketDataError::parse(
                PROVIDER_ID,
                format!("can't parse date {} -> {e}", row.record_date),
            )
        })?;

        let amount = row.amount.strip_prefix(CURRENCY_PREFIX).ok_or_else(|| {
            MarketDataError::parse(
                PROVIDER_ID,
                format!("wrong currency prefix {}", row.amount),
            )
        })?;
        let value = Decimal::from_str(amount).map_err(|e| {
            MarketDataError::parse(
                PROVIDER_ID,
                format!("can't parse dividend {} -> {e}", row.amount),
            )
        })?;

        dividends.push(SourceDividend {
            date,
            value,
            currency: DividendCurrency::Usd,
        });
    }

    Ok(dividends)
}

//! Upstream-level records.
//!
//! These mirror what the sources publish; the domain layer converts them
//! into its own tables.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading calendar bounds of an ISS market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketDates {
    pub from: NaiveDate,
    pub till: NaiveDate,
}

/// Daily OHLC row with turnover, as served by ISS candles and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub value: f64,
}

/// A security traded on an ISS board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSecurity {
    pub ticker: String,
    pub lot: i64,
    pub isin: String,
    pub board: String,
    pub sec_type: String,
    pub instrument: String,
}

/// Monthly CPI value as a fraction of the previous month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyCpi {
    /// Last day of the month.
    pub date: NaiveDate,
    pub value: f64,
}

/// Currency of a dividend as printed by the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DividendCurrency {
    #[serde(rename = "RUR")]
    Rur,
    #[serde(rename = "USD")]
    Usd,
}

/// One dividend payment found on a source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDividend {
    pub date: NaiveDate,
    pub value: Decimal,
    pub currency: DividendCurrency,
}

/// One line of the register-closing listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosingRecord {
    pub ticker: String,
    pub date: NaiveDate,
}

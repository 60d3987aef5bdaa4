//! Dividend history from the close-registers site.
//!
//! The page for a ticker holds a single table. Its first body row is a
//! header naming the share classes, every following row a payment: ex-date
//! text in column 1, common share dividend in column 2, preferred share
//! dividend in column 3.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::errors::MarketDataError;
use crate::http::{get_ok, HttpGetter};
use crate::models::{DividendCurrency, SourceDividend};

const URL: &str = "https://закрытияреестров.рф";
const PROVIDER_ID: &str = "CLOSE_REESTRY";
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Tickers published under another name.
const ALIASES: [(&str, &str); 1] = [("RUAL", "RUALR")];

lazy_static! {
    static ref DATE_REGEX: Regex = Regex::new(r"\d{1,2}\.\d{2}\.\d{4}").expect("Invalid regex pattern");
    static ref DIV_REGEX: Regex =
        Regex::new(r"(\d.*)[\x{00A0}\s](руб|USD|\$)").expect("Invalid regex pattern");
    static ref ROW_SELECTOR: Selector = Selector::parse("tbody tr").expect("Invalid selector");
    static ref CELL_SELECTOR: Selector = Selector::parse("td").expect("Invalid selector");
}

#[derive(Clone)]
pub struct CloseReestryClient {
    getter: Arc<dyn HttpGetter>,
    base_url: String,
}

impl CloseReestryClient {
    pub fn new(getter: Arc<dyn HttpGetter>) -> Self {
        Self {
            getter,
            base_url: URL.to_string(),
        }
    }

    /// Page address for a base ticker.
    pub fn url(&self, base_ticker: &str) -> String {
        let ticker = ALIASES
            .iter()
            .find(|(name, _)| *name == base_ticker)
            .map(|(_, alias)| *alias)
            .unwrap_or(base_ticker);

        format!("{}/{ticker}/", self.base_url)
    }

    pub async fn dividends(
        &self,
        base_ticker: &str,
        preferred: bool,
    ) -> Result<Vec<SourceDividend>, MarketDataError> {
        let body = get_ok(self.getter.as_ref(), PROVIDER_ID, &self.url(base_ticker), &[]).await?;
        let html = String::from_utf8_lossy(&body);

        parse_page(&html, preferred)
    }
}

fn cell_text(row: &ElementRef<'_>, column: usize) -> String {
    row.select(&CELL_SELECTOR)
        .nth(column)
        .map(|cell| cell.text().collect::<String>())
        .unwrap_or_default()
}

fn validate_header(header: &ElementRef<'_>, preferred: bool) -> Result<(), MarketDataError> {
    if preferred {
        let text = cell_text(header, 2);
        if !text.contains("привилегированную") {
            return Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("can't find preferred in header - {text}"),
            ));
        }
    }

    let text = cell_text(header, 1);
    if !text.contains("обыкновенную") {
        return Err(MarketDataError::parse(
            PROVIDER_ID,
            format!("can't find common in header - {text}"),
        ));
    }

    Ok(())
}

/// Parses one payment row. `None` marks a cancelled payment.
fn parse_row(row: &ElementRef<'_>, preferred: bool) -> Result<Option<SourceDividend>, MarketDataError> {
    let value_text = cell_text(row, if preferred { 2 } else { 1 });
    if value_text.contains("НЕ ВЫПЛАЧИВАТЬ") {
        return Ok(None);
    }

    let captures = DIV_REGEX.captures(&value_text).ok_or_else(|| {
        MarketDataError::parse(PROVIDER_ID, format!("can't parse value {value_text}"))
    })?;

    let amount = captures[1]
        .replacen(',', ".", 1)
        .replacen(' ', "", 1)
        .replace('\u{00A0}', "");
    let value = Decimal::from_str(amount.trim()).map_err(|e| {
        MarketDataError::parse(PROVIDER_ID, format!("can't parse dividend {amount} -> {e}"))
    })?;

    let currency = match &captures[2] {
        "руб" => DividendCurrency::Rur,
        "USD" | "$" => DividendCurrency::Usd,
        other => {
            return Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("can't parse currency - {other}"),
            ))
        }
    };

    let date_text = cell_text(row, 0);
    let date = DATE_REGEX
        .find(&date_text)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok())
        .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, format!("can't parse date {date_text}")))?;

    Ok(Some(SourceDividend {
        date,
        value,
        currency,
    }))
}

/// Extracts payments of the requested share class from the page.
pub fn parse_page(html: &str, preferred: bool) -> Result<Vec<SourceDividend>, MarketDataError> {
    let document = Html::parse_document(html);
    let mut rows = document.select(&ROW_SELECTOR);

    let header = rows
        .next()
        .ok_or_else(|| MarketDataError::parse(PROVIDER_ID, "no table rows"))?;
    validate_header(&header, preferred)?;

    let mut dividends = Vec::new();
    for row in rows {
        if row.text().any(|chunk| chunk.contains("ИТОГО")) {
            continue;
        }
        if let Some(dividend) = parse_row(&row, preferred)? {
            dividends.push(dividend);
        }
    }

    Ok(dividends)
}

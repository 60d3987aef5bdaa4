//! MOEX register-closing listing.
//!
//! A Windows-1251 encoded CSV with a header line. Column 0 carries a
//! free-form issuer description that contains the ticker as
//! `, TICKER [`, column 1 the register closing date.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::WINDOWS_1251;
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::MarketDataError;
use crate::http::{get_ok, HttpGetter};
use crate::models::ClosingRecord;

const URL: &str = "https://www.moex.com/ru/listing/listing-register-closing-csv.aspx";
const PROVIDER_ID: &str = "MOEX_LISTING";
const DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

lazy_static! {
    /// Ticker inside the issuer description, e.g. `ПАО Акрон, AKRN [RU0009028674]`.
    static ref TICKER_REGEX: Regex =
        Regex::new(r", ([A-Z]+-[A-Z]+|[A-Z]+|nompp) \[").expect("Invalid regex pattern");
}

/// Result of parsing the listing: good records plus per-line problems.
#[derive(Debug, Default)]
pub struct Listing {
    pub records: Vec<ClosingRecord>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct MoexListingClient {
    getter: Arc<dyn HttpGetter>,
}

impl MoexListingClient {
    pub fn new(getter: Arc<dyn HttpGetter>) -> Self {
        Self { getter }
    }

    /// Downloads the listing keeping records not older than `not_before`.
    pub async fn closings(&self, not_before: NaiveDateTime) -> Result<Listing, MarketDataError> {
        let body = get_ok(self.getter.as_ref(), PROVIDER_ID, URL, &[]).await?;

        Ok(parse_listing(&body, not_before))
    }
}

/// Decodes and parses the CSV. Broken lines are reported, not fatal.
pub fn parse_listing(body: &[u8], not_before: NaiveDateTime) -> Listing {
    let (text, _, _) = WINDOWS_1251.decode(body);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut listing = Listing::default();

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                listing.errors.push(format!("can't parse row -> {e}"));
                continue;
            }
        };

        let (Some(description), Some(raw_date)) = (record.get(0), record.get(1)) else {
            listing
                .errors
                .push(format!("too few columns in {:?}", record));
            continue;
        };

        let date = match NaiveDateTime::parse_from_str(raw_date.trim(), DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                listing
                    .errors
                    .push(format!("can't parse date {raw_date} -> {e}"));
                continue;
            }
        };

        if date < not_before {
            continue;
        }

        let Some(ticker) = TICKER_REGEX.captures(description).and_then(|c| c.get(1)) else {
            listing
                .errors
                .push(format!("can't parse ticker {description}"));
            continue;
        };

        listing.records.push(ClosingRecord {
            ticker: ticker.as_str().to_string(),
            date: date.date(),
        });
    }

    listing
}

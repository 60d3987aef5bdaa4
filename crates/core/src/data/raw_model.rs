use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use poptimizer_market_data::{DividendCurrency, SourceDividend};

use super::data_constants::DATA_START_DATE;
use crate::domain::utc_midnight;

/// Currency a dividend is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "RUR")]
    Rur,
    #[serde(rename = "USD")]
    Usd,
}

impl From<DividendCurrency> for Currency {
    fn from(currency: DividendCurrency) -> Self {
        match currency {
            DividendCurrency::Rur => Currency::Rur,
            DividendCurrency::Usd => Currency::Usd,
        }
    }
}

/// Dividend as entered by the user or found on a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDividend {
    pub date: DateTime<Utc>,
    pub value: Decimal,
    pub currency: Currency,
}

impl RawDividend {
    /// True if the dividend is after the start of tracked statistics.
    pub fn valid_date(&self) -> bool {
        let (year, month, day) = DATA_START_DATE;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(utc_midnight)
            .is_some_and(|start| start < self.date)
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.currency.cmp(&other.currency))
    }
}

impl From<SourceDividend> for RawDividend {
    fn from(div: SourceDividend) -> Self {
        Self {
            date: utc_midnight(div.date),
            value: div.value,
            currency: div.currency.into(),
        }
    }
}

/// Dividends ordered by date, value and currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RawTable(pub Vec<RawDividend>);

impl RawTable {
    pub fn sorted(mut rows: Vec<RawDividend>) -> Self {
        rows.sort_by(RawDividend::cmp_key);
        Self(rows)
    }

    pub fn exists_date(&self, date: DateTime<Utc>) -> bool {
        let n = self.0.partition_point(|row| row.date < date);
        n < self.0.len() && self.0[n].date == date
    }

    pub fn exists(&self, raw: &RawDividend) -> bool {
        self.0.binary_search_by(|row| row.cmp_key(raw)).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawDividend> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Upcoming register closing of a selected ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub ticker: String,
    pub base_ticker: String,
    pub preferred: bool,
    pub foreign: bool,
    pub date: DateTime<Utc>,
}

/// Reconciliation state of a dividend row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DividendState {
    /// Entered by the user and confirmed by the source.
    Ok,
    /// Entered by the user but absent on the source.
    Extra,
    /// Present on the source but not entered.
    Missed,
}

/// Row of the dividend comparison shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendCompareRow {
    pub date: DateTime<Utc>,
    pub value: Decimal,
    pub currency: Currency,
    pub status: DividendState,
}

/// Marks user rows against a source and adds the source rows the user lacks.
pub fn compare_with_source(raw: &RawTable, source: &RawTable) -> Vec<DividendCompareRow> {
    let mut rows: Vec<DividendCompareRow> = raw
        .iter()
        .map(|div| DividendCompareRow {
            date: div.date,
            value: div.value,
            currency: div.currency,
            status: if source.exists(div) {
                DividendState::Ok
            } else {
                DividendState::Extra
            },
        })
        .collect();

    rows.extend(
        source
            .iter()
            .filter(|div| div.valid_date() && !raw.exists(div))
            .map(|div| DividendCompareRow {
                date: div.date,
                value: div.value,
                currency: div.currency,
                status: DividendState::Missed,
            }),
    );

    rows.sort_by_key(|row| row.date);

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::day;
    use rust_decimal_macros::dec;

    fn rur(date: DateTime<Utc>, value: Decimal) -> RawDividend {
        RawDividend {
            date,
            value,
            currency: Currency::Rur,
        }
    }

    #[test]
    fn test_sorted_and_lookups() {
        let table = RawTable::sorted(vec![
            rur(day(2024, 7, 8), dec!(110)),
            rur(day(2023, 7, 12), dec!(100)),
            RawDividend {
                date: day(2023, 7, 12),
                value: dec!(100),
                currency: Currency::Usd,
            },
        ]);

        assert_eq!(table.0[0].currency, Currency::Rur);
        assert_eq!(table.0[2].date, day(2024, 7, 8));
        assert!(table.exists_date(day(2023, 7, 12)));
        assert!(!table.exists_date(day(2023, 7, 13)));
        assert!(table.exists(&rur(day(2024, 7, 8), dec!(110))));
        assert!(!table.exists(&rur(day(2024, 7, 8), dec!(111))));
    }

    #[test]
    fn test_valid_date() {
        assert!(rur(day(2015, 1, 2), dec!(1)).valid_date());
        assert!(!rur(day(2015, 1, 1), dec!(1)).valid_date());
        assert!(!rur(day(2014, 6, 1), dec!(1)).valid_date());
    }

    #[test]
    fn test_compare_with_source() {
        let raw = RawTable::sorted(vec![
            rur(day(2023, 7, 12), dec!(100)),
            rur(day(2024, 7, 8), dec!(110)),
        ]);
        let source = RawTable::sorted(vec![
            rur(day(2024, 7, 8), dec!(110)),
            rur(day(2024, 7, 9), dec!(120)),
            rur(day(2014, 1, 1), dec!(50)),
        ]);

        let rows = compare_with_source(&raw, &source);

        let states: Vec<_> = rows.iter().map(|row| (row.date, row.status)).collect();
        assert_eq!(
            states,
            vec![
                (day(2023, 7, 12), DividendState::Extra),
                (day(2024, 7, 8), DividendState::Ok),
                (day(2024, 7, 9), DividendState::Missed),
            ]
        );
    }

    #[test]
    fn test_currency_serde() {
        let json = serde_json::to_string(&rur(day(2024, 7, 8), dec!(110))).unwrap();

        assert!(json.contains("\"RUR\""));
    }
}

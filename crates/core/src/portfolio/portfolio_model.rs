use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::portfolio_constants::{CASH_TICKER, TURNOVER_WINDOWS};
use crate::data::{Candle, SecuritiesTable};
use crate::errors::{Result, ValidationError};

/// Holding of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub ticker: String,
    pub shares: i64,
    pub lot: i64,
    pub price: f64,
    pub turnover: f64,
    pub selected: bool,
}

impl Position {
    fn empty(ticker: &str, lot: i64) -> Self {
        Self {
            ticker: ticker.to_string(),
            lot,
            selected: true,
            ..Default::default()
        }
    }

    pub fn value(&self) -> f64 {
        self.price * self.shares as f64
    }

    /// True if the shares are not a whole number of lots.
    pub fn has_fractional_lots(&self) -> bool {
        match self.lot {
            lot if lot > 0 => self.shares % lot != 0,
            _ => self.shares != 0,
        }
    }
}

/// Positions sorted by ticker plus cash in roubles.
///
/// The same shape serves a single broker account and the total of all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub cash: i64,
}

impl Portfolio {
    pub fn value(&self) -> f64 {
        self.positions.iter().map(Position::value).sum::<f64>() + self.cash as f64
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.find(ticker).ok().map(|n| &self.positions[n])
    }

    fn find(&self, ticker: &str) -> std::result::Result<usize, usize> {
        self.positions
            .binary_search_by(|pos| pos.ticker.as_str().cmp(ticker))
    }

    /// Merges two portfolios adding shares of common tickers and cash.
    ///
    /// Market data of a common ticker is taken from `self`.
    pub fn sum(&self, other: &Portfolio) -> Portfolio {
        let mut positions = Vec::with_capacity(self.positions.len().max(other.positions.len()));
        let mut left = self.positions.iter().peekable();
        let mut right = other.positions.iter().peekable();

        loop {
            let next = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => match l.ticker.cmp(&r.ticker) {
                    Ordering::Less => left.next().cloned(),
                    Ordering::Greater => right.next().cloned(),
                    Ordering::Equal => {
                        let shares = r.shares;
                        right.next();
                        left.next().map(|pos| Position {
                            shares: pos.shares + shares,
                            ..pos.clone()
                        })
                    }
                },
                (Some(_), None) => left.next().cloned(),
                (None, Some(_)) => right.next().cloned(),
                (None, None) => break,
            };
            positions.extend(next);
        }

        Portfolio {
            positions,
            cash: self.cash + other.cash,
        }
    }

    /// Reconciles positions with the securities table.
    ///
    /// Lots and selection follow the table. Selected tickers missing from the
    /// portfolio are added empty; empty positions of unselected or delisted
    /// tickers are dropped. On a new day turnover is reset until fresh
    /// market data arrives. Returns the problems of the retained positions.
    pub fn update_sec(&mut self, table: &SecuritiesTable, new_day: bool) -> Vec<ValidationError> {
        let mut positions = Vec::with_capacity(self.positions.len());
        let mut held = std::mem::take(&mut self.positions).into_iter().peekable();
        let mut listed = table.iter().peekable();

        loop {
            match (held.peek(), listed.peek()) {
                (Some(pos), Some(sec)) => match pos.ticker.cmp(&sec.ticker) {
                    Ordering::Less => {
                        positions.extend(held.next().filter(|pos| pos.shares > 0).map(delisted));
                    }
                    Ordering::Greater => {
                        if sec.selected {
                            positions.push(Position::empty(&sec.ticker, sec.lot));
                        }
                        listed.next();
                    }
                    Ordering::Equal => {
                        if sec.selected || pos.shares != 0 {
                            positions.extend(held.next().map(|pos| Position {
                                lot: sec.lot,
                                selected: sec.selected,
                                ..pos
                            }));
                        } else {
                            held.next();
                        }
                        listed.next();
                    }
                },
                (Some(_), None) => {
                    positions.extend(held.next().filter(|pos| pos.shares > 0).map(delisted));
                }
                (None, Some(sec)) => {
                    if sec.selected {
                        positions.push(Position::empty(&sec.ticker, sec.lot));
                    }
                    listed.next();
                }
                (None, None) => break,
            }
        }

        if new_day {
            for pos in &mut positions {
                pos.turnover = 0.0;
            }
        }

        self.positions = positions;

        self.validate()
    }

    /// Problems of the current positions: fractional lots and unselected holdings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errs = Vec::new();

        for pos in &self.positions {
            if pos.has_fractional_lots() {
                errs.push(ValidationError::FractionalLots {
                    ticker: pos.ticker.clone(),
                });
            }

            if !pos.selected {
                errs.push(ValidationError::NotSelected {
                    ticker: pos.ticker.clone(),
                });
            }
        }

        errs
    }

    /// Applies prices and turnovers to the positions found in the cache.
    pub fn update_market_data(&mut self, cache: &HashMap<String, MarketData>) {
        for pos in &mut self.positions {
            if let Some(data) = cache.get(&pos.ticker) {
                pos.price = data.price;
                pos.turnover = data.turnover;
            }
        }
    }

    /// Sets the number of shares of a ticker, or the cash for the cash ticker.
    pub fn set_amount(&mut self, ticker: &str, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(ValidationError::InvalidInput(format!(
                "{amount} amount must be positive"
            ))
            .into());
        }

        if ticker == CASH_TICKER {
            self.cash = amount;
            return Ok(());
        }

        let n = self.find(ticker).map_err(|_| {
            ValidationError::InvalidInput(format!("{ticker} not found in portfolio"))
        })?;
        let pos = &mut self.positions[n];

        let candidate = Position {
            shares: amount,
            ..pos.clone()
        };
        if candidate.has_fractional_lots() {
            return Err(ValidationError::InvalidInput(format!(
                "{amount} amount have fractional lots {} for {ticker}",
                pos.lot
            ))
            .into());
        }

        pos.shares = amount;

        Ok(())
    }
}

fn delisted(pos: Position) -> Position {
    Position {
        selected: false,
        ..pos
    }
}

/// Last price and liquidity of a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketData {
    pub price: f64,
    pub turnover: f64,
}

impl MarketData {
    /// Market data as of `date` from the quote history.
    ///
    /// Turnover is zero if the ticker did not trade on that date.
    pub fn from_quotes(date: DateTime<Utc>, quotes: &[Candle]) -> Self {
        let Some(last) = quotes.last() else {
            return Self::default();
        };

        let turnover = if last.date == date {
            min_median_turnover(quotes)
        } else {
            0.0
        };

        Self {
            price: last.close,
            turnover,
        }
    }
}

/// Smallest of the turnover medians over the tracked windows.
///
/// Days missing from a short history count as zero turnover.
pub fn min_median_turnover(quotes: &[Candle]) -> f64 {
    TURNOVER_WINDOWS
        .iter()
        .map(|&window| {
            let start = quotes.len().saturating_sub(window);
            let mut values = vec![0.0; window - (quotes.len() - start)];
            values.extend(quotes[start..].iter().map(|row| row.turnover));

            median(values)
        })
        .fold(f64::INFINITY, f64::min)
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;

    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

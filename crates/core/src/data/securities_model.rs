use serde::{Deserialize, Serialize};

use poptimizer_market_data::provider::iss::BOARD_FQBR;
use poptimizer_market_data::BoardSecurity;

const PREFERRED_TYPE: &str = "2";
const PREFERRED_SUFFIX: &str = "P";
const FOREIGN_SUFFIX: &str = "-RM";

/// Security traded on one of the tracked boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub ticker: String,
    pub lot: i64,
    pub isin: String,
    pub board: String,
    #[serde(rename = "type")]
    pub sec_type: String,
    pub instrument: String,
    pub selected: bool,
}

impl Security {
    pub fn is_preferred(&self) -> bool {
        self.sec_type == PREFERRED_TYPE
    }

    pub fn is_foreign(&self) -> bool {
        self.board == BOARD_FQBR
    }

    /// Ticker of the issuer's common share.
    pub fn base_ticker(&self) -> &str {
        if self.is_preferred() {
            self.ticker
                .strip_suffix(PREFERRED_SUFFIX)
                .unwrap_or(&self.ticker)
        } else if self.is_foreign() {
            self.ticker.strip_suffix(FOREIGN_SUFFIX).unwrap_or(&self.ticker)
        } else {
            &self.ticker
        }
    }
}

/// Securities sorted by ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SecuritiesTable(pub Vec<Security>);

impl SecuritiesTable {
    pub fn get(&self, ticker: &str) -> Option<&Security> {
        self.0
            .binary_search_by(|sec| sec.ticker.as_str().cmp(ticker))
            .ok()
            .map(|n| &self.0[n])
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut Security> {
        match self.0.binary_search_by(|sec| sec.ticker.as_str().cmp(ticker)) {
            Ok(n) => Some(&mut self.0[n]),
            Err(_) => None,
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Security> {
        self.0.iter().filter(|sec| sec.selected)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Security> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New table from a board listing keeping the selection of known tickers.
    pub fn refreshed(&self, listing: Vec<BoardSecurity>) -> Self {
        let mut table: Vec<Security> = listing
            .into_iter()
            .map(|row| Security {
                selected: self.get(&row.ticker).is_some_and(|sec| sec.selected),
                ticker: row.ticker,
                lot: row.lot,
                isin: row.isin,
                board: row.board,
                sec_type: row.sec_type,
                instrument: row.instrument,
            })
            .collect();

        table.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        Self(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(ticker: &str, board: &str, sec_type: &str) -> BoardSecurity {
        BoardSecurity {
            ticker: ticker.to_string(),
            lot: 10,
            isin: format!("RU{ticker}"),
            board: board.to_string(),
            sec_type: sec_type.to_string(),
            instrument: "EQIN".to_string(),
        }
    }

    fn security(ticker: &str, board: &str, sec_type: &str) -> Security {
        Security {
            ticker: ticker.to_string(),
            board: board.to_string(),
            sec_type: sec_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_ticker() {
        assert_eq!(security("SBERP", "TQBR", "2").base_ticker(), "SBER");
        assert_eq!(security("AAPL-RM", "FQBR", "1").base_ticker(), "AAPL");
        assert_eq!(security("AKRN", "TQBR", "1").base_ticker(), "AKRN");
        assert!(security("AAPL-RM", "FQBR", "1").is_foreign());
        assert!(!security("AKRN", "TQBR", "1").is_preferred());
    }

    #[test]
    fn test_refreshed_keeps_selection_and_sorts() {
        let mut old = security("GAZP", "TQBR", "1");
        old.selected = true;
        let mut gone = security("AFKS", "TQBR", "1");
        gone.selected = true;
        let table = SecuritiesTable(vec![gone, old]);

        let fresh = table.refreshed(vec![
            listed("SBER", "TQBR", "1"),
            listed("GAZP", "TQBR", "1"),
            listed("AKRN", "TQBR", "1"),
        ]);

        let tickers: Vec<_> = fresh.iter().map(|sec| sec.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AKRN", "GAZP", "SBER"]);
        assert!(fresh.get("GAZP").unwrap().selected);
        assert!(!fresh.get("SBER").unwrap().selected);
        assert!(fresh.get("AFKS").is_none());
        assert_eq!(fresh.selected().count(), 1);
    }
}

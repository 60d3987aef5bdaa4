//! Tests for positions, portfolio reconciliation and market data.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::data::{Candle, SecuritiesTable, Security};
    use crate::domain::testing::day;
    use crate::errors::Error;
    use crate::portfolio::{min_median_turnover, MarketData, Portfolio, Position};

    fn pos(ticker: &str, shares: i64, lot: i64, price: f64, turnover: f64, selected: bool) -> Position {
        Position {
            ticker: ticker.to_string(),
            shares,
            lot,
            price,
            turnover,
            selected,
        }
    }

    fn sec(ticker: &str, lot: i64, selected: bool) -> Security {
        Security {
            ticker: ticker.to_string(),
            lot,
            selected,
            ..Default::default()
        }
    }

    fn candles(turnovers: impl IntoIterator<Item = f64>) -> Vec<Candle> {
        turnovers
            .into_iter()
            .enumerate()
            .map(|(n, turnover)| Candle {
                date: day(2020, 1, 1) + chrono::Duration::days(n as i64),
                open: 1.0,
                close: 2.0 + n as f64,
                high: 3.0,
                low: 1.0,
                turnover,
            })
            .collect()
    }

    fn messages(errs: Vec<crate::errors::ValidationError>) -> Vec<String> {
        errs.into_iter().map(|err| err.to_string()).collect()
    }

    // ==================== Values ====================

    #[test]
    fn test_position_and_portfolio_value() {
        let port = Portfolio {
            positions: vec![pos("A", 1, 1, 2.0, 0.0, true), pos("B", 3, 1, 4.0, 0.0, true)],
            cash: 5,
        };

        assert_eq!(port.positions[1].value(), 12.0);
        assert_eq!(port.value(), 19.0);
        assert_eq!(Portfolio::default().value(), 0.0);
    }

    #[test]
    fn test_sum_merges_by_ticker() {
        let first = Portfolio {
            positions: vec![
                pos("AKRN", 1, 10, 2.0, 11.0, false),
                pos("GAZP", 2, 100, 5.0, 4.0, true),
            ],
            cash: 13,
        };
        let second = Portfolio {
            positions: vec![
                pos("GAZP", 3, 100, 5.0, 4.0, true),
                pos("TRUR", 4, 100, 6.0, 4.0, true),
            ],
            cash: 25,
        };
        let total = Portfolio {
            positions: vec![
                pos("AKRN", 1, 10, 2.0, 11.0, false),
                pos("GAZP", 5, 100, 5.0, 4.0, true),
                pos("TRUR", 4, 100, 6.0, 4.0, true),
            ],
            cash: 38,
        };

        assert_eq!(first.sum(&second), total);
        assert_eq!(second.sum(&first), total);
        assert_eq!(Portfolio::default().sum(&first), first);
    }

    // ==================== Securities reconciliation ====================

    #[test]
    fn test_update_sec_same_day() {
        let mut port = Portfolio {
            positions: vec![
                pos("AKRN", 10, 10, 2.0, 11.0, true),
                pos("GAZP", 2, 100, 5.0, 4.0, false),
            ],
            cash: 111,
        };
        let table = SecuritiesTable(vec![
            sec("GAZP", 10, true),
            sec("TRUR", 100, false),
            sec("UPRO", 1, true),
        ]);

        let errs = port.update_sec(&table, false);

        assert_eq!(messages(errs), vec!["AKRN not selected", "GAZP have fractional lots"]);
        assert_eq!(
            port,
            Portfolio {
                positions: vec![
                    pos("AKRN", 10, 10, 2.0, 11.0, false),
                    pos("GAZP", 2, 10, 5.0, 4.0, true),
                    pos("UPRO", 0, 1, 0.0, 0.0, true),
                ],
                cash: 111,
            }
        );
    }

    #[test]
    fn test_update_sec_new_day_resets_turnover_and_drops_empty() {
        let mut port = Portfolio {
            positions: vec![
                pos("AKRN", 10, 10, 2.0, 11.0, true),
                pos("GAZP", 2, 100, 5.0, 4.0, false),
                pos("TRUR", 0, 100, 7.0, 3.0, true),
                pos("VSMO", 0, 1, 9.0, 11.0, true),
                pos("ZZZZ", 23, 1, 9.0, 11.0, true),
            ],
            cash: 111,
        };
        let table = SecuritiesTable(vec![
            sec("GAZP", 10, true),
            sec("TRUR", 100, false),
            sec("UPRO", 1, true),
        ]);

        let errs = port.update_sec(&table, true);

        assert_eq!(
            messages(errs),
            vec!["AKRN not selected", "GAZP have fractional lots", "ZZZZ not selected"]
        );
        assert_eq!(
            port.positions,
            vec![
                pos("AKRN", 10, 10, 2.0, 0.0, false),
                pos("GAZP", 2, 10, 5.0, 0.0, true),
                pos("UPRO", 0, 1, 0.0, 0.0, true),
                pos("ZZZZ", 23, 1, 9.0, 0.0, false),
            ]
        );
    }

    #[test]
    fn test_lot_change_keeps_fractional_position() {
        let mut port = Portfolio {
            positions: vec![pos("GAZP", 15, 1, 160.0, 1e9, true)],
            cash: 0,
        };

        let errs = port.update_sec(&SecuritiesTable(vec![sec("GAZP", 10, true)]), false);

        assert_eq!(messages(errs), vec!["GAZP have fractional lots"]);
        assert_eq!(port.position("GAZP").map(|pos| (pos.shares, pos.lot)), Some((15, 10)));
    }

    // ==================== Editing ====================

    #[test]
    fn test_set_amount() {
        let mut port = Portfolio {
            positions: vec![pos("AKRN", 0, 10, 2.0, 0.0, true)],
            cash: 0,
        };

        port.set_amount("RUR", 1_000).unwrap();
        port.set_amount("AKRN", 30).unwrap();

        assert_eq!(port.cash, 1_000);
        assert_eq!(port.positions[0].shares, 30);
        assert!(matches!(port.set_amount("AKRN", -10), Err(Error::Validation(_))));
        assert!(matches!(port.set_amount("AKRN", 15), Err(Error::Validation(_))));
        assert!(matches!(port.set_amount("GAZP", 10), Err(Error::Validation(_))));
        assert_eq!(port.positions[0].shares, 30);
    }

    // ==================== Market data ====================

    #[test]
    fn test_update_market_data_touches_cached_only() {
        let mut port = Portfolio {
            positions: vec![
                pos("AKRN", 10, 10, 2.0, 11.0, true),
                pos("GAZP", 2, 100, 5.0, 4.0, true),
            ],
            cash: 111,
        };
        let cache = HashMap::from([(
            "AKRN".to_string(),
            MarketData {
                price: 3.0,
                turnover: 10.0,
            },
        )]);

        port.update_market_data(&cache);

        assert_eq!(port.positions[0], pos("AKRN", 10, 10, 3.0, 10.0, true));
        assert_eq!(port.positions[1], pos("GAZP", 2, 100, 5.0, 4.0, true));
    }

    #[test]
    fn test_min_median_turnover_long_history() {
        let quotes = candles((0..600).map(f64::from));

        assert_eq!(min_median_turnover(&quotes), 326.5);
    }

    #[test]
    fn test_min_median_turnover_pads_short_history_with_zeros() {
        assert_eq!(min_median_turnover(&candles(vec![5.0; 20])), 0.0);
        assert_eq!(min_median_turnover(&[]), 0.0);
    }

    #[test]
    fn test_market_data_is_stale_without_trading_on_date() {
        let quotes = candles(vec![7.0; 600]);
        let last = quotes[599].date;

        let fresh = MarketData::from_quotes(last, &quotes);
        let stale = MarketData::from_quotes(last + chrono::Duration::days(1), &quotes);

        assert_eq!(fresh.price, 601.0);
        assert_eq!(fresh.turnover, 7.0);
        assert_eq!(stale.price, 601.0);
        assert_eq!(stale.turnover, 0.0);
        assert_eq!(MarketData::from_quotes(last, &[]), MarketData::default());
    }
}

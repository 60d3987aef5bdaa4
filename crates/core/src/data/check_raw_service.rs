use std::sync::Arc;

use super::data_constants::{DATE_FORMAT, RAW_DIV_GROUP};
use super::raw_model::{RawTable, Status};
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, ValidationError};
use crate::events::{warn_and_report, ErrorSink};

pub fn raw_id(ticker: &str) -> QualifiedId {
    QualifiedId::new(DATA_SUB, RAW_DIV_GROUP, ticker)
}

/// Compares upcoming closings with the dividends the user entered.
pub struct CheckRawService {
    repo: Arc<dyn AggregateRepositoryTrait<RawTable>>,
    sink: Arc<dyn ErrorSink>,
}

impl CheckRawService {
    pub fn new(repo: Arc<dyn AggregateRepositoryTrait<RawTable>>, sink: Arc<dyn ErrorSink>) -> Self {
        Self { repo, sink }
    }

    /// Reports every closing without a user dividend at its date and
    /// returns those closings.
    pub async fn check(&self, rows: &[Status]) -> Vec<Status> {
        let mut missed = Vec::new();

        for row in rows {
            let qid = raw_id(&row.ticker);
            let agg = match self.repo.get(&qid).await {
                Ok(agg) => agg,
                Err(err) => {
                    warn_and_report(self.sink.as_ref(), &err.within(&qid));
                    continue;
                }
            };

            if agg.entity().exists_date(row.date) {
                continue;
            }

            let err = ValidationError::MissedDividend {
                ticker: row.ticker.clone(),
                date: row.date.format(DATE_FORMAT).to_string(),
            };
            warn_and_report(self.sink.as_ref(), &Error::from(err).within(&qid));
            missed.push(row.clone());
        }

        missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw_model::{Currency, RawDividend};
    use crate::domain::testing::{day, MemoryStore};
    use crate::events::MockErrorSink;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn status(ticker: &str, date: DateTime<Utc>) -> Status {
        Status {
            ticker: ticker.to_string(),
            base_ticker: ticker.to_string(),
            preferred: false,
            foreign: false,
            date,
        }
    }

    #[tokio::test]
    async fn test_check_returns_missed_only() {
        let store = MemoryStore::new();
        store.put(
            raw_id("AKRN"),
            1,
            day(2024, 1, 1),
            &RawTable(vec![RawDividend {
                date: day(2024, 7, 8),
                value: dec!(110),
                currency: Currency::Rur,
            }]),
        );
        let sink = MockErrorSink::new();
        let service = CheckRawService::new(Arc::new(store), Arc::new(sink.clone()));

        let missed = service
            .check(&[status("AKRN", day(2024, 7, 8)), status("SBER", day(2024, 7, 11))])
            .await;

        assert_eq!(missed, vec![status("SBER", day(2024, 7, 11))]);
        assert_eq!(
            sink.messages(),
            vec!["data/raw_div/SBER -> Input validation failed: SBER missed dividend at 2024-07-11"]
        );
    }
}

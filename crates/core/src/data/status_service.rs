use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;

use poptimizer_market_data::{ClosingRecord, MoexListingClient};

use super::data_constants::STATUS_GROUP;
use super::raw_model::Status;
use super::securities_model::SecuritiesTable;
use crate::domain::{utc_midnight, AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};
use crate::utils::Clock;

/// Default look-back window of the register-closing listing.
pub const DEFAULT_STATUS_LOOKBACK_DAYS: i64 = 14;

pub fn status_id() -> QualifiedId {
    QualifiedId::singleton(DATA_SUB, STATUS_GROUP)
}

/// Collects upcoming register closings of the selected tickers.
pub struct StatusService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Status>>>,
    listing: MoexListingClient,
    clock: Arc<dyn Clock>,
    lookback: Duration,
    sink: Arc<dyn ErrorSink>,
}

impl StatusService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Status>>>,
        listing: MoexListingClient,
        clock: Arc<dyn Clock>,
        lookback_days: i64,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            repo,
            listing,
            clock,
            lookback: Duration::days(lookback_days),
            sink,
        }
    }

    /// Returns the stored rows; empty if nothing was found or the update failed.
    pub async fn update(&self, date: DateTime<Utc>, table: &SecuritiesTable) -> Vec<Status> {
        let qid = status_id();
        match self.try_update(&qid, date, table).await {
            Ok(rows) => rows,
            Err(err) => {
                warn_and_report(self.sink.as_ref(), &err.within(&qid));
                Vec::new()
            }
        }
    }

    async fn try_update(
        &self,
        qid: &QualifiedId,
        date: DateTime<Utc>,
        table: &SecuritiesTable,
    ) -> Result<Vec<Status>> {
        let mut agg = self.repo.get(qid).await?;

        let not_before = (self.clock.now() - self.lookback).naive_utc();
        let listing = self.listing.closings(not_before).await?;

        for problem in listing.errors {
            warn_and_report(self.sink.as_ref(), &Error::Parse(problem).within(qid));
        }

        let rows = select_closings(listing.records, table);
        if rows.is_empty() || &rows == agg.entity() {
            return Ok(rows);
        }

        agg.update(rows, date);
        self.repo.save(&mut agg).await?;
        info!("{qid} updated with {} rows", agg.entity().len());

        Ok(agg.into_entity())
    }
}

/// Keeps closings of selected tickers sorted by ticker and date.
fn select_closings(records: Vec<ClosingRecord>, table: &SecuritiesTable) -> Vec<Status> {
    let mut rows: Vec<Status> = records
        .into_iter()
        .filter_map(|record| {
            let sec = table.get(&record.ticker).filter(|sec| sec.selected)?;

            Some(Status {
                base_ticker: sec.base_ticker().to_string(),
                preferred: sec.is_preferred(),
                foreign: sec.is_foreign(),
                ticker: record.ticker,
                date: utc_midnight(record.date),
            })
        })
        .collect();

    rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));

    rows
}

//! Dividend history scraped from public sources.
//!
//! Russian shares are looked up on the close-registers site, foreign ones
//! on NASDAQ. Both keep one full-replace aggregate per ticker.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::info;

use poptimizer_market_data::{CloseReestryClient, NasdaqClient};

use super::data_constants::{CLOSE_REESTRY_GROUP, NASDAQ_GROUP};
use super::raw_model::{RawDividend, RawTable, Status};
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::Result;
use crate::events::{warn_and_report, ErrorSink};

/// A site that publishes dividend history for some tickers.
#[async_trait]
pub trait DividendSourceTrait: Send + Sync {
    /// Group the scraped tables are stored in.
    fn group(&self) -> &'static str;

    /// True if the source covers the ticker of the closing.
    fn accepts(&self, status: &Status) -> bool;

    async fn fetch(&self, status: &Status) -> Result<Vec<RawDividend>>;
}

#[async_trait]
impl DividendSourceTrait for CloseReestryClient {
    fn group(&self) -> &'static str {
        CLOSE_REESTRY_GROUP
    }

    fn accepts(&self, status: &Status) -> bool {
        !status.foreign
    }

    async fn fetch(&self, status: &Status) -> Result<Vec<RawDividend>> {
        let rows = self.dividends(&status.base_ticker, status.preferred).await?;

        Ok(rows.into_iter().map(RawDividend::from).collect())
    }
}

#[async_trait]
impl DividendSourceTrait for NasdaqClient {
    fn group(&self) -> &'static str {
        NASDAQ_GROUP
    }

    fn accepts(&self, status: &Status) -> bool {
        status.foreign
    }

    async fn fetch(&self, status: &Status) -> Result<Vec<RawDividend>> {
        let rows = self.dividends(&status.base_ticker).await?;

        Ok(rows.into_iter().map(RawDividend::from).collect())
    }
}

/// Refreshes the source tables of tickers with an upcoming closing.
pub struct DividendSourceService {
    repo: Arc<dyn AggregateRepositoryTrait<RawTable>>,
    source: Arc<dyn DividendSourceTrait>,
    sink: Arc<dyn ErrorSink>,
    concurrency: usize,
}

impl DividendSourceService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<RawTable>>,
        source: Arc<dyn DividendSourceTrait>,
        sink: Arc<dyn ErrorSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            repo,
            source,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn update(&self, date: DateTime<Utc>, rows: &[Status]) {
        stream::iter(rows.iter().filter(|status| self.source.accepts(status)))
            .for_each_concurrent(self.concurrency, |status| async move {
                let qid = QualifiedId::new(DATA_SUB, self.source.group(), &status.ticker);
                if let Err(err) = self.update_one(&qid, date, status).await {
                    warn_and_report(self.sink.as_ref(), &err.within(&qid));
                }
            })
            .await;
        info!("{} update is finished", self.source.group());
    }

    async fn update_one(&self, qid: &QualifiedId, date: DateTime<Utc>, status: &Status) -> Result<()> {
        let mut agg = self.repo.get(qid).await?;

        if agg.entity().exists_date(status.date) || agg.timestamp() == date {
            return Ok(());
        }

        let table = RawTable::sorted(self.source.fetch(status).await?);
        if &table == agg.entity() {
            return Ok(());
        }

        agg.update(table, date);
        self.repo.save(&mut agg).await?;
        info!("{qid} updated");

        Ok(())
    }
}

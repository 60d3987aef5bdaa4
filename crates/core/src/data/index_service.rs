use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::info;

use poptimizer_market_data::provider::iss::{ENGINE_STOCK, MARKET_INDEX};
use poptimizer_market_data::IssClient;

use super::data_constants::{INDEXES, INDEXES_GROUP};
use super::market_model::Candle;
use super::series;
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::Result;
use crate::events::{warn_and_report, ErrorSink};

pub fn index_id(index: &str) -> QualifiedId {
    QualifiedId::new(DATA_SUB, INDEXES_GROUP, index)
}

/// Appends daily history of the tracked indexes.
pub struct IndexService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
    iss: IssClient,
    sink: Arc<dyn ErrorSink>,
}

impl IndexService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
        iss: IssClient,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self { repo, iss, sink }
    }

    /// Updates every index concurrently; a failure affects only its index.
    pub async fn update(&self, date: DateTime<Utc>) {
        join_all(INDEXES.iter().map(|index| self.update_one(index, date))).await;
    }

    async fn update_one(&self, index: &str, date: DateTime<Utc>) {
        let qid = index_id(index);
        if let Err(err) = self.try_update(&qid, index, date).await {
            warn_and_report(self.sink.as_ref(), &err.within(&qid));
        }
    }

    async fn try_update(&self, qid: &QualifiedId, index: &str, date: DateTime<Utc>) -> Result<()> {
        let mut agg = self.repo.get(qid).await?;
        let from = agg.entity().last().map(|row| row.date.date_naive());

        let rows: Vec<Candle> = self
            .iss
            .market_history(ENGINE_STOCK, MARKET_INDEX, index, from, date.date_naive())
            .await?
            .into_iter()
            .map(Candle::from)
            .collect();

        if series::append(&mut agg, rows, date)? {
            self.repo.save(&mut agg).await?;
            info!("{qid} updated");
        }

        Ok(())
    }
}

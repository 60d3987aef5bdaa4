use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use poptimizer_market_data::provider::iss::{ENGINE_CURRENCY, INTERVAL_DAY, MARKET_SELT};
use poptimizer_market_data::IssClient;

use super::data_constants::{USD_GROUP, USD_TICKER};
use super::market_model::Candle;
use super::series;
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::Result;
use crate::events::{warn_and_report, ErrorSink};

pub fn usd_id() -> QualifiedId {
    QualifiedId::singleton(DATA_SUB, USD_GROUP)
}

/// Appends USD/RUB candles.
pub struct UsdService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
    iss: IssClient,
    sink: Arc<dyn ErrorSink>,
}

impl UsdService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
        iss: IssClient,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self { repo, iss, sink }
    }

    /// Returns the whole rate table, or nothing if the update failed.
    pub async fn update(&self, date: DateTime<Utc>) -> Option<Vec<Candle>> {
        let qid = usd_id();
        match self.try_update(&qid, date).await {
            Ok(rates) => Some(rates),
            Err(err) => {
                warn_and_report(self.sink.as_ref(), &err.within(&qid));
                None
            }
        }
    }

    async fn try_update(&self, qid: &QualifiedId, date: DateTime<Utc>) -> Result<Vec<Candle>> {
        let mut agg = self.repo.get(qid).await?;
        let from = agg.entity().last().map(|row| row.date.date_naive());

        let rows: Vec<Candle> = self
            .iss
            .market_candles(
                ENGINE_CURRENCY,
                MARKET_SELT,
                USD_TICKER,
                from,
                date.date_naive(),
                INTERVAL_DAY,
            )
            .await?
            .into_iter()
            .map(Candle::from)
            .collect();

        if series::append(&mut agg, rows, date)? {
            self.repo.save(&mut agg).await?;
            info!("{qid} updated");
        }

        Ok(agg.into_entity())
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::info;

use poptimizer_market_data::provider::iss::{
    BOARD_FQBR, BOARD_TQBR, BOARD_TQTF, ENGINE_STOCK, INTERVAL_DAY, MARKET_FOREIGN_SHARES,
    MARKET_SHARES,
};
use poptimizer_market_data::IssClient;

use super::data_constants::QUOTES_GROUP;
use super::market_model::Candle;
use super::securities_model::{SecuritiesTable, Security};
use super::series;
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};

pub fn quote_id(ticker: &str) -> QualifiedId {
    QualifiedId::new(DATA_SUB, QUOTES_GROUP, ticker)
}

fn market(board: &str) -> Result<&'static str> {
    match board {
        BOARD_TQBR | BOARD_TQTF => Ok(MARKET_SHARES),
        BOARD_FQBR => Ok(MARKET_FOREIGN_SHARES),
        _ => Err(Error::Parse(format!("unknown board {board}"))),
    }
}

/// Appends daily candles of every listed share, selected or not.
pub struct QuotesService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
    iss: IssClient,
    sink: Arc<dyn ErrorSink>,
    concurrency: usize,
}

impl QuotesService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
        iss: IssClient,
        sink: Arc<dyn ErrorSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            repo,
            iss,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn update(&self, date: DateTime<Utc>, table: &SecuritiesTable) {
        stream::iter(table.iter())
            .for_each_concurrent(self.concurrency, |sec| async move {
                let qid = quote_id(&sec.ticker);
                if let Err(err) = self.try_update(&qid, sec, date).await {
                    warn_and_report(self.sink.as_ref(), &err.within(&qid));
                }
            })
            .await;
        info!("quotes update is finished");
    }

    async fn try_update(&self, qid: &QualifiedId, sec: &Security, date: DateTime<Utc>) -> Result<()> {
        let market = market(&sec.board)?;
        let mut agg = self.repo.get(qid).await?;
        let from = agg.entity().last().map(|row| row.date.date_naive());

        let rows: Vec<Candle> = self
            .iss
            .market_candles(
                ENGINE_STOCK,
                market,
                &sec.ticker,
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
        }

        Ok(())
    }
}

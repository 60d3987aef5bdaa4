use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::check_raw_service::raw_id;
use super::data_constants::{DATE_FORMAT, DIV_GROUP};
use super::market_model::Candle;
use super::raw_model::{Currency, RawTable};
use super::securities_model::SecuritiesTable;
use super::series::{validate_increasing, DatedRow};
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};

pub fn div_id(ticker: &str) -> QualifiedId {
    QualifiedId::new(DATA_SUB, DIV_GROUP, ticker)
}

/// Dividends of one date in roubles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dividend {
    pub date: DateTime<Utc>,
    pub value: Decimal,
}

impl DatedRow for Dividend {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Sums raw dividends by date converting USD at the rate of that day.
///
/// The rate is the close of the last candle dated on or before the dividend.
pub fn convert(raw: &RawTable, rates: &[Candle]) -> Result<Vec<Dividend>> {
    let mut dividends: Vec<Dividend> = Vec::new();

    for row in raw.iter() {
        let value = match row.currency {
            Currency::Rur => row.value,
            Currency::Usd => row.value * usd_rate(rates, row.date)?,
        };

        match dividends.last_mut() {
            Some(last) if last.date == row.date => last.value += value,
            _ => dividends.push(Dividend {
                date: row.date,
                value,
            }),
        }
    }

    Ok(dividends)
}

fn usd_rate(rates: &[Candle], date: DateTime<Utc>) -> Result<Decimal> {
    let n = rates.partition_point(|rate| rate.date <= date);
    let rate = n
        .checked_sub(1)
        .and_then(|n| rates.get(n))
        .ok_or_else(|| Error::NotFound(format!("usd rate for {}", date.format(DATE_FORMAT))))?;

    Decimal::try_from(rate.close)
        .map_err(|err| Error::Parse(format!("bad usd rate {} -> {err}", rate.close)))
}

/// Derives rouble dividends of the selected tickers.
pub struct DividendsService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Dividend>>>,
    raw: Arc<dyn AggregateRepositoryTrait<RawTable>>,
    sink: Arc<dyn ErrorSink>,
    concurrency: usize,
}

impl DividendsService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Dividend>>>,
        raw: Arc<dyn AggregateRepositoryTrait<RawTable>>,
        sink: Arc<dyn ErrorSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            repo,
            raw,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn update(&self, date: DateTime<Utc>, table: &SecuritiesTable, rates: &[Candle]) {
        stream::iter(table.selected())
            .for_each_concurrent(self.concurrency, |sec| async move {
                let qid = div_id(&sec.ticker);
                if let Err(err) = self.update_one(&qid, &sec.ticker, date, rates).await {
                    warn_and_report(self.sink.as_ref(), &err.within(&qid));
                }
            })
            .await;
        info!("dividends update is finished");
    }

    async fn update_one(
        &self,
        qid: &QualifiedId,
        ticker: &str,
        date: DateTime<Utc>,
        rates: &[Candle],
    ) -> Result<()> {
        let raw = self.raw.get(&raw_id(ticker)).await?;
        if raw.entity().is_empty() {
            return Ok(());
        }

        let dividends = convert(raw.entity(), rates)?;
        validate_increasing(&dividends)?;

        let mut agg = self.repo.get(qid).await?;
        if agg.entity() == &dividends {
            return Ok(());
        }

        agg.update(dividends, date);
        self.repo.save(&mut agg).await?;

        Ok(())
    }
}

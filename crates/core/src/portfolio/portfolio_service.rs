use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use super::portfolio_constants::{account_id, portfolio_id, ACCOUNTS_GROUP, NEW_ACCOUNT, PORTFOLIO_GROUP};
use super::portfolio_model::{MarketData, Portfolio};
use crate::data::{quote_id, securities_id, Candle, SecuritiesTable};
use crate::domain::{Aggregate, AggregateRepositoryTrait, QualifiedId, PORTFOLIO_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};

/// Re-derives the accounts and the dated total portfolio from fresh market data.
pub struct PortfolioService {
    repo: Arc<dyn AggregateRepositoryTrait<Portfolio>>,
    securities: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
    quotes: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
    sink: Arc<dyn ErrorSink>,
}

impl PortfolioService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Portfolio>>,
        securities: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
        quotes: Arc<dyn AggregateRepositoryTrait<Vec<Candle>>>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            repo,
            securities,
            quotes,
            sink,
        }
    }

    pub async fn update(&self) {
        if let Err(err) = self.try_update().await {
            let origin = QualifiedId::singleton(PORTFOLIO_SUB, PORTFOLIO_GROUP);
            warn_and_report(self.sink.as_ref(), &err.within(origin));
        }
        info!("portfolio update is finished");
    }

    async fn try_update(&self) -> Result<()> {
        let sec = self.securities.get(&securities_id()).await?;
        if sec.is_new() {
            warn!("no securities to build portfolio");
            return Ok(());
        }
        let date = sec.timestamp();

        let mut aggs = self.load_accounts().await?;
        for agg in &mut aggs {
            self.update_sec(agg, sec.entity(), date);
        }

        let total = aggs
            .iter()
            .fold(Portfolio::default(), |total, agg| total.sum(agg.entity()));
        let mut port = self.repo.get(&portfolio_id(date)).await?;
        port.update(total, date);

        let cache = self.market_data(port.entity(), date).await;

        aggs.push(port);
        for mut agg in aggs {
            let mut entity = agg.entity().clone();
            entity.update_market_data(&cache);
            agg.update_same_date(entity);

            if let Err(err) = self.repo.save(&mut agg).await {
                warn_and_report(self.sink.as_ref(), &err.within(agg.qid()));
            }
        }

        Ok(())
    }

    /// Every account, or the template account if there are none yet.
    async fn load_accounts(&self) -> Result<Vec<Aggregate<Portfolio>>> {
        let aggs = self.repo.get_group(PORTFOLIO_SUB, ACCOUNTS_GROUP).await?;
        if !aggs.is_empty() {
            return Ok(aggs);
        }

        info!("no accounts, creating {NEW_ACCOUNT}");

        Ok(vec![self.repo.get(&account_id(NEW_ACCOUNT)).await?])
    }

    fn update_sec(&self, agg: &mut Aggregate<Portfolio>, table: &SecuritiesTable, date: DateTime<Utc>) {
        let new_day = agg.timestamp() != date;
        let mut account = agg.entity().clone();

        for err in account.update_sec(table, new_day) {
            warn_and_report(self.sink.as_ref(), &Error::from(err).within(agg.qid()));
        }

        if new_day {
            agg.update(account, date);
        } else {
            agg.update_same_date(account);
        }
    }

    /// Prices and turnovers by ticker. Tickers whose quotes can't be loaded
    /// are reported and left out, so their positions keep the old values.
    async fn market_data(&self, total: &Portfolio, date: DateTime<Utc>) -> HashMap<String, MarketData> {
        let mut cache = HashMap::with_capacity(total.positions.len());

        for pos in &total.positions {
            let qid = quote_id(&pos.ticker);
            match self.quotes.get(&qid).await {
                Ok(quotes) => {
                    cache.insert(pos.ticker.clone(), MarketData::from_quotes(date, quotes.entity()));
                }
                Err(err) => warn_and_report(self.sink.as_ref(), &err.within(&qid)),
            }
        }

        cache
    }
}

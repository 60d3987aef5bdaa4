use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use poptimizer_market_data::provider::iss::{ENGINE_STOCK, MARKET_SHARES};
use poptimizer_market_data::IssClient;

use super::data_constants::{DATE_FORMAT, TRADING_DATE_GROUP};
use crate::domain::{utc_midnight, AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};

pub fn trading_date_id() -> QualifiedId {
    QualifiedId::singleton(DATA_SUB, TRADING_DATE_GROUP)
}

/// Tracks the last trading session published by the exchange.
pub struct TradingDatesService {
    repo: Arc<dyn AggregateRepositoryTrait<DateTime<Utc>>>,
    iss: IssClient,
}

impl TradingDatesService {
    pub fn new(repo: Arc<dyn AggregateRepositoryTrait<DateTime<Utc>>>, iss: IssClient) -> Self {
        Self { repo, iss }
    }

    /// Stored last trading date; the Unix epoch if nothing is stored yet.
    pub async fn get(&self) -> Result<DateTime<Utc>> {
        let agg = self.repo.get(&trading_date_id()).await?;

        Ok(*agg.entity())
    }

    /// Checks upstream for a session after `checked_day` and stores it.
    ///
    /// Fails with [`Error::UpdateNotRequired`] if there is none.
    pub async fn update(&self, checked_day: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let qid = trading_date_id();
        let rows = self
            .iss
            .market_dates(ENGINE_STOCK, MARKET_SHARES)
            .await
            .map_err(|err| Error::from(err).within(&qid))?;

        if rows.len() != 1 {
            return Err(
                Error::Parse(format!("wrong rows count {}", rows.len())).within(&qid)
            );
        }

        let last_trading_day = utc_midnight(rows[0].till);
        if last_trading_day <= checked_day {
            return Err(Error::UpdateNotRequired);
        }

        let mut agg = self.repo.get(&qid).await.map_err(|err| err.within(&qid))?;
        agg.update(last_trading_day, last_trading_day);
        self.repo
            .save(&mut agg)
            .await
            .map_err(|err| err.within(&qid))?;

        info!(
            "new trading day {}",
            last_trading_day.format(DATE_FORMAT)
        );

        Ok(last_trading_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{day, iss_block, MemoryStore, StaticGetter};
    use serde_json::json;

    const DATES_URL: &str = "https://iss.moex.com/iss/history/engines/stock/markets/shares/dates.json";

    fn service(store: &MemoryStore, getter: StaticGetter) -> TradingDatesService {
        TradingDatesService::new(
            Arc::new(store.clone()),
            IssClient::new(Arc::new(getter)),
        )
    }

    fn dates(rows: &[serde_json::Value]) -> String {
        iss_block("dates", &["from", "till"], rows)
    }

    #[tokio::test]
    async fn test_update_stores_new_day() {
        let store = MemoryStore::new();
        let getter = StaticGetter::new().with(DATES_URL, dates(&[json!(["1997-03-24", "2024-06-17"])]));
        let service = service(&store, getter);

        let last = service.update(day(2024, 6, 14)).await.unwrap();

        assert_eq!(last, day(2024, 6, 17));
        assert_eq!(service.get().await.unwrap(), day(2024, 6, 17));
        let (ver, ts, _) = store.load::<DateTime<Utc>>(&trading_date_id()).unwrap();
        assert_eq!((ver, ts), (1, day(2024, 6, 17)));
    }

    #[tokio::test]
    async fn test_update_not_required() {
        let store = MemoryStore::new();
        let getter = StaticGetter::new().with(DATES_URL, dates(&[json!(["1997-03-24", "2024-06-17"])]));
        let service = service(&store, getter);

        let err = service.update(day(2024, 6, 17)).await.unwrap_err();

        assert!(matches!(err, Error::UpdateNotRequired));
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_rows_count() {
        let store = MemoryStore::new();
        let getter = StaticGetter::new().with(
            DATES_URL,
            dates(&[json!(["1997-03-24", "2024-06-17"]), json!(["1997-03-24", "2024-06-18"])]),
        );
        let service = service(&store, getter);

        let err = service.update(day(2024, 6, 14)).await.unwrap_err();

        assert!(err.to_string().contains("data/trading_date/trading_date"));
        assert!(err.to_string().contains("wrong rows count 2"));
    }

    #[tokio::test]
    async fn test_get_on_empty_store_is_epoch() {
        let service = service(&MemoryStore::new(), StaticGetter::new());

        assert_eq!(service.get().await.unwrap(), DateTime::<Utc>::UNIX_EPOCH);
    }
}

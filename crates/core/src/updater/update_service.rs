//! Update cycle driver.
//!
//! Every tick compares the last ended exchange day with the last checked
//! one. When a new day has ended and the exchange published a new session,
//! all market data is refreshed with the dependencies below and the
//! portfolio is rebuilt:
//!
//! ```text
//! cpi
//! index
//! usd ───────────────┐
//! securities ─┬──────┴─ div
//!             ├─ backup
//!             ├─ quotes
//!             └─ status ─ check_raw ─┬─ close_reestry
//!                                    └─ nasdaq
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use poptimizer_market_data::{
    CloseReestryClient, HttpGetter, IssClient, MoexListingClient, NasdaqClient, RosstatClient,
};

use crate::data::{
    Candle, CheckRawService, Cpi, CpiService, Dividend, DividendSourceService, DividendsService,
    IndexService, QuotesService, RawTable, SecuritiesService, SecuritiesTable, Status,
    StatusService, TradingDatesService, UsdService, DATE_FORMAT, RAW_DIV_GROUP, SECURITIES_GROUP,
};
use crate::domain::{AggregateRepositoryTrait, BackupRestoreTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};
use crate::portfolio::{Portfolio, PortfolioService};
use crate::utils::{last_day_ended, Clock};

/// Tunables of the update cycle.
#[derive(Debug, Clone)]
pub struct UpdaterSettings {
    /// Bound of the per-ticker fan-out.
    pub concurrency: usize,
    pub cpi_sheet: String,
    pub status_lookback_days: i64,
    /// Deadline of a whole cycle.
    pub timeout: Duration,
}

/// Every service taking part in the cycle.
pub struct Updaters {
    pub trading_dates: TradingDatesService,
    pub cpi: CpiService,
    pub index: IndexService,
    pub usd: UsdService,
    pub securities: SecuritiesService,
    pub quotes: QuotesService,
    pub status: StatusService,
    pub check_raw: CheckRawService,
    pub close_reestry: DividendSourceService,
    pub nasdaq: DividendSourceService,
    pub dividends: DividendsService,
    pub portfolio: PortfolioService,
}

impl Updaters {
    /// Wires all services to one document store and one HTTP client.
    pub fn build<S>(
        store: Arc<S>,
        getter: Arc<dyn HttpGetter>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
        settings: &UpdaterSettings,
    ) -> Self
    where
        S: AggregateRepositoryTrait<DateTime<Utc>>
            + AggregateRepositoryTrait<Vec<Cpi>>
            + AggregateRepositoryTrait<Vec<Candle>>
            + AggregateRepositoryTrait<SecuritiesTable>
            + AggregateRepositoryTrait<Vec<Status>>
            + AggregateRepositoryTrait<RawTable>
            + AggregateRepositoryTrait<Vec<Dividend>>
            + AggregateRepositoryTrait<Portfolio>
            + 'static,
    {
        let iss = IssClient::new(getter.clone());
        let concurrency = settings.concurrency;

        Self {
            trading_dates: TradingDatesService::new(store.clone(), iss.clone()),
            cpi: CpiService::new(
                store.clone(),
                RosstatClient::new(getter.clone(), settings.cpi_sheet.clone()),
                sink.clone(),
            ),
            index: IndexService::new(store.clone(), iss.clone(), sink.clone()),
            usd: UsdService::new(store.clone(), iss.clone(), sink.clone()),
            securities: SecuritiesService::new(store.clone(), iss.clone(), sink.clone()),
            quotes: QuotesService::new(store.clone(), iss, sink.clone(), concurrency),
            status: StatusService::new(
                store.clone(),
                MoexListingClient::new(getter.clone()),
                clock,
                settings.status_lookback_days,
                sink.clone(),
            ),
            check_raw: CheckRawService::new(store.clone(), sink.clone()),
            close_reestry: DividendSourceService::new(
                store.clone(),
                Arc::new(CloseReestryClient::new(getter.clone())),
                sink.clone(),
                concurrency,
            ),
            nasdaq: DividendSourceService::new(
                store.clone(),
                Arc::new(NasdaqClient::new(getter)),
                sink.clone(),
                concurrency,
            ),
            dividends: DividendsService::new(store.clone(), store.clone(), sink.clone(), concurrency),
            portfolio: PortfolioService::new(store.clone(), store.clone(), store, sink),
        }
    }
}

/// Runs update cycles when a new exchange day ends.
pub struct UpdateService {
    updaters: Updaters,
    backup: Arc<dyn BackupRestoreTrait>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ErrorSink>,
    timeout: Duration,
    checked_day: DateTime<Utc>,
}

impl UpdateService {
    pub fn new(
        updaters: Updaters,
        backup: Arc<dyn BackupRestoreTrait>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ErrorSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            updaters,
            backup,
            clock,
            sink,
            timeout,
            checked_day: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Restores user-edited groups and loads the last known trading day.
    ///
    /// Any failure here must stop the process before the loop starts.
    pub async fn init(&mut self) -> Result<()> {
        for group in [SECURITIES_GROUP, RAW_DIV_GROUP] {
            let count = self.backup.restore(DATA_SUB, group).await?;
            if count > 0 {
                info!("restored {count} docs of {DATA_SUB}/{group}");
            }
        }

        self.checked_day = self.updaters.trading_dates.get().await?;
        info!("last checked day {}", self.checked_day.format(DATE_FORMAT));

        Ok(())
    }

    pub fn checked_day(&self) -> DateTime<Utc> {
        self.checked_day
    }

    /// Ticks until the token is cancelled. A running cycle is abandoned on cancel.
    pub async fn run(mut self, tick: Duration, token: CancellationToken) {
        info!("updater started");

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.try_update() => {}
            }
        }

        info!("updater stopped");
    }

    /// Runs one cycle if a new day has ended, bounded by the cycle deadline.
    pub async fn try_update(&mut self) {
        let last_day = last_day_ended(self.clock.now());
        if last_day <= self.checked_day {
            return;
        }

        let timeout = self.timeout;
        let result = tokio::time::timeout(timeout, self.update(last_day)).await;

        if result.is_err() {
            let err = Error::Timeout(format!("update cycle exceeded {}s", timeout.as_secs()));
            warn_and_report(self.sink.as_ref(), &err.within("update"));
        }
    }

    async fn update(&mut self, last_day: DateTime<Utc>) {
        let trading_day = match self.updaters.trading_dates.update(self.checked_day).await {
            Ok(date) => date,
            Err(Error::UpdateNotRequired) => {
                self.checked_day = last_day;
                info!("no new session till {}", last_day.format(DATE_FORMAT));
                return;
            }
            Err(err) => {
                warn_and_report(self.sink.as_ref(), &err);
                return;
            }
        };

        info!("update for {} started", trading_day.format(DATE_FORMAT));
        self.update_data(trading_day).await;
        self.updaters.portfolio.update().await;

        self.checked_day = last_day;
        info!("update for {} finished", trading_day.format(DATE_FORMAT));
    }

    async fn update_data(&self, date: DateTime<Utc>) {
        let u = &self.updaters;
        let (sec_tx, sec_rx) = oneshot::channel::<Option<SecuritiesTable>>();

        let usd_branch = async move {
            let rates = u.usd.update(date).await;
            let table = sec_rx.await.ok().flatten();

            match (rates, table) {
                (Some(rates), Some(table)) if !rates.is_empty() => {
                    u.dividends.update(date, &table, &rates).await;
                }
                _ => warn!("dividends update skipped without usd or securities"),
            }
        };

        let securities_branch = async move {
            let table = u.securities.update(date).await;
            if sec_tx.send(table.clone()).is_err() {
                warn!("dividends update is gone");
            }

            let Some(table) = table else {
                warn!("securities dependent updates skipped");
                return;
            };

            let dividends_branch = async {
                let rows = u.status.update(date, &table).await;
                let missed = u.check_raw.check(&rows).await;
                tokio::join!(
                    u.close_reestry.update(date, &missed),
                    u.nasdaq.update(date, &missed),
                );
            };

            tokio::join!(
                self.backup_securities(),
                u.quotes.update(date, &table),
                dividends_branch,
            );
        };

        tokio::join!(
            u.cpi.update(date),
            u.index.update(date),
            usd_branch,
            securities_branch,
        );
    }

    async fn backup_securities(&self) {
        match self.backup.backup(DATA_SUB, SECURITIES_GROUP).await {
            Ok(()) => info!("backup of securities completed"),
            Err(err) => {
                let origin = QualifiedId::singleton(DATA_SUB, SECURITIES_GROUP);
                warn_and_report(self.sink.as_ref(), &err.within(origin));
            }
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use poptimizer_market_data::provider::iss::{
    BOARD_FQBR, BOARD_TQBR, BOARD_TQTF, ENGINE_STOCK, MARKET_FOREIGN_SHARES, MARKET_SHARES,
};
use poptimizer_market_data::IssClient;

use super::data_constants::SECURITIES_GROUP;
use super::securities_model::SecuritiesTable;
use crate::domain::{AggregateRepositoryTrait, BackupRestoreTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result};
use crate::events::{warn_and_report, ErrorSink};

/// Boards the cache tracks with the market each one trades on.
const MARKET_BOARDS: [(&str, &str); 3] = [
    (MARKET_SHARES, BOARD_TQBR),
    (MARKET_SHARES, BOARD_TQTF),
    (MARKET_FOREIGN_SHARES, BOARD_FQBR),
];

pub fn securities_id() -> QualifiedId {
    QualifiedId::singleton(DATA_SUB, SECURITIES_GROUP)
}

/// Refreshes the list of traded securities.
pub struct SecuritiesService {
    repo: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
    iss: IssClient,
    sink: Arc<dyn ErrorSink>,
}

impl SecuritiesService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
        iss: IssClient,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self { repo, iss, sink }
    }

    /// Returns the refreshed table, or nothing if the update failed.
    pub async fn update(&self, date: DateTime<Utc>) -> Option<SecuritiesTable> {
        let qid = securities_id();
        match self.try_update(&qid, date).await {
            Ok(table) => Some(table),
            Err(err) => {
                warn_and_report(self.sink.as_ref(), &err.within(&qid));
                None
            }
        }
    }

    async fn try_update(&self, qid: &QualifiedId, date: DateTime<Utc>) -> Result<SecuritiesTable> {
        let mut agg = self.repo.get(qid).await?;

        let mut listing = Vec::new();
        for (market, board) in MARKET_BOARDS {
            listing.extend(self.iss.board_securities(ENGINE_STOCK, market, board).await?);
        }

        let table = agg.entity().refreshed(listing);
        if &table == agg.entity() && agg.timestamp() == date {
            return Ok(table);
        }

        agg.update(table, date);
        self.repo.save(&mut agg).await?;
        info!("{qid} updated with {} securities", agg.entity().len());

        Ok(agg.into_entity())
    }
}

/// Ticker and selection flag as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectedTicker {
    pub ticker: String,
    pub selected: bool,
}

/// User edits of the security selection.
pub struct SecuritiesEditService {
    repo: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
    backup: Arc<dyn BackupRestoreTrait>,
}

impl SecuritiesEditService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
        backup: Arc<dyn BackupRestoreTrait>,
    ) -> Self {
        Self { repo, backup }
    }

    pub async fn get(&self) -> Result<Vec<SelectedTicker>> {
        let agg = self.repo.get(&securities_id()).await?;

        Ok(agg
            .entity()
            .iter()
            .map(|sec| SelectedTicker {
                ticker: sec.ticker.clone(),
                selected: sec.selected,
            })
            .collect())
    }

    /// Changes the selection of one ticker and dumps the table.
    pub async fn set_selected(&self, ticker: &str, selected: bool) -> Result<()> {
        let qid = securities_id();
        let mut agg = self.repo.get(&qid).await?;

        let mut table = agg.entity().clone();
        let sec = table
            .get_mut(ticker)
            .ok_or_else(|| Error::NotFound(format!("{qid} {ticker}")))?;
        sec.selected = selected;

        agg.update_same_date(table);
        self.repo.save(&mut agg).await?;

        match self.backup.backup(DATA_SUB, SECURITIES_GROUP).await {
            Ok(()) => info!("backup of selected securities completed"),
            Err(err) => warn!("{err}"),
        }

        Ok(())
    }
}

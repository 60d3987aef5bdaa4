use std::sync::Arc;

use log::{info, warn};
use rust_decimal::Decimal;

use super::check_raw_service::raw_id;
use super::data_constants::{CLOSE_REESTRY_GROUP, NASDAQ_GROUP, RAW_DIV_GROUP};
use super::raw_model::{compare_with_source, DividendCompareRow, RawDividend, RawTable};
use super::securities_model::{SecuritiesTable, Security};
use super::securities_service::securities_id;
use crate::domain::{is_utc_midnight, AggregateRepositoryTrait, BackupRestoreTrait, QualifiedId, DATA_SUB};
use crate::errors::{Error, Result, ValidationError};

/// User editing of raw dividends.
pub struct RawEditService {
    securities: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
    raw: Arc<dyn AggregateRepositoryTrait<RawTable>>,
    backup: Arc<dyn BackupRestoreTrait>,
}

impl RawEditService {
    pub fn new(
        securities: Arc<dyn AggregateRepositoryTrait<SecuritiesTable>>,
        raw: Arc<dyn AggregateRepositoryTrait<RawTable>>,
        backup: Arc<dyn BackupRestoreTrait>,
    ) -> Self {
        Self {
            securities,
            raw,
            backup,
        }
    }

    async fn security(&self, ticker: &str) -> Result<Security> {
        let agg = self.securities.get(&securities_id()).await?;

        agg.entity()
            .get(ticker)
            .cloned()
            .ok_or_else(|| ValidationError::InvalidInput(format!("wrong ticker {ticker}")).into())
    }

    /// User dividends of a ticker checked against the matching source.
    pub async fn get_dividends(&self, ticker: &str) -> Result<Vec<DividendCompareRow>> {
        let sec = self.security(ticker).await?;

        let raw = self.raw.get(&raw_id(ticker)).await?;

        let group = if sec.is_foreign() {
            NASDAQ_GROUP
        } else {
            CLOSE_REESTRY_GROUP
        };
        let source = self.raw.get(&QualifiedId::new(DATA_SUB, group, ticker)).await?;

        Ok(compare_with_source(raw.entity(), source.entity()))
    }

    /// Replaces the user dividends of a ticker and dumps the group.
    pub async fn save(&self, ticker: &str, rows: Vec<RawDividend>) -> Result<()> {
        validate(&rows)?;
        self.security(ticker).await?;

        let mut agg = self.raw.get(&raw_id(ticker)).await?;
        agg.update_same_date(RawTable::sorted(rows));
        self.raw.save(&mut agg).await?;

        match self.backup.backup(DATA_SUB, RAW_DIV_GROUP).await {
            Ok(()) => info!("backup of raw dividends completed"),
            Err(err) => warn!("{err}"),
        }

        Ok(())
    }
}

fn validate(rows: &[RawDividend]) -> Result<()> {
    for row in rows {
        if !is_utc_midnight(&row.date) {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "wrong date {}",
                row.date
            ))));
        }

        if row.value < Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "dividends must be positive {}",
                row.value
            ))));
        }
    }

    Ok(())
}

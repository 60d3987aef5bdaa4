use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use poptimizer_market_data::RosstatClient;

use super::data_constants::CPI_GROUP;
use super::market_model::Cpi;
use super::series::validate_increasing;
use crate::domain::{AggregateRepositoryTrait, QualifiedId, DATA_SUB};
use crate::errors::{Result, ValidationError};
use crate::events::{warn_and_report, ErrorSink};

pub fn cpi_id() -> QualifiedId {
    QualifiedId::singleton(DATA_SUB, CPI_GROUP)
}

/// Keeps the monthly CPI table in line with the Rosstat workbook.
pub struct CpiService {
    repo: Arc<dyn AggregateRepositoryTrait<Vec<Cpi>>>,
    rosstat: RosstatClient,
    sink: Arc<dyn ErrorSink>,
}

impl CpiService {
    pub fn new(
        repo: Arc<dyn AggregateRepositoryTrait<Vec<Cpi>>>,
        rosstat: RosstatClient,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self { repo, rosstat, sink }
    }

    pub async fn update(&self, date: DateTime<Utc>) {
        let qid = cpi_id();
        if let Err(err) = self.try_update(&qid, date).await {
            warn_and_report(self.sink.as_ref(), &err.within(&qid));
        }
    }

    async fn try_update(&self, qid: &QualifiedId, date: DateTime<Utc>) -> Result<()> {
        let mut agg = self.repo.get(qid).await?;
        let rows: Vec<Cpi> = self.rosstat.cpi().await?.into_iter().map(Cpi::from).collect();

        validate_increasing(&rows)?;
        validate_prefix(agg.entity(), &rows)?;

        if rows.len() == agg.entity().len() {
            return Ok(());
        }

        agg.update(rows, date);
        self.repo.save(&mut agg).await?;
        info!("{qid} updated");

        Ok(())
    }
}

/// The workbook is republished in full; stored months must not change.
fn validate_prefix(stored: &[Cpi], rows: &[Cpi]) -> Result<()> {
    if rows.len() < stored.len() {
        return Err(ValidationError::TooFewRows {
            new: rows.len(),
            old: stored.len(),
        }
        .into());
    }

    if let Some((old, new)) = stored.iter().zip(rows).find(|(old, new)| old != new) {
        return Err(ValidationError::AnchorMismatch {
            old: format!("{old:?}"),
            new: format!("{new:?}"),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{day, MemoryStore, StaticGetter};
    use crate::errors::Error;

    fn cpi(y: i32, m: u32, d: u32, value: f64) -> Cpi {
        Cpi {
            date: day(y, m, d),
            value,
        }
    }

    #[test]
    fn test_validate_prefix() {
        let stored = vec![cpi(1991, 1, 31, 1.062), cpi(1991, 2, 28, 1.048)];

        assert!(validate_prefix(&stored, &[stored[0].clone(), stored[1].clone(), cpi(1991, 3, 31, 1.063)]).is_ok());
        assert!(matches!(
            validate_prefix(&stored, &stored[..1]),
            Err(Error::Validation(ValidationError::TooFewRows { new: 1, old: 2 }))
        ));
        assert!(matches!(
            validate_prefix(&stored, &[cpi(1991, 1, 31, 1.5), stored[1].clone()]),
            Err(Error::Validation(ValidationError::AnchorMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_download_failure_is_reported_with_qid() {
        let store = MemoryStore::new();
        let sink = crate::events::MockErrorSink::new();
        let service = CpiService::new(
            Arc::new(store.clone()),
            RosstatClient::new(Arc::new(StaticGetter::new()), "01"),
            Arc::new(sink.clone()),
        );

        service.update(day(2024, 6, 17)).await;

        assert_eq!(sink.len(), 1);
        assert!(sink.contains("data/cpi/cpi"));
        assert!(store.saves().is_empty());
    }
}

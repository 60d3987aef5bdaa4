use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};

use super::accounts_traits::AccountServiceTrait;
use super::portfolio_constants::{account_id, portfolio_id, ACCOUNTS_GROUP, NEW_ACCOUNT};
use super::portfolio_model::Portfolio;
use crate::domain::{AggregateRepositoryTrait, PORTFOLIO_SUB};
use crate::errors::{Error, Result, ValidationError};

/// Service for editing broker accounts.
pub struct AccountService {
    repo: Arc<dyn AggregateRepositoryTrait<Portfolio>>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AggregateRepositoryTrait<Portfolio>>) -> Self {
        Self { repo }
    }

    /// Rebuilds the total portfolio of `date` from the current accounts.
    async fn refresh_total(&self, date: DateTime<Utc>) -> Result<()> {
        let total = self
            .repo
            .get_group(PORTFOLIO_SUB, ACCOUNTS_GROUP)
            .await?
            .iter()
            .fold(Portfolio::default(), |total, agg| total.sum(agg.entity()));

        let mut port = self.repo.get(&portfolio_id(date)).await?;
        port.update(total, date);
        self.repo.save(&mut port).await
    }
}

#[async_trait]
impl AccountServiceTrait for AccountService {
    async fn list_accounts(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .repo
            .list(PORTFOLIO_SUB, ACCOUNTS_GROUP)
            .await?
            .into_iter()
            .filter(|name| name != NEW_ACCOUNT)
            .collect();
        names.sort();

        Ok(names)
    }

    async fn create_account(&self, name: &str) -> Result<()> {
        if name == NEW_ACCOUNT {
            return Err(ValidationError::InvalidInput(format!("reserved name {name}")).into());
        }

        let mut agg = self.repo.get(&account_id(name)).await?;
        if !agg.is_new() {
            return Err(
                ValidationError::InvalidInput(format!("can't create existing account {name}")).into(),
            );
        }

        let template = self.repo.get(&account_id(NEW_ACCOUNT)).await?;
        agg.update(template.entity().clone(), template.timestamp());
        self.repo.save(&mut agg).await?;
        info!("account {name} created");

        Ok(())
    }

    async fn delete_account(&self, name: &str) -> Result<()> {
        self.repo.delete(&account_id(name)).await?;
        info!("account {name} deleted");

        Ok(())
    }

    async fn get_account(&self, name: &str) -> Result<Portfolio> {
        let agg = self.repo.get(&account_id(name)).await?;
        if agg.is_new() {
            return Err(Error::NotFound(format!("account {name}")));
        }

        Ok(agg.into_entity())
    }

    async fn set_amount(&self, name: &str, ticker: &str, amount: i64) -> Result<()> {
        debug!("setting {ticker} to {amount} in {name}");

        let mut agg = self.repo.get(&account_id(name)).await?;
        if agg.is_new() {
            return Err(Error::NotFound(format!("account {name}")));
        }

        let mut account = agg.entity().clone();
        account.set_amount(ticker, amount)?;
        agg.update_same_date(account);
        self.repo.save(&mut agg).await?;

        self.refresh_total(agg.timestamp()).await
    }

    async fn get_portfolio(&self, date: DateTime<Utc>) -> Result<Portfolio> {
        let qid = portfolio_id(date);
        let agg = self.repo.get(&qid).await?;
        if agg.is_new() {
            return Err(Error::NotFound(qid.to_string()));
        }

        Ok(agg.into_entity())
    }
}

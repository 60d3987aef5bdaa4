//! Account editing contract used by the API layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::portfolio_model::Portfolio;
use crate::errors::Result;

/// Trait defining the contract for broker account operations.
///
/// Accounts share the template account's positions on creation and are kept
/// in sync with the securities table by the portfolio update.
#[async_trait]
pub trait AccountServiceTrait: Send + Sync {
    /// Names of the user accounts, sorted, without the template.
    async fn list_accounts(&self) -> Result<Vec<String>>;

    /// Creates an account from the template.
    ///
    /// Fails for the reserved template name and for existing accounts.
    async fn create_account(&self, name: &str) -> Result<()>;

    /// Deletes an account. Deleting a missing one is not an error.
    async fn delete_account(&self, name: &str) -> Result<()>;

    async fn get_account(&self, name: &str) -> Result<Portfolio>;

    /// Sets shares of a ticker (or cash) and refreshes the total portfolio.
    async fn set_amount(&self, name: &str, ticker: &str, amount: i64) -> Result<()>;

    /// Total portfolio of a trading date.
    async fn get_portfolio(&self, date: DateTime<Utc>) -> Result<Portfolio>;
}

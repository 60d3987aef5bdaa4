use chrono::{DateTime, Utc};

use crate::data::DATE_FORMAT;
use crate::domain::{QualifiedId, PORTFOLIO_SUB};

/// Broker accounts, one aggregate per name.
pub const ACCOUNTS_GROUP: &str = "accounts";

/// Total portfolio, one aggregate per trading date.
pub const PORTFOLIO_GROUP: &str = "portfolio";

/// Reserved account holding the template for new accounts.
pub const NEW_ACCOUNT: &str = "__new__";

/// Pseudo ticker of the cash position.
pub const CASH_TICKER: &str = "RUR";

/// Trading-day windows of the turnover medians: a month, a year and twice their sum.
pub const TURNOVER_WINDOWS: [usize; 3] = [21, 252, 2 * (21 + 252)];

pub fn account_id(name: &str) -> QualifiedId {
    QualifiedId::new(PORTFOLIO_SUB, ACCOUNTS_GROUP, name)
}

pub fn portfolio_id(date: DateTime<Utc>) -> QualifiedId {
    QualifiedId::new(
        PORTFOLIO_SUB,
        PORTFOLIO_GROUP,
        date.format(DATE_FORMAT).to_string(),
    )
}

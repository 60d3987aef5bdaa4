//! Portfolio module - broker accounts, the dated total and their market data.

mod accounts_service;
mod accounts_traits;
mod portfolio_constants;
mod portfolio_model;
mod portfolio_service;

pub use accounts_service::AccountService;
pub use accounts_traits::AccountServiceTrait;
pub use portfolio_constants::*;
pub use portfolio_model::{min_median_turnover, MarketData, Portfolio, Position};
pub use portfolio_service::PortfolioService;

#[cfg(test)]
mod portfolio_model_tests;

//! Upstream data sources.

pub mod close_reestry;
pub mod iss;
pub mod moex_listing;
pub mod nasdaq;
pub mod rosstat;

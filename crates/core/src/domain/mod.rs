//! Aggregates and the storage contracts they are persisted through.

mod aggregate_model;
mod repository_traits;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate_model::*;
pub use repository_traits::*;

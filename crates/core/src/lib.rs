//! Poptimizer Core - market data cache, portfolio engine and update orchestrator.
//!
//! This crate contains the domain logic of the service. It is
//! database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod data;
pub mod domain;
pub mod errors;
pub mod events;
pub mod portfolio;
pub mod updater;
pub mod utils;

// Re-export the aggregate model and storage contracts
pub use domain::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

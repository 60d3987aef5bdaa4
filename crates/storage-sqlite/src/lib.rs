//! SQLite storage implementation for Poptimizer.
//!
//! This crate provides the document store behind the repository traits of
//! `poptimizer-core`:
//! - Database connection pooling and management
//! - Diesel migrations
//! - A generic versioned document repository with a JSON viewer
//! - JSON file backup and restore of user-edited groups
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//!
//! ```text
//!      core (domain)
//!            │
//!            ▼
//!  storage-sqlite (this crate)
//!            │
//!            ▼
//!        SQLite DB
//! ```

pub mod db;
pub mod documents;
pub mod errors;
pub mod schema;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use documents::DocumentRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from poptimizer-core for convenience
pub use poptimizer_core::errors::{DatabaseError, Error, Result};

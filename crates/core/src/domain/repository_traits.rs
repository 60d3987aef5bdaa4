use async_trait::async_trait;

use super::aggregate_model::{Aggregate, Payload, QualifiedId};
use crate::errors::Result;

/// Versioned store of aggregates with payload `E`.
///
/// Implementations must be safe for concurrent use. No operation retries.
#[async_trait]
pub trait AggregateRepositoryTrait<E: Payload>: Send + Sync {
    /// Loads an aggregate. A miss yields an empty aggregate with `ver == 0`.
    async fn get(&self, qid: &QualifiedId) -> Result<Aggregate<E>>;

    /// Loads every aggregate of a group.
    async fn get_group(&self, sub: &str, group: &str) -> Result<Vec<Aggregate<E>>>;

    /// Ids of every aggregate of a group.
    async fn list(&self, sub: &str, group: &str) -> Result<Vec<String>>;

    /// Persists the aggregate and bumps its version.
    ///
    /// A new aggregate is inserted with `ver = 1`; an existing one is
    /// replaced only if the stored version still equals `agg.ver()`.
    /// Both conflicts fail with `Error::WrongVersion`.
    async fn save(&self, agg: &mut Aggregate<E>) -> Result<()>;

    /// Removes an aggregate. Removing a missing one is not an error.
    async fn delete(&self, qid: &QualifiedId) -> Result<()>;
}

/// Read-only access to stored payloads rendered as JSON.
#[async_trait]
pub trait JsonViewerTrait: Send + Sync {
    /// The `data` part of the stored document. A miss is `Error::NotFound`.
    async fn get_json(&self, qid: &QualifiedId) -> Result<Vec<u8>>;
}

/// Dumps and restores user-edited groups.
#[async_trait]
pub trait BackupRestoreTrait: Send + Sync {
    /// Restores a group from its dump if the group is empty; returns the
    /// number of restored aggregates.
    async fn restore(&self, sub: &str, group: &str) -> Result<usize>;

    /// Writes a dump of a group.
    async fn backup(&self, sub: &str, group: &str) -> Result<()>;
}

//! JSON file dumps of user-edited groups.
//!
//! A group `(sub, group)` is dumped to `{dump_dir}/{sub}/{group}.json` as an
//! array of documents in the persisted layout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::model::DocumentDB;
use super::repository::DocumentRepository;
use crate::errors::IntoCore;
use crate::schema::documents;
use poptimizer_core::errors::{DatabaseError, Error, Result};
use poptimizer_core::BackupRestoreTrait;

/// A document as written to a dump file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DumpDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub ver: i64,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl DumpDocument {
    fn from_db(doc: DocumentDB) -> Result<Self> {
        Ok(Self {
            data: serde_json::from_str(&doc.data)?,
            id: doc.id,
            ver: doc.ver,
            timestamp: doc.timestamp.and_utc(),
        })
    }

    fn into_db(self, sub: &str, group: &str) -> Result<DocumentDB> {
        Ok(DocumentDB {
            sub: sub.to_string(),
            grp: group.to_string(),
            id: self.id,
            ver: self.ver,
            timestamp: self.timestamp.naive_utc(),
            data: serde_json::to_string(&self.data)?,
        })
    }
}

impl DocumentRepository {
    fn dump_path(&self, sub: &str, group: &str) -> PathBuf {
        self.dump_dir().join(sub).join(format!("{group}.json"))
    }
}

#[async_trait]
impl BackupRestoreTrait for DocumentRepository {
    async fn restore(&self, sub: &str, group: &str) -> Result<usize> {
        if !self.load_group(sub, group)?.is_empty() {
            return Ok(0);
        }

        let path = self.dump_path(sub, group);
        if !path.exists() {
            info!("no dump {} for {sub}.{group}", path.display());
            return Ok(0);
        }

        let dump = fs::read(&path).map_err(|e| restore_failed(sub, group, e))?;
        let docs: Vec<DumpDocument> =
            serde_json::from_slice(&dump).map_err(|e| restore_failed(sub, group, e))?;
        let rows = docs
            .into_iter()
            .map(|doc| doc.into_db(sub, group))
            .collect::<Result<Vec<_>>>()?;

        let count = self
            .writer()
            .exec(move |conn| {
                diesel::insert_into(documents::table)
                    .values(&rows)
                    .execute(conn)
                    .into_core()
            })
            .await?;

        info!("collection {sub}.{group} restored with {count} documents");

        Ok(count)
    }

    async fn backup(&self, sub: &str, group: &str) -> Result<()> {
        let docs = self
            .load_group(sub, group)?
            .into_iter()
            .map(DumpDocument::from_db)
            .collect::<Result<Vec<_>>>()?;

        let path = self.dump_path(sub, group);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| backup_failed(sub, group, e))?;
        }

        let json = serde_json::to_vec_pretty(&docs)?;
        fs::write(&path, json).map_err(|e| backup_failed(sub, group, e))?;

        info!("backup of collection {sub}.{group} completed");

        Ok(())
    }
}

fn backup_failed(sub: &str, group: &str, err: impl ToString) -> Error {
    Error::Database(DatabaseError::BackupFailed(format!(
        "{sub}.{group}: {}",
        err.to_string()
    )))
}

fn restore_failed(sub: &str, group: &str, err: impl ToString) -> Error {
    Error::Database(DatabaseError::RestoreFailed(format!(
        "{sub}.{group}: {}",
        err.to_string()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::TimeZone;
    use poptimizer_core::{Aggregate, AggregateRepositoryTrait, QualifiedId};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn open(dir: &std::path::Path, name: &str) -> DocumentRepository {
        let pool = create_pool(&dir.join(name).to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        DocumentRepository::new(Arc::clone(&pool), writer, dir.join("dump"))
    }

    #[tokio::test]
    async fn test_backup_then_restore_into_empty_db() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let source = open(temp_dir.path(), "source.db");
        let ts = Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap();

        for ticker in ["AKRN", "GAZP"] {
            let mut agg: Aggregate<Value> = source
                .get(&QualifiedId::new("data", "raw_div", ticker))
                .await
                .unwrap();
            agg.update(json!([{ "date": "2024-07-08T00:00:00Z", "value": 110.0 }]), ts);
            source.save(&mut agg).await.unwrap();
            source.save(&mut agg).await.unwrap();
        }

        source.backup("data", "raw_div").await.unwrap();
        assert!(temp_dir.path().join("dump/data/raw_div.json").exists());

        let target = open(temp_dir.path(), "target.db");
        assert_eq!(target.restore("data", "raw_div").await.unwrap(), 2);
        assert_eq!(target.restore("data", "raw_div").await.unwrap(), 0);

        let restored: Aggregate<Value> = target
            .get(&QualifiedId::new("data", "raw_div", "GAZP"))
            .await
            .unwrap();
        assert_eq!(restored.ver(), 2);
        assert_eq!(restored.timestamp(), ts);
        assert_eq!(restored.entity()[0]["value"], json!(110.0));
    }

    #[tokio::test]
    async fn test_restore_without_dump_is_empty() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let repo = open(temp_dir.path(), "test.db");

        assert_eq!(repo.restore("data", "securities").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_restore_broken_dump_fails() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let repo = open(temp_dir.path(), "test.db");
        fs::create_dir_all(temp_dir.path().join("dump/data")).unwrap();
        fs::write(temp_dir.path().join("dump/data/securities.json"), "not json").unwrap();

        let err = repo.restore("data", "securities").await.unwrap_err();

        assert!(matches!(err, Error::Database(DatabaseError::RestoreFailed(_))));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use log::debug;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::model::DocumentDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, IntoCore, StorageError};
use crate::schema::documents;
use poptimizer_core::errors::{Error, Result};
use poptimizer_core::{Aggregate, AggregateRepositoryTrait, JsonViewerTrait, Payload, QualifiedId};

/// Document store keyed by `(sub, group, id)` with optimistic versioning.
///
/// Reads go straight to the pool, writes through the single writer actor.
/// One instance serves every payload type.
pub struct DocumentRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    dump_dir: PathBuf,
}

impl DocumentRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, dump_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            writer,
            dump_dir: dump_dir.into(),
        }
    }

    pub(super) fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    pub(super) fn writer(&self) -> &WriteHandle {
        &self.writer
    }

    pub(super) fn load_group(&self, sub: &str, group: &str) -> Result<Vec<DocumentDB>> {
        let mut conn = get_connection(&self.pool)?;

        documents::table
            .filter(documents::sub.eq(sub))
            .filter(documents::grp.eq(group))
            .order(documents::id.asc())
            .select(DocumentDB::as_select())
            .load::<DocumentDB>(&mut conn)
            .into_core()
    }

    fn load(&self, qid: &QualifiedId) -> Result<Option<DocumentDB>> {
        let mut conn = get_connection(&self.pool)?;

        documents::table
            .find((qid.sub.as_str(), qid.group.as_str(), qid.id.as_str()))
            .select(DocumentDB::as_select())
            .first::<DocumentDB>(&mut conn)
            .optional()
            .into_core()
    }
}

#[async_trait]
impl<E: Payload> AggregateRepositoryTrait<E> for DocumentRepository {
    async fn get(&self, qid: &QualifiedId) -> Result<Aggregate<E>> {
        match self.load(qid)? {
            None => Ok(Aggregate::new(qid.clone())),
            Some(doc) => doc.into_aggregate(),
        }
    }

    async fn get_group(&self, sub: &str, group: &str) -> Result<Vec<Aggregate<E>>> {
        self.load_group(sub, group)?
            .into_iter()
            .map(DocumentDB::into_aggregate)
            .collect()
    }

    async fn list(&self, sub: &str, group: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;

        documents::table
            .filter(documents::sub.eq(sub))
            .filter(documents::grp.eq(group))
            .order(documents::id.asc())
            .select(documents::id)
            .load::<String>(&mut conn)
            .into_core()
    }

    async fn save(&self, agg: &mut Aggregate<E>) -> Result<()> {
        let qid = agg.qid().clone();
        let ver = agg.ver();
        let row = DocumentDB::saved(agg)?;

        self.writer
            .exec(move |conn| {
                if ver == 0 {
                    return match diesel::insert_into(documents::table)
                        .values(&row)
                        .execute(conn)
                    {
                        Ok(_) => Ok(()),
                        Err(err) if is_unique_violation(&err) => Err(Error::WrongVersion { qid }),
                        Err(err) => Err(StorageError::from(err).into()),
                    };
                }

                let updated = diesel::update(
                    documents::table
                        .find((row.sub.as_str(), row.grp.as_str(), row.id.as_str()))
                        .filter(documents::ver.eq(ver)),
                )
                .set((
                    documents::ver.eq(row.ver),
                    documents::timestamp.eq(row.timestamp),
                    documents::data.eq(&row.data),
                ))
                .execute(conn)
                .into_core()?;

                match updated {
                    0 => Err(Error::WrongVersion { qid }),
                    _ => Ok(()),
                }
            })
            .await?;

        agg.mark_saved();
        debug!("{} saved with ver {}", agg.qid(), agg.ver());

        Ok(())
    }

    async fn delete(&self, qid: &QualifiedId) -> Result<()> {
        let qid = qid.clone();

        self.writer
            .exec(move |conn| {
                diesel::delete(documents::table.find((
                    qid.sub.as_str(),
                    qid.group.as_str(),
                    qid.id.as_str(),
                )))
                .execute(conn)
                .into_core()?;

                Ok(())
            })
            .await
    }
}

#[async_trait]
impl JsonViewerTrait for DocumentRepository {
    async fn get_json(&self, qid: &QualifiedId) -> Result<Vec<u8>> {
        let doc = self
            .load(qid)?
            .ok_or_else(|| Error::NotFound(qid.to_string()))?;
        let data: Value = serde_json::from_str(&doc.data)?;

        Ok(serde_json::to_vec(&extended_json(data))?)
    }
}

/// Wraps every RFC 3339 timestamp into an extended JSON `{"$date": ...}` object.
fn extended_json(value: Value) -> Value {
    match value {
        Value::String(text) => match DateTime::parse_from_rfc3339(&text) {
            Ok(date) => json!({
                "$date": date
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            }),
            Err(_) => Value::String(text),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(extended_json).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, extended_json(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
    struct Rows {
        values: Vec<f64>,
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()
    }

    fn rows(values: &[f64]) -> Rows {
        Rows {
            values: values.to_vec(),
        }
    }

    async fn create_test_repository() -> (DocumentRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        let repo = DocumentRepository::new(pool, writer, temp_dir.path().join("dump"));
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_is_new() {
        let (repo, _temp_dir) = create_test_repository().await;

        let agg: Aggregate<Rows> = repo.get(&QualifiedId::new("data", "usd", "usd")).await.unwrap();

        assert!(agg.is_new());
        assert_eq!(agg.entity(), &Rows::default());
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let (repo, _temp_dir) = create_test_repository().await;
        let qid = QualifiedId::new("data", "usd", "usd");

        let mut agg: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        agg.update(rows(&[87.1]), day(25));
        repo.save(&mut agg).await.unwrap();
        agg.update(rows(&[87.1, 87.3]), day(26));
        repo.save(&mut agg).await.unwrap();

        let loaded: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        assert_eq!(loaded.ver(), 2);
        assert_eq!(loaded.timestamp(), day(26));
        assert_eq!(loaded.entity(), &rows(&[87.1, 87.3]));
        assert_eq!(loaded, agg);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let (repo, _temp_dir) = create_test_repository().await;
        let qid = QualifiedId::new("data", "quotes", "GAZP");

        let mut first: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        let mut second: Aggregate<Rows> = repo.get(&qid).await.unwrap();

        first.update(rows(&[1.0]), day(17));
        repo.save(&mut first).await.unwrap();

        second.update(rows(&[2.0]), day(17));
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(err, Error::WrongVersion { .. }));
        assert_eq!(second.ver(), 0);

        let mut reloaded: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        let mut stale = reloaded.clone();
        reloaded.update_same_date(rows(&[3.0]));
        repo.save(&mut reloaded).await.unwrap();

        stale.update_same_date(rows(&[4.0]));
        assert!(repo.save(&mut stale).await.unwrap_err().is_wrong_version());

        let stored: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        assert_eq!(stored.ver(), 2);
        assert_eq!(stored.entity(), &rows(&[3.0]));
    }

    #[tokio::test]
    async fn test_group_list_and_delete() {
        let (repo, _temp_dir) = create_test_repository().await;

        for ticker in ["SBER", "AKRN", "GAZP"] {
            let mut agg: Aggregate<Rows> = repo
                .get(&QualifiedId::new("data", "quotes", ticker))
                .await
                .unwrap();
            agg.update(rows(&[1.0]), day(17));
            repo.save(&mut agg).await.unwrap();
        }

        let ids = AggregateRepositoryTrait::<Rows>::list(&repo, "data", "quotes").await.unwrap();
        assert_eq!(ids, vec!["AKRN", "GAZP", "SBER"]);

        AggregateRepositoryTrait::<Rows>::delete(&repo, &QualifiedId::new("data", "quotes", "GAZP"))
            .await
            .unwrap();
        AggregateRepositoryTrait::<Rows>::delete(&repo, &QualifiedId::new("data", "quotes", "GAZP"))
            .await
            .unwrap();

        let group: Vec<Aggregate<Rows>> = repo.get_group("data", "quotes").await.unwrap();
        let ids: Vec<&str> = group.iter().map(|agg| agg.qid().id.as_str()).collect();
        assert_eq!(ids, vec!["AKRN", "SBER"]);
        assert!(group.iter().all(|agg| agg.ver() == 1));
    }

    #[tokio::test]
    async fn test_get_json() {
        let (repo, _temp_dir) = create_test_repository().await;
        let qid = QualifiedId::new("data", "index", "MCFTRR");

        assert!(matches!(repo.get_json(&qid).await, Err(Error::NotFound(_))));

        let mut agg: Aggregate<Rows> = repo.get(&qid).await.unwrap();
        agg.update(rows(&[1.5]), day(17));
        repo.save(&mut agg).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&repo.get_json(&qid).await.unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "values": [1.5] }));
    }

    #[tokio::test]
    async fn test_get_json_wraps_dates() {
        let (repo, _temp_dir) = create_test_repository().await;
        let qid = QualifiedId::new("data", "status", "status");

        let mut agg: Aggregate<serde_json::Value> = repo.get(&qid).await.unwrap();
        agg.update(
            serde_json::json!([{ "ticker": "AKRN", "date": day(17), "preferred": false }]),
            day(17),
        );
        repo.save(&mut agg).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&repo.get_json(&qid).await.unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "ticker": "AKRN",
                "date": { "$date": "2024-06-17T00:00:00.000Z" },
                "preferred": false,
            }])
        );
    }
}

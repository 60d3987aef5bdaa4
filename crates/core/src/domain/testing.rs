//! In-memory collaborators shared by the service tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use poptimizer_market_data::{HttpGetter, HttpResponse, MarketDataError};
use serde_json::Value;

use super::{
    utc_midnight, Aggregate, AggregateRepositoryTrait, BackupRestoreTrait, JsonViewerTrait,
    Payload, QualifiedId,
};
use crate::errors::{DatabaseError, Error, Result};

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    utc_midnight(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[derive(Clone)]
struct Doc {
    ver: i64,
    timestamp: DateTime<Utc>,
    data: Value,
}

/// Document store kept in memory; payloads go through JSON like the real one.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<BTreeMap<QualifiedId, Doc>>>,
    saves: Arc<Mutex<Vec<QualifiedId>>>,
    backups: Arc<Mutex<Vec<(String, String)>>>,
    fail_saves: Arc<AtomicBool>,
    rejected: Arc<Mutex<Vec<QualifiedId>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an aggregate directly, bypassing version checks.
    pub fn put<E: Payload>(&self, qid: QualifiedId, ver: i64, timestamp: DateTime<Utc>, entity: &E) {
        self.docs.lock().unwrap().insert(
            qid,
            Doc {
                ver,
                timestamp,
                data: serde_json::to_value(entity).unwrap(),
            },
        );
    }

    pub fn load<E: Payload>(&self, qid: &QualifiedId) -> Option<(i64, DateTime<Utc>, E)> {
        self.docs.lock().unwrap().get(qid).map(|doc| {
            (
                doc.ver,
                doc.timestamp,
                serde_json::from_value(doc.data.clone()).unwrap(),
            )
        })
    }

    /// Qids of every successful save, in order.
    pub fn saves(&self) -> Vec<QualifiedId> {
        self.saves.lock().unwrap().clone()
    }

    pub fn saves_of(&self, group: &str) -> usize {
        self.saves
            .lock()
            .unwrap()
            .iter()
            .filter(|qid| qid.group == group)
            .count()
    }

    pub fn backups(&self) -> Vec<(String, String)> {
        self.backups.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Saves of `qid` fail with a version conflict, as if another writer got ahead.
    pub fn reject_saves_of(&self, qid: QualifiedId) {
        self.rejected.lock().unwrap().push(qid);
    }
}

#[async_trait]
impl<E: Payload> AggregateRepositoryTrait<E> for MemoryStore {
    async fn get(&self, qid: &QualifiedId) -> Result<Aggregate<E>> {
        let doc = self.docs.lock().unwrap().get(qid).cloned();

        match doc {
            None => Ok(Aggregate::new(qid.clone())),
            Some(doc) => Ok(Aggregate::from_parts(
                qid.clone(),
                doc.ver,
                doc.timestamp,
                serde_json::from_value(doc.data)?,
            )),
        }
    }

    async fn get_group(&self, sub: &str, group: &str) -> Result<Vec<Aggregate<E>>> {
        let ids = AggregateRepositoryTrait::<E>::list(self, sub, group).await?;
        let mut aggs = Vec::with_capacity(ids.len());
        for id in ids {
            aggs.push(self.get(&QualifiedId::new(sub, group, id)).await?);
        }

        Ok(aggs)
    }

    async fn list(&self, sub: &str, group: &str) -> Result<Vec<String>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .keys()
            .filter(|qid| qid.sub == sub && qid.group == group)
            .map(|qid| qid.id.clone())
            .collect())
    }

    async fn save(&self, agg: &mut Aggregate<E>) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "store is down".to_string(),
            )));
        }

        if self.rejected.lock().unwrap().contains(agg.qid()) {
            return Err(Error::WrongVersion {
                qid: agg.qid().clone(),
            });
        }

        let mut docs = self.docs.lock().unwrap();
        let stored = docs.get(agg.qid()).map(|doc| doc.ver);

        match (agg.ver(), stored) {
            (0, None) => {}
            (ver, Some(current)) if ver != 0 && ver == current => {}
            _ => {
                return Err(Error::WrongVersion {
                    qid: agg.qid().clone(),
                })
            }
        }

        docs.insert(
            agg.qid().clone(),
            Doc {
                ver: agg.ver() + 1,
                timestamp: agg.timestamp(),
                data: serde_json::to_value(agg.entity())?,
            },
        );
        drop(docs);

        self.saves.lock().unwrap().push(agg.qid().clone());
        agg.mark_saved();

        Ok(())
    }

    async fn delete(&self, qid: &QualifiedId) -> Result<()> {
        self.docs.lock().unwrap().remove(qid);
        Ok(())
    }
}

#[async_trait]
impl JsonViewerTrait for MemoryStore {
    async fn get_json(&self, qid: &QualifiedId) -> Result<Vec<u8>> {
        let doc = self.docs.lock().unwrap().get(qid).cloned();
        let doc = doc.ok_or_else(|| Error::NotFound(qid.to_string()))?;

        Ok(serde_json::to_vec(&doc.data)?)
    }
}

#[async_trait]
impl BackupRestoreTrait for MemoryStore {
    async fn restore(&self, _sub: &str, _group: &str) -> Result<usize> {
        Ok(0)
    }

    async fn backup(&self, sub: &str, group: &str) -> Result<()> {
        self.backups
            .lock()
            .unwrap()
            .push((sub.to_string(), group.to_string()));
        Ok(())
    }
}

/// Serves canned bodies by longest matching URL prefix and counts requests.
#[derive(Clone, Default)]
pub struct StaticGetter {
    responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticGetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, prefix: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.lock().unwrap().insert(
            prefix.to_string(),
            HttpResponse {
                status: 200,
                body: body.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpGetter for StaticGetter {
    async fn get(
        &self,
        url: &str,
        _headers: &[(&'static str, &'static str)],
    ) -> std::result::Result<HttpResponse, MarketDataError> {
        self.requests.lock().unwrap().push(url.to_string());

        let responses = self.responses.lock().unwrap();
        let response = responses
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, response)| response.clone());

        Ok(response.unwrap_or(HttpResponse {
            status: 404,
            body: Vec::new(),
        }))
    }
}

/// ISS JSON block with the given columns and rows.
pub fn iss_block(name: &str, columns: &[&str], rows: &[Value]) -> String {
    serde_json::json!({ name: { "columns": columns, "data": rows } }).to_string()
}

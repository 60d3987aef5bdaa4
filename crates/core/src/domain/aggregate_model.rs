use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Subdomain of market data aggregates.
pub const DATA_SUB: &str = "data";
/// Subdomain of user portfolio aggregates.
pub const PORTFOLIO_SUB: &str = "portfolio";

/// Identity of an aggregate: subdomain, group and instance id.
///
/// Singleton groups use the group name as id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedId {
    pub sub: String,
    pub group: String,
    pub id: String,
}

impl QualifiedId {
    pub fn new(sub: impl Into<String>, group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            group: group.into(),
            id: id.into(),
        }
    }

    /// Id of a singleton group.
    pub fn singleton(sub: &str, group: &str) -> Self {
        Self::new(sub, group, group)
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.sub, self.group, self.id)
    }
}

/// Anything that can be stored as aggregate payload.
pub trait Payload: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {}

/// Midnight UTC of a calendar day.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// True if the instant is exactly midnight UTC.
pub fn is_utc_midnight(date: &DateTime<Utc>) -> bool {
    date.time() == NaiveTime::MIN
}

/// Versioned, timestamped payload with an immutable identity.
///
/// The payload changes only through [`Aggregate::update`] and
/// [`Aggregate::update_same_date`]; the version only through a repository save.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<E> {
    qid: QualifiedId,
    ver: i64,
    timestamp: DateTime<Utc>,
    entity: E,
}

impl<E: Default> Aggregate<E> {
    /// Empty, not yet persisted aggregate.
    pub fn new(qid: QualifiedId) -> Self {
        Self {
            qid,
            ver: 0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            entity: E::default(),
        }
    }
}

impl<E> Aggregate<E> {
    /// Rebuilds a persisted aggregate. Used by repositories.
    pub fn from_parts(qid: QualifiedId, ver: i64, timestamp: DateTime<Utc>, entity: E) -> Self {
        Self {
            qid,
            ver,
            timestamp,
            entity,
        }
    }

    pub fn qid(&self) -> &QualifiedId {
        &self.qid
    }

    pub fn ver(&self) -> i64 {
        self.ver
    }

    /// True until the first successful save.
    pub fn is_new(&self) -> bool {
        self.ver == 0
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    /// Replaces the payload and the date it belongs to.
    pub fn update(&mut self, entity: E, timestamp: DateTime<Utc>) {
        self.entity = entity;
        self.timestamp = timestamp;
    }

    /// Replaces the payload keeping the timestamp.
    pub fn update_same_date(&mut self, entity: E) {
        self.entity = entity;
    }

    /// Records a successful save. Called by repositories only.
    pub fn mark_saved(&mut self) {
        self.ver += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_aggregate_is_empty() {
        let agg: Aggregate<Vec<i32>> = Aggregate::new(QualifiedId::singleton(DATA_SUB, "cpi"));

        assert!(agg.is_new());
        assert_eq!(agg.ver(), 0);
        assert!(agg.entity().is_empty());
        assert_eq!(agg.qid().to_string(), "data/cpi/cpi");
    }

    #[test]
    fn test_update_same_date_keeps_timestamp() {
        let date = utc_midnight(NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
        let mut agg: Aggregate<Vec<i32>> = Aggregate::new(QualifiedId::new("a", "b", "c"));

        agg.update(vec![1], date);
        agg.update_same_date(vec![1, 2]);

        assert_eq!(agg.timestamp(), date);
        assert_eq!(agg.entity(), &vec![1, 2]);
        assert_eq!(agg.ver(), 0);
    }

    #[test]
    fn test_utc_midnight() {
        let date = utc_midnight(NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());

        assert!(is_utc_midnight(&date));
        assert!(!is_utc_midnight(&(date + chrono::Duration::hours(3))));
    }
}

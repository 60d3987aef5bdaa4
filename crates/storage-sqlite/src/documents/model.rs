//! Database model for aggregate documents.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use poptimizer_core::{Aggregate, Payload, QualifiedId, Result};

/// One row of the `documents` table. `data` holds the JSON payload.
#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DocumentDB {
    pub sub: String,
    pub grp: String,
    pub id: String,
    pub ver: i64,
    pub timestamp: NaiveDateTime,
    pub data: String,
}

impl DocumentDB {
    /// Row for the state the aggregate will have after a successful save.
    pub fn saved<E: Payload>(agg: &Aggregate<E>) -> Result<Self> {
        let qid = agg.qid();

        Ok(Self {
            sub: qid.sub.clone(),
            grp: qid.group.clone(),
            id: qid.id.clone(),
            ver: agg.ver() + 1,
            timestamp: agg.timestamp().naive_utc(),
            data: serde_json::to_string(agg.entity())?,
        })
    }

    pub fn qid(&self) -> QualifiedId {
        QualifiedId::new(&self.sub, &self.grp, &self.id)
    }

    pub fn into_aggregate<E: Payload>(self) -> Result<Aggregate<E>> {
        let entity = serde_json::from_str(&self.data)?;

        Ok(Aggregate::from_parts(
            self.qid(),
            self.ver,
            self.timestamp.and_utc(),
            entity,
        ))
    }
}

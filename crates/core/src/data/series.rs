//! Append-only time series.
//!
//! A fresh download must start with the last stored row and continue with
//! strictly increasing dates; only the rows after that anchor are appended.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::domain::Aggregate;
use crate::errors::{Result, ValidationError};

/// A row of a series ordered by date.
pub trait DatedRow {
    fn date(&self) -> DateTime<Utc>;
}

/// Fails unless every row is dated strictly after the previous one.
pub fn validate_increasing<R: DatedRow>(rows: &[R]) -> Result<()> {
    for pair in rows.windows(2) {
        if pair[0].date() >= pair[1].date() {
            return Err(ValidationError::NotIncreasingDates(format!(
                "{} and {}",
                pair[0].date().format("%Y-%m-%d"),
                pair[1].date().format("%Y-%m-%d"),
            ))
            .into());
        }
    }

    Ok(())
}

/// Rows of `fetched` that extend `stored`.
///
/// The first fetched row has to repeat the last stored one; it is dropped.
pub fn new_rows<R>(stored: &[R], mut fetched: Vec<R>) -> Result<Vec<R>>
where
    R: DatedRow + PartialEq + Debug,
{
    validate_increasing(&fetched)?;

    let Some(last) = stored.last() else {
        return Ok(fetched);
    };

    match fetched.first() {
        None => Ok(fetched),
        Some(first) if first == last => {
            fetched.remove(0);
            Ok(fetched)
        }
        Some(first) => Err(ValidationError::AnchorMismatch {
            old: format!("{last:?}"),
            new: format!("{first:?}"),
        }
        .into()),
    }
}

/// Appends a download to the aggregate.
///
/// Returns `false` if there is nothing new, leaving the aggregate untouched.
pub fn append<R>(agg: &mut Aggregate<Vec<R>>, fetched: Vec<R>, date: DateTime<Utc>) -> Result<bool>
where
    R: DatedRow + PartialEq + Debug + Clone,
{
    let rows = new_rows(agg.entity(), fetched)?;
    if rows.is_empty() {
        return Ok(false);
    }

    let mut table = agg.entity().clone();
    table.extend(rows);
    agg.update(table, date);

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::day;
    use crate::domain::QualifiedId;
    use crate::errors::Error;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(DateTime<Utc>, i32);

    impl DatedRow for Row {
        fn date(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_validate_increasing_rejects_repeated_date() {
        let rows = vec![Row(day(2024, 1, 1), 1), Row(day(2024, 1, 1), 2)];

        let err = validate_increasing(&rows).unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::NotIncreasingDates(_))
        ));
    }

    #[test]
    fn test_new_rows_drops_anchor() {
        let stored = vec![Row(day(2024, 6, 24), 1), Row(day(2024, 6, 25), 2)];
        let fetched = vec![Row(day(2024, 6, 25), 2), Row(day(2024, 6, 26), 3)];

        let rows = new_rows(&stored, fetched).unwrap();

        assert_eq!(rows, vec![Row(day(2024, 6, 26), 3)]);
    }

    #[test]
    fn test_new_rows_on_empty_store_keeps_everything() {
        let fetched = vec![Row(day(2024, 6, 25), 2), Row(day(2024, 6, 26), 3)];

        assert_eq!(new_rows(&[], fetched.clone()).unwrap(), fetched);
    }

    #[test]
    fn test_new_rows_anchor_mismatch() {
        let stored = vec![Row(day(2024, 6, 25), 2)];
        let fetched = vec![Row(day(2024, 6, 25), 7)];

        let err = new_rows(&stored, fetched).unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::AnchorMismatch { .. })
        ));
    }

    #[test]
    fn test_append_without_new_rows_is_noop() {
        let mut agg = Aggregate::from_parts(
            QualifiedId::new("data", "quotes", "AKRN"),
            3,
            day(2024, 6, 25),
            vec![Row(day(2024, 6, 25), 2)],
        );

        let changed = append(&mut agg, vec![Row(day(2024, 6, 25), 2)], day(2024, 6, 26)).unwrap();

        assert!(!changed);
        assert_eq!(agg.timestamp(), day(2024, 6, 25));
        assert_eq!(agg.entity().len(), 1);
    }

    #[test]
    fn test_append_extends_and_moves_timestamp() {
        let mut agg = Aggregate::from_parts(
            QualifiedId::new("data", "quotes", "AKRN"),
            3,
            day(2024, 6, 25),
            vec![Row(day(2024, 6, 25), 2)],
        );

        let fetched = vec![Row(day(2024, 6, 25), 2), Row(day(2024, 6, 26), 3)];
        let changed = append(&mut agg, fetched, day(2024, 6, 26)).unwrap();

        assert!(changed);
        assert_eq!(agg.timestamp(), day(2024, 6, 26));
        assert_eq!(agg.entity().len(), 2);
    }
}

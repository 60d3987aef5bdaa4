use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::domain::utc_midnight;

/// Timezone of the exchange trading calendar.
pub const MOEX_TZ: Tz = chrono_tz::Europe::Moscow;

/// Local time after which ISS has published end-of-day data for the previous day.
const ISS_PUBLISH_TIME: (u32, u32) = (0, 45);

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// The most recent day whose end-of-day data is already published, as UTC midnight.
///
/// Before 00:45 exchange time the previous day is still being processed,
/// so the answer is two days back; from 00:45 on it is yesterday.
pub fn last_day_ended(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&MOEX_TZ);
    let today = local.date_naive();
    let cutoff = NaiveTime::from_hms_opt(ISS_PUBLISH_TIME.0, ISS_PUBLISH_TIME.1, 0)
        .unwrap_or(NaiveTime::MIN);

    let delta = if local.time() < cutoff { 2 } else { 1 };

    utc_midnight(today - Days::new(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn moscow(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        MOEX_TZ
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        utc_midnight(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_last_day_ended_around_cutoff() {
        assert_eq!(last_day_ended(moscow(2024, 6, 18, 0, 44, 59)), day(2024, 6, 16));
        assert_eq!(last_day_ended(moscow(2024, 6, 18, 0, 45, 1)), day(2024, 6, 17));
        assert_eq!(last_day_ended(moscow(2024, 6, 18, 0, 45, 0)), day(2024, 6, 17));
    }

    #[test]
    fn test_last_day_ended_uses_exchange_calendar_day() {
        // 22:30 UTC on the 17th is already 01:30 on the 18th in Moscow.
        let now = Utc.with_ymd_and_hms(2024, 6, 17, 22, 30, 0).unwrap();

        assert_eq!(last_day_ended(now), day(2024, 6, 17));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(day(2024, 1, 1));
        clock.set(day(2024, 1, 2));

        assert_eq!(clock.now(), day(2024, 1, 2));
    }
}

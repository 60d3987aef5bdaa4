pub mod time_utils;

pub use time_utils::{last_day_ended, Clock, FixedClock, SystemClock, MOEX_TZ};

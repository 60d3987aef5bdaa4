use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use poptimizer_market_data::{Candle as IssCandle, MonthlyCpi};

use super::series::DatedRow;
use crate::domain::utc_midnight;

/// Daily candle of an index, a currency or a share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub turnover: f64,
}

impl DatedRow for Candle {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

impl From<IssCandle> for Candle {
    fn from(candle: IssCandle) -> Self {
        Self {
            date: utc_midnight(candle.date),
            open: candle.open,
            close: candle.close,
            high: candle.high,
            low: candle.low,
            turnover: candle.value,
        }
    }
}

/// Monthly inflation as a fraction of the previous month, dated at month end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpi {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl DatedRow for Cpi {
    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

impl From<MonthlyCpi> for Cpi {
    fn from(cpi: MonthlyCpi) -> Self {
        Self {
            date: utc_midnight(cpi.date),
            value: cpi.value,
        }
    }
}

//! Rosstat consumer price index workbook.
//!
//! The workbook holds one sheet where row 3 lists years starting at 1991
//! from column 1, and rows 5..17 hold monthly percentages labelled with
//! Russian month names in column 0. The current year is filled
//! partially, so parsing stops at the first empty month.

use std::io::Cursor;
use std::sync::Arc;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::http::{get_ok, HttpGetter};
use crate::models::MonthlyCpi;

const URL: &str = "https://rosstat.gov.ru/storage/mediabank/ipc_4(2).xlsx";
const PROVIDER_ID: &str = "ROSSTAT";

/// Sheet with monthly CPI in the current workbook layout.
pub const DEFAULT_SHEET: &str = "01";

const HEADER_ROW: usize = 3;
const FIRST_YEAR: i32 = 1991;
const FIRST_DATA_ROW: usize = 5;
const FIRST_DATA_COL: usize = 1;

const MONTHS: [&str; 12] = [
    "январь",
    "февраль",
    "март",
    "апрель",
    "май",
    "июнь",
    "июль",
    "август",
    "сентябрь",
    "октябрь",
    "ноябрь",
    "декабрь",
];

/// Downloads the CPI workbook and extracts monthly values.
#[derive(Clone)]
pub struct RosstatClient {
    getter: Arc<dyn HttpGetter>,
    sheet: String,
}

impl RosstatClient {
    pub fn new(getter: Arc<dyn HttpGetter>, sheet: impl Into<String>) -> Self {
        Self {
            getter,
            sheet: sheet.into(),
        }
    }

    pub async fn cpi(&self) -> Result<Vec<MonthlyCpi>, MarketDataError> {
        let body = get_ok(self.getter.as_ref(), PROVIDER_ID, URL, &[]).await?;
        let grid = read_sheet(body, &self.sheet)?;

        parse_grid(&grid)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Reads a sheet into rows of cell texts with trailing empty cells removed.
fn read_sheet(body: Vec<u8>, sheet: &str) -> Result<Vec<Vec<String>>, MarketDataError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(body))
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("can't open xlsx: {e}")))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("can't read sheet {sheet}: {e}")))?;

    let Some((last_row, last_col)) = range.end() else {
        return Ok(Vec::new());
    };

    let grid = (0..=last_row)
        .map(|row| {
            let mut cells: Vec<String> = (0..=last_col)
                .map(|col| range.get_value((row, col)).map(cell_text).unwrap_or_default())
                .collect();
            while cells.last().is_some_and(|cell| cell.is_empty()) {
                cells.pop();
            }
            cells
        })
        .collect();

    Ok(grid)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

/// Extracts monthly CPI from the sheet grid.
pub fn parse_grid(grid: &[Vec<String>]) -> Result<Vec<MonthlyCpi>, MarketDataError> {
    if grid.len() < FIRST_DATA_ROW + MONTHS.len() {
        return Err(MarketDataError::parse(
            PROVIDER_ID,
            format!("too few rows {}", grid.len()),
        ));
    }

    for (n, month) in MONTHS.iter().enumerate() {
        let label = grid[FIRST_DATA_ROW + n]
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        if label != *month {
            return Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("wrong month name {label} vs {month}"),
            ));
        }
    }

    let header = grid[HEADER_ROW].get(FIRST_DATA_COL..).unwrap_or_default();
    let mut years = Vec::with_capacity(header.len());
    for (position, value) in header.iter().enumerate() {
        let year: i32 = value
            .parse()
            .map_err(|e| MarketDataError::parse(PROVIDER_ID, format!("can't parse year {value}: {e}")))?;
        let expected = FIRST_YEAR + position as i32;
        if year != expected {
            return Err(MarketDataError::parse(
                PROVIDER_ID,
                format!("wrong year {year} vs {expected}"),
            ));
        }
        years.push(year);
    }

    let data = &grid[FIRST_DATA_ROW..FIRST_DATA_ROW + MONTHS.len()];
    let mut cpi = Vec::with_capacity(years.len() * MONTHS.len());

    for (col, year) in years.iter().enumerate() {
        for (month, row) in data.iter().enumerate() {
            let Some(cell) = row.get(FIRST_DATA_COL + col).filter(|c| !c.is_empty()) else {
                return Ok(cpi);
            };

            let percents: f64 = cell.replace(',', ".").parse().map_err(|e| {
                MarketDataError::parse(PROVIDER_ID, format!("can't parse {cell}: {e}"))
            })?;
            let date = last_day_of_month(*year, month as u32 + 1).ok_or_else(|| {
                MarketDataError::parse(PROVIDER_ID, format!("bad month {year}-{}", month + 1))
            })?;

            cpi.push(MonthlyCpi {
                date,
                value: percents / 100.0,
            });
        }
    }

    Ok(cpi)
}

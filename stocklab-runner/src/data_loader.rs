//! CSV bar loading.
//!
//! Reads `date,open,high,low,close,volume` files (lower-case or capitalized
//! headers, extra columns ignored) into the ordered, filtered
//! series the core expects:
//! 1. Rows whose open or close is zero, missing or non-numeric are dropped
//! 2. Rows are sorted ascending by date
//! 3. Duplicate dates keep the last row in file order
//!
//! Rows with an inconsistent high/low range are kept with a warning.
//!
//! A symbol's name is its file stem, so `data/AAPL.csv` loads as `AAPL`.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use stocklab_core::domain::{Bar, PeriodType};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: invalid date '{value}' (expected YYYY-MM-DD)")]
    BadDate { line: u64, value: String },

    #[error("no usable bars in {0}")]
    Empty(String),
}

/// One symbol's bars at one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    pub symbol: String,
    pub period_type: PeriodType,
    pub bars: Vec<Bar>,
}

impl SymbolSeries {
    pub fn new(symbol: impl Into<String>, period_type: PeriodType, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            period_type,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: String,
    #[serde(alias = "Open", default)]
    open: String,
    #[serde(alias = "High", default)]
    high: String,
    #[serde(alias = "Low", default)]
    low: String,
    #[serde(alias = "Close", default)]
    close: String,
    #[serde(alias = "Volume", default)]
    volume: String,
}

/// Lenient numeric field: anything unparseable (`null`, empty) is NaN.
fn parse_price(field: &str) -> f64 {
    field.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_volume(field: &str) -> u64 {
    let value = parse_price(field);
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(field: &str) -> Option<NaiveDate> {
    let trimmed = field.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Parse bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut rows: Vec<Bar> = Vec::new();
    let mut dropped = 0usize;
    let mut inconsistent = 0usize;

    while csv_reader.read_record(&mut record)? {
        // Physical line of the record start; blank lines are counted.
        let line = record.position().map_or(0, |pos| pos.line());
        let row: CsvRow = record.deserialize(Some(&headers))?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::BadDate {
            line,
            value: row.date.clone(),
        })?;
        let bar = Bar {
            date,
            open: parse_price(&row.open),
            high: parse_price(&row.high),
            low: parse_price(&row.low),
            close: parse_price(&row.close),
            volume: parse_volume(&row.volume),
        };
        if !bar.is_tradable() {
            warn!(line, %date, open = bar.open, close = bar.close, "dropping untradable row");
            dropped += 1;
            continue;
        }
        if !bar.is_sane() {
            // Kept: the engine trades on close only.
            warn!(line, %date, high = bar.high, low = bar.low, "inconsistent OHLC range");
            inconsistent += 1;
        }
        rows.push(bar);
    }

    let bars = sort_and_dedup(rows);
    debug!(bars = bars.len(), dropped, inconsistent, "parsed CSV bars");
    Ok(bars)
}

/// Stable sort by date, then keep the last row of each date.
fn sort_and_dedup(mut rows: Vec<Bar>) -> Vec<Bar> {
    rows.sort_by_key(|b| b.date);
    let mut bars: Vec<Bar> = Vec::with_capacity(rows.len());
    for bar in rows {
        match bars.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => bars.push(bar),
        }
    }
    bars
}

/// Load one CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(std::io::BufReader::new(file))?;
    if bars.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    Ok(bars)
}

/// Load one CSV file as a named series.
pub fn load_symbol(path: &Path, period_type: PeriodType) -> Result<SymbolSeries, LoadError> {
    let symbol = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let bars = load_csv(path)?;
    Ok(SymbolSeries::new(symbol, period_type, bars))
}

/// Load every `*.csv` in a directory, ordered by symbol name.
pub fn load_dir(dir: &Path, period_type: PeriodType) -> Result<Vec<SymbolSeries>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            paths.push(path);
        }
    }
    paths.sort();
    paths
        .iter()
        .map(|path| load_symbol(path, period_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_basic_csv() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,11,9,10.5,1000\n\
                   2024-01-03,10.5,12,10,11.5,2000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
        assert_eq!(bars[1].close, 11.5);
        assert_eq!(bars[1].volume, 2000);
    }

    #[test]
    fn capitalized_headers_and_extra_columns() {
        let csv = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                   2024-01-02,10,11,9,10.5,10.4,1000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 1000);
    }

    #[test]
    fn drops_zero_and_null_rows() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,11,9,10.5,1000\n\
                   2024-01-03,0,11,9,10.5,1000\n\
                   2024-01-04,null,null,null,null,null\n\
                   2024-01-05,10,11,9,0,1000\n\
                   2024-01-08,10,11,9,10.2,1000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 8)]);
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-04,10,11,9,10,1\n\
                   2024-01-02,10,11,9,20,1\n\
                   2024-01-04,10,11,9,30,1\n\
                   2024-01-03,10,11,9,40,1\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![20.0, 40.0, 30.0]);
    }

    #[test]
    fn datetime_suffix_is_accepted() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02 00:00:00,10,11,9,10.5,1000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars[0].date, date(2024, 1, 2));
    }

    #[test]
    fn bad_date_reports_line() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,11,9,10.5,1000\n\
                   01/03/2024,10,11,9,10.5,1000\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::BadDate { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "01/03/2024");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_date_line_counts_blank_lines() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,11,9,10.5,1000\n\
                   \n\
                   2024-01-03,10,11,9,10.5,1000\n\
                   notadate,10,11,9,10.5,1000\n";
        match read_bars(csv.as_bytes()).unwrap_err() {
            LoadError::BadDate { line, value } => {
                assert_eq!(line, 5);
                assert_eq!(value, "notadate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inconsistent_range_is_kept() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,9,11,10.5,1000\n\
                   2024-01-03,10,null,null,10.5,1000\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(|b| b.is_tradable() && !b.is_sane()));
    }

    #[test]
    fn fractional_volume_rounds() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,11,9,10.5,1234.6\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars[0].volume, 1235);
    }

    #[test]
    fn load_csv_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EMPTY.csv");
        std::fs::write(&path, "date,open,high,low,close,volume\n").unwrap();
        assert!(matches!(load_csv(&path), Err(LoadError::Empty(_))));
    }

    #[test]
    fn load_symbol_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MSFT.csv");
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n2024-01-02,10,11,9,10.5,1000\n",
        )
        .unwrap();
        let series = load_symbol(&path, PeriodType::Weekly).unwrap();
        assert_eq!(series.symbol, "MSFT");
        assert_eq!(series.period_type, PeriodType::Weekly);
        assert_eq!(series.len(), 1);
    }
}

//! CSV file bar source.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a header row and columns
//! `timestamp,open,high,low,close,volume[,trade_count,vwap]`.

use crate::domain::bar::Bar;
use crate::domain::error::LftError;
use crate::ports::data_port::BarSource;
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

/// Date-only values become midnight UTC; anything else is kept as written.
pub(crate) fn normalise_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => format!("{}T00:00:00Z", date.format("%Y-%m-%d")),
        Err(_) => trimmed.to_string(),
    }
}

pub(crate) fn read_error(symbol: &str, path: &std::path::Path, e: std::io::Error) -> LftError {
    if e.kind() == ErrorKind::NotFound {
        LftError::NoData {
            symbol: symbol.to_string(),
        }
    } else {
        LftError::Decode {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        }
    }
}

/// Ascending time order. A file with unparseable timestamps is kept in file
/// order so those bars stay inside the windows they belong to; its
/// parseable bars must then already be ascending.
pub(crate) fn order_bars(symbol: &str, mut bars: Vec<Bar>) -> Result<Vec<Bar>, LftError> {
    if bars.iter().all(|b| b.time().is_some()) {
        bars.sort_by_key(Bar::time);
        return Ok(bars);
    }
    let mut last: Option<DateTime<Utc>> = None;
    for (idx, ts) in bars.iter().enumerate().filter_map(|(i, b)| b.time().map(|t| (i, t))) {
        if last.is_some_and(|prev| ts < prev) {
            return Err(LftError::Decode {
                symbol: symbol.to_string(),
                reason: format!(
                    "bar {} is out of order and the file has unparseable timestamps",
                    idx
                ),
            });
        }
        last = Some(ts);
    }
    Ok(bars)
}

fn field<T: FromStr>(record: &csv::StringRecord, idx: usize, name: &str, symbol: &str) -> Result<T, LftError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(idx).ok_or_else(|| LftError::Decode {
        symbol: symbol.to_string(),
        reason: format!("missing {} column", name),
    })?;
    raw.trim().parse().map_err(|e| LftError::Decode {
        symbol: symbol.to_string(),
        reason: format!("invalid {} value {:?}: {}", name, raw, e),
    })
}

fn optional_field<T: FromStr>(record: &csv::StringRecord, idx: usize, name: &str, symbol: &str) -> Result<Option<T>, LftError>
where
    T::Err: std::fmt::Display,
{
    match record.get(idx).map(str::trim) {
        None | Some("") => Ok(None),
        Some(_) => field(record, idx, name, symbol).map(Some),
    }
}

impl BarSource for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, LftError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| read_error(symbol, &path, e))?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| LftError::Decode {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = record.get(0).ok_or_else(|| LftError::Decode {
                symbol: symbol.to_string(),
                reason: "missing timestamp column".into(),
            })?;

            bars.push(Bar {
                timestamp: normalise_timestamp(timestamp),
                open: field(&record, 1, "open", symbol)?,
                high: field(&record, 2, "high", symbol)?,
                low: field(&record, 3, "low", symbol)?,
                close: field(&record, 4, "close", symbol)?,
                volume: field(&record, 5, "volume", symbol)?,
                trade_count: optional_field(&record, 6, "trade_count", symbol)?.unwrap_or(0),
                vwap: optional_field(&record, 7, "vwap", symbol)?,
            });
        }

        order_bars(symbol, bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, LftError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume,trade_count,vwap\n\
            2026-01-15T14:35:00Z,100.0,110.0,90.0,105.0,50000,300,101.5\n\
            2026-01-15T14:30:00Z,105.0,115.0,100.0,110.0,60000,,\n\
            2026-01-15T14:40:00Z,110.0,120.0,105.0,115.0,55000,210,112.0\n";

        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(
            path.join("SPY.csv"),
            "timestamp,open,high,low,close,volume\n2026-01-15,470.0,472.0,468.0,471.0,900000\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_sorted_with_optional_columns() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let bars = adapter.fetch_bars("AAPL").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, "2026-01-15T14:30:00Z");
        assert_eq!(bars[0].trade_count, 0);
        assert_eq!(bars[0].vwap, None);
        assert_eq!(bars[1].open, 100.0);
        assert_eq!(bars[1].volume, 50000);
        assert_eq!(bars[1].trade_count, 300);
        assert_eq!(bars[1].vwap, Some(101.5));
        assert!(bars.iter().all(Bar::is_valid));
    }

    #[test]
    fn date_only_timestamps_become_midnight_utc() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let bars = adapter.fetch_bars("SPY").unwrap();
        assert_eq!(bars[0].timestamp, "2026-01-15T00:00:00Z");
        assert!(bars[0].is_valid());
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_bars("XYZ");
        assert!(matches!(result, Err(LftError::NoData { .. })));
    }

    #[test]
    fn bad_number_is_decode_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "timestamp,open,high,low,close,volume\n2026-01-15,abc,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let result = adapter.fetch_bars("BAD");
        assert!(matches!(result, Err(LftError::Decode { ref reason, .. }) if reason.contains("open")));
    }

    #[test]
    fn unparseable_timestamp_keeps_its_position() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("GAP.csv"),
            "timestamp,open,high,low,close,volume\n\
             2026-02-16T15:30:00Z,100,101,99,100,10\n\
             2026-02-16T15:35:00Z,100,101,99,100,10\n\
             garbage,100,101,99,100,10\n\
             2026-02-16T15:45:00Z,100,101,99,100,10\n",
        )
        .unwrap();
        let bars = CsvAdapter::new(dir.path().to_path_buf()).fetch_bars("GAP").unwrap();
        let stamps: Vec<&str> = bars.iter().map(|b| b.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2026-02-16T15:30:00Z",
                "2026-02-16T15:35:00Z",
                "garbage",
                "2026-02-16T15:45:00Z"
            ]
        );
        assert!(!bars[2].is_valid());
    }

    #[test]
    fn unsorted_file_with_unparseable_timestamp_rejected() {
        let bars = vec![
            Bar { timestamp: "2026-02-16T15:35:00Z".into(), ..sample_bar() },
            Bar { timestamp: "garbage".into(), ..sample_bar() },
            Bar { timestamp: "2026-02-16T15:30:00Z".into(), ..sample_bar() },
        ];
        assert!(matches!(order_bars("GAP", bars), Err(LftError::Decode { .. })));
    }

    fn sample_bar() -> Bar {
        Bar {
            timestamp: String::new(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 10,
            trade_count: 0,
            vwap: None,
        }
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["AAPL", "SPY"]);
    }
}

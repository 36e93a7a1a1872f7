//! JSON file bar source.
//!
//! One file per symbol, `<SYMBOL>.json`, in the shape written by the bar
//! fetcher: `{"symbol": "AAPL", "bars": [{"t", "o", "h", "l", "c", "v", "vw", "n"}]}`.

use crate::adapters::csv_adapter::{normalise_timestamp, order_bars, read_error};
use crate::domain::bar::Bar;
use crate::domain::error::LftError;
use crate::ports::data_port::BarSource;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct BarFile {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    bars: Vec<RawBar>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    t: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: u64,
    #[serde(default)]
    vw: Option<f64>,
    #[serde(default)]
    n: u64,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Bar {
            timestamp: normalise_timestamp(&raw.t),
            open: raw.o,
            high: raw.h,
            low: raw.l,
            close: raw.c,
            volume: raw.v,
            trade_count: raw.n,
            vwap: raw.vw,
        }
    }
}

pub struct JsonBarAdapter {
    base_path: PathBuf,
}

impl JsonBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn json_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", symbol))
    }
}

/// Decodes one bar document. A `symbol` field that disagrees with the
/// requested symbol is rejected.
pub fn decode_bars(symbol: &str, content: &str) -> Result<Vec<Bar>, LftError> {
    let file: BarFile = serde_json::from_str(content).map_err(|e| LftError::Decode {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    })?;
    if let Some(found) = &file.symbol {
        if !found.eq_ignore_ascii_case(symbol) {
            return Err(LftError::Decode {
                symbol: symbol.to_string(),
                reason: format!("file holds bars for {}", found),
            });
        }
    }
    order_bars(symbol, file.bars.into_iter().map(Bar::from).collect())
}

impl BarSource for JsonBarAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, LftError> {
        let path = self.json_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| read_error(symbol, &path, e))?;
        decode_bars(symbol, &content)
    }

    fn list_symbols(&self) -> Result<Vec<String>, LftError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".json") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

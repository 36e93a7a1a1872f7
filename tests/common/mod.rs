#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use lftrader::domain::bar::Bar;
use lftrader::domain::error::LftError;
use lftrader::ports::data_port::BarSource;
use std::collections::{HashMap, HashSet};

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashSet<String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashSet::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str) -> Self {
        self.errors.insert(symbol.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, LftError> {
        if self.errors.contains(symbol) {
            return Err(LftError::Decode {
                symbol: symbol.to_string(),
                reason: "mock decode failure".to_string(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars.clone()),
            None => Err(LftError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, LftError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Minute bars from 2026-02-16 (a Monday) at `start`, one per index.
pub fn minute_ts(start: &str, i: usize) -> String {
    let base: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
        .unwrap()
        .with_timezone(&Utc);
    (base + Duration::minutes(i as i64))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

pub const SESSION_START: &str = "2026-02-16T15:30:00Z";

pub fn bar_with_ts(timestamp: String, open: f64, close: f64, volume: u64) -> Bar {
    Bar {
        timestamp,
        open,
        high: open.max(close) + 0.25,
        low: open.min(close) - 0.25,
        close,
        volume,
        trade_count: 100,
        vwap: None,
    }
}

pub fn make_bar(i: usize, open: f64, close: f64, volume: u64) -> Bar {
    bar_with_ts(minute_ts(SESSION_START, i), open, close, volume)
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    (0..count).map(|i| make_bar(i, price, price, 1000)).collect()
}

/// Appends a bar at the next minute.
pub fn push(bars: &mut Vec<Bar>, open: f64, close: f64, volume: u64) {
    let i = bars.len();
    bars.push(make_bar(i, open, close, volume));
}

/// 20 flat warmup bars followed by `cycles` repetitions of a 1.5% dip, a
/// recovery that clears the default take-profit, and two flat bars.
pub fn dip_and_recover(cycles: usize) -> Vec<Bar> {
    let mut bars = flat_bars(20, 100.0);
    for _ in 0..cycles {
        push(&mut bars, 100.0, 98.5, 1000);
        push(&mut bars, 98.5, 100.0, 1000);
        push(&mut bars, 100.0, 100.0, 1000);
        push(&mut bars, 100.0, 100.0, 1000);
    }
    push(&mut bars, 100.0, 100.0, 1000);
    bars
}

pub fn generate_bars(count: usize, start_price: f64, step: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let open = start_price + step * i as f64;
            make_bar(i, open, open + step, 1000)
        })
        .collect()
}

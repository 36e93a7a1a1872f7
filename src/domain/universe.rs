//! Symbol universe parsing and data sufficiency checks.
//!
//! Parses symbol lists from configuration and loads each symbol's bars,
//! skipping symbols that have too little data to simulate.

use crate::domain::error::LftError;
use crate::domain::selection::SymbolSeries;
use crate::ports::data_port::BarSource;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug)]
pub struct UniverseValidationResult {
    pub series: Vec<SymbolSeries>,
    pub skipped: Vec<SkippedSymbol>,
}

impl UniverseValidationResult {
    pub fn symbols(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.symbol.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

/// Loads bars for every symbol. Symbols that fail to load or have fewer
/// than `min_bars` bars are skipped; it is an error only when none remain.
pub fn validate_universe(
    source: &dyn BarSource,
    symbols: Vec<String>,
    min_bars: usize,
) -> Result<UniverseValidationResult, LftError> {
    let total = symbols.len();
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let bars = match source.fetch_bars(&symbol) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.is_empty() {
            warn!(symbol = %symbol, "skipping symbol (no data found)");
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < min_bars {
            warn!(
                symbol = %symbol,
                bars = bars.len(),
                minimum = min_bars,
                "skipping symbol (insufficient bars)"
            );
            skipped.push(SkippedSymbol {
                symbol,
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        let invalid = bars.iter().filter(|b| !b.is_valid()).count();
        if invalid > 0 {
            warn!(symbol = %symbol, invalid, "bars failing validity checks will be skipped");
        }
        info!(symbol = %symbol, bars = bars.len(), "loaded");
        series.push(SymbolSeries { symbol, bars });
    }

    if series.is_empty() {
        return Err(LftError::InsufficientData {
            symbol: "all".to_string(),
            bars: 0,
            minimum: min_bars,
        });
    }

    if !skipped.is_empty() {
        info!(used = series.len(), total, "scoring a subset of the universe");
    }

    Ok(UniverseValidationResult { series, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_symbols_basic() {
        let result = parse_symbols("AAPL,MSFT,GOOGL").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn parse_symbols_with_whitespace() {
        let result = parse_symbols("  AAPL , MSFT ,GOOGL").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn parse_symbols_uppercase() {
        let result = parse_symbols("aapl,msft").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn parse_symbols_empty_token() {
        let result = parse_symbols("AAPL,,MSFT");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn parse_symbols_duplicate() {
        let result = parse_symbols("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateSymbol(s)) if s == "AAPL"));
    }
}

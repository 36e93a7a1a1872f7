//! Broker positions file.
//!
//! A JSON array of positions as the broker reports them:
//! `[{"symbol": "AAPL", "qty": "13", "avg_entry_price": "150.20", "side": "long"}]`.
//! Numbers may be given as JSON numbers or numeric strings.

use crate::domain::error::LftError;
use crate::domain::order::HeldPosition;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Value(f64),
    Text(String),
}

impl Number {
    fn get(&self) -> Option<f64> {
        match self {
            Number::Value(v) => Some(*v),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    symbol: String,
    qty: Number,
    avg_entry_price: Number,
    #[serde(default)]
    side: Option<String>,
}

fn decode_error(reason: String) -> LftError {
    LftError::Decode {
        symbol: "positions".to_string(),
        reason,
    }
}

/// Long positions with at least one whole share. Shorts and fractional
/// remainders are skipped with a warning.
pub fn decode_positions(content: &str) -> Result<Vec<HeldPosition>, LftError> {
    let raw: Vec<RawPosition> =
        serde_json::from_str(content).map_err(|e| decode_error(e.to_string()))?;

    let mut held = Vec::with_capacity(raw.len());
    for p in raw {
        let symbol = p.symbol.trim().to_uppercase();
        if p.side.as_deref().is_some_and(|s| !s.eq_ignore_ascii_case("long")) {
            warn!(symbol = %symbol, "skipping non-long position");
            continue;
        }
        let (Some(qty), Some(avg_entry_price)) = (p.qty.get(), p.avg_entry_price.get()) else {
            return Err(decode_error(format!("{} has a non-numeric qty or price", symbol)));
        };
        if !(avg_entry_price.is_finite() && avg_entry_price > 0.0) {
            return Err(decode_error(format!("{} has entry price {}", symbol, avg_entry_price)));
        }
        let quantity = qty.floor();
        if !(quantity >= 1.0) {
            warn!(symbol = %symbol, qty, "skipping position under one share");
            continue;
        }
        held.push(HeldPosition {
            symbol,
            quantity: quantity as u64,
            avg_entry_price,
        });
    }
    Ok(held)
}

/// A missing file means nothing is held.
pub fn load_positions(path: &Path) -> Result<Vec<HeldPosition>, LftError> {
    match fs::read_to_string(path) {
        Ok(content) => decode_positions(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "no positions file");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

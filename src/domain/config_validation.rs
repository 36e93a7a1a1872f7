//! Configuration validation.
//!
//! Validates every config field before a run starts.

use crate::domain::entry::lookup;
use crate::domain::error::LftError;
use crate::domain::simulator::EndOfDataPolicy;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> LftError {
    LftError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// `[data]` needs a bars directory; everything else has defaults.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    match config.get_string("data", "bars_dir") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(LftError::ConfigMissing {
                section: "data".to_string(),
                key: "bars_dir".to_string(),
            });
        }
    }
    if let Some(format) = config.get_string("data", "format") {
        if !matches!(format.trim(), "csv" | "json") {
            return Err(invalid("data", "format", "format must be csv or json"));
        }
    }
    if let Some(calendar) = config.get_string("data", "calendar") {
        if !matches!(calendar.trim(), "nyse" | "always_open") {
            return Err(invalid("data", "calendar", "calendar must be nyse or always_open"));
        }
    }
    if let Some(symbols) = config.get_string("data", "symbols") {
        if !symbols.trim().is_empty() {
            parse_symbols(&symbols).map_err(|e| invalid("data", "symbols", e.to_string()))?;
        }
    }
    Ok(())
}

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    for key in ["take_profit_pct", "stop_loss_pct", "trailing_stop_pct"] {
        let value = config.get_double("trading", key, 0.01);
        if !(value > 0.0 && value < 1.0) {
            return Err(invalid(
                "trading",
                key,
                format!("{} must be between 0 and 1 (exclusive)", key),
            ));
        }
    }
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    let warmup = config.get_int("simulation", "warmup_bars", 20);
    if warmup < 0 {
        return Err(invalid("simulation", "warmup_bars", "warmup_bars must be non-negative"));
    }
    if let Some(policy) = config.get_string("simulation", "end_of_data") {
        if EndOfDataPolicy::parse(policy.trim()).is_none() {
            return Err(invalid(
                "simulation",
                "end_of_data",
                "end_of_data must be force_close or discard",
            ));
        }
    }
    Ok(())
}

pub fn validate_selection_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    let min_trades = config.get_int("selection", "min_trades", 5);
    if min_trades < 1 {
        return Err(invalid("selection", "min_trades", "min_trades must be at least 1"));
    }
    let min_win_rate = config.get_double("selection", "min_win_rate", 0.5);
    if !(0.0..=1.0).contains(&min_win_rate) {
        return Err(invalid(
            "selection",
            "min_win_rate",
            "min_win_rate must be between 0 and 1",
        ));
    }
    if let Some(list) = config.get_string("selection", "strategies") {
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if lookup(name).is_none() {
                return Err(LftError::UnknownStrategy {
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

pub fn validate_orders_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    let value = config.get_double("orders", "max_order_value", 2000.0);
    if value <= 0.0 {
        return Err(invalid("orders", "max_order_value", "max_order_value must be positive"));
    }
    Ok(())
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), LftError> {
    validate_data_config(config)?;
    validate_trading_config(config)?;
    validate_simulation_config(config)?;
    validate_selection_config(config)?;
    validate_orders_config(config)?;
    Ok(())
}

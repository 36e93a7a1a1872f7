//! Order instructions derived from entry signals and exits.

use serde::Serialize;

use super::bar::Bar;
use super::entry::EntryRule;
use super::error::LftError;
use super::params::TradingParams;
use super::position::{BarContext, ExitDecision, ExitReason, Position};
use crate::ports::session_port::SessionCalendar;

pub const DEFAULT_MAX_ORDER_VALUE: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

/// A market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderInstruction {
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    /// Free text: the strategy for entries, the exit reason for exits.
    pub tag: String,
}

fn stamp(symbol: &str, bar: &Bar) -> Result<String, LftError> {
    bar.time()
        .map(|t| t.format("%Y%m%dT%H%M%S").to_string())
        .ok_or_else(|| LftError::OrderRejected {
            symbol: symbol.to_string(),
            reason: format!("bad timestamp {}", bar.timestamp),
        })
}

/// True when `rule` accepts the newest bar and the calendar allows entries
/// at its timestamp.
pub fn entry_signal(bars: &[Bar], rule: &EntryRule, calendar: &dyn SessionCalendar) -> bool {
    let Some(latest) = bars.last() else {
        return false;
    };
    match latest.time() {
        Some(ts) if latest.is_valid() && calendar.market_open(ts) && !calendar.risk_off(ts) => {
            rule.accepts(bars)
        }
        _ => false,
    }
}

/// Market buy sized to `max_order_value` at the latest close. The client
/// order id carries symbol, strategy and risk parameters.
pub fn entry_order(
    symbol: &str,
    strategy: &str,
    latest: &Bar,
    params: &TradingParams,
    max_order_value: f64,
) -> Result<OrderInstruction, LftError> {
    let rejected = |reason: String| LftError::OrderRejected {
        symbol: symbol.to_string(),
        reason,
    };
    if !latest.is_valid() {
        return Err(rejected("latest bar is invalid".to_string()));
    }
    let shares = (max_order_value / latest.close).floor();
    if shares < 1.0 {
        return Err(rejected(format!(
            "too expensive: {:.2} buys less than one share at {:.2}",
            max_order_value, latest.close
        )));
    }
    let stamp = stamp(symbol, latest)?;
    Ok(OrderInstruction {
        client_order_id: format!(
            "{}_{}_tp{:.2}_sl{:.2}_tsl{:.2}_{}",
            symbol,
            strategy,
            params.take_profit_pct * 100.0,
            params.stop_loss_pct * 100.0,
            params.trailing_stop_pct * 100.0,
            stamp
        ),
        symbol: symbol.to_string(),
        side: Side::Buy,
        quantity: shares as u64,
        tag: strategy.to_string(),
    })
}

/// A long position held at the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldPosition {
    pub symbol: String,
    pub quantity: u64,
    pub avg_entry_price: f64,
}

/// Exit reason for `held` on the latest bar, if any. Levels are rebuilt from
/// the average entry price, so the trailing stop starts from entry. Risk-off
/// liquidates even when the bar is otherwise unusable.
pub fn exit_check(
    held: &HeldPosition,
    latest: &Bar,
    params: &TradingParams,
    calendar: &dyn SessionCalendar,
) -> Option<ExitReason> {
    let risk_off = latest.time().is_some_and(|ts| calendar.risk_off(ts));
    if !risk_off && !latest.is_valid() {
        return None;
    }
    let mut position = Position::open(held.avg_entry_price, params, 0, &latest.timestamp);
    let ctx = BarContext {
        risk_off,
        session_ends: false,
    };
    match position.evaluate(latest.close, ctx) {
        ExitDecision::Hold => None,
        ExitDecision::AtNextOpen(reason) | ExitDecision::AtClose(reason) => Some(reason),
    }
}

pub fn exit_order(
    symbol: &str,
    quantity: u64,
    reason: ExitReason,
    seq: u32,
    latest: &Bar,
) -> Result<OrderInstruction, LftError> {
    let stamp = stamp(symbol, latest)?;
    Ok(OrderInstruction {
        client_order_id: format!("EXIT_{symbol}_{seq}_{stamp}"),
        symbol: symbol.to_string(),
        side: Side::Sell,
        quantity,
        tag: reason.as_str().to_string(),
    })
}

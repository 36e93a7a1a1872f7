//! Open position tracking, exit classification and closed trades.

use serde::Serialize;
use std::fmt;

use super::params::TradingParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    RiskOff,
    EndOfData,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        ExitReason::TakeProfit,
        ExitReason::StopLoss,
        ExitReason::TrailingStop,
        ExitReason::RiskOff,
        ExitReason::EndOfData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::RiskOff => "risk_off",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar facts about the signal bar that the price rules cannot see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarContext {
    pub risk_off: bool,
    /// The following bar belongs to a different session date.
    pub session_ends: bool,
}

/// What to do with an open position after seeing one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitDecision {
    Hold,
    /// Close at the following bar's open.
    AtNextOpen(ExitReason),
    /// Close at this bar's close.
    AtClose(ExitReason),
}

/// A long position. Levels are absolute prices fixed at fill time; only
/// `trailing_stop` (and the peak it follows) moves afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub trailing_stop: f64,
    pub trailing_stop_pct: f64,
    pub peak_close: f64,
    pub entry_index: usize,
    pub entry_timestamp: String,
}

impl Position {
    pub fn open(
        entry_price: f64,
        params: &TradingParams,
        entry_index: usize,
        entry_timestamp: &str,
    ) -> Self {
        let levels = params.levels(entry_price);
        Position {
            entry_price,
            take_profit: levels.take_profit,
            stop_loss: levels.stop_loss,
            trailing_stop: levels.trailing_stop,
            trailing_stop_pct: params.trailing_stop_pct,
            peak_close: entry_price,
            entry_index,
            entry_timestamp: entry_timestamp.to_string(),
        }
    }

    /// Raise the trailing stop when `close` makes a new peak. Never lowers it.
    pub fn ratchet(&mut self, close: f64) {
        if close > self.peak_close {
            self.peak_close = close;
            let candidate = close * (1.0 - self.trailing_stop_pct);
            if candidate > self.trailing_stop {
                self.trailing_stop = candidate;
            }
        }
    }

    pub fn should_take_profit(&self, close: f64) -> bool {
        close >= self.take_profit
    }

    pub fn should_stop_loss(&self, close: f64) -> bool {
        close <= self.stop_loss
    }

    pub fn should_trail_out(&self, close: f64) -> bool {
        close <= self.trailing_stop
    }

    /// Price-based exit for `close`, checked take-profit first, then stop-loss,
    /// then trailing stop. Does not ratchet.
    pub fn price_exit(&self, close: f64) -> Option<ExitReason> {
        if self.should_take_profit(close) {
            Some(ExitReason::TakeProfit)
        } else if self.should_stop_loss(close) {
            Some(ExitReason::StopLoss)
        } else if self.should_trail_out(close) {
            Some(ExitReason::TrailingStop)
        } else {
            None
        }
    }

    /// Full per-bar transition: risk-off, then session end, then ratchet and
    /// price rules.
    pub fn evaluate(&mut self, close: f64, ctx: BarContext) -> ExitDecision {
        if ctx.risk_off {
            return ExitDecision::AtNextOpen(ExitReason::RiskOff);
        }
        if ctx.session_ends {
            return ExitDecision::AtClose(ExitReason::RiskOff);
        }
        self.ratchet(close);
        match self.price_exit(close) {
            Some(reason) => ExitDecision::AtNextOpen(reason),
            None => ExitDecision::Hold,
        }
    }

    pub fn close(
        self,
        exit_price: f64,
        exit_index: usize,
        exit_timestamp: &str,
        exit_reason: ExitReason,
    ) -> Trade {
        Trade {
            entry_price: self.entry_price,
            exit_price,
            profit_pct: (exit_price - self.entry_price) / self.entry_price,
            duration_bars: exit_index.saturating_sub(self.entry_index),
            exit_reason,
            entry_timestamp: self.entry_timestamp,
            exit_timestamp: exit_timestamp.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_price: f64,
    pub exit_price: f64,
    /// Unscaled: 0.02 is a 2% gain.
    pub profit_pct: f64,
    pub duration_bars: usize,
    pub exit_reason: ExitReason,
    pub entry_timestamp: String,
    pub exit_timestamp: String,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit_pct > 0.0
    }
}

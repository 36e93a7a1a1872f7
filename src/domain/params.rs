//! Risk parameters and the absolute price levels derived from them.

use serde::Serialize;

/// Take-profit, stop-loss and trailing-stop distances as unscaled fractions
/// (0.0125 means 1.25%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradingParams {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
}

impl Default for TradingParams {
    fn default() -> Self {
        TradingParams {
            take_profit_pct: 0.0125,
            stop_loss_pct: 0.0125,
            trailing_stop_pct: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub trailing_stop: f64,
}

impl TradingParams {
    pub fn levels(&self, entry_price: f64) -> Levels {
        Levels {
            take_profit: entry_price * (1.0 + self.take_profit_pct),
            stop_loss: entry_price * (1.0 - self.stop_loss_pct),
            trailing_stop: entry_price * (1.0 - self.trailing_stop_pct),
        }
    }
}

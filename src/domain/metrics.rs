//! Per-strategy trade statistics.

use serde::Serialize;

use super::position::{ExitReason, Trade};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExitReasonCounts {
    pub take_profit: usize,
    pub stop_loss: usize,
    pub trailing_stop: usize,
    pub risk_off: usize,
    pub end_of_data: usize,
}

impl ExitReasonCounts {
    pub fn record(&mut self, reason: ExitReason) {
        match reason {
            ExitReason::TakeProfit => self.take_profit += 1,
            ExitReason::StopLoss => self.stop_loss += 1,
            ExitReason::TrailingStop => self.trailing_stop += 1,
            ExitReason::RiskOff => self.risk_off += 1,
            ExitReason::EndOfData => self.end_of_data += 1,
        }
    }

    pub fn get(&self, reason: ExitReason) -> usize {
        match reason {
            ExitReason::TakeProfit => self.take_profit,
            ExitReason::StopLoss => self.stop_loss,
            ExitReason::TrailingStop => self.trailing_stop,
            ExitReason::RiskOff => self.risk_off,
            ExitReason::EndOfData => self.end_of_data,
        }
    }

    pub fn total(&self) -> usize {
        ExitReason::ALL.iter().map(|r| self.get(*r)).sum()
    }
}

/// Statistics for one (symbol, strategy) run. All percentages are unscaled
/// fractions; `avg_loss` and `largest_loss` are magnitudes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub symbol: String,
    pub strategy: String,
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub avg_profit: f64,
    /// Compounded: product of (1 + profit_pct) minus one.
    pub total_return: f64,
    /// Sum of wins over sum of loss magnitudes; 0 when there are no losses.
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub min_duration: usize,
    pub max_duration: usize,
    pub avg_duration: f64,
    pub exit_reasons: ExitReasonCounts,
    pub viable: bool,
    pub trades: Vec<Trade>,
}

impl StrategyResult {
    /// Builds the result from scratch. `viable` starts false; the selector
    /// applies its policy afterwards.
    pub fn compute(symbol: &str, strategy: &str, trades: Vec<Trade>) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut growth = 1.0_f64;
        let mut total_duration = 0usize;
        let mut min_duration = usize::MAX;
        let mut max_duration = 0usize;
        let mut exit_reasons = ExitReasonCounts::default();

        for trade in &trades {
            let p = trade.profit_pct;
            total_profit += p;
            growth *= 1.0 + p;
            if p > 0.0 {
                wins += 1;
                total_wins += p;
                largest_win = largest_win.max(p);
            } else if p < 0.0 {
                losses += 1;
                total_losses += p.abs();
                largest_loss = largest_loss.max(p.abs());
            }

            total_duration += trade.duration_bars;
            min_duration = min_duration.min(trade.duration_bars);
            max_duration = max_duration.max(trade.duration_bars);
            exit_reasons.record(trade.exit_reason);
        }

        let n = trades.len();
        let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

        StrategyResult {
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            trade_count: n,
            wins,
            losses,
            win_rate: ratio(wins as f64, n),
            avg_profit: ratio(total_profit, n),
            total_return: if n > 0 { growth - 1.0 } else { 0.0 },
            profit_factor: if total_losses > 0.0 {
                total_wins / total_losses
            } else {
                0.0
            },
            avg_win: ratio(total_wins, wins),
            avg_loss: ratio(total_losses, losses),
            largest_win,
            largest_loss,
            min_duration: if n > 0 { min_duration } else { 0 },
            max_duration,
            avg_duration: ratio(total_duration as f64, n),
            exit_reasons,
            viable: false,
            trades,
        }
    }
}

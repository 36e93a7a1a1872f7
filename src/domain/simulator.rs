//! Walk-forward trade simulator.
//!
//! One pass over a bar series for one entry rule. Bar `i` is the signal bar;
//! every fill happens at bar `i + 1`'s open except session-gap and
//! end-of-data closes, which use a close already observed. Nothing past
//! `i + 1` is read while deciding at `i`.

use tracing::{debug, trace};

use super::bar::Bar;
use super::entry::EntryRule;
use super::params::TradingParams;
use super::position::{BarContext, ExitDecision, ExitReason, Position, Trade};
use crate::ports::session_port::SessionCalendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfDataPolicy {
    /// Close at the last valid bar's close with reason `end_of_data`.
    #[default]
    ForceClose,
    /// Drop the open position; it never becomes a trade.
    Discard,
}

impl EndOfDataPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "force_close" => Some(EndOfDataPolicy::ForceClose),
            "discard" => Some(EndOfDataPolicy::Discard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub warmup_bars: usize,
    pub end_of_data: EndOfDataPolicy,
    /// Close open positions at the last bar of each session date.
    pub close_on_session_gap: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            warmup_bars: 20,
            end_of_data: EndOfDataPolicy::ForceClose,
            close_on_session_gap: true,
        }
    }
}

impl SimulationConfig {
    pub fn min_bars(&self) -> usize {
        self.warmup_bars + 2
    }
}

fn blocked(calendar: &dyn SessionCalendar, bar: &Bar) -> bool {
    match bar.time() {
        Some(ts) => !calendar.market_open(ts) || calendar.risk_off(ts),
        None => true,
    }
}

fn context(calendar: &dyn SessionCalendar, bar: &Bar, next: &Bar, config: &SimulationConfig) -> BarContext {
    let risk_off = bar.time().is_some_and(|ts| calendar.risk_off(ts));
    let session_ends = config.close_on_session_gap && bar.session_date() != next.session_date();
    BarContext {
        risk_off,
        session_ends,
    }
}

pub fn simulate(
    bars: &[Bar],
    rule: &EntryRule,
    params: &TradingParams,
    calendar: &dyn SessionCalendar,
    config: &SimulationConfig,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    if bars.len() < config.min_bars() {
        trace!(
            rule = rule.name,
            bars = bars.len(),
            "series shorter than warmup, no trades"
        );
        return trades;
    }

    let mut position: Option<Position> = None;

    for i in config.warmup_bars..bars.len() - 1 {
        let bar = &bars[i];
        let next = &bars[i + 1];

        let Some(mut pos) = position.take() else {
            if !bar.is_valid() || !next.is_valid() {
                continue;
            }
            if blocked(calendar, bar) || blocked(calendar, next) {
                continue;
            }
            if rule.accepts(&bars[..=i]) {
                trace!(rule = rule.name, signal = i, fill = next.open, "entry");
                position = Some(Position::open(next.open, params, i + 1, &next.timestamp));
            }
            continue;
        };

        if !bar.is_valid() {
            position = Some(pos);
            continue;
        }

        match pos.evaluate(bar.close, context(calendar, bar, next, config)) {
            ExitDecision::Hold => position = Some(pos),
            ExitDecision::AtNextOpen(reason) if next.is_valid() => {
                trades.push(pos.close(next.open, i + 1, &next.timestamp, reason));
            }
            // no usable fill price on the next bar
            ExitDecision::AtNextOpen(reason) | ExitDecision::AtClose(reason) => {
                trades.push(pos.close(bar.close, i, &bar.timestamp, reason));
            }
        }
    }

    if let Some(pos) = position {
        match config.end_of_data {
            EndOfDataPolicy::ForceClose => {
                if let Some(last) = (pos.entry_index..bars.len()).rev().find(|&j| bars[j].is_valid()) {
                    let bar = &bars[last];
                    trades.push(pos.close(bar.close, last, &bar.timestamp, ExitReason::EndOfData));
                }
            }
            EndOfDataPolicy::Discard => {
                debug!(rule = rule.name, entry = pos.entry_index, "discarding open position at end of data");
            }
        }
    }

    debug!(rule = rule.name, trades = trades.len(), "simulation complete");
    trades
}

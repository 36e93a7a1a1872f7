//! Strategy scoring, ranking and per-symbol selection.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::bar::Bar;
use super::entry::{registry_rank, EntryRule};
use super::metrics::StrategyResult;
use super::params::TradingParams;
use super::simulator::{simulate, SimulationConfig};
use crate::ports::session_port::SessionCalendar;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViabilityPolicy {
    pub min_trades: usize,
    pub min_win_rate: f64,
    /// Also accept a single winning trade.
    pub single_trade_carve_out: bool,
}

impl Default for ViabilityPolicy {
    fn default() -> Self {
        ViabilityPolicy {
            min_trades: 5,
            min_win_rate: 0.50,
            single_trade_carve_out: false,
        }
    }
}

impl ViabilityPolicy {
    pub fn is_viable(&self, result: &StrategyResult) -> bool {
        if self.single_trade_carve_out && result.trade_count == 1 && result.wins == 1 {
            return true;
        }
        result.trade_count >= self.min_trades && result.win_rate >= self.min_win_rate
    }
}

/// Bars for one symbol, ready to score.
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

pub struct Scorer<'a> {
    pub rules: Vec<EntryRule>,
    pub params: TradingParams,
    pub simulation: SimulationConfig,
    pub policy: ViabilityPolicy,
    pub calendar: &'a dyn SessionCalendar,
    pub parallel: bool,
}

impl Scorer<'_> {
    fn run(&self, symbol: &str, bars: &[Bar], rule: &EntryRule) -> StrategyResult {
        let trades = simulate(bars, rule, &self.params, self.calendar, &self.simulation);
        let mut result = StrategyResult::compute(symbol, rule.name, trades);
        result.viable = self.policy.is_viable(&result);
        debug!(
            symbol,
            strategy = rule.name,
            trades = result.trade_count,
            win_rate = result.win_rate,
            viable = result.viable,
            "scored"
        );
        result
    }

    /// Scores every (symbol, rule) pair and returns the ranked list.
    pub fn score_universe(&self, universe: &[SymbolSeries]) -> Vec<StrategyResult> {
        let jobs: Vec<(&SymbolSeries, &EntryRule)> = universe
            .iter()
            .flat_map(|s| self.rules.iter().map(move |r| (s, r)))
            .collect();

        info!(
            symbols = universe.len(),
            strategies = self.rules.len(),
            parallel = self.parallel,
            "scoring universe"
        );

        let mut results = self.run_jobs(&jobs);
        rank_results(&mut results);
        results
    }

    #[cfg(feature = "parallel")]
    fn run_jobs(&self, jobs: &[(&SymbolSeries, &EntryRule)]) -> Vec<StrategyResult> {
        if self.parallel {
            jobs.par_iter()
                .map(|(s, rule)| self.run(&s.symbol, &s.bars, rule))
                .collect()
        } else {
            jobs.iter()
                .map(|(s, rule)| self.run(&s.symbol, &s.bars, rule))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_jobs(&self, jobs: &[(&SymbolSeries, &EntryRule)]) -> Vec<StrategyResult> {
        jobs.iter()
            .map(|(s, rule)| self.run(&s.symbol, &s.bars, rule))
            .collect()
    }
}

fn compare(a: &StrategyResult, b: &StrategyResult) -> Ordering {
    a.symbol
        .cmp(&b.symbol)
        .then_with(|| b.viable.cmp(&a.viable))
        .then_with(|| b.win_rate.total_cmp(&a.win_rate))
        .then_with(|| registry_rank(&a.strategy).cmp(&registry_rank(&b.strategy)))
        .then_with(|| a.strategy.cmp(&b.strategy))
}

/// Symbol ascending, viable first, win rate descending, registry order.
pub fn rank_results(results: &mut [StrategyResult]) {
    results.sort_by(compare);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub strategy: String,
    pub win_rate: f64,
    pub avg_profit: f64,
    pub total_return: f64,
    pub trade_count: usize,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Selection {
    Selected(Recommendation),
    NoViableStrategy { symbol: String },
}

impl Selection {
    pub fn symbol(&self) -> &str {
        match self {
            Selection::Selected(r) => &r.symbol,
            Selection::NoViableStrategy { symbol } => symbol,
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Selection::Selected(r) => Some(r),
            Selection::NoViableStrategy { .. } => None,
        }
    }
}

/// Picks the first viable result per symbol. Expects `ranked` to be in
/// [`rank_results`] order.
pub fn select(ranked: &[StrategyResult], params: &TradingParams) -> Vec<Selection> {
    let mut selections: Vec<Selection> = Vec::new();
    for group in ranked.chunk_by(|a, b| a.symbol == b.symbol) {
        let symbol = &group[0].symbol;
        let selection = match group.iter().find(|r| r.viable) {
            Some(best) => {
                info!(symbol = %symbol, strategy = %best.strategy, win_rate = best.win_rate, "selected");
                Selection::Selected(Recommendation {
                    symbol: best.symbol.clone(),
                    strategy: best.strategy.clone(),
                    win_rate: best.win_rate,
                    avg_profit: best.avg_profit,
                    total_return: best.total_return,
                    trade_count: best.trade_count,
                    take_profit_pct: params.take_profit_pct,
                    stop_loss_pct: params.stop_loss_pct,
                    trailing_stop_pct: params.trailing_stop_pct,
                })
            }
            None => {
                info!(symbol = %symbol, "no viable strategy");
                Selection::NoViableStrategy {
                    symbol: symbol.clone(),
                }
            }
        };
        selections.push(selection);
    }
    selections
}

/// Everything a selection run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    pub params: TradingParams,
    pub policy: ViabilityPolicy,
    pub recommendations: Vec<Selection>,
    pub results: Vec<StrategyResult>,
}

impl SelectionReport {
    pub fn build(results: Vec<StrategyResult>, params: TradingParams, policy: ViabilityPolicy) -> Self {
        let recommendations = select(&results, &params);
        SelectionReport {
            params,
            policy,
            recommendations,
            results,
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter_map(Selection::recommendation)
    }
}

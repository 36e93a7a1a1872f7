//! Entry rules and the ordered strategy registry.
//!
//! Every rule looks at `bars[..=i]` (the current bar is the last element) and
//! returns `false` on short history or on any invalid bar inside the window it
//! reads. Rules never panic.

use super::bar::Bar;

pub type EntryPredicate = fn(&[Bar]) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct EntryRule {
    pub name: &'static str,
    /// Bars the predicate needs before it can ever accept.
    pub min_history: usize,
    pub predicate: EntryPredicate,
}

impl EntryRule {
    pub fn accepts(&self, history: &[Bar]) -> bool {
        history.len() >= self.min_history && (self.predicate)(history)
    }
}

impl PartialEq for EntryRule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

pub const VOLUME_SURGE_WINDOW: usize = 20;
pub const MEAN_REVERSION_WINDOW: usize = 20;
pub const SMA_SHORT: usize = 10;
pub const SMA_LONG: usize = 20;
pub const BREAKOUT_RECENT: usize = 5;
pub const BREAKOUT_HISTORY: usize = 20;

/// Registry order is also the final tie-break when ranking results.
pub const STANDARD_RULES: [EntryRule; 5] = [
    EntryRule {
        name: "volume_surge",
        min_history: VOLUME_SURGE_WINDOW,
        predicate: volume_surge,
    },
    EntryRule {
        name: "mean_reversion",
        min_history: MEAN_REVERSION_WINDOW,
        predicate: mean_reversion,
    },
    EntryRule {
        name: "sma_crossover",
        min_history: SMA_LONG + 1,
        predicate: sma_crossover,
    },
    EntryRule {
        name: "price_dip",
        min_history: 2,
        predicate: price_dip,
    },
    EntryRule {
        name: "volatility_breakout",
        min_history: BREAKOUT_RECENT + BREAKOUT_HISTORY,
        predicate: volatility_breakout,
    },
];

pub fn lookup(name: &str) -> Option<&'static EntryRule> {
    STANDARD_RULES.iter().find(|r| r.name == name)
}

pub fn rule_names() -> Vec<&'static str> {
    STANDARD_RULES.iter().map(|r| r.name).collect()
}

/// Position of `name` in [`STANDARD_RULES`]; unknown names sort last.
pub fn registry_rank(name: &str) -> usize {
    STANDARD_RULES
        .iter()
        .position(|r| r.name == name)
        .unwrap_or(STANDARD_RULES.len())
}

fn tail(bars: &[Bar], n: usize) -> Option<&[Bar]> {
    if n == 0 || bars.len() < n {
        return None;
    }
    let window = &bars[bars.len() - n..];
    if window.iter().all(Bar::is_valid) {
        Some(window)
    } else {
        None
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn sma(bars: &[Bar]) -> f64 {
    mean(bars.iter().map(|b| b.close))
}

/// Heavy volume on a red bar: current volume above twice the 20-bar average
/// and a drop of more than 1% from the open.
pub fn volume_surge(bars: &[Bar]) -> bool {
    let Some(window) = tail(bars, VOLUME_SURGE_WINDOW) else {
        return false;
    };
    let avg_volume = mean(window.iter().map(|b| b.volume as f64));
    if avg_volume <= 0.0 {
        return false;
    }
    let current = &window[window.len() - 1];
    current.volume as f64 > 2.0 * avg_volume && current.change_pct() < -1.0
}

/// Close more than two population standard deviations below the 20-bar mean.
pub fn mean_reversion(bars: &[Bar]) -> bool {
    let Some(window) = tail(bars, MEAN_REVERSION_WINDOW) else {
        return false;
    };
    let mu = sma(window);
    let variance = mean(window.iter().map(|b| (b.close - mu).powi(2)));
    let stddev = variance.sqrt();
    if stddev <= 0.0001 {
        return false;
    }
    let current = &window[window.len() - 1];
    (current.close - mu) / stddev < -2.0
}

pub fn sma_crossover(bars: &[Bar]) -> bool {
    sma_crossover_with(bars, SMA_SHORT, SMA_LONG)
}

/// Short SMA crosses above long SMA between the previous and current bar.
pub fn sma_crossover_with(bars: &[Bar], short: usize, long: usize) -> bool {
    if short == 0 || short >= long {
        return false;
    }
    let Some(window) = tail(bars, long + 1) else {
        return false;
    };
    let prev = &window[..long];
    let curr = &window[1..];
    let prev_short = sma(&prev[prev.len() - short..]);
    let prev_long = sma(prev);
    let curr_short = sma(&curr[curr.len() - short..]);
    let curr_long = sma(curr);
    prev_short <= prev_long && curr_short > curr_long
}

/// Current bar closes more than 1% below its open.
pub fn price_dip(bars: &[Bar]) -> bool {
    if bars.len() < 2 {
        return false;
    }
    tail(bars, 1).is_some_and(|current| current[0].change_pct() < -1.0)
}

/// Recent bar ranges expand past 1.5x their prior 20-bar average while the
/// current bar closes up.
pub fn volatility_breakout(bars: &[Bar]) -> bool {
    let Some(window) = tail(bars, BREAKOUT_RECENT + BREAKOUT_HISTORY) else {
        return false;
    };
    let (history, recent) = window.split_at(BREAKOUT_HISTORY);
    let historical = mean(history.iter().map(Bar::range_ratio));
    if historical < 0.0001 {
        return false;
    }
    let current_vol = mean(recent.iter().map(Bar::range_ratio));
    let current = &recent[recent.len() - 1];
    current_vol > 1.5 * historical && current.close > current.open
}

//! Single-bar statistics per symbol.
//!
//! Summarises what entering at each bar's open could have gained or lost
//! within that bar, and derives rough take-profit / stop-loss suggestions.
//! Percentages here are scaled (1.5 means 1.5%).

use serde::Serialize;

use super::bar::Bar;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarProfile {
    pub symbol: String,
    pub bar_count: usize,
    pub max_gain_pct: f64,
    pub max_loss_pct: f64,
    pub avg_range_pct: f64,
    pub volatility: f64,
    pub win_rate_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub profit_factor: f64,
    pub suggested_tp_pct: f64,
    pub suggested_sl_pct: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

impl BarProfile {
    fn empty(symbol: &str, bar_count: usize) -> Self {
        BarProfile {
            symbol: symbol.to_string(),
            bar_count,
            max_gain_pct: 0.0,
            max_loss_pct: 0.0,
            avg_range_pct: 0.0,
            volatility: 0.0,
            win_rate_pct: 0.0,
            avg_win_pct: 0.0,
            avg_loss_pct: 0.0,
            profit_factor: 0.0,
            suggested_tp_pct: 0.0,
            suggested_sl_pct: 0.0,
        }
    }

    /// `bar_count` counts every bar; statistics use valid bars only.
    pub fn compute(symbol: &str, bars: &[Bar]) -> Self {
        let valid: Vec<&Bar> = bars.iter().filter(|b| b.is_valid()).collect();
        if valid.is_empty() {
            return BarProfile::empty(symbol, bars.len());
        }

        let gains: Vec<f64> = valid
            .iter()
            .map(|b| (b.high - b.open) / b.open * 100.0)
            .collect();
        let losses: Vec<f64> = valid
            .iter()
            .map(|b| (b.low - b.open) / b.open * 100.0)
            .collect();
        let ranges: Vec<f64> = valid.iter().map(|b| b.range_ratio() * 100.0).collect();
        let returns: Vec<f64> = valid
            .windows(2)
            .map(|w| (w[1].close - w[0].close) / w[0].close * 100.0)
            .collect();

        let max_gain_pct = gains.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_loss_pct = losses.iter().copied().fold(f64::INFINITY, f64::min);
        let volatility = population_stddev(&returns);

        let winning: Vec<f64> = gains.iter().copied().filter(|g| *g > 0.0).collect();
        let losing: Vec<f64> = losses.iter().copied().filter(|l| *l < 0.0).collect();
        let total_gains: f64 = winning.iter().sum();
        let total_losses: f64 = losing.iter().map(|l| l.abs()).sum();

        BarProfile {
            symbol: symbol.to_string(),
            bar_count: bars.len(),
            max_gain_pct,
            max_loss_pct,
            avg_range_pct: mean(&ranges),
            volatility,
            win_rate_pct: winning.len() as f64 / gains.len() as f64 * 100.0,
            avg_win_pct: mean(&winning),
            avg_loss_pct: mean(&losing),
            profit_factor: if total_losses > 0.0 {
                total_gains / total_losses
            } else {
                0.0
            },
            suggested_tp_pct: max_gain_pct * 0.5,
            suggested_sl_pct: (max_loss_pct.abs() * 0.5).min(volatility * 2.0),
        }
    }
}

/// Largest single-bar gain first; ties by symbol.
pub fn rank_profiles(profiles: &mut [BarProfile]) {
    profiles.sort_by(|a, b| {
        b.max_gain_pct
            .total_cmp(&a.max_gain_pct)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: "2026-02-02T15:00:00Z".into(),
            open,
            high,
            low,
            close,
            volume: 100,
            trade_count: 1,
            vwap: None,
        }
    }

    #[test]
    fn empty_series() {
        let p = BarProfile::compute("AAPL", &[]);
        assert_eq!(p.bar_count, 0);
        assert_eq!(p.max_gain_pct, 0.0);
        assert_eq!(p.suggested_sl_pct, 0.0);
    }

    #[test]
    fn invalid_bars_ignored_but_counted() {
        let bars = vec![make_bar(100.0, 90.0, 80.0, 85.0)];
        let p = BarProfile::compute("AAPL", &bars);
        assert_eq!(p.bar_count, 1);
        assert_eq!(p.max_gain_pct, 0.0);
    }

    #[test]
    fn two_bar_profile() {
        let bars = vec![
            make_bar(100.0, 102.0, 99.0, 101.0),
            make_bar(101.0, 101.0, 98.98, 99.99),
        ];
        let p = BarProfile::compute("AAPL", &bars);
        assert_eq!(p.bar_count, 2);
        assert_relative_eq!(p.max_gain_pct, 2.0, epsilon = 1e-9);
        assert_relative_eq!(p.max_loss_pct, -2.0, epsilon = 1e-9);
        // one close-to-close return, so zero spread
        assert_relative_eq!(p.volatility, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.win_rate_pct, 50.0, epsilon = 1e-9);
        assert_relative_eq!(p.avg_win_pct, 2.0, epsilon = 1e-9);
        assert_relative_eq!(p.avg_loss_pct, -1.5, epsilon = 1e-9);
        assert_relative_eq!(p.profit_factor, 2.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(p.suggested_tp_pct, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.suggested_sl_pct, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn stop_suggestion_capped_by_loss() {
        let bars = vec![
            make_bar(100.0, 101.0, 99.0, 100.0),
            make_bar(100.0, 111.0, 99.0, 110.0),
            make_bar(110.0, 111.0, 98.0, 99.0),
        ];
        let p = BarProfile::compute("X", &bars);
        // returns +10% then -10%, stddev 10
        assert_relative_eq!(p.volatility, 10.0, epsilon = 1e-9);
        let expected_sl = (p.max_loss_pct.abs() * 0.5).min(20.0);
        assert_relative_eq!(p.suggested_sl_pct, expected_sl, epsilon = 1e-12);
    }

    #[test]
    fn ranking_by_max_gain() {
        let mut profiles = vec![
            BarProfile {
                max_gain_pct: 1.0,
                ..BarProfile::empty("A", 1)
            },
            BarProfile {
                max_gain_pct: 3.0,
                ..BarProfile::empty("C", 1)
            },
            BarProfile {
                max_gain_pct: 3.0,
                ..BarProfile::empty("B", 1)
            },
        ];
        rank_profiles(&mut profiles);
        let order: Vec<&str> = profiles.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }
}

//! Candidate screening over the whole symbol universe.
//!
//! Thresholds are derived from the universe itself, so the screen adapts to
//! whatever set of symbols it is given.

use serde::Serialize;

use super::bar::Bar;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolStats {
    pub symbol: String,
    pub bar_count: usize,
    pub avg_volume: f64,
    pub avg_price: f64,
    /// Mean of (high - low) / close, unscaled.
    pub avg_volatility: f64,
    /// (high - low) / close * 100 of the last bar.
    pub last_bar_range_pct: f64,
}

impl SymbolStats {
    pub fn compute(symbol: &str, bars: &[Bar]) -> Self {
        let n = bars.len();
        let (volume, price, range) = bars.iter().fold((0.0, 0.0, 0.0), |(v, p, r), b| {
            let ratio = if b.close > 0.0 { b.range_ratio() } else { 0.0 };
            (v + b.volume as f64, p + b.close, r + ratio)
        });
        let avg = |total: f64| if n > 0 { total / n as f64 } else { 0.0 };
        let last_bar_range_pct = match bars.last() {
            Some(last) if last.close > 0.0 => last.range_ratio() * 100.0,
            _ => 0.0,
        };
        SymbolStats {
            symbol: symbol.to_string(),
            bar_count: n,
            avg_volume: avg(volume),
            avg_price: avg(price),
            avg_volatility: avg(range),
            last_bar_range_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Spread {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl Spread {
    fn of(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Spread::default();
        }
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
        Spread {
            min: values[0],
            max: values[values.len() - 1],
            median,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MarketStats {
    pub volume: Spread,
    pub price: Spread,
    pub volatility: Spread,
}

impl MarketStats {
    pub fn compute(stats: &[SymbolStats]) -> Self {
        let volume = Spread::of(stats.iter().map(|s| s.avg_volume).collect());
        MarketStats {
            volume: Spread {
                min: volume.min.floor(),
                max: volume.max.ceil(),
                median: volume.median,
            },
            price: Spread::of(stats.iter().map(|s| s.avg_price).collect()),
            volatility: Spread::of(stats.iter().map(|s| s.avg_volatility).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenCriteria {
    pub min_avg_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_volatility: f64,
    pub min_bar_count: usize,
    pub max_bar_range_pct: f64,
}

impl ScreenCriteria {
    pub fn from_market(market: &MarketStats) -> Self {
        ScreenCriteria {
            min_avg_volume: market.volume.median * 0.5,
            min_price: 10.0,
            max_price: market.price.max * 1.1,
            min_volatility: market.volatility.median * 0.5,
            min_bar_count: 100,
            max_bar_range_pct: 0.5,
        }
    }

    /// First failing check, or `None` when the symbol passes.
    pub fn reject(&self, stats: &SymbolStats) -> Option<Rejection> {
        if stats.bar_count < self.min_bar_count {
            return Some(Rejection::InsufficientBars {
                bars: stats.bar_count,
                minimum: self.min_bar_count,
            });
        }
        if stats.avg_volume < self.min_avg_volume {
            return Some(Rejection::LowVolume {
                avg: stats.avg_volume,
                minimum: self.min_avg_volume,
            });
        }
        if stats.avg_price < self.min_price {
            return Some(Rejection::PriceTooLow {
                avg: stats.avg_price,
                minimum: self.min_price,
            });
        }
        if stats.avg_price > self.max_price {
            return Some(Rejection::PriceTooHigh {
                avg: stats.avg_price,
                maximum: self.max_price,
            });
        }
        if stats.avg_volatility < self.min_volatility {
            return Some(Rejection::LowVolatility {
                avg: stats.avg_volatility,
                minimum: self.min_volatility,
            });
        }
        if stats.last_bar_range_pct > self.max_bar_range_pct {
            return Some(Rejection::SpreadTooWide {
                range_pct: stats.last_bar_range_pct,
                maximum: self.max_bar_range_pct,
            });
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("insufficient bars ({bars} < {minimum})")]
    InsufficientBars { bars: usize, minimum: usize },
    #[error("low volume ({avg:.0} < {minimum:.0})")]
    LowVolume { avg: f64, minimum: f64 },
    #[error("price too low (${avg:.2} < ${minimum:.2})")]
    PriceTooLow { avg: f64, minimum: f64 },
    #[error("price too high (${avg:.2} > ${maximum:.2})")]
    PriceTooHigh { avg: f64, maximum: f64 },
    #[error("low volatility ({avg:.4} < {minimum:.4})")]
    LowVolatility { avg: f64, minimum: f64 },
    #[error("spread too wide ({range_pct:.3}% > {maximum:.2}%)")]
    SpreadTooWide { range_pct: f64, maximum: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenedSymbol {
    #[serde(flatten)]
    pub stats: SymbolStats,
    pub tradeable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenReport {
    /// Passing symbols in input order.
    pub candidates: Vec<String>,
    pub criteria: ScreenCriteria,
    pub market: MarketStats,
    pub symbols: Vec<ScreenedSymbol>,
}

/// Screens `(symbol, bars)` pairs against criteria derived from all of them.
pub fn screen(universe: &[(String, Vec<Bar>)]) -> ScreenReport {
    let stats: Vec<SymbolStats> = universe
        .iter()
        .map(|(symbol, bars)| SymbolStats::compute(symbol, bars))
        .collect();
    let market = MarketStats::compute(&stats);
    let criteria = ScreenCriteria::from_market(&market);

    let symbols: Vec<ScreenedSymbol> = stats
        .into_iter()
        .map(|s| {
            let rejection = criteria.reject(&s);
            ScreenedSymbol {
                stats: s,
                tradeable: rejection.is_none(),
                rejection,
            }
        })
        .collect();
    let candidates = symbols
        .iter()
        .filter(|s| s.tradeable)
        .map(|s| s.stats.symbol.clone())
        .collect();

    ScreenReport {
        candidates,
        criteria,
        market,
        symbols,
    }
}

//! End-to-end tests over the domain pipeline with mock ports.
//!
//! Tests cover:
//! - Entry fills at the following bar's open (volume surge on a red bar)
//! - Mean reversion rejecting a shallow dip
//! - Exit paths through the simulator: take-profit, risk-off window, session gap
//! - End-of-data policies
//! - Universe validation with partial failures
//! - Scoring, ranking and selection across a multi-symbol universe

mod common;

use approx::assert_relative_eq;
use common::*;
use lftrader::adapters::file_config_adapter::FileConfigAdapter;
use lftrader::adapters::json_report_adapter::JsonReportAdapter;
use lftrader::adapters::session_calendar::{AlwaysOpenCalendar, NyseCalendar};
use lftrader::cli::run_select_pipeline;
use lftrader::domain::entry::{lookup, STANDARD_RULES};
use lftrader::domain::error::LftError;
use lftrader::domain::params::TradingParams;
use lftrader::domain::position::ExitReason;
use lftrader::domain::selection::{Scorer, Selection, SelectionReport, SymbolSeries, ViabilityPolicy};
use lftrader::domain::simulator::{simulate, EndOfDataPolicy, SimulationConfig};
use lftrader::domain::universe::{validate_universe, SkipReason};
use tempfile::TempDir;

mod entry_and_fill {
    use super::*;

    /// 24 flat bars, then a heavy-volume red bar.
    fn surge_series() -> Vec<lftrader::domain::bar::Bar> {
        let mut bars = flat_bars(24, 100.0);
        push(&mut bars, 99.0, 97.0, 3000);
        bars
    }

    #[test]
    fn volume_surge_accepts_heavy_red_bar() {
        let rule = lookup("volume_surge").unwrap();
        let bars = surge_series();
        assert!(rule.accepts(&bars));
        assert!(!rule.accepts(&bars[..24]));
    }

    #[test]
    fn trade_fills_at_following_open() {
        let rule = lookup("volume_surge").unwrap();
        let mut bars = surge_series();
        push(&mut bars, 97.5, 97.5, 1000);
        push(&mut bars, 97.5, 99.0, 1000);
        push(&mut bars, 99.2, 99.2, 1000);

        let trades = simulate(
            &bars,
            rule,
            &TradingParams::default(),
            &AlwaysOpenCalendar,
            &SimulationConfig::default(),
        );
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_relative_eq!(t.entry_price, 97.5);
        assert_eq!(t.entry_timestamp, bars[25].timestamp);
        assert_eq!(t.exit_reason, ExitReason::TakeProfit);
        assert_relative_eq!(t.exit_price, 99.2);
        assert_eq!(t.exit_timestamp, bars[27].timestamp);
        assert_eq!(t.duration_bars, 2);
        assert!(t.is_win());
    }

    #[test]
    fn mean_reversion_rejects_shallow_dip() {
        let mut bars: Vec<_> = (0..20)
            .map(|i| {
                let close = if i % 2 == 0 { 98.0 } else { 102.0 };
                make_bar(i, close, close, 1000)
            })
            .collect();
        push(&mut bars, 97.0, 97.0, 1000);
        assert!(!lookup("mean_reversion").unwrap().accepts(&bars));
    }
}

mod exits {
    use super::*;

    /// Flat warmup, a 1.5% dip signal at index 21, then flat at 98.5.
    fn dip_then_flat(total: usize, start: &str) -> Vec<lftrader::domain::bar::Bar> {
        let mut bars: Vec<_> = (0..21)
            .map(|i| bar_with_ts(minute_ts(start, i), 100.0, 100.0, 1000))
            .collect();
        bars.push(bar_with_ts(minute_ts(start, 21), 100.0, 98.5, 1000));
        for i in 22..total {
            bars.push(bar_with_ts(minute_ts(start, i), 98.5, 98.5, 1000));
        }
        bars
    }

    #[test]
    fn force_close_at_end_of_data() {
        let bars = dip_then_flat(25, SESSION_START);
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &AlwaysOpenCalendar,
            &SimulationConfig::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(trades[0].exit_timestamp, bars[24].timestamp);
        assert_relative_eq!(trades[0].profit_pct, 0.0);
    }

    #[test]
    fn discard_drops_open_position() {
        let bars = dip_then_flat(25, SESSION_START);
        let config = SimulationConfig {
            end_of_data: EndOfDataPolicy::Discard,
            ..SimulationConfig::default()
        };
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &AlwaysOpenCalendar,
            &config,
        );
        assert!(trades.is_empty());
    }

    #[test]
    fn closing_risk_off_window_exits_at_next_open() {
        // 20:00 UTC start; the last 30 minutes of the session are risk-off
        let bars = dip_then_flat(33, "2026-02-16T20:00:00Z");
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &NyseCalendar::default(),
            &SimulationConfig::default(),
        );
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.exit_reason, ExitReason::RiskOff);
        assert_eq!(t.entry_timestamp, "2026-02-16T20:22:00Z");
        assert_eq!(t.exit_timestamp, "2026-02-16T20:31:00Z");
    }

    #[test]
    fn no_entries_during_opening_risk_off() {
        let bars = dip_then_flat(30, "2026-02-16T14:30:00Z");
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &NyseCalendar::default(),
            &SimulationConfig::default(),
        );
        assert!(trades.is_empty());
    }

    #[test]
    fn no_entry_when_fill_lands_in_closing_risk_off() {
        let rule = lookup("price_dip").unwrap();
        let params = TradingParams::default();
        let cal = NyseCalendar::default();
        // signal at 20:29, fill at 20:30 where the closing window starts
        let blocked = dip_then_flat(30, "2026-02-16T20:08:00Z");
        assert!(simulate(&blocked, rule, &params, &cal, &SimulationConfig::default()).is_empty());

        // one minute earlier the fill is still tradable
        let allowed = dip_then_flat(30, "2026-02-16T20:07:00Z");
        let trades = simulate(&allowed, rule, &params, &cal, &SimulationConfig::default());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_timestamp, "2026-02-16T20:29:00Z");
        assert_eq!(trades[0].exit_reason, ExitReason::RiskOff);
    }

    fn across_sessions() -> Vec<lftrader::domain::bar::Bar> {
        let mut bars = dip_then_flat(23, SESSION_START);
        bars.push(bar_with_ts("2026-02-17T15:30:00Z".into(), 98.5, 98.5, 1000));
        bars.push(bar_with_ts("2026-02-17T15:31:00Z".into(), 98.5, 98.5, 1000));
        bars
    }

    #[test]
    fn session_gap_closes_at_current_close() {
        let bars = across_sessions();
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &AlwaysOpenCalendar,
            &SimulationConfig::default(),
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::RiskOff);
        assert_eq!(trades[0].exit_timestamp, bars[22].timestamp);
        assert_eq!(trades[0].duration_bars, 0);
    }

    #[test]
    fn session_gap_ignored_when_disabled() {
        let bars = across_sessions();
        let config = SimulationConfig {
            close_on_session_gap: false,
            ..SimulationConfig::default()
        };
        let trades = simulate(
            &bars,
            lookup("price_dip").unwrap(),
            &TradingParams::default(),
            &AlwaysOpenCalendar,
            &config,
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfData);
    }
}

mod universe_validation {
    use super::*;

    #[test]
    fn partial_universe_proceeds() {
        let source = MockBarSource::new()
            .with_bars("AAPL", dip_and_recover(2))
            .with_bars("TINY", flat_bars(5, 50.0))
            .with_error("BROKEN");
        let symbols = vec!["AAPL".to_string(), "TINY".into(), "BROKEN".into(), "GONE".into()];

        let result = validate_universe(&source, symbols, SimulationConfig::default().min_bars()).unwrap();
        assert_eq!(result.symbols(), vec!["AAPL"]);
        assert_eq!(result.skipped.len(), 3);
        assert_eq!(result.skipped[0].symbol, "TINY");
        assert_eq!(result.skipped[0].reason, SkipReason::InsufficientBars { bars: 5 });
        assert_eq!(result.skipped[1].reason, SkipReason::NoData);
        assert_eq!(result.skipped[2].reason, SkipReason::NoData);
    }

    #[test]
    fn empty_universe_is_error() {
        let source = MockBarSource::new().with_bars("TINY", flat_bars(5, 50.0));
        let err = validate_universe(&source, vec!["TINY".into()], 22).unwrap_err();
        assert!(matches!(err, LftError::InsufficientData { .. }));
    }
}

mod selection_pipeline {
    use super::*;

    fn scorer(parallel: bool) -> Scorer<'static> {
        Scorer {
            rules: STANDARD_RULES.to_vec(),
            params: TradingParams::default(),
            simulation: SimulationConfig::default(),
            policy: ViabilityPolicy::default(),
            calendar: &AlwaysOpenCalendar,
            parallel,
        }
    }

    fn universe() -> Vec<SymbolSeries> {
        vec![
            SymbolSeries {
                symbol: "MSFT".into(),
                bars: flat_bars(60, 300.0),
            },
            SymbolSeries {
                symbol: "AAPL".into(),
                bars: dip_and_recover(8),
            },
        ]
    }

    #[test]
    fn one_result_per_symbol_and_rule() {
        let results = scorer(false).score_universe(&universe());
        assert_eq!(results.len(), 2 * STANDARD_RULES.len());
        assert!(results[..STANDARD_RULES.len()].iter().all(|r| r.symbol == "AAPL"));
        assert!(results[STANDARD_RULES.len()..].iter().all(|r| r.symbol == "MSFT"));
    }

    #[test]
    fn dip_strategy_selected_and_flat_symbol_has_none() {
        let s = scorer(false);
        let results = s.score_universe(&universe());
        let report = SelectionReport::build(results, s.params, s.policy);

        assert_eq!(report.recommendations.len(), 2);
        let rec = report.recommendations[0].recommendation().unwrap();
        assert_eq!(rec.symbol, "AAPL");
        assert_eq!(rec.trade_count, 8);
        assert_relative_eq!(rec.win_rate, 1.0);
        assert_relative_eq!(rec.take_profit_pct, 0.0125);
        assert_eq!(
            report.recommendations[1],
            Selection::NoViableStrategy {
                symbol: "MSFT".into()
            }
        );

        let dip = report
            .results
            .iter()
            .find(|r| r.symbol == "AAPL" && r.strategy == "price_dip")
            .unwrap();
        assert!(dip.viable);
        assert_eq!(dip.exit_reasons.get(ExitReason::TakeProfit), 8);
        assert_relative_eq!(dip.avg_profit, 1.5 / 98.5, epsilon = 1e-12);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let a = scorer(false).score_universe(&universe());
        let b = scorer(true).score_universe(&universe());
        assert_eq!(a, b);
    }

    #[test]
    fn pipeline_writes_deterministic_report() {
        let dir = TempDir::new().unwrap();
        let config = FileConfigAdapter::parse("[data]\nbars_dir = unused\n").unwrap();
        let source = MockBarSource::new()
            .with_bars("AAPL", dip_and_recover(8))
            .with_bars("MSFT", flat_bars(60, 300.0));
        let symbols = vec!["AAPL".to_string(), "MSFT".into()];

        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        for (path, parallel) in [(&first, true), (&second, false)] {
            run_select_pipeline(
                &config,
                &source,
                &AlwaysOpenCalendar,
                symbols.clone(),
                parallel,
                &JsonReportAdapter::new(true),
                path,
            )
            .unwrap();
        }
        let a = std::fs::read_to_string(&first).unwrap();
        let b = std::fs::read_to_string(&second).unwrap();
        assert_eq!(a, b);

        let value: serde_json::Value = serde_json::from_str(&a).unwrap();
        assert_eq!(value["recommendations"][0]["status"], "selected");
        assert_eq!(value["recommendations"][1]["status"], "no_viable_strategy");
    }
}

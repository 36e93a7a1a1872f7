//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fix_encoder::FixEncoder;
use crate::adapters::json_bar_adapter::JsonBarAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::positions_adapter::load_positions;
use crate::adapters::session_calendar::CalendarKind;
use crate::domain::config_validation::validate_config;
use crate::domain::entry::{lookup, rule_names, EntryRule, STANDARD_RULES};
use crate::domain::error::LftError;
use crate::domain::metrics::StrategyResult;
use crate::domain::order::{
    entry_order, entry_signal, exit_check, exit_order, HeldPosition, OrderInstruction,
    DEFAULT_MAX_ORDER_VALUE,
};
use crate::domain::params::TradingParams;
use crate::domain::profile::{rank_profiles, BarProfile};
use crate::domain::screen::screen;
use crate::domain::selection::{Scorer, Selection, SelectionReport, ViabilityPolicy};
use crate::domain::simulator::{simulate, EndOfDataPolicy, SimulationConfig};
use crate::domain::universe::{parse_symbols, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::order_port::OrderEncoder;
use crate::ports::report_port::ResultWriter;
use crate::ports::session_port::SessionCalendar;

#[derive(Parser, Debug)]
#[command(name = "lftrader", about = "Low-frequency equity strategy backtester")]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score every strategy per symbol and write the selection report
    Select {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated symbols, overriding [data] symbols
        #[arg(long)]
        symbols: Option<String>,
        /// Run simulations on the calling thread only
        #[arg(long)]
        sequential: bool,
    },
    /// Simulate one strategy on one symbol and print its trades
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        strategy: String,
    },
    /// Print single-bar statistics per symbol
    Profile {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Screen the universe for tradeable candidates
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the latest bar for entry signals and emit FIX buy orders
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        /// SYMBOL:strategy pairs; defaults to a fresh selection run
        #[arg(long = "pick")]
        picks: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check held positions against the latest bar and emit FIX sell orders
    Exits {
        #[arg(short, long)]
        config: PathBuf,
        /// Broker positions JSON, overriding [orders] positions_file
        #[arg(long)]
        positions: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the registered entry strategies
    Strategies,
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    let result = match cli.command {
        Command::Select {
            config,
            output,
            symbols,
            sequential,
        } => run_select(&config, output.as_deref(), symbols.as_deref(), sequential),
        Command::Simulate {
            config,
            symbol,
            strategy,
        } => run_simulate(&config, &symbol, &strategy),
        Command::Profile { config, symbols } => run_profile(&config, symbols.as_deref()),
        Command::Screen { config, output } => run_screen(&config, output.as_deref()),
        Command::Signal {
            config,
            picks,
            output,
        } => run_signal(&config, &picks, output.as_deref()),
        Command::Exits {
            config,
            positions,
            output,
        } => run_exits(&config, positions.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Strategies => {
            run_strategies();
            Ok(())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if matches!(e, LftError::UnknownStrategy { .. }) {
                info!("known strategies: {}", rule_names().join(", "));
            }
            (&e).into()
        }
    }
}

fn load_validated(path: &Path) -> Result<FileConfigAdapter, LftError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::load(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_trading_params(adapter: &dyn ConfigPort) -> TradingParams {
    let d = TradingParams::default();
    TradingParams {
        take_profit_pct: adapter.get_double("trading", "take_profit_pct", d.take_profit_pct),
        stop_loss_pct: adapter.get_double("trading", "stop_loss_pct", d.stop_loss_pct),
        trailing_stop_pct: adapter.get_double("trading", "trailing_stop_pct", d.trailing_stop_pct),
    }
}

pub fn build_simulation_config(adapter: &dyn ConfigPort) -> Result<SimulationConfig, LftError> {
    let d = SimulationConfig::default();
    let warmup = adapter.get_int("simulation", "warmup_bars", d.warmup_bars as i64);
    let warmup_bars = usize::try_from(warmup).map_err(|_| LftError::ConfigInvalid {
        section: "simulation".into(),
        key: "warmup_bars".into(),
        reason: "warmup_bars must be non-negative".into(),
    })?;
    let end_of_data = match adapter.get_string("simulation", "end_of_data") {
        None => d.end_of_data,
        Some(s) => EndOfDataPolicy::parse(s.trim()).ok_or_else(|| LftError::ConfigInvalid {
            section: "simulation".into(),
            key: "end_of_data".into(),
            reason: format!("unknown policy {s:?}"),
        })?,
    };
    Ok(SimulationConfig {
        warmup_bars,
        end_of_data,
        close_on_session_gap: adapter.get_bool(
            "simulation",
            "close_on_session_gap",
            d.close_on_session_gap,
        ),
    })
}

pub fn build_viability_policy(adapter: &dyn ConfigPort) -> Result<ViabilityPolicy, LftError> {
    let d = ViabilityPolicy::default();
    let min_trades = adapter.get_int("selection", "min_trades", d.min_trades as i64);
    let min_trades = usize::try_from(min_trades).map_err(|_| LftError::ConfigInvalid {
        section: "selection".into(),
        key: "min_trades".into(),
        reason: format!("min_trades must be non-negative, got {min_trades}"),
    })?;
    Ok(ViabilityPolicy {
        min_trades,
        min_win_rate: adapter.get_double("selection", "min_win_rate", d.min_win_rate),
        single_trade_carve_out: adapter.get_bool(
            "selection",
            "single_trade_carve_out",
            d.single_trade_carve_out,
        ),
    })
}

/// `[selection] strategies` in the given order, or the full registry.
pub fn build_rules(adapter: &dyn ConfigPort) -> Result<Vec<EntryRule>, LftError> {
    let Some(list) = adapter.get_string("selection", "strategies") else {
        return Ok(STANDARD_RULES.to_vec());
    };
    let names: Vec<&str> = list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if names.is_empty() {
        return Ok(STANDARD_RULES.to_vec());
    }
    names
        .into_iter()
        .map(|name| {
            lookup(name).copied().ok_or_else(|| LftError::UnknownStrategy {
                name: name.to_string(),
            })
        })
        .collect()
}

pub fn build_bar_source(adapter: &dyn ConfigPort) -> Result<Box<dyn BarSource>, LftError> {
    let dir = adapter
        .get_string("data", "bars_dir")
        .ok_or_else(|| LftError::ConfigMissing {
            section: "data".into(),
            key: "bars_dir".into(),
        })?;
    let dir = PathBuf::from(dir.trim());
    match adapter.get_string("data", "format").as_deref().map(str::trim) {
        None | Some("json") => Ok(Box::new(JsonBarAdapter::new(dir))),
        Some("csv") => Ok(Box::new(CsvAdapter::new(dir))),
        Some(other) => Err(LftError::ConfigInvalid {
            section: "data".into(),
            key: "format".into(),
            reason: format!("unknown format {other:?}"),
        }),
    }
}

pub fn build_calendar(adapter: &dyn ConfigPort) -> Result<Box<dyn SessionCalendar>, LftError> {
    let name = adapter
        .get_string("data", "calendar")
        .unwrap_or_else(|| "nyse".to_string());
    CalendarKind::parse(name.trim())
        .map(CalendarKind::build)
        .ok_or_else(|| LftError::ConfigInvalid {
            section: "data".into(),
            key: "calendar".into(),
            reason: format!("unknown calendar {name:?}"),
        })
}

/// Override, then `[data] symbols`, then every symbol the source has.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
    source: &dyn BarSource,
) -> Result<Vec<String>, LftError> {
    let invalid = |e: crate::domain::universe::UniverseError| LftError::ConfigInvalid {
        section: "data".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    };
    if let Some(list) = symbols_override {
        return parse_symbols(list).map_err(invalid);
    }
    match config.get_string("data", "symbols") {
        Some(list) if !list.trim().is_empty() => parse_symbols(&list).map_err(invalid),
        _ => source.list_symbols(),
    }
}

pub fn output_path(override_path: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    match override_path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(
            config
                .get_string("report", "output")
                .unwrap_or_else(|| "strategies.json".to_string()),
        ),
    }
}

/// Everything after configuration: load, score, rank, select, persist.
pub fn run_select_pipeline(
    config: &dyn ConfigPort,
    source: &dyn BarSource,
    calendar: &dyn SessionCalendar,
    symbols: Vec<String>,
    parallel: bool,
    writer: &dyn ResultWriter,
    output: &Path,
) -> Result<SelectionReport, LftError> {
    let simulation = build_simulation_config(config)?;
    let scorer = Scorer {
        rules: build_rules(config)?,
        params: build_trading_params(config),
        simulation,
        policy: build_viability_policy(config)?,
        calendar,
        parallel,
    };

    let universe = validate_universe(source, symbols, simulation.min_bars())?;
    let results = scorer.score_universe(&universe.series);
    let report = SelectionReport::build(results, scorer.params, scorer.policy);
    writer.write(&report, output)?;
    Ok(report)
}

fn print_selection(report: &SelectionReport) {
    for selection in &report.recommendations {
        match selection {
            Selection::Selected(r) => println!(
                "{:<6} {:<20} win_rate={:.3} avg_profit={:.4} trades={}",
                r.symbol, r.strategy, r.win_rate, r.avg_profit, r.trade_count
            ),
            Selection::NoViableStrategy { symbol } => {
                println!("{:<6} (no viable strategy)", symbol)
            }
        }
    }
}

fn run_select(
    config_path: &Path,
    output: Option<&Path>,
    symbols: Option<&str>,
    sequential: bool,
) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let source = build_bar_source(&config)?;
    let calendar = build_calendar(&config)?;
    let symbols = resolve_symbols(symbols, &config, source.as_ref())?;
    let parallel = !sequential && config.get_bool("selection", "parallel", true);
    let output = output_path(output, &config);

    let report = run_select_pipeline(
        &config,
        source.as_ref(),
        calendar.as_ref(),
        symbols,
        parallel,
        &JsonReportAdapter::new(true),
        &output,
    )?;
    print_selection(&report);
    if report.selected().next().is_none() {
        // daily bars stamped at midnight never open under the nyse calendar
        warn!("no symbol has a viable strategy; check [data] calendar for daily bars");
    }
    info!(
        selected = report.selected().count(),
        symbols = report.recommendations.len(),
        "selection complete"
    );
    Ok(())
}

fn run_simulate(config_path: &Path, symbol: &str, strategy: &str) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let rule = lookup(strategy).ok_or_else(|| LftError::UnknownStrategy {
        name: strategy.to_string(),
    })?;
    let source = build_bar_source(&config)?;
    let calendar = build_calendar(&config)?;
    let params = build_trading_params(&config);
    let simulation = build_simulation_config(&config)?;

    let symbol = symbol.to_uppercase();
    let bars = source.fetch_bars(&symbol)?;
    if bars.is_empty() {
        return Err(LftError::NoData { symbol });
    }
    let trades = simulate(&bars, rule, &params, calendar.as_ref(), &simulation);
    let result = StrategyResult::compute(&symbol, rule.name, trades);
    println!("{}", JsonReportAdapter::new(true).render(&result)?);
    Ok(())
}

fn load_all(
    symbols: Option<&str>,
    config: &dyn ConfigPort,
    source: &dyn BarSource,
) -> Result<Vec<(String, Vec<crate::domain::bar::Bar>)>, LftError> {
    let mut loaded = Vec::new();
    for symbol in resolve_symbols(symbols, config, source)? {
        match source.fetch_bars(&symbol) {
            Ok(bars) => loaded.push((symbol, bars)),
            Err(e) => warn!(symbol = %symbol, error = %e, "skipping symbol"),
        }
    }
    if loaded.is_empty() {
        return Err(LftError::NoData {
            symbol: "all".to_string(),
        });
    }
    Ok(loaded)
}

fn run_profile(config_path: &Path, symbols: Option<&str>) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let source = build_bar_source(&config)?;
    let mut profiles: Vec<BarProfile> = load_all(symbols, &config, source.as_ref())?
        .iter()
        .map(|(symbol, bars)| BarProfile::compute(symbol, bars))
        .collect();
    rank_profiles(&mut profiles);

    println!(
        "{:<6} {:>6} {:>8} {:>8} {:>8} {:>8} {:>7} {:>6} {:>6}",
        "symbol", "bars", "max_gain", "max_loss", "range", "vol", "win%", "tp%", "sl%"
    );
    for p in &profiles {
        println!(
            "{:<6} {:>6} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>7.1} {:>6.2} {:>6.2}",
            p.symbol,
            p.bar_count,
            p.max_gain_pct,
            p.max_loss_pct,
            p.avg_range_pct,
            p.volatility,
            p.win_rate_pct,
            p.suggested_tp_pct,
            p.suggested_sl_pct
        );
    }
    Ok(())
}

fn run_screen(config_path: &Path, output: Option<&Path>) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let source = build_bar_source(&config)?;
    let report = screen(&load_all(None, &config, source.as_ref())?);
    info!(
        candidates = report.candidates.len(),
        symbols = report.symbols.len(),
        "screen complete"
    );
    let body = JsonReportAdapter::new(true).render(&report)?;
    match output {
        Some(path) => fs::write(path, body + "\n")?,
        None => println!("{body}"),
    }
    Ok(())
}

fn parse_pick(pick: &str) -> Result<(String, &'static EntryRule), LftError> {
    let (symbol, strategy) = pick.split_once(':').ok_or_else(|| LftError::UnknownStrategy {
        name: pick.to_string(),
    })?;
    let rule = lookup(strategy.trim()).ok_or_else(|| LftError::UnknownStrategy {
        name: strategy.trim().to_string(),
    })?;
    Ok((symbol.trim().to_uppercase(), rule))
}

/// Buy orders for every pick whose rule fires on the latest bar.
pub fn collect_entry_orders(
    picks: &[(String, &EntryRule)],
    source: &dyn BarSource,
    calendar: &dyn SessionCalendar,
    params: &TradingParams,
    max_order_value: f64,
) -> Vec<OrderInstruction> {
    let mut orders = Vec::new();
    for (symbol, rule) in picks {
        let bars = match source.fetch_bars(symbol) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                continue;
            }
        };
        if !entry_signal(&bars, rule, calendar) {
            info!(symbol = %symbol, strategy = rule.name, "no signal");
            continue;
        }
        let Some(latest) = bars.last() else {
            continue;
        };
        match entry_order(symbol, rule.name, latest, params, max_order_value) {
            Ok(order) => {
                info!(symbol = %symbol, strategy = rule.name, shares = order.quantity, "entry signal");
                orders.push(order);
            }
            Err(e) => warn!("{e}"),
        }
    }
    orders
}

fn run_signal(config_path: &Path, picks: &[String], output: Option<&Path>) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let source = build_bar_source(&config)?;
    let calendar = build_calendar(&config)?;
    let params = build_trading_params(&config);
    let max_order_value = config.get_double("orders", "max_order_value", DEFAULT_MAX_ORDER_VALUE);

    let picks: Vec<(String, &EntryRule)> = if picks.is_empty() {
        let symbols = resolve_symbols(None, &config, source.as_ref())?;
        let simulation = build_simulation_config(&config)?;
        let scorer = Scorer {
            rules: build_rules(&config)?,
            params,
            simulation,
            policy: build_viability_policy(&config)?,
            calendar: calendar.as_ref(),
            parallel: config.get_bool("selection", "parallel", true),
        };
        let universe = validate_universe(source.as_ref(), symbols, simulation.min_bars())?;
        let report = SelectionReport::build(scorer.score_universe(&universe.series), params, scorer.policy);
        report
            .selected()
            .filter_map(|r| lookup(&r.strategy).map(|rule| (r.symbol.clone(), rule)))
            .collect()
    } else {
        picks.iter().map(|p| parse_pick(p)).collect::<Result<_, _>>()?
    };

    let orders = collect_entry_orders(&picks, source.as_ref(), calendar.as_ref(), &params, max_order_value);
    let messages = FixEncoder::default().encode_batch(&orders);
    match output {
        Some(path) => fs::write(path, messages)?,
        None => print!("{messages}"),
    }
    info!(orders = orders.len(), "signal check complete");
    Ok(())
}

/// Sell orders for every held position whose exit fires on its latest bar.
/// Sequence numbers count emitted orders from 1.
pub fn collect_exit_orders(
    positions: &[HeldPosition],
    source: &dyn BarSource,
    calendar: &dyn SessionCalendar,
    params: &TradingParams,
) -> Vec<OrderInstruction> {
    let mut orders = Vec::new();
    for held in positions {
        let bars = match source.fetch_bars(&held.symbol) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %held.symbol, error = %e, "skipping position");
                continue;
            }
        };
        let Some(latest) = bars.last() else {
            warn!(symbol = %held.symbol, "no bars for position");
            continue;
        };
        let Some(reason) = exit_check(held, latest, params, calendar) else {
            info!(symbol = %held.symbol, "hold");
            continue;
        };
        let seq = u32::try_from(orders.len() + 1).unwrap_or(u32::MAX);
        match exit_order(&held.symbol, held.quantity, reason, seq, latest) {
            Ok(order) => {
                info!(symbol = %held.symbol, reason = reason.as_str(), shares = order.quantity, "exit signal");
                orders.push(order);
            }
            Err(e) => warn!("{e}"),
        }
    }
    orders
}

fn run_exits(
    config_path: &Path,
    positions: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let source = build_bar_source(&config)?;
    let calendar = build_calendar(&config)?;
    let params = build_trading_params(&config);
    let positions_path = match positions {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(
            config
                .get_string("orders", "positions_file")
                .unwrap_or_else(|| "positions.json".to_string()),
        ),
    };

    let held = load_positions(&positions_path)?;
    let orders = collect_exit_orders(&held, source.as_ref(), calendar.as_ref(), &params);
    let messages = FixEncoder::default().encode_batch(&orders);
    match output {
        Some(path) => fs::write(path, messages)?,
        None => print!("{messages}"),
    }
    info!(positions = held.len(), orders = orders.len(), "exit check complete");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), LftError> {
    let config = load_validated(config_path)?;
    let rules = build_rules(&config)?;
    let simulation = build_simulation_config(&config)?;
    let params = build_trading_params(&config);
    println!("Config validated successfully");
    println!(
        "  trading: tp={:.4} sl={:.4} trail={:.4}",
        params.take_profit_pct, params.stop_loss_pct, params.trailing_stop_pct
    );
    println!(
        "  simulation: warmup={} end_of_data={:?}",
        simulation.warmup_bars, simulation.end_of_data
    );
    println!(
        "  strategies: {}",
        rules.iter().map(|r| r.name).collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

fn run_strategies() {
    for rule in &STANDARD_RULES {
        println!("{:<20} min_history={}", rule.name, rule.min_history);
    }
}

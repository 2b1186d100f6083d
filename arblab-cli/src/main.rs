//! ArbLab CLI — backtest, replay and sweep commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file
//! - `simulate` — replay an order file against a price file
//! - `orders` — write the order schedule a config's strategy generates
//! - `sweep` — run a parameter grid over a config
//! - `snap` — move a date onto the trading calendar of a price file

use anyhow::{bail, Context, Result};
use arblab_core::data::{DuplicatePolicy, TradingCalendar};
use arblab_core::domain::KeyShape;
use arblab_runner::export::{save_artifacts, write_orders_csv};
use arblab_runner::{
    generate_orders, load_prices, run_backtest, BacktestConfig, BacktestResult, ParamSweep,
    PreparedData, SweepGrid,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "arblab",
    about = "ArbLab CLI: daily portfolio simulation for merger-arbitrage order schedules"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts. Defaults to the config's output.dir.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay an order file against a price file.
    Simulate {
        /// Price CSV (date, deal_id, price[, leg]).
        #[arg(long)]
        prices: PathBuf,

        /// Order CSV (date, deal_id, shares[, leg]).
        #[arg(long)]
        orders: PathBuf,

        /// Starting cash.
        #[arg(long)]
        capital: Option<f64>,

        /// Key instruments by (deal_id, leg) instead of deal_id alone.
        #[arg(long, default_value_t = false)]
        composite: bool,

        /// How to resolve several prices for one (date, key).
        #[arg(long, value_enum, default_value_t = Duplicates::Average)]
        duplicates: Duplicates,

        /// Keep a per-order fill log.
        #[arg(long, default_value_t = false)]
        record_fills: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Write the orders a config's strategy generates, without simulating.
    Orders {
        /// Path to a TOML config file with a [strategy] section.
        #[arg(long)]
        config: PathBuf,

        /// Destination CSV.
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a parameter grid over a config.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Initial capital values (comma-separated).
        #[arg(long, value_delimiter = ',')]
        capitals: Vec<f64>,

        /// Announce-to-completion share counts (comma-separated).
        #[arg(long, value_delimiter = ',')]
        shares: Vec<i64>,

        /// Announce-to-completion exit offsets in sessions (comma-separated).
        #[arg(long, value_delimiter = ',')]
        offsets: Vec<usize>,

        /// Pair-arbitrage capital per leg (comma-separated).
        #[arg(long, value_delimiter = ',')]
        each_side: Vec<f64>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Snap a date onto the trading calendar of a price file.
    Snap {
        /// Price CSV whose dates form the calendar.
        #[arg(long)]
        prices: PathBuf,

        /// Date to snap (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        #[arg(long, value_enum, default_value_t = Direction::Next)]
        direction: Direction,

        /// Number of trading days to move.
        #[arg(long, default_value_t = 1)]
        sessions: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Duplicates {
    Fail,
    Average,
    #[value(name = "first_wins")]
    FirstWins,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(d: Duplicates) -> Self {
        match d {
            Duplicates::Fail => DuplicatePolicy::Fail,
            Duplicates::Average => DuplicatePolicy::Average,
            Duplicates::FirstWins => DuplicatePolicy::FirstWins,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Next,
    Previous,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, output_dir),
        Commands::Simulate {
            prices,
            orders,
            capital,
            composite,
            duplicates,
            record_fills,
            output_dir,
        } => {
            let mut config = BacktestConfig::from_order_file(prices, orders);
            if let Some(capital) = capital {
                config.backtest.initial_capital = capital;
            }
            if composite {
                config.backtest.key_shape = KeyShape::Composite;
            }
            config.backtest.duplicate_policy = duplicates.into();
            config.backtest.record_fills = record_fills;
            config.output.dir = output_dir;
            execute(&config)
        }
        Commands::Orders { config, out } => orders_cmd(&config, &out),
        Commands::Sweep {
            config,
            capitals,
            shares,
            offsets,
            each_side,
            sequential,
            top,
        } => {
            let grid = SweepGrid {
                initial_capitals: capitals,
                shares_on_announce: shares,
                exit_offsets: offsets,
                capital_each_side: each_side,
            };
            sweep_cmd(&config, &grid, sequential, top)
        }
        Commands::Snap {
            prices,
            date,
            direction,
            sessions,
        } => snap_cmd(&prices, &date, direction, sessions),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn run_cmd(config_path: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    execute(&config)
}

fn execute(config: &BacktestConfig) -> Result<()> {
    let result = run_backtest(config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &config.output.dir, &config.output.formats)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn orders_cmd(config_path: &Path, out: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    if config.strategy.is_none() {
        bail!("{} has no [strategy] section", config_path.display());
    }
    config.validate()?;

    let data = PreparedData::load(&config)?;
    let orders = generate_orders(&config, &data);
    write_orders_csv(&orders, out)?;
    println!("Wrote {} orders to {}", orders.len(), out.display());
    Ok(())
}

fn sweep_cmd(config_path: &Path, grid: &SweepGrid, sequential: bool, top: usize) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    let data = PreparedData::load(&config)?;
    info!(points = grid.size(&config), "grid expanded");

    let results = ParamSweep::new(&data)
        .with_parallelism(!sequential)
        .sweep(grid, &config)?;

    println!();
    println!(
        "{:<18} {:>14} {:>10} {:>10} {:>10} {:>16}",
        "Run", "Capital", "Return", "Sharpe", "MaxDD", "Final Value"
    );
    println!("{}", "-".repeat(83));
    for r in results.top_n(top) {
        let id = r.run_id.to_string();
        println!(
            "{:<18} {:>14.2} {:>9.2}% {:>10.3} {:>9.2}% {:>16.2}",
            &id[..id.len().min(16)],
            r.params.initial_capital,
            r.metrics.total_return * 100.0,
            r.metrics.sharpe,
            r.metrics.max_drawdown * 100.0,
            r.metrics.final_value,
        );
    }
    println!();
    println!("{} of {} runs shown", results.top_n(top).len(), results.len());
    Ok(())
}

fn snap_cmd(prices: &Path, date: &str, direction: Direction, sessions: usize) -> Result<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{date}', expected YYYY-MM-DD"))?;
    if sessions == 0 {
        bail!("--sessions must be at least 1");
    }

    let records = load_prices(prices, KeyShape::Single)?;
    let calendar = TradingCalendar::from_prices(&records);
    let snapped = match direction {
        Direction::Next => calendar.sessions_after(date, sessions),
        Direction::Previous => calendar.sessions_before(date, sessions),
    };

    let on_calendar = if calendar.contains(date) { "yes" } else { "no" };
    println!("Date:           {date} (trading day: {on_calendar})");
    match snapped {
        Some(d) => println!("Snapped:        {d}"),
        None => println!("Snapped:        none (outside {} trading days)", calendar.len()),
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.run_id);
    println!("Source:         {}", result.source_label());
    match (result.start_date, result.end_date) {
        (Some(start), Some(end)) => println!("Period:         {start} to {end}"),
        _ => println!("Period:         (no trading days)"),
    }
    println!("Trading Days:   {}", m.trading_days);
    println!("Orders:         {}", result.orders.len());
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", m.final_value);
    println!("Final Cash:     {:.2}", result.final_cash);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Max Gross:      {:.2}", m.max_gross_exposure);
    if m.gap_days > 0 {
        println!();
        println!("WARNING: {} day(s) valued a held position at zero (no price)", m.gap_days);
    }
    println!();
}

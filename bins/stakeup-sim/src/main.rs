//! stakeup-sim: Developer simulator for StakeUp accounting.
//!
//! Prints drip schedules, weekly gauge seeding and a full deposit → deploy →
//! settle ledger scenario as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use stakeup_core::constants::{EPOCHS_PER_YEAR, ONE_HOUR, ONE_WEEK, ONE_YEAR, SCHEDULE_YEARS, WAD};
use stakeup_core::math::{format_units, parse_units};
use stakeup_core::registry::MemoryRegistry;
use stakeup_core::types::{Address, PoolState};
use stakeup_drip::{CurvePoolData, DripSchedule, GaugeDistributor};
use stakeup_ledger::{LedgerConfig, ShareLedger};

/// StakeUp accounting simulator.
#[derive(Parser, Debug)]
#[command(name = "stakeup-sim", version, about = "Simulate StakeUp drips, gauges and the stUSD ledger")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print what a drip schedule releases each year (or each week).
    Schedule(ScheduleArgs),
    /// Seed gauges weekly and print every seed.
    Seed(SeedArgs),
    /// Run a deposit, deployment, yield and settlement through the ledger.
    Scenario(ScenarioArgs),
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Total reward supply, in whole tokens (decimals allowed).
    #[arg(long)]
    total: String,

    /// Schedule start, Unix seconds.
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Release one current-rate epoch per week instead of catching up yearly.
    #[arg(long)]
    weekly: bool,
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Reward per pool, in whole tokens. Repeat for several pools.
    #[arg(long = "reward", required = true)]
    rewards: Vec<String>,

    /// Number of weekly seedings to run.
    #[arg(long, default_value_t = SCHEDULE_YEARS * EPOCHS_PER_YEAR)]
    weeks: u64,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Ledger config file (TOML). Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fee sink address, overriding the config.
    #[arg(long)]
    fee_sink: Option<Address>,

    /// Underlying deposited, in whole tokens.
    #[arg(long, default_value = "1000")]
    deposit: String,

    /// Final pool exchange rate.
    #[arg(long, default_value = "1.05")]
    rate: String,
}

#[derive(Serialize)]
struct DripRow {
    period: u64,
    amount: String,
    remaining: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Schedule(args) => run_schedule(args),
        Commands::Seed(args) => run_seed(args),
        Commands::Scenario(args) => run_scenario(args),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value).context("serializing output")?);
    Ok(())
}

fn run_schedule(args: ScheduleArgs) -> Result<()> {
    let total = parse_units(&args.total, 18).with_context(|| format!("invalid total {:?}", args.total))?;
    let mut schedule = DripSchedule::new(total, args.start)?;
    info!(total = %args.total, weekly = args.weekly, "running drip schedule");

    let (periods, step) = if args.weekly {
        (SCHEDULE_YEARS * EPOCHS_PER_YEAR, ONE_WEEK)
    } else {
        (SCHEDULE_YEARS, ONE_YEAR)
    };
    for period in 0..periods {
        // Weekly drips fire at the start of each epoch, yearly ones at its end.
        let now = if args.weekly {
            args.start + period * step
        } else {
            args.start + (period + 1) * step
        };
        let amount = schedule.drip(now, args.weekly)?;
        print_json(&DripRow {
            period: period + 1,
            amount: format_units(amount, 18)?,
            remaining: format_units(schedule.remaining_supply(), 18)?,
        })?;
    }
    Ok(())
}

fn run_seed(args: SeedArgs) -> Result<()> {
    let pools = args
        .rewards
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let reward = parse_units(r, 18).with_context(|| format!("invalid reward {r:?}"))?;
            let seed = u8::try_from(i + 1).context("too many pools")?;
            Ok(CurvePoolData::new(
                Address::from_seed(seed),
                Address::from_seed(seed.wrapping_add(0x80)),
                reward,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut distributor = GaugeDistributor::new(0, pools)?;
    for week in 0..args.weeks {
        for seed in distributor.seed_gauges(week * ONE_WEEK)? {
            print_json(&seed)?;
        }
    }
    Ok(())
}

fn run_scenario(args: ScenarioArgs) -> Result<()> {
    let mut config = LedgerConfig::load(args.config.as_deref()).context("loading ledger config")?;
    if let Some(sink) = args.fee_sink {
        config.fee_sink = sink;
    }
    config.validate().context("validating ledger config")?;
    let decimals = config.underlying_decimals;

    let deposit = parse_units(&args.deposit, decimals).with_context(|| format!("invalid deposit {:?}", args.deposit))?;
    let rate = parse_units(&args.rate, 18).with_context(|| format!("invalid rate {:?}", args.rate))?;
    if rate == 0 {
        bail!("rate must be positive");
    }
    config.strict_rates = true;

    let registry = Arc::new(MemoryRegistry::new());
    let pool = Address::from_seed(0x10);
    let now = 1_700_000_000u64;
    let commit_end = now + 3 * 24 * ONE_HOUR;
    registry.register_pool(pool, PoolState::Commit, commit_end);
    registry.set_exchange_rate(pool, WAD);

    let mut ledger = ShareLedger::new(config, registry.clone())?;
    let depositor = Address::from_seed(0xa1);
    ledger.deposit_underlying(depositor, deposit)?;
    ledger.poke(commit_end - ONE_HOUR)?;

    registry.set_state(pool, PoolState::Holding);
    registry.set_exchange_rate(pool, rate);
    ledger.poke(commit_end + ONE_WEEK)?;
    print_json(&ledger.snapshot()?)?;

    registry.set_state(pool, PoolState::FinalWithdraw);
    if let Some(report) = ledger.settle_pool(pool)? {
        let fee = format_units(report.performance_fee, 18)?;
        info!(performance_fee = %fee, "settled");
        print_json(&report)?;
    }
    let shares = ledger.shares_of(&depositor);
    print_json(&ledger.redeem_st_usd(depositor, shares)?)?;
    print_json(&ledger.snapshot()?)?;
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Output goes to stderr.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

//! Contract Engine CLI
//!
//! # Commands
//!
//! - `contract_engine value --contracts <csv> --date <YYYY-MM-DD>` - Value a contract extract
//! - `contract_engine amount --features <csv> --premium <amount> ...` - Premium amounts of a schedule
//! - `contract_engine reference <number>` - Structured reference of a contract number

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use contract_engine::contract::load_contracts;
use contract_engine::formulas::{load_features, IndexCurve, Role, RoleType};
use contract_engine::{
    amount_at, contract_reference_number, AmountType, ContractValuation, EngineConfig,
    ScheduleSnapshot, ValuationRunner,
};
use rust_decimal::Decimal;

/// Contract valuation and premium amount engine
#[derive(Parser)]
#[command(name = "contract_engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value every contract of a CSV extract at a date
    Value {
        /// Contract extract (CSV)
        #[arg(short, long)]
        contracts: PathBuf,

        /// Valuation date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Table directory, defaults to $CONTRACT_TABLES_PATH or data/tables
        #[arg(short, long)]
        tables: Option<PathBuf>,

        /// Print one JSON object per contract
        #[arg(long)]
        json: bool,
    },

    /// Compute premium amounts from a feature extract
    Amount {
        /// Feature extract (CSV)
        #[arg(short, long)]
        features: PathBuf,

        /// Amount type, all amounts when omitted
        #[arg(short = 't', long = "type")]
        amount_type: Option<AmountType>,

        /// Premium amount
        #[arg(short, long)]
        premium: Decimal,

        /// Amount a deduction applies to, defaults to the premium
        #[arg(long)]
        applied: Option<Decimal>,

        /// Schedule start date (YYYY-MM-DD)
        #[arg(long)]
        valid_from: NaiveDate,

        /// Date the amount is booked, defaults to the schedule start
        #[arg(long)]
        application_date: Option<NaiveDate>,

        /// Date the premium was attributed, defaults to the schedule start
        #[arg(long)]
        attribution_date: Option<NaiveDate>,

        /// Number of planned premiums
        #[arg(long, default_value = "1")]
        planned_premiums: u32,

        /// The subscriber is a legal person
        #[arg(long)]
        legal_person: bool,

        /// Index curve point as months=rate, may be repeated
        #[arg(long = "index-point", value_parser = parse_index_point)]
        index_points: Vec<(u32, Decimal)>,
    },

    /// Print the structured reference of a contract number
    Reference {
        number: u64,
    },
}

fn parse_index_point(s: &str) -> Result<(u32, Decimal), String> {
    let (months, rate) = s
        .split_once('=')
        .ok_or_else(|| format!("expected months=rate, got '{}'", s))?;
    let months: u32 = months.trim().parse().map_err(|e| format!("bad months '{}': {}", months, e))?;
    let rate: Decimal = rate.trim().parse().map_err(|e| format!("bad rate '{}': {}", rate, e))?;
    Ok((months, rate))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Value {
            contracts,
            date,
            tables,
            json,
        } => run_value(contracts, date, tables, json),
        Commands::Amount {
            features,
            amount_type,
            premium,
            applied,
            valid_from,
            application_date,
            attribution_date,
            planned_premiums,
            legal_person,
            index_points,
        } => {
            let features = load_features(&features)
                .map_err(|e| anyhow!("Failed to load features from {}: {}", features.display(), e))?;

            let mut schedule = ScheduleSnapshot::new(valid_from, premium, planned_premiums)
                .with_features(features)
                .with_role(Role {
                    role_type: RoleType::Subscriber,
                    legal_person,
                    from_date: valid_from,
                    thru_date: None,
                });
            if !index_points.is_empty() {
                schedule = schedule.with_index_curve(valid_from, IndexCurve::new("cli", index_points));
            }

            let application = application_date.unwrap_or(valid_from);
            let attribution = attribution_date.unwrap_or(valid_from);
            let types = amount_type.map_or_else(AmountType::all, |t| vec![t]);

            for amount_type in types {
                let amount = amount_at(&schedule, premium, application, attribution, amount_type, applied)
                    .with_context(|| format!("Failed to compute {}", amount_type))?;
                println!("{:<26} {:>14}", amount_type.to_string(), amount.to_string());
            }
            Ok(())
        }
        Commands::Reference { number } => {
            println!("{}", contract_reference_number(number)?);
            Ok(())
        }
    }
}

fn run_value(contracts: PathBuf, date: NaiveDate, tables: Option<PathBuf>, json: bool) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(tables) = tables {
        config = config.with_tables_path(tables);
    }
    config.preload_tables = true;

    let start = Instant::now();
    let runner = ValuationRunner::from_config(&config)
        .with_context(|| format!("Failed to load tables from {}", config.tables_path.display()))?;
    let contracts = load_contracts(&contracts)
        .map_err(|e| anyhow!("Failed to load contracts from {}: {}", contracts.display(), e))?;
    log::info!("Loaded {} contracts in {:?}", contracts.len(), start.elapsed());

    let valuations = runner
        .value_batch(&contracts, date)
        .into_iter()
        .zip(&contracts)
        .map(|(result, contract)| {
            result.with_context(|| format!("Failed to value contract {}", contract.contract_id))
        })
        .collect::<Result<Vec<_>>>()?;

    if json {
        for valuation in &valuations {
            println!("{}", serde_json::to_string(valuation)?);
        }
    } else {
        print_table(&valuations);
    }

    log::info!("Valued {} contracts in {:?}", valuations.len(), start.elapsed());
    Ok(())
}

fn print_table(valuations: &[ContractValuation]) {
    let money = |v: Option<Decimal>| v.map_or_else(|| "-".to_string(), |v| v.to_string());

    println!(
        "{:>8} {:<10} {:>7} {:>8} {:>12} {:>12} {:>12} {:>10} {:>12} {:>12}",
        "Contract", "State", "Elapsed", "Payments", "CapitalDue", "Surrender", "Interest", "Tax", "Payable", "Reserve"
    );
    println!("{}", "-".repeat(110));

    for v in valuations {
        println!(
            "{:>8} {:<10} {:>7} {:>8} {:>12} {:>12} {:>12} {:>10} {:>12} {:>12}",
            v.contract_id,
            v.state.as_str(),
            v.elapsed_months,
            v.payments_due,
            v.capital_due.to_string(),
            money(v.surrender_value),
            money(v.buyout_interest),
            money(v.withholding_tax),
            money(v.payable_amount),
            v.mathematical_reserve.to_string(),
        );
    }
}

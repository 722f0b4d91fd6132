//! Equipcost CLI
//!
//! Command-line interface for the fleet cost analytics pipeline: generate
//! fixture data, aggregate monthly rollups, forecast costs, and run
//! repair-vs-replace analysis.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use equipcost::financial::FleetOptimizer;
use equipcost::forecast::{Forecaster, MethodChoice, DEFAULT_HORIZON_MONTHS};
use equipcost::registry::{loader, EquipmentId, RecommendedAction};
use equipcost::store::{EquipmentFilter, EquipmentStore, MemoryStore};
use equipcost::reliability::{BathtubModeler, MtbfPredictor};
use equipcost::synthetic::FleetGenerator;
use equipcost::{rollup, AnalyticsError, Settings, TcoCalculator};
use rayon::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "equipcost", version, about = "Capital-asset cost analytics for hospital equipment fleets")]
struct Cli {
    /// Directory holding the fleet CSV files
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the synthetic fixture fleet CSVs
    GenerateData {
        /// RNG seed for reproducible fleets
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Generate the fixture fleet, then reload it to validate the files
    LoadData {
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Compute monthly cost rollups from work orders and contracts
    Aggregate {
        /// Equipment id (all assets if omitted)
        #[arg(long)]
        equipment_id: Option<EquipmentId>,
    },
    /// Run a cost forecast for an equipment item
    Forecast {
        /// Equipment id (picks the first CT scanner if omitted)
        #[arg(long)]
        equipment_id: Option<EquipmentId>,
        /// Forecast horizon in months
        #[arg(long, default_value_t = DEFAULT_HORIZON_MONTHS)]
        horizon: u32,
        /// Forecast method: auto, arima, or exponential_smoothing
        #[arg(long, default_value = "auto")]
        method: String,
    },
    /// Rank repair-vs-replace priorities across the fleet
    Analyze {
        /// Facility id filter
        #[arg(long)]
        facility: Option<String>,
        /// Annual capital budget
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Fleet cost summary report
    Report {
        /// Facility id filter
        #[arg(long)]
        facility: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        let code = match err.downcast_ref::<AnalyticsError>() {
            Some(analytic) if analytic.is_skippable() => 1,
            _ => 2,
        };
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let settings = Settings::from_env();

    match cli.command {
        Command::GenerateData { seed } => generate_data(&cli.data_dir, seed, today),
        Command::LoadData { seed } => {
            generate_data(&cli.data_dir, seed, today)?;
            let store = load_store(&cli.data_dir)?;
            println!(
                "Validated fleet: {} assets, {} work orders, {} contracts, {} PM schedules",
                store.equipment_count(),
                store.work_order_count(),
                store.contract_count(),
                store.pm_schedule_count()
            );
            Ok(())
        }
        Command::Aggregate { equipment_id } => aggregate(&cli.data_dir, equipment_id),
        Command::Forecast { equipment_id, horizon, method } => {
            forecast(&cli.data_dir, equipment_id, horizon, &method, today)
        }
        Command::Analyze { facility, budget } => analyze(
            &cli.data_dir,
            facility.as_deref(),
            budget.unwrap_or(settings.annual_capital_budget),
            &settings,
            today,
        ),
        Command::Report { facility } => report(&cli.data_dir, facility.as_deref(), today),
    }
}

fn generate_data(data_dir: &Path, seed: u64, today: NaiveDate) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let mut store = MemoryStore::new();
    let mut generator = FleetGenerator::new(seed, today);
    let counts = generator.populate(&mut store)?;

    write_fleet_csvs(&store, data_dir)?;

    println!("Generated fleet (seed {}):", seed);
    println!("  Assets:       {}", counts.equipment);
    println!("  Work orders:  {}", counts.work_orders);
    println!("  Contracts:    {}", counts.contracts);
    println!("  PM schedules: {}", counts.pm_schedules);
    println!("Written to {}", data_dir.display());
    Ok(())
}

fn write_fleet_csvs(store: &MemoryStore, data_dir: &Path) -> Result<()> {
    let equipment = store.list_equipment(&EquipmentFilter::all())?;

    loader::write_equipment(File::create(data_dir.join("equipment.csv"))?, &equipment)?;

    let mut orders = Vec::new();
    let mut contracts = Vec::new();
    let mut schedules = Vec::new();
    for eq in &equipment {
        for wo in store.work_orders(eq.id)? {
            orders.push((eq.asset_tag.clone(), wo));
        }
        for contract in store.contracts(eq.id)? {
            contracts.push((eq.asset_tag.clone(), contract));
        }
        for pm in store.pm_schedules(eq.id)? {
            schedules.push((eq.asset_tag.clone(), pm));
        }
    }

    loader::write_work_orders(
        File::create(data_dir.join("work_orders.csv"))?,
        orders.iter().map(|(tag, wo)| (tag.as_str(), wo)),
    )?;
    loader::write_contracts(
        File::create(data_dir.join("contracts.csv"))?,
        contracts.iter().map(|(tag, c)| (tag.as_str(), c)),
    )?;
    loader::write_pm_schedules(
        File::create(data_dir.join("pm_schedules.csv"))?,
        schedules.iter().map(|(tag, pm)| (tag.as_str(), pm)),
    )?;
    Ok(())
}

/// Load the fleet CSVs into a fresh in-memory store
fn load_store(data_dir: &Path) -> Result<MemoryStore> {
    let equipment_path = data_dir.join("equipment.csv");
    if !equipment_path.exists() {
        return Err(AnalyticsError::InvalidArgument(format!(
            "no fleet data in {}; run generate-data first",
            data_dir.display()
        ))
        .into());
    }

    let mut store = MemoryStore::new();
    let mut tag_ids = std::collections::HashMap::new();

    for eq in loader::load_equipment(&equipment_path)? {
        let tag = eq.asset_tag.clone();
        let id = store.insert_equipment(eq)?;
        tag_ids.insert(tag, id);
    }

    let resolve = |tag: &str, tag_ids: &std::collections::HashMap<String, EquipmentId>| {
        tag_ids.get(tag).copied().ok_or_else(|| {
            AnalyticsError::InvalidArgument(format!("unknown asset tag {} in dependent file", tag))
        })
    };

    // Dependent files are optional; a registry alone is a valid fleet
    let wo_path = data_dir.join("work_orders.csv");
    if wo_path.exists() {
        for tagged in loader::load_work_orders(wo_path)? {
            let mut wo = tagged.record;
            wo.equipment_id = resolve(&tagged.asset_tag, &tag_ids)?;
            store.insert_work_order(wo)?;
        }
    }
    let contract_path = data_dir.join("contracts.csv");
    if contract_path.exists() {
        for tagged in loader::load_contracts(contract_path)? {
            let mut contract = tagged.record;
            contract.equipment_id = resolve(&tagged.asset_tag, &tag_ids)?;
            store.insert_contract(contract)?;
        }
    }
    let pm_path = data_dir.join("pm_schedules.csv");
    if pm_path.exists() {
        for tagged in loader::load_pm_schedules(pm_path)? {
            let mut pm = tagged.record;
            pm.equipment_id = resolve(&tagged.asset_tag, &tag_ids)?;
            store.insert_pm_schedule(pm)?;
        }
    }

    Ok(store)
}

fn aggregate(data_dir: &Path, equipment_id: Option<EquipmentId>) -> Result<()> {
    let mut store = load_store(data_dir)?;
    let count = rollup::compute_monthly_rollups(&mut store, equipment_id)?;
    println!("Created {} monthly rollup records", count);

    // Export the fact table alongside the inputs
    let path = data_dir.join("rollups.csv");
    let mut file = File::create(&path)?;
    writeln!(
        file,
        "asset_tag,month,pm_cost,corrective_cost,parts_cost,contract_cost_allocated,downtime_hours,work_order_count,total_cost"
    )?;
    for eq in store.list_equipment(&EquipmentFilter::all())? {
        for r in store.rollups(eq.id)? {
            writeln!(
                file,
                "{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{},{:.2}",
                eq.asset_tag,
                r.month,
                r.pm_cost,
                r.corrective_cost,
                r.parts_cost,
                r.contract_cost_allocated,
                r.downtime_hours,
                r.work_order_count,
                r.total_cost,
            )?;
        }
    }
    println!("Rollups written to {}", path.display());
    Ok(())
}

fn forecast(
    data_dir: &Path,
    equipment_id: Option<EquipmentId>,
    horizon: u32,
    method: &str,
    today: NaiveDate,
) -> Result<()> {
    let method: MethodChoice = method
        .parse()
        .map_err(AnalyticsError::InvalidArgument)?;

    let mut store = load_store(data_dir)?;

    let equipment_id = match equipment_id {
        Some(id) => id,
        None => {
            let scanners = store.list_equipment(&EquipmentFilter::for_class("ct_scanner"))?;
            let eq = scanners.first().ok_or_else(|| {
                AnalyticsError::NotFound("no CT scanner in the registry".to_string())
            })?;
            println!(
                "Auto-selected: {} ({} {})",
                eq.asset_tag,
                eq.manufacturer.as_deref().unwrap_or("unknown"),
                eq.model_name.as_deref().unwrap_or("unknown"),
            );
            eq.id
        }
    };

    rollup::compute_monthly_rollups(&mut store, Some(equipment_id))?;

    let forecaster = Forecaster::new(today);
    let result = forecaster.forecast_equipment(&mut store, equipment_id, horizon, method)?;

    println!("\nForecast complete: {}", result.method.as_str());
    println!("  Horizon: {} months", result.horizon_months);
    println!(
        "  Metrics: MAE=${:.2}, RMSE=${:.2}, MAPE={:.1}%",
        result.metrics.mae, result.metrics.rmse, result.metrics.mape
    );

    println!("\n{:>10} {:>14} {:>14} {:>14}", "Month", "Predicted", "Lower", "Upper");
    println!("{}", "-".repeat(56));
    for point in result.predictions.iter().take(12) {
        println!(
            "{:>10} {:>14.2} {:>14.2} {:>14.2}",
            point.month, point.predicted_cost, point.lower_bound, point.upper_bound
        );
    }
    if result.predictions.len() > 12 {
        println!("... ({} more months)", result.predictions.len() - 12);
    }
    Ok(())
}

fn analyze(
    data_dir: &Path,
    facility: Option<&str>,
    budget: f64,
    settings: &Settings,
    today: NaiveDate,
) -> Result<()> {
    let mut store = load_store(data_dir)?;
    rollup::compute_monthly_rollups(&mut store, None)?;

    println!(
        "Running repair-vs-replace analysis{}...",
        facility.map(|f| format!(" for {}", f)).unwrap_or_default()
    );

    let optimizer = FleetOptimizer::new(today)
        .with_budget(budget)
        .with_discount_rate(settings.discount_rate)
        .with_calendar(settings.fiscal_calendar);
    let priorities = optimizer.rank_replacement_priorities(&mut store, facility)?;

    let replace_now = priorities
        .iter()
        .filter(|p| p.recommended_action == RecommendedAction::ReplaceImmediately)
        .count();
    let plan = priorities
        .iter()
        .filter(|p| p.recommended_action == RecommendedAction::PlanReplacement)
        .count();
    let keep = priorities.len() - replace_now - plan;

    println!("\nAnalysis Summary");
    println!("  Total evaluated:     {}", priorities.len());
    println!("  Replace immediately: {}", replace_now);
    println!("  Plan replacement:    {}", plan);
    println!("  Continue operating:  {}", keep);

    let top: Vec<_> = priorities
        .iter()
        .filter(|p| p.recommended_action.is_replacement())
        .take(20)
        .collect();
    if !top.is_empty() {
        println!(
            "\n{:>4} {:<14} {:<18} {:>8} {:>14} {:>12} {:>8} {:<20}",
            "Rank", "Asset Tag", "Class", "Age(yr)", "NPV Savings", "Repl. Cost", "Budget", "Action"
        );
        println!("{}", "-".repeat(106));
        for p in top {
            println!(
                "{:>4} {:<14} {:<18} {:>8.1} {:>14.0} {:>12.0} {:>8} {:<20}",
                p.rank,
                p.asset_tag,
                p.equipment_class,
                p.age_months as f64 / 12.0,
                p.npv_savings,
                p.replacement_cost,
                if p.within_budget { "yes" } else { "no" },
                p.recommended_action.as_str(),
            );
        }
    }

    let schedule = optimizer.optimal_replacement_schedule(&mut store, facility, 5)?;
    println!("\nReplacement Schedule (annual budget ${:.0}):", budget);
    for year in &schedule.schedule {
        println!(
            "  FY{}: {} replacements, spend ${:.0}, projected savings ${:.0}",
            year.fiscal_year,
            year.replacements.len(),
            year.year_spend,
            year.year_savings
        );
    }
    println!(
        "  Total: spend ${:.0}, projected savings ${:.0}",
        schedule.total_spend, schedule.total_projected_savings
    );
    Ok(())
}

fn report(data_dir: &Path, facility: Option<&str>, today: NaiveDate) -> Result<()> {
    let mut store = load_store(data_dir)?;
    rollup::compute_monthly_rollups(&mut store, None)?;

    let summary = rollup::fleet_cost_summary(&store, facility, today)?;
    if summary.total_equipment == 0 {
        return Err(AnalyticsError::NotFound(format!(
            "no equipment{}",
            facility.map(|f| format!(" in facility {}", f)).unwrap_or_default()
        ))
        .into());
    }

    let equipment =
        store.list_equipment(&EquipmentFilter::all().with_facility(facility))?;
    let avg_age: f64 =
        equipment.iter().map(|e| e.age_years(today)).sum::<f64>() / equipment.len() as f64;
    let total_acquisition: f64 = equipment.iter().map(|e| e.acquisition_cost).sum();

    println!(
        "\nFleet Cost Report{}",
        facility.map(|f| format!(" - {}", f)).unwrap_or_default()
    );
    println!("  Date: {}", today);
    println!("  Total assets: {}", summary.total_equipment);
    println!("  Average age: {:.1} years", avg_age);
    println!("  Past useful life: {}", summary.aging_assets_count);
    println!("  Total acquisition value: ${:.0}", total_acquisition);
    println!("  Annual maintenance cost: ${:.0}", summary.total_annual_cost);
    if total_acquisition > 0.0 {
        println!(
            "  Maintenance/acquisition ratio: {:.1}%",
            summary.total_annual_cost / total_acquisition * 100.0
        );
    }

    println!("\nTop Cost Classes (trailing 12 months)");
    for class in &summary.top_cost_classes {
        println!("  {:<20} ${:.0}", class.equipment_class, class.annual_cost);
    }

    // Age-normalised TCO sweep; read-only, so it fans out across cores
    let calculator = TcoCalculator::new(today);
    let mut tco_reports: Vec<_> = equipment
        .par_iter()
        .filter_map(|eq| calculator.calculate_tco(&store, eq.id, None).ok())
        .collect();
    tco_reports.sort_by(|a, b| b.annualized_tco.total_cmp(&a.annualized_tco));

    println!("\nHighest Annualized TCO");
    println!(
        "{:<14} {:<18} {:>8} {:>16} {:>16}",
        "Asset Tag", "Class", "Age(yr)", "Total TCO", "Annualized TCO"
    );
    println!("{}", "-".repeat(76));
    for report in tco_reports.iter().take(5) {
        println!(
            "{:<14} {:<18} {:>8.1} {:>16.2} {:>16.2}",
            report.asset_tag,
            report.equipment_class,
            report.age_years,
            report.total_tco,
            report.annualized_tco,
        );
    }

    // Failure outlook for the costliest assets; thin histories are skipped
    let mtbf = MtbfPredictor::new(today);
    let modeler = BathtubModeler::new(today);
    println!("\nFailure Outlook (highest-TCO assets)");
    for report in tco_reports.iter().take(5) {
        let prediction = match mtbf.predict_next_failure(&store, report.equipment_id) {
            Ok(prediction) => prediction,
            Err(err) => {
                log::debug!("no MTBF for {}: {}", report.asset_tag, err);
                continue;
            }
        };
        let life = modeler.estimate_remaining_useful_life(&store, report.equipment_id)?;
        println!(
            "  {:<14} MTBF {:>6.1}d  next failure ~{}  p(90d) {:.0}%  remaining life ~{}mo",
            report.asset_tag,
            prediction.mtbf_days,
            prediction.predicted_next_failure,
            prediction.probability_within_90_days * 100.0,
            life.estimated_remaining_months,
        );
    }

    // Overdue preventive maintenance
    let mut overdue = 0usize;
    for eq in &equipment {
        for pm in store.pm_schedules(eq.id)? {
            if pm.is_overdue(today) {
                overdue += 1;
            }
        }
    }
    println!("\nOverdue PM schedules: {}", overdue);
    Ok(())
}

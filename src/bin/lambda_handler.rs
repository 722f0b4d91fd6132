//! AWS Lambda handler for fleet cost analytics
//!
//! Accepts fleet CSV data inline, runs the aggregation and repair-vs-replace
//! pipeline, and returns replacement priorities with fleet-level summaries.

use chrono::NaiveDate;
use equipcost::financial::{FleetOptimizer, ReplacementPriority, ReplacementSchedule, TcoReport};
use equipcost::registry::loader;
use equipcost::rollup::{self, FleetCostSummary};
use equipcost::store::{EquipmentFilter, EquipmentStore, MemoryStore};
use equipcost::{AnalyticsError, TcoCalculator};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

fn default_budget() -> f64 {
    equipcost::config::DEFAULT_ANNUAL_CAPITAL_BUDGET
}
fn default_discount_rate() -> f64 {
    equipcost::config::DEFAULT_DISCOUNT_RATE
}
fn default_horizon_years() -> u32 {
    equipcost::financial::DEFAULT_HORIZON_YEARS
}

/// Input for the analytics run
#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    /// Registry entries as CSV (required)
    pub equipment_csv: String,

    /// Work orders as CSV (optional)
    #[serde(default)]
    pub work_orders_csv: Option<String>,

    /// Service contracts as CSV (optional)
    #[serde(default)]
    pub contracts_csv: Option<String>,

    /// Facility filter for ranking and summaries
    #[serde(default)]
    pub facility: Option<String>,

    /// Annual capital budget (default: $2,000,000)
    #[serde(default = "default_budget")]
    pub annual_capital_budget: f64,

    /// Annual discount rate (default: 8%)
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,

    /// Replacement schedule horizon in fiscal years (default: 5)
    #[serde(default = "default_horizon_years")]
    pub schedule_horizon_years: u32,

    /// Analysis date (default: today)
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Output of the analytics run
#[derive(Debug, Default, Serialize)]
pub struct AnalyticsResponse {
    /// Registry entries loaded
    pub equipment_count: usize,

    /// Rollup rows written by the aggregation pass
    pub rollup_rows: usize,

    /// Trailing-year fleet cost summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_summary: Option<FleetCostSummary>,

    /// Ranked replacement priorities
    pub priorities: Vec<ReplacementPriority>,

    /// Budget-constrained replacement schedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ReplacementSchedule>,

    /// Five highest annualized-TCO assets
    pub highest_tco_assets: Vec<TcoReport>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,

    /// Error message if the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn error_response(start: std::time::Instant, message: String) -> AnalyticsResponse {
    AnalyticsResponse {
        execution_time_ms: start.elapsed().as_millis() as u64,
        error: Some(message),
        ..AnalyticsResponse::default()
    }
}

fn build_store(request: &AnalyticsRequest) -> Result<MemoryStore, String> {
    let mut store = MemoryStore::new();
    let mut tag_ids = std::collections::HashMap::new();

    let equipment =
        loader::load_equipment_from_reader(Cursor::new(request.equipment_csv.as_bytes()))
            .map_err(|e| format!("failed to parse equipment CSV: {}", e))?;
    for eq in equipment {
        let tag = eq.asset_tag.clone();
        let id = store
            .insert_equipment(eq)
            .map_err(|e| format!("failed to insert equipment: {}", e))?;
        tag_ids.insert(tag, id);
    }

    if let Some(csv_data) = &request.work_orders_csv {
        let orders = loader::load_work_orders_from_reader(Cursor::new(csv_data.as_bytes()))
            .map_err(|e| format!("failed to parse work order CSV: {}", e))?;
        for tagged in orders {
            let id = *tag_ids.get(&tagged.asset_tag).ok_or_else(|| {
                format!("work order references unknown asset {}", tagged.asset_tag)
            })?;
            let mut wo = tagged.record;
            wo.equipment_id = id;
            store
                .insert_work_order(wo)
                .map_err(|e| format!("failed to insert work order: {}", e))?;
        }
    }

    if let Some(csv_data) = &request.contracts_csv {
        let contracts = loader::load_contracts_from_reader(Cursor::new(csv_data.as_bytes()))
            .map_err(|e| format!("failed to parse contract CSV: {}", e))?;
        for tagged in contracts {
            let id = *tag_ids.get(&tagged.asset_tag).ok_or_else(|| {
                format!("contract references unknown asset {}", tagged.asset_tag)
            })?;
            let mut contract = tagged.record;
            contract.equipment_id = id;
            store
                .insert_contract(contract)
                .map_err(|e| format!("failed to insert contract: {}", e))?;
        }
    }

    Ok(store)
}

/// Lambda handler function
async fn handler(event: LambdaEvent<AnalyticsRequest>) -> Result<AnalyticsResponse, Error> {
    let start = std::time::Instant::now();
    let request = event.payload;
    let as_of = request
        .as_of
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let mut store = match build_store(&request) {
        Ok(store) => store,
        Err(message) => return Ok(error_response(start, message)),
    };
    let equipment_count = store.equipment_count();

    let rollup_rows = match rollup::compute_monthly_rollups(&mut store, None) {
        Ok(rows) => rows,
        Err(err) => return Ok(error_response(start, err.to_string())),
    };

    let facility = request.facility.as_deref();
    let optimizer = FleetOptimizer::new(as_of)
        .with_budget(request.annual_capital_budget)
        .with_discount_rate(request.discount_rate);

    let mut run = || -> Result<
        (Vec<ReplacementPriority>, ReplacementSchedule, FleetCostSummary),
        AnalyticsError,
    > {
        let priorities = optimizer.rank_replacement_priorities(&mut store, facility)?;
        let schedule = optimizer.optimal_replacement_schedule(
            &mut store,
            facility,
            request.schedule_horizon_years,
        )?;
        let summary = rollup::fleet_cost_summary(&store, facility, as_of)?;
        Ok((priorities, schedule, summary))
    };
    let (priorities, schedule, fleet_summary) = match run() {
        Ok(results) => results,
        Err(err) => return Ok(error_response(start, err.to_string())),
    };

    // Read-only TCO sweep across the fleet
    let calculator = TcoCalculator::new(as_of);
    let filter = EquipmentFilter::all().with_facility(facility);
    let equipment = match store.list_equipment(&filter) {
        Ok(equipment) => equipment,
        Err(err) => return Ok(error_response(start, err.to_string())),
    };
    let mut tco_reports: Vec<_> = equipment
        .par_iter()
        .filter_map(|eq| calculator.calculate_tco(&store, eq.id, None).ok())
        .collect();
    tco_reports.sort_by(|a, b| b.annualized_tco.total_cmp(&a.annualized_tco));
    tco_reports.truncate(5);

    Ok(AnalyticsResponse {
        equipment_count,
        rollup_rows,
        fleet_summary: Some(fleet_summary),
        priorities,
        schedule: Some(schedule),
        highest_tco_assets: tco_reports,
        execution_time_ms: start.elapsed().as_millis() as u64,
        error: None,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging
    env_logger::init();

    // Run the Lambda runtime
    lambda_runtime::run(service_fn(handler)).await
}

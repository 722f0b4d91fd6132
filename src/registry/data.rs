//! Equipment registry entities and their dependent records
//!
//! These structs mirror the persisted tables one-to-one. Registry entries
//! exclusively own their dependents through `equipment_id` back-references;
//! deleting a registry entry cascades.

use crate::dates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a registry entry
pub type EquipmentId = u32;

/// Tolerated rounding when validating work order cost component sums
pub const COST_SUM_TOLERANCE: f64 = 0.01;

/// Lifecycle status of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Active,
    Inactive,
    PendingReplacement,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Active => "active",
            EquipmentStatus::Inactive => "inactive",
            EquipmentStatus::PendingReplacement => "pending_replacement",
        }
    }
}

/// Maintenance activity category on a work order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderType {
    CorrectiveRepair,
    PreventiveMaintenance,
    SafetyInspection,
    Calibration,
}

impl WorkOrderType {
    /// Everything that is not a corrective repair counts as planned
    /// maintenance in the monthly rollups.
    pub fn is_corrective(&self) -> bool {
        matches!(self, WorkOrderType::CorrectiveRepair)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderType::CorrectiveRepair => "corrective_repair",
            WorkOrderType::PreventiveMaintenance => "preventive_maintenance",
            WorkOrderType::SafetyInspection => "safety_inspection",
            WorkOrderType::Calibration => "calibration",
        }
    }
}

/// Dispatch priority of a work order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderPriority {
    Emergency,
    Urgent,
    Routine,
    Scheduled,
}

/// Who performed the work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicianType {
    InHouse,
    Oem,
    ThirdPartyIso,
}

/// Coverage model of a service contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    FullService,
    PreventiveOnly,
    PartsOnly,
    TimeAndMaterials,
    PerCall,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::FullService => "full_service",
            ContractType::PreventiveOnly => "preventive_only",
            ContractType::PartsOnly => "parts_only",
            ContractType::TimeAndMaterials => "time_and_materials",
            ContractType::PerCall => "per_call",
        }
    }
}

/// Depreciation method for book value schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    Macrs,
}

impl DepreciationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationMethod::StraightLine => "straight_line",
            DepreciationMethod::Macrs => "macrs",
        }
    }
}

/// Forecast model actually used for a persisted forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Arima,
    ExponentialSmoothing,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::Arima => "arima",
            ForecastMethod::ExponentialSmoothing => "exponential_smoothing",
        }
    }
}

/// Outcome of a repair-vs-replace analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ContinueOperating,
    PlanReplacement,
    ReplaceImmediately,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::ContinueOperating => "continue_operating",
            RecommendedAction::PlanReplacement => "plan_replacement",
            RecommendedAction::ReplaceImmediately => "replace_immediately",
        }
    }

    /// Whether this action puts the asset on the replacement schedule
    pub fn is_replacement(&self) -> bool {
        matches!(
            self,
            RecommendedAction::ReplaceImmediately | RecommendedAction::PlanReplacement
        )
    }
}

/// A tracked piece of capital equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRegistry {
    /// Store-assigned id (0 until inserted)
    pub id: EquipmentId,

    /// Unique asset tag, e.g. `EQ-2019-0042`
    pub asset_tag: String,

    pub serial_number: Option<String>,

    /// Equipment class, e.g. `ct_scanner`, `infusion_pump`
    pub equipment_class: String,

    pub manufacturer: Option<String>,
    pub model_name: Option<String>,

    pub facility_id: String,
    pub department: Option<String>,

    pub acquisition_date: NaiveDate,
    pub acquisition_cost: f64,

    pub installation_date: Option<NaiveDate>,
    pub warranty_expiration: Option<NaiveDate>,

    /// Expected useful life in months; analytics default to 120 when absent
    pub useful_life_months: Option<u32>,

    pub status: EquipmentStatus,

    pub disposition_date: Option<NaiveDate>,
    pub disposition_method: Option<String>,
}

impl EquipmentRegistry {
    /// Age in whole months as of a given date (30.44-day months)
    pub fn age_months(&self, as_of: NaiveDate) -> i64 {
        dates::age_months(self.acquisition_date, as_of)
    }

    /// Age in fractional years as of a given date (365.25-day years)
    pub fn age_years(&self, as_of: NaiveDate) -> f64 {
        dates::age_years(self.acquisition_date, as_of)
    }

    /// Whether the asset has outlived its expected useful life
    pub fn past_useful_life(&self, as_of: NaiveDate) -> bool {
        match self.useful_life_months {
            Some(life) => self.age_months(as_of) > life as i64,
            None => false,
        }
    }

    /// Validate the registry invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.acquisition_cost <= 0.0 {
            return Err(format!(
                "acquisition_cost must be positive, got {}",
                self.acquisition_cost
            ));
        }
        if let Some(installed) = self.installation_date {
            if installed < self.acquisition_date {
                return Err(format!(
                    "installation_date {} precedes acquisition_date {}",
                    installed, self.acquisition_date
                ));
            }
        }
        Ok(())
    }
}

/// A unit of maintenance activity against one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: u32,
    pub equipment_id: EquipmentId,

    /// Unique work order number, e.g. `WO-0001234`
    pub wo_number: String,

    pub wo_type: WorkOrderType,
    pub priority: WorkOrderPriority,

    pub opened_date: NaiveDate,
    pub completed_date: Option<NaiveDate>,

    pub description: Option<String>,
    pub root_cause: Option<String>,

    pub labor_hours: Option<f64>,
    pub labor_cost: Option<f64>,
    pub parts_cost: Option<f64>,
    pub vendor_service_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub downtime_hours: Option<f64>,

    pub technician_type: TechnicianType,
}

impl WorkOrder {
    /// Validate the work order invariants
    pub fn validate(&self) -> Result<(), String> {
        if let Some(completed) = self.completed_date {
            if completed < self.opened_date {
                return Err(format!(
                    "completed_date {} precedes opened_date {}",
                    completed, self.opened_date
                ));
            }
        }
        if let Some(total) = self.total_cost {
            let components = self.labor_cost.unwrap_or(0.0)
                + self.parts_cost.unwrap_or(0.0)
                + self.vendor_service_cost.unwrap_or(0.0);
            if (total - components).abs() > COST_SUM_TOLERANCE {
                return Err(format!(
                    "total_cost {:.2} does not match cost components {:.2}",
                    total, components
                ));
            }
        }
        Ok(())
    }
}

/// A maintenance coverage agreement for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceContract {
    pub id: u32,
    pub equipment_id: EquipmentId,

    pub contract_type: ContractType,
    pub provider: Option<String>,

    pub annual_cost: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub includes_parts: bool,
    pub includes_labor: bool,
    pub includes_pm: bool,

    pub response_time_hours: Option<u32>,
    pub uptime_guarantee_pct: Option<f64>,
}

impl ServiceContract {
    /// Validate the contract invariants
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(format!("start_date {} after end_date {}", start, end));
            }
        }
        Ok(())
    }
}

/// A recurring preventive maintenance requirement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmSchedule {
    pub id: u32,
    pub equipment_id: EquipmentId,

    pub pm_type: String,
    pub frequency_months: u32,

    pub estimated_duration_hours: Option<f64>,
    pub estimated_cost: Option<f64>,

    pub last_completed: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
}

impl PmSchedule {
    /// Whether the next PM is overdue as of a given date
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        matches!(self.next_due, Some(due) if due < as_of)
    }
}

/// Monthly cost and downtime aggregate for a single asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub id: u32,
    pub equipment_id: EquipmentId,

    /// First-of-month date identifying the period
    pub month: NaiveDate,

    pub pm_cost: f64,
    pub corrective_cost: f64,
    pub parts_cost: f64,
    pub contract_cost_allocated: f64,
    pub downtime_hours: f64,
    pub work_order_count: u32,

    /// `pm_cost + corrective_cost + contract_cost_allocated`
    pub total_cost: f64,
}

/// Persisted output of a forecasting run
///
/// `monthly_forecasts` and `model_metrics` are opaque JSON blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostForecastRecord {
    pub id: u32,
    pub equipment_id: EquipmentId,

    pub forecast_date: NaiveDate,
    pub horizon_months: u32,
    pub method: ForecastMethod,

    pub monthly_forecasts: String,
    pub model_metrics: String,

    pub annual_tco_current_year: f64,
    pub annual_tco_next_year: f64,
    pub cumulative_tco_to_date: f64,
}

/// Persisted output of a repair-vs-replace analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementAnalysisRecord {
    pub id: u32,
    pub equipment_id: EquipmentId,

    pub analysis_date: NaiveDate,
    pub current_age_months: u32,

    pub remaining_book_value: f64,
    pub annual_maintenance_current: f64,
    pub annual_maintenance_projected: f64,
    pub replacement_cost_estimate: f64,

    pub npv_continue_operating: f64,
    pub npv_replace_now: f64,
    pub npv_savings_if_replaced: f64,

    pub recommended_action: RecommendedAction,
    pub optimal_replacement_date: Option<NaiveDate>,
    pub discount_rate: f64,
}

/// One fiscal year of a persisted depreciation schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationRow {
    pub id: u32,
    pub equipment_id: EquipmentId,

    pub fiscal_year: i32,
    pub method: DepreciationMethod,

    pub beginning_book_value: f64,
    pub depreciation_expense: f64,
    pub ending_book_value: f64,
    pub accumulated_depreciation: f64,
}

//! NPV and IRR utilities plus the repair-vs-replace decision engine
//!
//! Cash flows are costs (positive values), so scenario NPVs are typically
//! negative; a less-negative NPV is the cheaper path.

use crate::config::DEFAULT_DISCOUNT_RATE;
use crate::dates::{round2, FiscalCalendar};
use crate::depreciation::Depreciator;
use crate::error::AnalyticsError;
use crate::registry::{
    DepreciationMethod, EquipmentId, RecommendedAction, ReplacementAnalysisRecord,
};
use crate::store::{EquipmentFilter, EquipmentStore};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Years projected in each scenario
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Annual escalation of maintenance on aging equipment
const CONTINUE_ESCALATION: f64 = 1.08;

/// New equipment: first-year maintenance as a fraction of replacement cost
const NEW_EQUIPMENT_MAINTENANCE_FRACTION: f64 = 0.03;

/// Annual escalation of maintenance on new equipment
const REPLACE_ESCALATION: f64 = 1.02;

/// Savings above this fraction of the replacement cost trigger an
/// immediate-replacement recommendation (policy constant)
const IMMEDIATE_REPLACEMENT_FRACTION: f64 = 0.10;

/// Trailing window for the current annual maintenance estimate, days
const MAINTENANCE_LOOKBACK_DAYS: i64 = 730;

/// Net present value of a cost stream.
///
/// `npv = -initial - sum(cf_t / (1 + rate)^t)` for `t = 1..n`; costs are
/// positive inputs, so the result is typically negative.
pub fn compute_npv(cash_flows: &[f64], discount_rate: f64, initial_investment: f64) -> f64 {
    let mut npv = -initial_investment;
    for (t, cf) in cash_flows.iter().enumerate() {
        npv -= cf / (1.0 + discount_rate).powi(t as i32 + 1);
    }
    round2(npv)
}

/// Internal rate of return by bisection over `[-0.5, 2.0]`.
///
/// `cash_flows` are annual net benefits; `initial_investment` is the time-zero
/// outlay. Returns `None` when no root is found within 1000 iterations.
///
/// The bisection assumes `npv(rate)` is monotone on the bracket; cash-flow
/// patterns with multiple sign changes may not converge.
pub fn compute_irr(cash_flows: &[f64], initial_investment: f64, tol: f64) -> Option<f64> {
    let npv_at = |rate: f64| -> f64 {
        let mut npv = -initial_investment;
        for (t, cf) in cash_flows.iter().enumerate() {
            npv += cf / (1.0 + rate).powi(t as i32 + 1);
        }
        npv
    };

    let mut low = -0.5;
    let mut high = 2.0;

    for _ in 0..1000 {
        let mid = (low + high) / 2.0;
        let npv = npv_at(mid);
        if npv.abs() < tol {
            return Some((mid * 1e6).round() / 1e6);
        }
        if npv > 0.0 {
            low = mid;
        } else {
            high = mid;
        }
    }

    None
}

/// Which scenario an NPV figure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementScenario {
    ContinueOperating,
    ReplaceNow,
}

/// NPV of one scenario with its projected cash flows
#[derive(Debug, Clone, Serialize)]
pub struct NpvResult {
    pub scenario: ReplacementScenario,
    pub npv: f64,
    pub annual_cash_flows: Vec<f64>,
    pub discount_rate: f64,
    pub horizon_years: u32,
}

/// Full repair-vs-replace report for one asset
#[derive(Debug, Clone, Serialize)]
pub struct RepairReplaceReport {
    pub equipment_id: EquipmentId,
    pub asset_tag: String,
    pub equipment_class: String,
    pub current_age_months: u32,
    pub remaining_book_value: f64,
    pub annual_maintenance_current: f64,
    pub annual_maintenance_projected: f64,
    pub replacement_cost: f64,
    pub npv_continue: f64,
    pub npv_replace: f64,
    pub npv_savings: f64,
    pub recommended_action: RecommendedAction,
    /// Reserved for schedule-aware recommendations
    pub optimal_replacement_date: Option<NaiveDate>,
}

/// NPV-based repair-vs-replace decision engine
#[derive(Debug, Clone)]
pub struct NpvAnalyzer {
    discount_rate: f64,
    calendar: FiscalCalendar,
    as_of: NaiveDate,
}

impl NpvAnalyzer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            calendar: FiscalCalendar::default(),
            as_of,
        }
    }

    pub fn with_discount_rate(mut self, rate: f64) -> Self {
        self.discount_rate = rate;
        self
    }

    pub fn with_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Annualised maintenance from the trailing 730 days of rollups
    fn annual_maintenance(
        &self,
        store: &dyn EquipmentStore,
        equipment_id: EquipmentId,
    ) -> Result<f64, AnalyticsError> {
        let cutoff = self.as_of - Duration::days(MAINTENANCE_LOOKBACK_DAYS);
        let recent: Vec<f64> = store
            .rollups(equipment_id)?
            .iter()
            .filter(|r| r.month >= cutoff)
            .map(|r| r.total_cost)
            .collect();

        if recent.is_empty() {
            return Ok(0.0);
        }

        let months = recent.len().min(24) as f64;
        Ok(recent.iter().sum::<f64>() / months * 12.0)
    }

    /// Fleet-wide mean acquisition cost for a class (0 with no peers)
    fn class_avg_acquisition(
        &self,
        store: &dyn EquipmentStore,
        equipment_class: &str,
    ) -> Result<f64, AnalyticsError> {
        let peers = store.list_equipment(&EquipmentFilter::for_class(equipment_class))?;
        if peers.is_empty() {
            return Ok(0.0);
        }
        Ok(peers.iter().map(|p| p.acquisition_cost).sum::<f64>() / peers.len() as f64)
    }

    /// NPV of keeping the asset: current maintenance escalating 8% per year
    pub fn npv_continue_operating(
        &self,
        store: &dyn EquipmentStore,
        equipment_id: EquipmentId,
        horizon_years: u32,
    ) -> Result<NpvResult, AnalyticsError> {
        let current_annual = self.annual_maintenance(store, equipment_id)?;

        let cash_flows: Vec<f64> = (0..horizon_years)
            .map(|year| round2(current_annual * CONTINUE_ESCALATION.powi(year as i32)))
            .collect();
        let npv = compute_npv(&cash_flows, self.discount_rate, 0.0);

        Ok(NpvResult {
            scenario: ReplacementScenario::ContinueOperating,
            npv,
            annual_cash_flows: cash_flows,
            discount_rate: self.discount_rate,
            horizon_years,
        })
    }

    /// NPV of replacing now: net investment after trade-in at book value,
    /// then new-equipment maintenance escalating 2% per year.
    ///
    /// Re-writes the asset's straight-line depreciation schedule as a side
    /// effect of establishing the book value.
    pub fn npv_replace_now(
        &self,
        store: &mut dyn EquipmentStore,
        equipment_id: EquipmentId,
        replacement_cost: f64,
        horizon_years: u32,
    ) -> Result<NpvResult, AnalyticsError> {
        let depreciator = Depreciator::new(self.as_of).with_calendar(self.calendar);
        let book_value =
            depreciator.compute_book_value(store, equipment_id, DepreciationMethod::StraightLine)?;
        let net_investment = replacement_cost - book_value.max(0.0);

        let new_annual = replacement_cost * NEW_EQUIPMENT_MAINTENANCE_FRACTION;
        let cash_flows: Vec<f64> = (0..horizon_years)
            .map(|year| round2(new_annual * REPLACE_ESCALATION.powi(year as i32)))
            .collect();
        let npv = compute_npv(&cash_flows, self.discount_rate, net_investment);

        Ok(NpvResult {
            scenario: ReplacementScenario::ReplaceNow,
            npv,
            annual_cash_flows: cash_flows,
            discount_rate: self.discount_rate,
            horizon_years,
        })
    }

    /// Run both scenarios, recommend an action, and persist the analysis.
    ///
    /// The persisted analysis is fully replaced on every invocation. The
    /// replacement cost defaults to the class-average acquisition cost.
    pub fn repair_vs_replace(
        &self,
        store: &mut dyn EquipmentStore,
        equipment_id: EquipmentId,
        replacement_cost: Option<f64>,
        horizon_years: u32,
    ) -> Result<RepairReplaceReport, AnalyticsError> {
        let eq = store
            .equipment(equipment_id)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", equipment_id)))?;

        let replacement_cost = match replacement_cost {
            Some(cost) => cost,
            None => self.class_avg_acquisition(store, &eq.equipment_class)?,
        };

        let continue_result = self.npv_continue_operating(store, equipment_id, horizon_years)?;
        let replace_result =
            self.npv_replace_now(store, equipment_id, replacement_cost, horizon_years)?;

        // Both NPVs are costs; replacing saves money when it is less negative
        let savings = round2(replace_result.npv - continue_result.npv);

        let current_annual = continue_result.annual_cash_flows.first().copied().unwrap_or(0.0);
        let projected_annual = continue_result.annual_cash_flows.last().copied().unwrap_or(0.0);

        let depreciator = Depreciator::new(self.as_of).with_calendar(self.calendar);
        let book_value =
            depreciator.compute_book_value(store, equipment_id, DepreciationMethod::StraightLine)?;

        let recommended_action = if savings > replacement_cost * IMMEDIATE_REPLACEMENT_FRACTION {
            RecommendedAction::ReplaceImmediately
        } else if savings > 0.0 {
            RecommendedAction::PlanReplacement
        } else {
            RecommendedAction::ContinueOperating
        };

        let age_months = eq.age_months(self.as_of).max(0) as u32;

        store.delete_analyses(equipment_id)?;
        store.insert_analysis(ReplacementAnalysisRecord {
            id: 0,
            equipment_id,
            analysis_date: self.as_of,
            current_age_months: age_months,
            remaining_book_value: round2(book_value),
            annual_maintenance_current: round2(current_annual),
            annual_maintenance_projected: round2(projected_annual),
            replacement_cost_estimate: round2(replacement_cost),
            npv_continue_operating: continue_result.npv,
            npv_replace_now: replace_result.npv,
            npv_savings_if_replaced: savings,
            recommended_action,
            optimal_replacement_date: None,
            discount_rate: self.discount_rate,
        })?;

        log::debug!(
            "{}: savings {:.2}, action {}",
            eq.asset_tag,
            savings,
            recommended_action.as_str()
        );

        Ok(RepairReplaceReport {
            equipment_id,
            asset_tag: eq.asset_tag,
            equipment_class: eq.equipment_class,
            current_age_months: age_months,
            remaining_book_value: round2(book_value),
            annual_maintenance_current: round2(current_annual),
            annual_maintenance_projected: round2(projected_annual),
            replacement_cost: round2(replacement_cost),
            npv_continue: continue_result.npv,
            npv_replace: replace_result.npv,
            npv_savings: savings,
            recommended_action,
            optimal_replacement_date: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        EquipmentRegistry, EquipmentStatus, TechnicianType, WorkOrder, WorkOrderPriority,
        WorkOrderType,
    };
    use crate::rollup;
    use crate::store::MemoryStore;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_npv_reference_value() {
        // -(5000/1.08 + 5000/1.08^2 + 5000/1.08^3)
        let npv = compute_npv(&[5_000.0, 5_000.0, 5_000.0], 0.08, 0.0);
        assert_abs_diff_eq!(npv, -12_885.48, epsilon = 0.01);
    }

    #[test]
    fn test_npv_with_initial_investment() {
        let npv = compute_npv(&[1_000.0], 0.10, 500.0);
        assert_abs_diff_eq!(npv, -500.0 - 1_000.0 / 1.1, epsilon = 0.01);
    }

    #[test]
    fn test_npv_monotone_in_rate() {
        // Costs shrink with discounting: higher rate, higher (less negative) NPV
        let flows = [2_000.0, 2_000.0, 2_000.0, 2_000.0];
        let low = compute_npv(&flows, 0.02, 0.0);
        let high = compute_npv(&flows, 0.12, 0.0);
        assert!(high > low);
    }

    #[test]
    fn test_irr_two_year_recovery() {
        // 1000 out, 600 back twice: IRR between 10% and 15%
        let irr = compute_irr(&[600.0, 600.0], 1_000.0, 1e-6).unwrap();
        assert!(irr > 0.10 && irr < 0.15, "irr = {}", irr);
    }

    #[test]
    fn test_irr_break_even() {
        let irr = compute_irr(&[1_000.0], 1_000.0, 1e-6).unwrap();
        assert!(irr.abs() < 0.01, "irr = {}", irr);
    }

    #[test]
    fn test_irr_no_recovery() {
        // Nothing comes back: npv < 0 on the whole bracket
        assert!(compute_irr(&[0.0], 1_000.0, 1e-6).is_none());
    }

    fn insert_asset(
        store: &mut MemoryStore,
        tag: &str,
        class: &str,
        acq: NaiveDate,
        cost: f64,
    ) -> EquipmentId {
        store
            .insert_equipment(EquipmentRegistry {
                id: 0,
                asset_tag: tag.to_string(),
                serial_number: None,
                equipment_class: class.to_string(),
                manufacturer: None,
                model_name: None,
                facility_id: "FAC-001".to_string(),
                department: None,
                acquisition_date: acq,
                acquisition_cost: cost,
                installation_date: None,
                warranty_expiration: None,
                useful_life_months: Some(96),
                status: EquipmentStatus::Active,
                disposition_date: None,
                disposition_method: None,
            })
            .unwrap()
    }

    fn insert_repair(store: &mut MemoryStore, id: EquipmentId, number: u32, opened: NaiveDate, cost: f64) {
        store
            .insert_work_order(WorkOrder {
                id: 0,
                equipment_id: id,
                wo_number: format!("WO-{:07}", number),
                wo_type: WorkOrderType::CorrectiveRepair,
                priority: WorkOrderPriority::Urgent,
                opened_date: opened,
                completed_date: Some(opened),
                description: None,
                root_cause: None,
                labor_hours: None,
                labor_cost: Some(cost),
                parts_cost: Some(0.0),
                vendor_service_cost: Some(0.0),
                total_cost: Some(cost),
                downtime_hours: Some(12.0),
                technician_type: TechnicianType::Oem,
            })
            .unwrap();
    }

    /// Eight-year-old CT scanner with heavy recent maintenance
    fn aging_ct_fixture(store: &mut MemoryStore) -> EquipmentId {
        let id = insert_asset(store, "EQ-2018-0001", "ct_scanner", d(2018, 2, 1), 280_000.0);

        // Escalating corrective costs over the trailing two years
        let mut number = 1;
        let mut month = d(2024, 3, 1);
        let mut cost = 8_000.0;
        while month <= d(2026, 1, 1) {
            insert_repair(store, id, number, month, cost);
            number += 1;
            cost *= 1.04;
            month = crate::dates::add_months(month, 1);
        }

        rollup::compute_monthly_rollups(store, Some(id)).unwrap();
        id
    }

    #[test]
    fn test_continue_scenario_escalates_costs() {
        let mut store = MemoryStore::new();
        let id = aging_ct_fixture(&mut store);
        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));

        let result = analyzer.npv_continue_operating(&store, id, 5).unwrap();
        assert_eq!(result.annual_cash_flows.len(), 5);
        assert!(result.npv < 0.0);

        // 8% escalation between consecutive years
        let ratio = result.annual_cash_flows[1] / result.annual_cash_flows[0];
        assert_abs_diff_eq!(ratio, 1.08, epsilon = 0.001);
    }

    #[test]
    fn test_replace_scenario_uses_book_value_trade_in() {
        let mut store = MemoryStore::new();
        let id = aging_ct_fixture(&mut store);
        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));

        let result = analyzer.npv_replace_now(&mut store, id, 300_000.0, 5).unwrap();
        assert!(result.npv < 0.0);
        assert_abs_diff_eq!(result.annual_cash_flows[0], 9_000.0, epsilon = 0.01);

        // Depreciation schedule was re-written as a side effect
        let rows = store
            .depreciation_rows(id, DepreciationMethod::StraightLine)
            .unwrap();
        assert!(!rows.is_empty());
    }

    #[test]
    fn test_aging_ct_recommends_replacement() {
        let mut store = MemoryStore::new();
        let id = aging_ct_fixture(&mut store);
        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));

        let report = analyzer
            .repair_vs_replace(&mut store, id, Some(300_000.0), 5)
            .unwrap();

        assert!(report.npv_savings > 0.0, "savings = {}", report.npv_savings);
        assert!(report.recommended_action.is_replacement());
        assert!(report.current_age_months >= 96);
        assert!(report.optimal_replacement_date.is_none());

        // Exactly one persisted analysis per invocation
        let analyses = store.analyses(id).unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].recommended_action, report.recommended_action);

        let report2 = analyzer
            .repair_vs_replace(&mut store, id, Some(300_000.0), 5)
            .unwrap();
        assert_eq!(store.analyses(id).unwrap().len(), 1);
        assert_abs_diff_eq!(report2.npv_savings, report.npv_savings, epsilon = 0.01);
    }

    #[test]
    fn test_replacement_cost_defaults_to_class_average() {
        let mut store = MemoryStore::new();
        let id = aging_ct_fixture(&mut store);
        insert_asset(&mut store, "EQ-2022-0002", "ct_scanner", d(2022, 6, 1), 320_000.0);

        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));
        let report = analyzer.repair_vs_replace(&mut store, id, None, 5).unwrap();

        assert_abs_diff_eq!(report.replacement_cost, 300_000.0, epsilon = 0.01);
    }

    #[test]
    fn test_lightly_used_asset_keeps_operating() {
        let mut store = MemoryStore::new();
        let id = insert_asset(&mut store, "EQ-2024-0001", "ct_scanner", d(2024, 1, 15), 350_000.0);
        insert_repair(&mut store, id, 1, d(2025, 6, 1), 900.0);
        rollup::compute_monthly_rollups(&mut store, Some(id)).unwrap();

        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));
        let report = analyzer
            .repair_vs_replace(&mut store, id, Some(350_000.0), 5)
            .unwrap();

        assert_eq!(report.recommended_action, RecommendedAction::ContinueOperating);
        assert!(report.npv_savings < 0.0);
    }

    #[test]
    fn test_unknown_asset() {
        let mut store = MemoryStore::new();
        let analyzer = NpvAnalyzer::new(d(2026, 2, 26));
        let err = analyzer.repair_vs_replace(&mut store, 9, None, 5).unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(_)));
    }
}

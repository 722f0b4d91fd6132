//! Budget-constrained fleet replacement ranking and scheduling

use super::npv::{NpvAnalyzer, DEFAULT_HORIZON_YEARS};
use crate::config::DEFAULT_ANNUAL_CAPITAL_BUDGET;
use crate::dates::{round2, FiscalCalendar};
use crate::error::AnalyticsError;
use crate::registry::{EquipmentId, RecommendedAction};
use crate::store::{EquipmentFilter, EquipmentStore};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// One ranked replacement candidate
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementPriority {
    pub rank: usize,
    pub equipment_id: EquipmentId,
    pub asset_tag: String,
    pub equipment_class: String,
    pub age_months: u32,
    pub npv_savings: f64,
    pub recommended_action: RecommendedAction,
    pub replacement_cost: f64,
    /// Greedy budget flag: true while cumulative replacement cost of
    /// positive-savings assets stays within the annual budget
    pub within_budget: bool,
}

/// Replacements funded in one fiscal year
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleYear {
    pub fiscal_year: i32,
    pub replacements: Vec<ReplacementPriority>,
    pub year_spend: f64,
    pub year_savings: f64,
}

/// Multi-year replacement schedule under the annual budget
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementSchedule {
    pub facility_id: Option<String>,
    pub annual_budget: f64,
    pub horizon_years: u32,
    pub schedule: Vec<ScheduleYear>,
    pub total_spend: f64,
    pub total_projected_savings: f64,
}

/// Fleet-wide replacement optimiser
#[derive(Debug, Clone)]
pub struct FleetOptimizer {
    annual_capital_budget: f64,
    analyzer: NpvAnalyzer,
    calendar: FiscalCalendar,
    as_of: NaiveDate,
}

impl FleetOptimizer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            annual_capital_budget: DEFAULT_ANNUAL_CAPITAL_BUDGET,
            analyzer: NpvAnalyzer::new(as_of),
            calendar: FiscalCalendar::default(),
            as_of,
        }
    }

    pub fn with_budget(mut self, annual_capital_budget: f64) -> Self {
        self.annual_capital_budget = annual_capital_budget;
        self
    }

    pub fn with_discount_rate(mut self, rate: f64) -> Self {
        self.analyzer = self.analyzer.with_discount_rate(rate);
        self
    }

    pub fn with_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.analyzer = self.analyzer.with_calendar(calendar);
        self.calendar = calendar;
        self
    }

    /// Run repair-vs-replace across every active asset and rank by savings.
    ///
    /// Assets whose analysis fails for analytic reasons (insufficient
    /// history, degenerate life) are skipped so one bad asset cannot sink
    /// fleet reporting; store errors still abort.
    pub fn rank_replacement_priorities(
        &self,
        store: &mut dyn EquipmentStore,
        facility_id: Option<&str>,
    ) -> Result<Vec<ReplacementPriority>, AnalyticsError> {
        let filter = EquipmentFilter::active().with_facility(facility_id);
        let fleet = store.list_equipment(&filter)?;

        let mut priorities = Vec::with_capacity(fleet.len());
        let mut skipped = 0usize;

        for eq in &fleet {
            let report =
                match self
                    .analyzer
                    .repair_vs_replace(store, eq.id, None, DEFAULT_HORIZON_YEARS)
                {
                    Ok(report) => report,
                    Err(err) if err.is_skippable() => {
                        log::debug!("skipping {} in ranking: {}", eq.asset_tag, err);
                        skipped += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                };

            priorities.push(ReplacementPriority {
                rank: 0,
                equipment_id: eq.id,
                asset_tag: report.asset_tag,
                equipment_class: report.equipment_class,
                age_months: report.current_age_months,
                npv_savings: report.npv_savings,
                recommended_action: report.recommended_action,
                replacement_cost: report.replacement_cost,
                within_budget: false,
            });
        }

        // Savings descending, then age descending
        priorities.sort_by(|a, b| {
            b.npv_savings
                .total_cmp(&a.npv_savings)
                .then(b.age_months.cmp(&a.age_months))
        });

        let mut cumulative = 0.0;
        for (i, priority) in priorities.iter_mut().enumerate() {
            priority.rank = i + 1;
            if priority.npv_savings > 0.0 {
                cumulative += priority.replacement_cost;
                priority.within_budget = cumulative <= self.annual_capital_budget;
            }
        }

        log::info!(
            "ranked {} of {} active assets ({} skipped)",
            priorities.len(),
            fleet.len(),
            skipped
        );
        Ok(priorities)
    }

    /// Greedy multi-year schedule: each fiscal year funds the highest-savings
    /// unscheduled candidates that fit the remaining annual budget.
    pub fn optimal_replacement_schedule(
        &self,
        store: &mut dyn EquipmentStore,
        facility_id: Option<&str>,
        horizon_years: u32,
    ) -> Result<ReplacementSchedule, AnalyticsError> {
        let priorities = self.rank_replacement_priorities(store, facility_id)?;
        let candidates: Vec<ReplacementPriority> = priorities
            .into_iter()
            .filter(|p| p.recommended_action.is_replacement())
            .collect();

        let current_fy = self.calendar.fiscal_year(self.as_of);
        let mut scheduled: HashSet<EquipmentId> = HashSet::new();
        let mut schedule = Vec::with_capacity(horizon_years as usize);
        let mut total_spend = 0.0;
        let mut total_savings = 0.0;

        for year_offset in 0..horizon_years {
            let mut year_replacements = Vec::new();
            let mut year_spend = 0.0;
            let mut year_savings = 0.0;

            for candidate in &candidates {
                if scheduled.contains(&candidate.equipment_id) {
                    continue;
                }
                if year_spend + candidate.replacement_cost <= self.annual_capital_budget {
                    year_spend += candidate.replacement_cost;
                    year_savings += candidate.npv_savings;
                    scheduled.insert(candidate.equipment_id);
                    year_replacements.push(candidate.clone());
                }
            }

            total_spend += year_spend;
            total_savings += year_savings;
            schedule.push(ScheduleYear {
                fiscal_year: current_fy + year_offset as i32,
                replacements: year_replacements,
                year_spend: round2(year_spend),
                year_savings: round2(year_savings),
            });
        }

        Ok(ReplacementSchedule {
            facility_id: facility_id.map(str::to_string),
            annual_budget: self.annual_capital_budget,
            horizon_years,
            schedule,
            total_spend: round2(total_spend),
            total_projected_savings: round2(total_savings),
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

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn insert_asset(
        store: &mut MemoryStore,
        tag: &str,
        facility: &str,
        acq: NaiveDate,
        cost: f64,
        status: EquipmentStatus,
    ) -> EquipmentId {
        store
            .insert_equipment(EquipmentRegistry {
                id: 0,
                asset_tag: tag.to_string(),
                serial_number: None,
                equipment_class: "c_arm".to_string(),
                manufacturer: None,
                model_name: None,
                facility_id: facility.to_string(),
                department: None,
                acquisition_date: acq,
                acquisition_cost: cost,
                installation_date: None,
                warranty_expiration: None,
                useful_life_months: Some(96),
                status,
                disposition_date: None,
                disposition_method: None,
            })
            .unwrap()
    }

    fn add_heavy_maintenance(store: &mut MemoryStore, id: EquipmentId, monthly_cost: f64) {
        let mut month = d(2024, 6, 1);
        let mut number = id * 1_000;
        while month <= d(2026, 1, 1) {
            store
                .insert_work_order(WorkOrder {
                    id: 0,
                    equipment_id: id,
                    wo_number: format!("WO-{:07}", number),
                    wo_type: WorkOrderType::CorrectiveRepair,
                    priority: WorkOrderPriority::Urgent,
                    opened_date: month,
                    completed_date: Some(month),
                    description: None,
                    root_cause: None,
                    labor_hours: None,
                    labor_cost: Some(monthly_cost),
                    parts_cost: Some(0.0),
                    vendor_service_cost: Some(0.0),
                    total_cost: Some(monthly_cost),
                    downtime_hours: Some(10.0),
                    technician_type: TechnicianType::ThirdPartyIso,
                })
                .unwrap();
            number += 1;
            month = crate::dates::add_months(month, 1);
        }
        rollup::compute_monthly_rollups(store, Some(id)).unwrap();
    }

    /// Two failing old assets, one healthy young one, one inactive
    fn fleet_fixture(store: &mut MemoryStore) -> (EquipmentId, EquipmentId, EquipmentId) {
        let worst = insert_asset(store, "EQ-OLD-1", "FAC-001", d(2015, 3, 1), 180_000.0, EquipmentStatus::Active);
        add_heavy_maintenance(store, worst, 22_000.0);

        let second = insert_asset(store, "EQ-OLD-2", "FAC-001", d(2016, 5, 1), 200_000.0, EquipmentStatus::Active);
        add_heavy_maintenance(store, second, 14_000.0);

        let healthy = insert_asset(store, "EQ-NEW-1", "FAC-002", d(2024, 9, 1), 210_000.0, EquipmentStatus::Active);
        add_heavy_maintenance(store, healthy, 300.0);

        insert_asset(store, "EQ-GONE", "FAC-001", d(2012, 1, 1), 150_000.0, EquipmentStatus::Inactive);

        (worst, second, healthy)
    }

    #[test]
    fn test_ranking_orders_by_savings() {
        let mut store = MemoryStore::new();
        let (worst, second, healthy) = fleet_fixture(&mut store);

        let optimizer = FleetOptimizer::new(d(2026, 2, 26)).with_budget(2_000_000.0);
        let priorities = optimizer.rank_replacement_priorities(&mut store, None).unwrap();

        // Inactive asset never enters the ranking
        assert_eq!(priorities.len(), 3);
        assert_eq!(priorities[0].equipment_id, worst);
        assert_eq!(priorities[0].rank, 1);
        assert_eq!(priorities[1].equipment_id, second);
        assert_eq!(priorities[2].equipment_id, healthy);
        assert!(priorities[0].npv_savings > priorities[1].npv_savings);

        // Both failing assets fit the budget; the healthy one has no savings
        assert!(priorities[0].within_budget);
        assert!(priorities[1].within_budget);
        assert!(!priorities[2].within_budget);
    }

    #[test]
    fn test_ranking_respects_facility_filter() {
        let mut store = MemoryStore::new();
        fleet_fixture(&mut store);

        let optimizer = FleetOptimizer::new(d(2026, 2, 26));
        let priorities = optimizer
            .rank_replacement_priorities(&mut store, Some("FAC-002"))
            .unwrap();

        assert_eq!(priorities.len(), 1);
        assert_eq!(priorities[0].asset_tag, "EQ-NEW-1");
    }

    #[test]
    fn test_tight_budget_flags_only_affordable() {
        let mut store = MemoryStore::new();
        fleet_fixture(&mut store);

        // Budget covers one class-average replacement, not two
        let optimizer = FleetOptimizer::new(d(2026, 2, 26)).with_budget(200_000.0);
        let priorities = optimizer.rank_replacement_priorities(&mut store, None).unwrap();

        assert!(priorities[0].within_budget);
        assert!(!priorities[1].within_budget);
    }

    #[test]
    fn test_schedule_spreads_over_years() {
        let mut store = MemoryStore::new();
        fleet_fixture(&mut store);

        let optimizer = FleetOptimizer::new(d(2026, 2, 26)).with_budget(200_000.0);
        let schedule = optimizer
            .optimal_replacement_schedule(&mut store, None, 3)
            .unwrap();

        // FY2026 runs through September 2026
        assert_eq!(schedule.schedule[0].fiscal_year, 2026);
        assert_eq!(schedule.schedule.len(), 3);

        // One replacement per year until candidates run out
        assert_eq!(schedule.schedule[0].replacements.len(), 1);
        assert_eq!(schedule.schedule[1].replacements.len(), 1);
        assert!(schedule.schedule[0].year_spend <= 200_000.0);

        // No asset is scheduled twice
        let mut seen = HashSet::new();
        for year in &schedule.schedule {
            for replacement in &year.replacements {
                assert!(seen.insert(replacement.equipment_id));
            }
        }

        let spend_sum: f64 = schedule.schedule.iter().map(|y| y.year_spend).sum();
        assert!((schedule.total_spend - spend_sum).abs() < 0.02);
    }

    #[test]
    fn test_empty_fleet() {
        let mut store = MemoryStore::new();
        let optimizer = FleetOptimizer::new(d(2026, 2, 26));
        let priorities = optimizer.rank_replacement_priorities(&mut store, None).unwrap();
        assert!(priorities.is_empty());
    }
}

//! In-memory reference store
//!
//! Vec-backed tables with monotonically assigned ids. Used by the CLI, the
//! serverless handler, and every test; a relational adapter implementing
//! [`EquipmentStore`] is an external consumer concern.

use super::{EquipmentFilter, EquipmentStore, StoreError, StoreResult};
use crate::registry::{
    CostForecastRecord, DepreciationMethod, DepreciationRow, EquipmentId, EquipmentRegistry,
    MonthlyRollup, PmSchedule, ReplacementAnalysisRecord, ServiceContract, WorkOrder,
};

/// Vec-backed store with sequential id assignment
#[derive(Debug, Default)]
pub struct MemoryStore {
    equipment: Vec<EquipmentRegistry>,
    work_orders: Vec<WorkOrder>,
    contracts: Vec<ServiceContract>,
    pm_schedules: Vec<PmSchedule>,
    rollups: Vec<MonthlyRollup>,
    depreciation: Vec<DepreciationRow>,
    forecasts: Vec<CostForecastRecord>,
    analyses: Vec<ReplacementAnalysisRecord>,
    next_equipment_id: EquipmentId,
    next_row_id: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_equipment_id: 1,
            next_row_id: 1,
            ..Self::default()
        }
    }

    fn next_row_id(&mut self) -> u32 {
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }

    /// Total number of registry entries
    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    /// Total number of work orders across the fleet
    pub fn work_order_count(&self) -> usize {
        self.work_orders.len()
    }

    /// Total number of service contracts across the fleet
    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }

    /// Total number of PM schedules across the fleet
    pub fn pm_schedule_count(&self) -> usize {
        self.pm_schedules.len()
    }
}

impl EquipmentStore for MemoryStore {
    fn equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentRegistry>> {
        Ok(self.equipment.iter().find(|e| e.id == id).cloned())
    }

    fn equipment_by_tag(&self, asset_tag: &str) -> StoreResult<Option<EquipmentRegistry>> {
        Ok(self.equipment.iter().find(|e| e.asset_tag == asset_tag).cloned())
    }

    fn list_equipment(&self, filter: &EquipmentFilter) -> StoreResult<Vec<EquipmentRegistry>> {
        Ok(self
            .equipment
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn insert_equipment(&mut self, mut equipment: EquipmentRegistry) -> StoreResult<EquipmentId> {
        if self.equipment.iter().any(|e| e.asset_tag == equipment.asset_tag) {
            return Err(StoreError::DuplicateAssetTag(equipment.asset_tag));
        }
        equipment.id = self.next_equipment_id;
        self.next_equipment_id += 1;
        let id = equipment.id;
        self.equipment.push(equipment);
        Ok(id)
    }

    fn delete_equipment(&mut self, id: EquipmentId) -> StoreResult<()> {
        self.equipment.retain(|e| e.id != id);
        self.work_orders.retain(|w| w.equipment_id != id);
        self.contracts.retain(|c| c.equipment_id != id);
        self.pm_schedules.retain(|p| p.equipment_id != id);
        self.rollups.retain(|r| r.equipment_id != id);
        self.depreciation.retain(|d| d.equipment_id != id);
        self.forecasts.retain(|f| f.equipment_id != id);
        self.analyses.retain(|a| a.equipment_id != id);
        Ok(())
    }

    fn work_orders(&self, equipment_id: EquipmentId) -> StoreResult<Vec<WorkOrder>> {
        let mut orders: Vec<_> = self
            .work_orders
            .iter()
            .filter(|w| w.equipment_id == equipment_id)
            .cloned()
            .collect();
        orders.sort_by_key(|w| w.opened_date);
        Ok(orders)
    }

    fn corrective_work_orders(&self, equipment_id: EquipmentId) -> StoreResult<Vec<WorkOrder>> {
        let mut orders: Vec<_> = self
            .work_orders
            .iter()
            .filter(|w| w.equipment_id == equipment_id && w.wo_type.is_corrective())
            .cloned()
            .collect();
        orders.sort_by_key(|w| w.opened_date);
        Ok(orders)
    }

    fn insert_work_order(&mut self, mut order: WorkOrder) -> StoreResult<u32> {
        order.id = self.next_row_id();
        let id = order.id;
        self.work_orders.push(order);
        Ok(id)
    }

    fn contracts(&self, equipment_id: EquipmentId) -> StoreResult<Vec<ServiceContract>> {
        Ok(self
            .contracts
            .iter()
            .filter(|c| c.equipment_id == equipment_id)
            .cloned()
            .collect())
    }

    fn insert_contract(&mut self, mut contract: ServiceContract) -> StoreResult<u32> {
        contract.id = self.next_row_id();
        let id = contract.id;
        self.contracts.push(contract);
        Ok(id)
    }

    fn pm_schedules(&self, equipment_id: EquipmentId) -> StoreResult<Vec<PmSchedule>> {
        Ok(self
            .pm_schedules
            .iter()
            .filter(|p| p.equipment_id == equipment_id)
            .cloned()
            .collect())
    }

    fn insert_pm_schedule(&mut self, mut schedule: PmSchedule) -> StoreResult<u32> {
        schedule.id = self.next_row_id();
        let id = schedule.id;
        self.pm_schedules.push(schedule);
        Ok(id)
    }

    fn rollups(&self, equipment_id: EquipmentId) -> StoreResult<Vec<MonthlyRollup>> {
        let mut rollups: Vec<_> = self
            .rollups
            .iter()
            .filter(|r| r.equipment_id == equipment_id)
            .cloned()
            .collect();
        rollups.sort_by_key(|r| r.month);
        Ok(rollups)
    }

    fn delete_rollups(&mut self, equipment_id: EquipmentId) -> StoreResult<usize> {
        let before = self.rollups.len();
        self.rollups.retain(|r| r.equipment_id != equipment_id);
        Ok(before - self.rollups.len())
    }

    fn insert_rollup(&mut self, mut rollup: MonthlyRollup) -> StoreResult<u32> {
        rollup.id = self.next_row_id();
        let id = rollup.id;
        self.rollups.push(rollup);
        Ok(id)
    }

    fn depreciation_rows(
        &self,
        equipment_id: EquipmentId,
        method: DepreciationMethod,
    ) -> StoreResult<Vec<DepreciationRow>> {
        let mut rows: Vec<_> = self
            .depreciation
            .iter()
            .filter(|d| d.equipment_id == equipment_id && d.method == method)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.fiscal_year);
        Ok(rows)
    }

    fn delete_depreciation_rows(
        &mut self,
        equipment_id: EquipmentId,
        method: DepreciationMethod,
    ) -> StoreResult<usize> {
        let before = self.depreciation.len();
        self.depreciation
            .retain(|d| !(d.equipment_id == equipment_id && d.method == method));
        Ok(before - self.depreciation.len())
    }

    fn insert_depreciation_row(&mut self, mut row: DepreciationRow) -> StoreResult<u32> {
        row.id = self.next_row_id();
        let id = row.id;
        self.depreciation.push(row);
        Ok(id)
    }

    fn forecasts(&self, equipment_id: EquipmentId) -> StoreResult<Vec<CostForecastRecord>> {
        Ok(self
            .forecasts
            .iter()
            .filter(|f| f.equipment_id == equipment_id)
            .cloned()
            .collect())
    }

    fn insert_forecast(&mut self, mut forecast: CostForecastRecord) -> StoreResult<u32> {
        forecast.id = self.next_row_id();
        let id = forecast.id;
        self.forecasts.push(forecast);
        Ok(id)
    }

    fn analyses(&self, equipment_id: EquipmentId) -> StoreResult<Vec<ReplacementAnalysisRecord>> {
        Ok(self
            .analyses
            .iter()
            .filter(|a| a.equipment_id == equipment_id)
            .cloned()
            .collect())
    }

    fn delete_analyses(&mut self, equipment_id: EquipmentId) -> StoreResult<usize> {
        let before = self.analyses.len();
        self.analyses.retain(|a| a.equipment_id != equipment_id);
        Ok(before - self.analyses.len())
    }

    fn insert_analysis(&mut self, mut analysis: ReplacementAnalysisRecord) -> StoreResult<u32> {
        analysis.id = self.next_row_id();
        let id = analysis.id;
        self.analyses.push(analysis);
        Ok(id)
    }
}

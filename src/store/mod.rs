//! Store abstraction over the persisted fleet state
//!
//! The analytics core is store-agnostic: every operation receives a store
//! reference from its caller, which also owns the transactional scope. Reads
//! take `&self` so fleet-wide read-only sweeps can run in parallel; writes
//! take `&mut self` and must be serialised per asset by a supervising layer.

mod memory;

pub use memory::MemoryStore;

use crate::registry::{
    CostForecastRecord, DepreciationMethod, DepreciationRow, EquipmentId, EquipmentRegistry,
    EquipmentStatus, MonthlyRollup, PmSchedule, ReplacementAnalysisRecord, ServiceContract,
    WorkOrder,
};
use thiserror::Error;

/// Failures reported by a store implementation
///
/// The core never retries: a store error aborts the operation and is
/// surfaced unchanged so the caller's transaction can roll back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate asset tag {0}")]
    DuplicateAssetTag(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Predicate filter for registry listings
#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub facility_id: Option<String>,
    pub equipment_class: Option<String>,
    pub status: Option<EquipmentStatus>,
}

impl EquipmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self {
            status: Some(EquipmentStatus::Active),
            ..Self::default()
        }
    }

    pub fn for_class(class: &str) -> Self {
        Self {
            equipment_class: Some(class.to_string()),
            ..Self::default()
        }
    }

    pub fn with_facility(mut self, facility_id: Option<&str>) -> Self {
        self.facility_id = facility_id.map(str::to_string);
        self
    }

    /// Whether a registry entry satisfies this filter
    pub fn matches(&self, eq: &EquipmentRegistry) -> bool {
        if let Some(facility) = &self.facility_id {
            if &eq.facility_id != facility {
                return false;
            }
        }
        if let Some(class) = &self.equipment_class {
            if &eq.equipment_class != class {
                return false;
            }
        }
        if let Some(status) = self.status {
            if eq.status != status {
                return false;
            }
        }
        true
    }
}

/// Persistence contract required by the analytics core
pub trait EquipmentStore {
    // --- registry ---

    /// Look up a registry entry by store id
    fn equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentRegistry>>;

    /// Look up a registry entry by asset tag
    fn equipment_by_tag(&self, asset_tag: &str) -> StoreResult<Option<EquipmentRegistry>>;

    /// List registry entries matching a filter, in insertion order
    fn list_equipment(&self, filter: &EquipmentFilter) -> StoreResult<Vec<EquipmentRegistry>>;

    /// Insert a registry entry, assigning and returning its id
    fn insert_equipment(&mut self, equipment: EquipmentRegistry) -> StoreResult<EquipmentId>;

    /// Delete a registry entry and cascade to every dependent record
    fn delete_equipment(&mut self, id: EquipmentId) -> StoreResult<()>;

    // --- work orders ---

    /// All work orders for an asset, ordered by opened date ascending
    fn work_orders(&self, equipment_id: EquipmentId) -> StoreResult<Vec<WorkOrder>>;

    /// Corrective-repair work orders for an asset, ordered by opened date
    fn corrective_work_orders(&self, equipment_id: EquipmentId) -> StoreResult<Vec<WorkOrder>>;

    fn insert_work_order(&mut self, order: WorkOrder) -> StoreResult<u32>;

    // --- contracts & PM schedules ---

    /// All service contracts for an asset
    fn contracts(&self, equipment_id: EquipmentId) -> StoreResult<Vec<ServiceContract>>;

    fn insert_contract(&mut self, contract: ServiceContract) -> StoreResult<u32>;

    /// All PM schedules for an asset
    fn pm_schedules(&self, equipment_id: EquipmentId) -> StoreResult<Vec<PmSchedule>>;

    fn insert_pm_schedule(&mut self, schedule: PmSchedule) -> StoreResult<u32>;

    // --- rollups ---

    /// Monthly rollups for an asset, ordered by month ascending
    fn rollups(&self, equipment_id: EquipmentId) -> StoreResult<Vec<MonthlyRollup>>;

    /// Delete every rollup for an asset, returning the number removed
    fn delete_rollups(&mut self, equipment_id: EquipmentId) -> StoreResult<usize>;

    fn insert_rollup(&mut self, rollup: MonthlyRollup) -> StoreResult<u32>;

    // --- depreciation schedules ---

    /// Depreciation rows for (asset, method), ordered by fiscal year
    fn depreciation_rows(
        &self,
        equipment_id: EquipmentId,
        method: DepreciationMethod,
    ) -> StoreResult<Vec<DepreciationRow>>;

    fn delete_depreciation_rows(
        &mut self,
        equipment_id: EquipmentId,
        method: DepreciationMethod,
    ) -> StoreResult<usize>;

    fn insert_depreciation_row(&mut self, row: DepreciationRow) -> StoreResult<u32>;

    // --- forecasts & analyses ---

    /// Persisted forecasts for an asset, oldest first
    fn forecasts(&self, equipment_id: EquipmentId) -> StoreResult<Vec<CostForecastRecord>>;

    fn insert_forecast(&mut self, forecast: CostForecastRecord) -> StoreResult<u32>;

    /// Persisted replacement analyses for an asset, oldest first
    fn analyses(&self, equipment_id: EquipmentId) -> StoreResult<Vec<ReplacementAnalysisRecord>>;

    fn delete_analyses(&mut self, equipment_id: EquipmentId) -> StoreResult<usize>;

    fn insert_analysis(&mut self, analysis: ReplacementAnalysisRecord) -> StoreResult<u32>;
}

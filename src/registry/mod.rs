//! Fleet registry: entities, enums, and CSV ingestion

mod data;
pub mod loader;

pub use data::{
    ContractType, CostForecastRecord, DepreciationMethod, DepreciationRow, EquipmentId,
    EquipmentRegistry, EquipmentStatus, ForecastMethod, MonthlyRollup, PmSchedule,
    RecommendedAction, ReplacementAnalysisRecord, ServiceContract, TechnicianType, WorkOrder,
    WorkOrderPriority, WorkOrderType, COST_SUM_TOLERANCE,
};
pub use loader::{LoadError, Tagged};

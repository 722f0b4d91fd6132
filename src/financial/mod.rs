//! Financial calculators: TCO, NPV/IRR, repair-vs-replace, fleet optimisation

mod fleet;
mod npv;
mod tco;

pub use fleet::{FleetOptimizer, ReplacementPriority, ReplacementSchedule, ScheduleYear};
pub use npv::{
    compute_irr, compute_npv, NpvAnalyzer, NpvResult, RepairReplaceReport, ReplacementScenario,
    DEFAULT_HORIZON_YEARS,
};
pub use tco::{TcoCalculator, TcoComparison, TcoReport};

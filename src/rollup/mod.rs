//! Monthly cost aggregation: work orders + contract amortisation to rollups

mod aggregator;

pub use aggregator::{
    compute_monthly_rollups, cost_history, fleet_cost_summary, ClassCost, FleetCostSummary,
};

//! Equipcost - capital-asset cost analytics for hospital equipment fleets
//!
//! This library provides:
//! - Monthly cost aggregation of work orders and amortised contract fees
//! - ARIMA and exponential-smoothing cost forecasting with confidence bands
//! - Bathtub failure-rate modelling and remaining-life estimation
//! - MTBF-based next-failure prediction
//! - Depreciation, TCO, NPV/IRR, and repair-vs-replace analysis
//! - Budget-constrained fleet replacement ranking and scheduling

pub mod config;
pub mod dates;
pub mod depreciation;
pub mod error;
pub mod financial;
pub mod forecast;
pub mod registry;
pub mod reliability;
pub mod rollup;
pub mod store;
pub mod synthetic;

// Re-export commonly used types
pub use config::Settings;
pub use error::AnalyticsError;
pub use registry::{EquipmentId, EquipmentRegistry, MonthlyRollup, ServiceContract, WorkOrder};
pub use store::{EquipmentFilter, EquipmentStore, MemoryStore, StoreError};

// Re-export the analytics components
pub use depreciation::Depreciator;
pub use financial::{FleetOptimizer, NpvAnalyzer, TcoCalculator};
pub use forecast::{Forecaster, MethodChoice};
pub use reliability::{BathtubModeler, MtbfPredictor};

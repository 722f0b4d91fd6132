//! Error types for the analytics core

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the analytical components
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Unknown asset tag or equipment id
    #[error("equipment {0} not found")]
    NotFound(String),

    /// Forecasting with fewer than the minimum months of cost history
    #[error("insufficient cost history: {months} months, need at least {required}")]
    InsufficientHistory { months: usize, required: usize },

    /// MTBF prediction with fewer than 2 corrective repairs
    #[error("insufficient repair history: {0} corrective repairs, need at least 2")]
    InsufficientRepairHistory(usize),

    /// All time-between-failure gaps were non-positive
    #[error("no valid time-between-failure intervals")]
    NoValidIntervals,

    /// Bathtub curve fit invoked with an empty data set
    #[error("no repair observations provided for curve fitting")]
    NoData,

    /// MACRS with a recovery period other than 5 or 7 years
    #[error("unsupported MACRS recovery period: {0} years")]
    UnsupportedRecoveryPeriod(u32),

    /// Caller-supplied arguments that cannot be analysed
    #[error("{0}")]
    InvalidArgument(String),

    /// Numerical fit failure. Handled internally by the forecaster's
    /// fallback chain and never surfaced from `forecast_equipment`.
    #[error("numerical fitting failed: {0}")]
    NumericFailure(String),

    /// Store failure; rolled back by the caller's transaction, never retried
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AnalyticsError {
    /// Whether this error is a per-asset analytic condition that fleet-level
    /// reporting may skip, as opposed to a store failure that must abort.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, AnalyticsError::Store(_))
    }
}

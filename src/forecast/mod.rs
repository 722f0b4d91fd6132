//! Time-series cost forecasting: ARIMA, exponential smoothing, metrics

mod arima;
mod forecaster;
mod metrics;
mod optimizer;
mod smoothing;

pub use arima::{fit_arima, ArimaFit};
pub use forecaster::{
    Forecaster, ForecastResult, MethodChoice, MonthlyForecastPoint, DEFAULT_HORIZON_MONTHS,
    DEFAULT_MIN_HISTORY_MONTHS, MIN_FORECAST_MONTHS,
};
pub use metrics::{compute_metrics, ModelMetrics};
pub use optimizer::nelder_mead;
pub use smoothing::{fit_holt, HoltFit};

//! Forecast accuracy metrics

use crate::dates::round2;
use serde::{Deserialize, Serialize};

/// Holdout accuracy of a fitted forecasting model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error over non-zero actuals
    pub mape: f64,
}

impl ModelMetrics {
    /// Zero metrics, reported by the constant-mean fallback
    pub fn zero() -> Self {
        Self { mae: 0.0, rmse: 0.0, mape: 0.0 }
    }
}

/// Compute MAE, RMSE, and MAPE between actual and predicted values.
///
/// MAPE averages over non-zero actuals only and is reported as a
/// percentage; it is zero when every actual is zero.
pub fn compute_metrics(actual: &[f64], predicted: &[f64]) -> ModelMetrics {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return ModelMetrics::zero();
    }

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut nonzero = 0usize;

    for (a, p) in actual.iter().zip(predicted.iter()).take(n) {
        let err = a - p;
        abs_sum += err.abs();
        sq_sum += err * err;
        if *a != 0.0 {
            pct_sum += (err / a).abs();
            nonzero += 1;
        }
    }

    let mae = abs_sum / n as f64;
    let rmse = (sq_sum / n as f64).sqrt();
    let mape = if nonzero > 0 {
        pct_sum / nonzero as f64 * 100.0
    } else {
        0.0
    };

    ModelMetrics {
        mae: round2(mae),
        rmse: round2(rmse),
        mape: round2(mape),
    }
}

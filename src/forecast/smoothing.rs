//! Additive-trend exponential smoothing (Holt's linear method)
//!
//! No seasonal component; `alpha` and `beta` are optimised on the
//! one-step-ahead sum of squared errors.

use super::optimizer::nelder_mead;
use crate::error::AnalyticsError;

/// Evaluation budget for the smoothing parameter search
const MAX_EVALS: usize = 2_000;

/// Fitted Holt linear-trend model
#[derive(Debug, Clone)]
pub struct HoltFit {
    pub alpha: f64,
    pub beta: f64,

    /// Terminal level and trend, the forecast origin
    pub level: f64,
    pub trend: f64,

    /// One-step in-sample predictions; index 0 echoes the first observation
    pub fitted: Vec<f64>,
}

/// One-step-ahead SSE for candidate smoothing parameters
fn holt_sse(series: &[f64], alpha: f64, beta: f64) -> f64 {
    let mut level = series[0];
    let mut trend = series[1] - series[0];
    let mut sse = 0.0;

    for &y in &series[1..] {
        let pred = level + trend;
        let err = y - pred;
        sse += err * err;

        let new_level = alpha * y + (1.0 - alpha) * (level + trend);
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;
    }

    sse
}

/// Fit Holt's linear method to a level series.
///
/// Fails with `NumericFailure` on degenerate input; the forecaster handles
/// that internally with a constant-mean forecast.
pub fn fit_holt(series: &[f64]) -> Result<HoltFit, AnalyticsError> {
    if series.len() < 3 {
        return Err(AnalyticsError::NumericFailure(format!(
            "Holt smoothing needs at least 3 observations, got {}",
            series.len()
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::NumericFailure(
            "non-finite observation in series".to_string(),
        ));
    }

    let best = nelder_mead(
        |p| holt_sse(series, p[0], p[1]),
        &[0.5, 0.1],
        &[0.01, 0.01],
        &[0.99, 0.99],
        MAX_EVALS,
    );
    let (alpha, beta) = (best[0], best[1]);

    // Replay the recursion at the optimum to capture state and fits
    let mut level = series[0];
    let mut trend = series[1] - series[0];
    let mut fitted = Vec::with_capacity(series.len());
    fitted.push(series[0]);

    for &y in &series[1..] {
        fitted.push(level + trend);
        let new_level = alpha * y + (1.0 - alpha) * (level + trend);
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;
    }

    if !level.is_finite() || !trend.is_finite() {
        return Err(AnalyticsError::NumericFailure(
            "Holt recursion diverged".to_string(),
        ));
    }

    log::debug!(
        "Holt fit: alpha={:.3} beta={:.3} level={:.2} trend={:.2}",
        alpha,
        beta,
        level,
        trend
    );

    Ok(HoltFit { alpha, beta, level, trend, fitted })
}

impl HoltFit {
    /// Mean forecast for `1..=horizon` steps ahead: `level + h * trend`
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|h| self.level + h as f64 * self.trend)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rejects_short_series() {
        assert!(fit_holt(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_linear_series_extrapolates_exactly() {
        let series: Vec<f64> = (0..20).map(|t| 50.0 + 25.0 * t as f64).collect();
        let fit = fit_holt(&series).unwrap();
        let forecast = fit.forecast(4);

        for (h, value) in forecast.iter().enumerate() {
            let expected = 50.0 + 25.0 * (19 + h + 1) as f64;
            assert_abs_diff_eq!(*value, expected, epsilon = 1.0);
        }
    }

    #[test]
    fn test_flat_series_has_no_trend() {
        let series = vec![120.0; 15];
        let fit = fit_holt(&series).unwrap();
        assert_abs_diff_eq!(fit.trend, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.forecast(6)[5], 120.0, epsilon = 0.1);
    }

    #[test]
    fn test_fitted_matches_series_length() {
        let series: Vec<f64> = (0..12).map(|t| 10.0 * t as f64).collect();
        let fit = fit_holt(&series).unwrap();
        assert_eq!(fit.fitted.len(), series.len());
    }
}

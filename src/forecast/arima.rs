//! ARIMA(1,1,1) fitted by conditional sum of squares
//!
//! The model works on the first-differenced series
//! `w[t] - mu = phi (w[t-1] - mu) + theta e[t-1] + e[t]`; forecasts are
//! integrated back to levels, and forecast variance accumulates the
//! psi-weights of the integrated process.

use super::optimizer::nelder_mead;
use crate::error::AnalyticsError;

/// Evaluation budget for the CSS optimisation
const MAX_EVALS: usize = 5_000;

/// Fitted ARIMA(1,1,1) model
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub mu: f64,
    pub phi: f64,
    pub theta: f64,
    pub sigma2: f64,

    /// One-step in-sample predictions on levels; index 0 echoes the first
    /// observation and carries no information
    pub fitted: Vec<f64>,

    last_level: f64,
    last_diff: f64,
    last_innovation: f64,
}

/// Conditional sum of squared innovations for candidate parameters
fn css(diffs: &[f64], mu: f64, phi: f64, theta: f64) -> f64 {
    let mut w_prev = mu;
    let mut e_prev = 0.0;
    let mut sse = 0.0;

    for &w in diffs {
        let pred = mu + phi * (w_prev - mu) + theta * e_prev;
        let e = w - pred;
        sse += e * e;
        w_prev = w;
        e_prev = e;
    }

    sse
}

/// Lag-1 autocorrelation, used as the AR starting guess
fn lag1_autocorr(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if var <= 0.0 {
        return 0.0;
    }
    let cov: f64 = values
        .windows(2)
        .map(|pair| (pair[0] - mean) * (pair[1] - mean))
        .sum();
    cov / var
}

/// Fit ARIMA(1,1,1) to a level series.
///
/// Fails with `NumericFailure` on degenerate input; the forecaster handles
/// that internally by falling back to exponential smoothing.
pub fn fit_arima(series: &[f64]) -> Result<ArimaFit, AnalyticsError> {
    if series.len() < 4 {
        return Err(AnalyticsError::NumericFailure(format!(
            "ARIMA needs at least 4 observations, got {}",
            series.len()
        )));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::NumericFailure(
            "non-finite observation in series".to_string(),
        ));
    }

    let diffs: Vec<f64> = series.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let m = diffs.len() as f64;

    let mean_diff = diffs.iter().sum::<f64>() / m;
    let sd_diff = (diffs.iter().map(|w| (w - mean_diff).powi(2)).sum::<f64>() / m).sqrt();
    let spread = sd_diff.max(1.0) * 10.0;

    let x0 = [mean_diff, lag1_autocorr(&diffs).clamp(-0.9, 0.9), 0.0];
    let lower = [mean_diff - spread, -0.99, -0.99];
    let upper = [mean_diff + spread, 0.99, 0.99];

    let best = nelder_mead(
        |p| css(&diffs, p[0], p[1], p[2]),
        &x0,
        &lower,
        &upper,
        MAX_EVALS,
    );
    let (mu, phi, theta) = (best[0], best[1], best[2]);

    if !mu.is_finite() || !phi.is_finite() || !theta.is_finite() {
        return Err(AnalyticsError::NumericFailure(
            "ARIMA optimisation produced non-finite parameters".to_string(),
        ));
    }

    // Final pass: innovations, in-sample fits, terminal state
    let mut w_prev = mu;
    let mut e_prev = 0.0;
    let mut sse = 0.0;
    let mut fitted = Vec::with_capacity(series.len());
    fitted.push(series[0]);

    for (t, &w) in diffs.iter().enumerate() {
        let pred = mu + phi * (w_prev - mu) + theta * e_prev;
        fitted.push(series[t] + pred);
        let e = w - pred;
        sse += e * e;
        w_prev = w;
        e_prev = e;
    }

    let sigma2 = sse / m;
    if !sigma2.is_finite() {
        return Err(AnalyticsError::NumericFailure(
            "ARIMA innovation variance is not finite".to_string(),
        ));
    }

    log::debug!(
        "ARIMA(1,1,1) fit: mu={:.4} phi={:.4} theta={:.4} sigma2={:.4}",
        mu,
        phi,
        theta,
        sigma2
    );

    Ok(ArimaFit {
        mu,
        phi,
        theta,
        sigma2,
        fitted,
        last_level: *series.last().expect("series is non-empty"),
        last_diff: *diffs.last().expect("diffs are non-empty"),
        last_innovation: e_prev,
    })
}

impl ArimaFit {
    /// Mean forecast on levels for `1..=horizon` steps ahead
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(horizon);
        let mut w_prev = self.last_diff;
        let mut e_prev = self.last_innovation;
        let mut level = self.last_level;

        for _ in 0..horizon {
            let w_hat = self.mu + self.phi * (w_prev - self.mu) + self.theta * e_prev;
            level += w_hat;
            out.push(level);
            w_prev = w_hat;
            e_prev = 0.0;
        }

        out
    }

    /// Forecast standard error per step, widening with the horizon
    pub fn forecast_se(&self, horizon: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(horizon);
        let mut psi_sum = 1.0; // cumulative psi-weight of the integrated process
        let mut psi = 1.0;
        let mut var = 0.0;

        for step in 0..horizon {
            var += psi_sum * psi_sum;
            out.push((self.sigma2 * var).sqrt());

            // Next ARMA psi-weight: psi[j] = phi^(j-1) (phi + theta)
            psi = if step == 0 {
                self.phi + self.theta
            } else {
                psi * self.phi
            };
            psi_sum += psi;
        }

        out
    }
}

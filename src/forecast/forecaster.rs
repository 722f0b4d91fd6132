//! Forecast orchestration: model choice, fallback chain, and persistence
//!
//! The fallback chain is ARIMA -> exponential smoothing -> constant mean;
//! numerical failures never surface from `forecast_equipment`.

use super::arima::fit_arima;
use super::metrics::{compute_metrics, ModelMetrics};
use super::smoothing::fit_holt;
use crate::dates::{add_months, round2};
use crate::error::AnalyticsError;
use crate::registry::{CostForecastRecord, EquipmentId, ForecastMethod};
use crate::rollup;
use crate::store::{EquipmentStore, StoreError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Months of history below which ARIMA is not attempted
pub const DEFAULT_MIN_HISTORY_MONTHS: usize = 24;

/// Hard minimum months of history for any forecast
pub const MIN_FORECAST_MONTHS: usize = 6;

/// Default forecast horizon
pub const DEFAULT_HORIZON_MONTHS: u32 = 36;

/// Two-sided 80% normal quantile (ARIMA lower band)
const Z_80: f64 = 1.2816;

/// Two-sided 95% normal quantile (upper band)
const Z_95: f64 = 1.96;

/// Lower-band multiplier for the synthetic smoothing intervals
const SYNTHETIC_LOWER_Z: f64 = 1.28;

/// Caller-requested forecast method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodChoice {
    /// Pick automatically (ARIMA when history allows)
    Auto,
    Arima,
    ExponentialSmoothing,
}

impl FromStr for MethodChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(MethodChoice::Auto),
            "arima" => Ok(MethodChoice::Arima),
            "exponential_smoothing" => Ok(MethodChoice::ExponentialSmoothing),
            other => Err(format!(
                "unknown method {:?}, expected auto, arima, or exponential_smoothing",
                other
            )),
        }
    }
}

/// One forecast month with its confidence band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyForecastPoint {
    pub month: NaiveDate,
    pub predicted_cost: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Output of a forecasting run
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    pub method: ForecastMethod,
    pub horizon_months: u32,
    pub predictions: Vec<MonthlyForecastPoint>,
    pub metrics: ModelMetrics,
}

/// Time-series cost forecaster over an asset's monthly rollups
#[derive(Debug, Clone)]
pub struct Forecaster {
    min_history_months: usize,
    as_of: NaiveDate,
}

impl Forecaster {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            min_history_months: DEFAULT_MIN_HISTORY_MONTHS,
            as_of,
        }
    }

    pub fn with_min_history(mut self, months: usize) -> Self {
        self.min_history_months = months;
        self
    }

    /// ARIMA(1,1,1) forecast with 80/95% bands; falls back to exponential
    /// smoothing on any numerical failure.
    pub fn forecast_arima(&self, history: &[(NaiveDate, f64)], horizon: u32) -> ForecastResult {
        match self.try_arima(history, horizon) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("ARIMA fit failed ({}), falling back to smoothing", err);
                self.forecast_exponential_smoothing(history, horizon)
            }
        }
    }

    fn try_arima(
        &self,
        history: &[(NaiveDate, f64)],
        horizon: u32,
    ) -> Result<ForecastResult, AnalyticsError> {
        let values: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
        let n = values.len();

        let fit = fit_arima(&values)?;
        let mean = fit.forecast(horizon as usize);
        let se = fit.forecast_se(horizon as usize);

        // Holdout metrics: refit on the training split and score the rest
        let split = ((n as f64 * 0.8) as usize).max(self.min_history_months / 2);
        let metrics = if split < n {
            let val_fit = fit_arima(&values[..split])?;
            let val_pred = val_fit.forecast(n - split);
            compute_metrics(&values[split..], &val_pred)
        } else {
            compute_metrics(&values[1..], &fit.fitted[1..])
        };

        let last_month = history.last().map(|(m, _)| *m).unwrap_or(self.as_of);
        let predictions = (0..horizon as usize)
            .map(|i| {
                let predicted = mean[i].max(0.0);
                let lower = (mean[i] - Z_80 * se[i]).max(0.0);
                // Keep lower <= predicted <= upper even when the raw mean
                // was negative and got clamped
                let upper = (mean[i] + Z_95 * se[i]).max(predicted);
                MonthlyForecastPoint {
                    month: add_months(last_month, i as u32 + 1),
                    predicted_cost: round2(predicted),
                    lower_bound: round2(lower),
                    upper_bound: round2(upper),
                }
            })
            .collect();

        Ok(ForecastResult {
            method: ForecastMethod::Arima,
            horizon_months: horizon,
            predictions,
            metrics,
        })
    }

    /// Additive-trend smoothing forecast with synthetic widening bands;
    /// degrades to a constant-mean forecast with zero metrics on failure.
    pub fn forecast_exponential_smoothing(
        &self,
        history: &[(NaiveDate, f64)],
        horizon: u32,
    ) -> ForecastResult {
        // Clamp away zeros so the trend fit is stable on sparse months
        let values: Vec<f64> = history.iter().map(|(_, v)| v.max(0.01)).collect();
        let n = values.len();

        let split = ((n as f64 * 0.8) as usize).max(self.min_history_months / 2);

        let fitted = fit_holt(&values).and_then(|fit| {
            let pred = fit.forecast(horizon as usize);
            let metrics = if split < n {
                let val_fit = fit_holt(&values[..split])?;
                let val_pred = val_fit.forecast(n - split);
                compute_metrics(&values[split..], &val_pred)
            } else {
                compute_metrics(&values, &fit.fitted)
            };
            Ok((pred, metrics))
        });

        let (pred, metrics) = match fitted {
            Ok(result) => result,
            Err(err) => {
                log::warn!(
                    "smoothing fit failed ({}), emitting constant mean forecast",
                    err
                );
                let mean = values.iter().sum::<f64>() / n.max(1) as f64;
                (vec![mean; horizon as usize], ModelMetrics::zero())
            }
        };

        let mean_all = values.iter().sum::<f64>() / n.max(1) as f64;
        let sigma = (values.iter().map(|v| (v - mean_all).powi(2)).sum::<f64>() / n.max(1) as f64)
            .sqrt();

        let last_month = history.last().map(|(m, _)| *m).unwrap_or(self.as_of);
        let predictions = (0..horizon as usize)
            .map(|i| {
                let predicted = pred[i].max(0.0);
                let width = sigma * (1.0 + 0.1 * i as f64);
                MonthlyForecastPoint {
                    month: add_months(last_month, i as u32 + 1),
                    predicted_cost: round2(predicted),
                    lower_bound: round2((predicted - SYNTHETIC_LOWER_Z * width).max(0.0)),
                    upper_bound: round2(predicted + Z_95 * width),
                }
            })
            .collect();

        ForecastResult {
            method: ForecastMethod::ExponentialSmoothing,
            horizon_months: horizon,
            predictions,
            metrics,
        }
    }

    /// Forecast an asset's monthly costs from its rollup history and persist
    /// the result.
    ///
    /// Fewer than 6 months of history fails with `InsufficientHistory`;
    /// between 6 and the configured minimum forces exponential smoothing;
    /// `auto` resolves to ARIMA otherwise.
    pub fn forecast_equipment(
        &self,
        store: &mut dyn EquipmentStore,
        equipment_id: EquipmentId,
        horizon: u32,
        method: MethodChoice,
    ) -> Result<ForecastResult, AnalyticsError> {
        let eq = store
            .equipment(equipment_id)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", equipment_id)))?;

        let history: Vec<(NaiveDate, f64)> = rollup::cost_history(store, equipment_id)?
            .iter()
            .map(|r| (r.month, r.total_cost))
            .collect();

        if history.len() < MIN_FORECAST_MONTHS {
            return Err(AnalyticsError::InsufficientHistory {
                months: history.len(),
                required: MIN_FORECAST_MONTHS,
            });
        }

        let result = if history.len() < self.min_history_months {
            log::info!(
                "{}: only {} months of history, forcing exponential smoothing",
                eq.asset_tag,
                history.len()
            );
            self.forecast_exponential_smoothing(&history, horizon)
        } else {
            match method {
                MethodChoice::Auto | MethodChoice::Arima => self.forecast_arima(&history, horizon),
                MethodChoice::ExponentialSmoothing => {
                    self.forecast_exponential_smoothing(&history, horizon)
                }
            }
        };

        // Realised and projected TCO around the forecast date
        let current_year_start = NaiveDate::from_ymd_opt(self.as_of.year(), 1, 1)
            .expect("January 1 is always valid");
        let next_year_start = NaiveDate::from_ymd_opt(self.as_of.year() + 1, 1, 1)
            .expect("January 1 is always valid");
        let next_year_end = NaiveDate::from_ymd_opt(self.as_of.year() + 1, 12, 31)
            .expect("December 31 is always valid");

        let annual_tco_current: f64 = history
            .iter()
            .filter(|(month, _)| *month >= current_year_start)
            .map(|(_, cost)| cost)
            .sum();
        let cumulative: f64 = history.iter().map(|(_, cost)| cost).sum();
        let annual_tco_next: f64 = result
            .predictions
            .iter()
            .filter(|p| p.month >= next_year_start && p.month <= next_year_end)
            .map(|p| p.predicted_cost)
            .sum();

        let monthly_json = serde_json::to_string(&result.predictions)
            .map_err(|e| StoreError::backend(format!("serialising forecast months: {}", e)))?;
        let metrics_json = serde_json::to_string(&result.metrics)
            .map_err(|e| StoreError::backend(format!("serialising forecast metrics: {}", e)))?;

        store.insert_forecast(CostForecastRecord {
            id: 0,
            equipment_id,
            forecast_date: self.as_of,
            horizon_months: horizon,
            method: result.method,
            monthly_forecasts: monthly_json,
            model_metrics: metrics_json,
            annual_tco_current_year: round2(annual_tco_current),
            annual_tco_next_year: round2(annual_tco_next),
            cumulative_tco_to_date: round2(cumulative),
        })?;

        log::info!(
            "{}: {} forecast over {} months, MAE {:.2}",
            eq.asset_tag,
            result.method.as_str(),
            horizon,
            result.metrics.mae
        );
        Ok(result)
    }
}

//! Piecewise bathtub failure-rate model and remaining-life estimation
//!
//! The hazard is an early-life Weibull (decreasing), a constant useful-life
//! rate, and a wear-out Weibull (increasing). The wear-out segment evaluates
//! the Weibull at `t - t_wear + 1`; the offset keeps the argument positive
//! at the boundary.

use crate::dates::round4;
use crate::error::AnalyticsError;
use crate::forecast::nelder_mead;
use crate::registry::EquipmentId;
use crate::store::{EquipmentFilter, EquipmentStore};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Evaluation cap for the curve fit
const MAX_FIT_EVALS: usize = 10_000;

/// Minimum class-level observations before the curve fit is trusted
const MIN_FIT_OBSERVATIONS: usize = 5;

/// Future window scanned for the wear-out threshold, in months
const THRESHOLD_SCAN_MONTHS: u32 = 240;

/// Remaining life reported when the threshold is never crossed
const NO_THRESHOLD_REMAINING_MONTHS: u32 = 120;

/// Useful life assumed when the registry entry does not configure one
const DEFAULT_USEFUL_LIFE_MONTHS: u32 = 120;

/// Initial guesses for the seven curve parameters
const INIT: [f64; 7] = [0.5, 12.0, 0.5, 2.5, 24.0, 12.0, 84.0];
const LOWER: [f64; 7] = [0.1, 1.0, 0.01, 1.1, 1.0, 3.0, 36.0];
const UPPER: [f64; 7] = [0.99, 60.0, 5.0, 10.0, 120.0, 36.0, 180.0];

/// Fitted bathtub curve parameters for one equipment class
#[derive(Debug, Clone, Serialize)]
pub struct BathtubParams {
    pub equipment_class: String,

    /// Early-life Weibull shape (< 1: decreasing hazard)
    pub early_life_shape: f64,
    pub early_life_scale: f64,

    /// Constant annual repair rate during useful life
    pub useful_life_rate: f64,

    /// Wear-out Weibull shape (> 1: increasing hazard)
    pub wearout_shape: f64,
    pub wearout_scale: f64,

    /// Age at which early life ends, months
    pub transition_month_early: f64,
    /// Age at which wear-out begins, months
    pub transition_month_wearout: f64,
}

/// One class-level observation: repairs per year at a given age
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairObservation {
    pub age_months: f64,
    pub annual_repair_count: f64,
}

/// How a remaining-life figure was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeEstimateMethod {
    /// Too little class data; useful life minus current age
    UsefulLifeDefault,
    /// Fitted curve crossed the wear-out threshold
    BathtubCurve,
    /// Fitted curve never crossed the threshold in the scan window
    BathtubCurveNoThreshold,
}

impl LifeEstimateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifeEstimateMethod::UsefulLifeDefault => "useful_life_default",
            LifeEstimateMethod::BathtubCurve => "bathtub_curve",
            LifeEstimateMethod::BathtubCurveNoThreshold => "bathtub_curve_no_threshold",
        }
    }
}

/// Remaining useful life estimate for one asset
#[derive(Debug, Clone, Serialize)]
pub struct RemainingLifeEstimate {
    pub equipment_id: EquipmentId,
    pub current_age_months: u32,
    pub estimated_remaining_months: u32,
    pub confidence: f64,
    pub method: LifeEstimateMethod,
}

/// Weibull failure rate `(shape/scale) * (t/scale)^(shape-1)`, `t >= 0.01`
fn weibull_rate(t: f64, shape: f64, scale: f64) -> f64 {
    let t = t.max(0.01);
    (shape / scale) * (t / scale).powf(shape - 1.0)
}

/// Evaluate the piecewise bathtub model at age `t` months
pub fn bathtub_rate(t: f64, p: &BathtubParams) -> f64 {
    if t < p.transition_month_early {
        weibull_rate(t, p.early_life_shape, p.early_life_scale)
    } else if t < p.transition_month_wearout {
        p.useful_life_rate
    } else {
        weibull_rate(
            t - p.transition_month_wearout + 1.0,
            p.wearout_shape,
            p.wearout_scale,
        )
    }
}

fn rate_from_raw(t: f64, raw: &[f64]) -> f64 {
    if t < raw[5] {
        weibull_rate(t, raw[0], raw[1])
    } else if t < raw[6] {
        raw[2]
    } else {
        weibull_rate(t - raw[6] + 1.0, raw[3], raw[4])
    }
}

/// Failure-rate modeller over class-level repair history
#[derive(Debug, Clone)]
pub struct BathtubModeler {
    as_of: NaiveDate,
}

impl BathtubModeler {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    /// Least-squares fit of the bathtub curve to repair observations.
    ///
    /// The initial guess is retained when the optimiser fails to improve on
    /// it; an empty data set fails with `NoData`.
    pub fn fit_bathtub_curve(
        &self,
        equipment_class: &str,
        data: &[RepairObservation],
    ) -> Result<BathtubParams, AnalyticsError> {
        if data.is_empty() {
            return Err(AnalyticsError::NoData);
        }

        let objective = |p: &[f64]| {
            data.iter()
                .map(|obs| {
                    let err = rate_from_raw(obs.age_months, p) - obs.annual_repair_count;
                    err * err
                })
                .sum::<f64>()
        };

        let best = nelder_mead(&objective, &INIT, &LOWER, &UPPER, MAX_FIT_EVALS);
        let raw = if best.iter().all(|v| v.is_finite()) && objective(&best) <= objective(&INIT) {
            best
        } else {
            INIT.to_vec()
        };

        log::debug!(
            "{}: bathtub fit over {} observations, sse {:.4}",
            equipment_class,
            data.len(),
            objective(&raw)
        );

        Ok(BathtubParams {
            equipment_class: equipment_class.to_string(),
            early_life_shape: round4(raw[0]),
            early_life_scale: round4(raw[1]),
            useful_life_rate: round4(raw[2]),
            wearout_shape: round4(raw[3]),
            wearout_scale: round4(raw[4]),
            transition_month_early: raw[5].trunc(),
            transition_month_wearout: raw[6].trunc(),
        })
    }

    /// Predicted annual corrective repairs at a given age
    pub fn predict_annual_repairs(&self, age_months: f64, params: &BathtubParams) -> f64 {
        bathtub_rate(age_months, params)
    }

    /// Estimate remaining useful life from class-level failure rates.
    ///
    /// With fewer than 5 class observations, falls back to the registry's
    /// useful life. Otherwise fits the curve and scans forward for the age
    /// at which the rate exceeds three times the useful-life rate.
    pub fn estimate_remaining_useful_life(
        &self,
        store: &dyn EquipmentStore,
        equipment_id: EquipmentId,
    ) -> Result<RemainingLifeEstimate, AnalyticsError> {
        let eq = store
            .equipment(equipment_id)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("id {}", equipment_id)))?;

        let current_age = eq.age_months(self.as_of).max(0) as u32;
        let data = self.class_repair_data(store, &eq.equipment_class)?;

        if data.len() < MIN_FIT_OBSERVATIONS {
            let useful_life = eq.useful_life_months.unwrap_or(DEFAULT_USEFUL_LIFE_MONTHS);
            let remaining = useful_life.saturating_sub(current_age);
            log::debug!(
                "{}: {} class observations, defaulting to useful life",
                eq.asset_tag,
                data.len()
            );
            return Ok(RemainingLifeEstimate {
                equipment_id,
                current_age_months: current_age,
                estimated_remaining_months: remaining,
                confidence: 0.3,
                method: LifeEstimateMethod::UsefulLifeDefault,
            });
        }

        let params = self.fit_bathtub_curve(&eq.equipment_class, &data)?;
        let threshold = params.useful_life_rate * 3.0;

        for future_month in current_age..current_age + THRESHOLD_SCAN_MONTHS {
            let rate = self.predict_annual_repairs(future_month as f64, &params);
            if rate > threshold {
                return Ok(RemainingLifeEstimate {
                    equipment_id,
                    current_age_months: current_age,
                    estimated_remaining_months: future_month - current_age,
                    confidence: 0.6,
                    method: LifeEstimateMethod::BathtubCurve,
                });
            }
        }

        Ok(RemainingLifeEstimate {
            equipment_id,
            current_age_months: current_age,
            estimated_remaining_months: NO_THRESHOLD_REMAINING_MONTHS,
            confidence: 0.4,
            method: LifeEstimateMethod::BathtubCurveNoThreshold,
        })
    }

    /// Class-level repair observations: per asset, per calendar year with
    /// any corrective repair, the repair count at the asset's mid-year age.
    fn class_repair_data(
        &self,
        store: &dyn EquipmentStore,
        equipment_class: &str,
    ) -> Result<Vec<RepairObservation>, AnalyticsError> {
        let peers = store.list_equipment(&EquipmentFilter::for_class(equipment_class))?;

        let mut observations = Vec::new();
        for peer in &peers {
            let mut repairs_by_year: BTreeMap<i32, u32> = BTreeMap::new();
            for wo in store.corrective_work_orders(peer.id)? {
                *repairs_by_year.entry(wo.opened_date.year()).or_insert(0) += 1;
            }

            for (year, count) in repairs_by_year {
                let mid_year = NaiveDate::from_ymd_opt(year, 7, 1)
                    .expect("July 1 is always valid");
                let age = crate::dates::age_months(peer.acquisition_date, mid_year);
                if age > 0 {
                    observations.push(RepairObservation {
                        age_months: age as f64,
                        annual_repair_count: count as f64,
                    });
                }
            }
        }

        Ok(observations)
    }
}

//! Failure-rate modelling: bathtub hazard curves and MTBF prediction

mod bathtub;
mod mtbf;

pub use bathtub::{
    bathtub_rate, BathtubModeler, BathtubParams, LifeEstimateMethod, RemainingLifeEstimate,
    RepairObservation,
};
pub use mtbf::{FailurePrediction, MtbfPredictor};

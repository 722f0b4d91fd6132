//! Book value schedules: straight-line and MACRS depreciation

mod schedule;

pub use schedule::{
    macrs_schedule, straight_line_schedule, DepreciationYear, Depreciator, MACRS_5YR, MACRS_7YR,
};

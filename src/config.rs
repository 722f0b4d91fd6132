//! Environment-driven defaults for the analytics components
//!
//! Components receive their configuration by value through constructors;
//! this module only centralises the environment parsing that the binaries
//! perform at startup.

use crate::dates::FiscalCalendar;
use std::env;

/// Default annual discount rate for NPV scenarios
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.08;

/// Default downtime cost per hour of unavailability
pub const DEFAULT_DOWNTIME_HOURLY_RATE: f64 = 500.0;

/// Default annual capital budget for fleet replacement planning
pub const DEFAULT_ANNUAL_CAPITAL_BUDGET: f64 = 2_000_000.0;

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub discount_rate: f64,
    pub downtime_hourly_rate: f64,
    pub annual_capital_budget: f64,
    pub fiscal_calendar: FiscalCalendar,
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// Recognised variables: `EQUIPCOST_DISCOUNT_RATE`,
    /// `EQUIPCOST_DOWNTIME_HOURLY_RATE`, `EQUIPCOST_ANNUAL_CAPITAL_BUDGET`,
    /// `EQUIPCOST_FISCAL_YEAR_START_MONTH`. Unparsable values are ignored
    /// with a warning.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Some(rate) = parse_var::<f64>("EQUIPCOST_DISCOUNT_RATE") {
            settings.discount_rate = rate;
        }
        if let Some(rate) = parse_var::<f64>("EQUIPCOST_DOWNTIME_HOURLY_RATE") {
            settings.downtime_hourly_rate = rate;
        }
        if let Some(budget) = parse_var::<f64>("EQUIPCOST_ANNUAL_CAPITAL_BUDGET") {
            settings.annual_capital_budget = budget;
        }
        if let Some(month) = parse_var::<u32>("EQUIPCOST_FISCAL_YEAR_START_MONTH") {
            if (1..=12).contains(&month) {
                settings.fiscal_calendar = FiscalCalendar::new(month);
            } else {
                log::warn!("EQUIPCOST_FISCAL_YEAR_START_MONTH={} out of range, using October", month);
            }
        }

        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            downtime_hourly_rate: DEFAULT_DOWNTIME_HOURLY_RATE,
            annual_capital_budget: DEFAULT_ANNUAL_CAPITAL_BUDGET,
            fiscal_calendar: FiscalCalendar::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

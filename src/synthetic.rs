//! Seeded synthetic fleet generator
//!
//! Populates a store with a realistic hospital fleet: ~500 assets across
//! three facilities, ten years of PM and bathtub-shaped corrective history
//! with age-escalating costs, age-appropriate service contracts, and PM
//! schedules. Deterministic for a given seed.

use crate::error::AnalyticsError;
use crate::registry::{
    ContractType, EquipmentId, EquipmentRegistry, EquipmentStatus, PmSchedule, ServiceContract,
    TechnicianType, WorkOrder, WorkOrderPriority, WorkOrderType,
};
use crate::store::EquipmentStore;
use chrono::{Datelike, Duration, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Per-class generation parameters
struct ClassSpec {
    class: &'static str,
    count: usize,
    cost_range: (f64, f64),
    useful_life_months: u32,
    pm_frequency_months: u32,
    repair_cost_range: (f64, f64),
    pm_cost_range: (f64, f64),
    manufacturers: &'static [&'static str],
    models: &'static [&'static str],
}

const CLASS_SPECS: &[ClassSpec] = &[
    ClassSpec {
        class: "ct_scanner",
        count: 15,
        cost_range: (800_000.0, 2_500_000.0),
        useful_life_months: 120,
        pm_frequency_months: 3,
        repair_cost_range: (2_000.0, 15_000.0),
        pm_cost_range: (800.0, 3_000.0),
        manufacturers: &["GE Healthcare", "Siemens Healthineers", "Philips Healthcare", "Canon Medical"],
        models: &["Revolution CT", "SOMATOM Force", "IQon Spectral CT", "Aquilion ONE"],
    },
    ClassSpec {
        class: "mri",
        count: 10,
        cost_range: (1_500_000.0, 3_000_000.0),
        useful_life_months: 132,
        pm_frequency_months: 3,
        repair_cost_range: (3_000.0, 20_000.0),
        pm_cost_range: (1_000.0, 4_000.0),
        manufacturers: &["GE Healthcare", "Siemens Healthineers", "Philips Healthcare", "Canon Medical"],
        models: &["SIGNA Premier", "MAGNETOM Vida", "Ingenia Ambition", "Vantage Orian"],
    },
    ClassSpec {
        class: "ultrasound",
        count: 40,
        cost_range: (50_000.0, 250_000.0),
        useful_life_months: 84,
        pm_frequency_months: 6,
        repair_cost_range: (500.0, 3_000.0),
        pm_cost_range: (200.0, 800.0),
        manufacturers: &["GE Healthcare", "Siemens Healthineers", "Philips Healthcare", "Mindray"],
        models: &["LOGIQ E10", "ACUSON Sequoia", "EPIQ Elite", "Resona I9"],
    },
    ClassSpec {
        class: "ventilator",
        count: 80,
        cost_range: (25_000.0, 50_000.0),
        useful_life_months: 96,
        pm_frequency_months: 6,
        repair_cost_range: (300.0, 2_000.0),
        pm_cost_range: (150.0, 500.0),
        manufacturers: &["Draeger", "GE Healthcare", "Philips Healthcare", "Mindray"],
        models: &["Evita V800", "CARESCAPE R860", "Trilogy Evo", "SV800"],
    },
    ClassSpec {
        class: "infusion_pump",
        count: 120,
        cost_range: (3_000.0, 8_000.0),
        useful_life_months: 84,
        pm_frequency_months: 6,
        repair_cost_range: (100.0, 500.0),
        pm_cost_range: (50.0, 200.0),
        manufacturers: &["GE Healthcare", "Mindray"],
        models: &["Alaris System", "BeneFusion SP5"],
    },
    ClassSpec {
        class: "patient_monitor",
        count: 100,
        cost_range: (8_000.0, 25_000.0),
        useful_life_months: 72,
        pm_frequency_months: 6,
        repair_cost_range: (200.0, 1_000.0),
        pm_cost_range: (100.0, 400.0),
        manufacturers: &["GE Healthcare", "Philips Healthcare", "Mindray", "Masimo"],
        models: &["CARESCAPE B650", "IntelliVue MX800", "BeneVision N22", "Root"],
    },
    ClassSpec {
        class: "surgical_light",
        count: 30,
        cost_range: (15_000.0, 60_000.0),
        useful_life_months: 120,
        pm_frequency_months: 12,
        repair_cost_range: (200.0, 1_500.0),
        pm_cost_range: (100.0, 500.0),
        manufacturers: &["Stryker", "GE Healthcare", "Draeger"],
        models: &["Visum II", "HeraLux LED", "Polaris 600"],
    },
    ClassSpec {
        class: "defibrillator",
        count: 40,
        cost_range: (15_000.0, 35_000.0),
        useful_life_months: 96,
        pm_frequency_months: 6,
        repair_cost_range: (300.0, 2_000.0),
        pm_cost_range: (150.0, 600.0),
        manufacturers: &["Philips Healthcare", "Stryker", "GE Healthcare", "Mindray"],
        models: &["HeartStart MRx", "LIFEPAK 15", "MAC VU360", "BeneHeart D6"],
    },
    ClassSpec {
        class: "anesthesia_machine",
        count: 35,
        cost_range: (40_000.0, 100_000.0),
        useful_life_months: 120,
        pm_frequency_months: 3,
        repair_cost_range: (500.0, 4_000.0),
        pm_cost_range: (300.0, 1_200.0),
        manufacturers: &["Draeger", "GE Healthcare", "Mindray"],
        models: &["Perseus A500", "Aisys CS2", "WATO EX-65"],
    },
    ClassSpec {
        class: "c_arm",
        count: 30,
        cost_range: (100_000.0, 300_000.0),
        useful_life_months: 96,
        pm_frequency_months: 3,
        repair_cost_range: (1_000.0, 8_000.0),
        pm_cost_range: (500.0, 2_000.0),
        manufacturers: &["GE Healthcare", "Siemens Healthineers", "Philips Healthcare"],
        models: &["OEC 3D", "Cios Alpha", "Zenition 50"],
    },
];

const FACILITIES: &[&str] = &["FAC-001", "FAC-002", "FAC-003"];

const DEPARTMENTS: &[&str] = &[
    "Radiology",
    "ICU",
    "Emergency",
    "Surgery",
    "Cardiology",
    "Neonatal",
    "Pulmonology",
    "General Medicine",
    "Orthopedics",
    "Anesthesiology",
];

const ISO_PROVIDERS: &[&str] = &["Aramark", "TRIMEDX", "Sodexo HTM", "Agiliti"];

const ROOT_CAUSES: &[&str] = &[
    "Normal wear",
    "Component fatigue",
    "Electrical fault",
    "Software error",
    "Calibration drift",
    "User error",
    "Power surge",
    "Fluid leak",
    "Mechanical failure",
    "Sensor degradation",
];

const PRIORITIES: [WorkOrderPriority; 4] = [
    WorkOrderPriority::Emergency,
    WorkOrderPriority::Urgent,
    WorkOrderPriority::Routine,
    WorkOrderPriority::Scheduled,
];
const PRIORITY_WEIGHTS: [f64; 4] = [0.05, 0.15, 0.50, 0.30];

const TECHNICIANS: [TechnicianType; 3] = [
    TechnicianType::InHouse,
    TechnicianType::Oem,
    TechnicianType::ThirdPartyIso,
];

/// Record counts produced by one generation run
#[derive(Debug, Clone, Copy, Default)]
pub struct FleetCounts {
    pub equipment: usize,
    pub work_orders: usize,
    pub contracts: usize,
    pub pm_schedules: usize,
}

/// Deterministic fleet generator
pub struct FleetGenerator {
    rng: ChaCha8Rng,
    today: NaiveDate,
    history_start: NaiveDate,
    wo_counter: u32,
}

impl FleetGenerator {
    pub fn new(seed: u64, today: NaiveDate) -> Self {
        let history_start = NaiveDate::from_ymd_opt(today.year() - 10, 1, 1)
            .expect("January 1 is always valid");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            today,
            history_start,
            wo_counter: 0,
        }
    }

    /// Generate the full fixture fleet into a store
    pub fn populate(&mut self, store: &mut dyn EquipmentStore) -> Result<FleetCounts, AnalyticsError> {
        let mut counts = FleetCounts::default();
        let mut asset_counter = 0u32;

        for spec in CLASS_SPECS {
            for _ in 0..spec.count {
                asset_counter += 1;
                let eq = self.generate_asset(store, spec, asset_counter)?;

                counts.equipment += 1;
                counts.work_orders += self.generate_work_orders(store, spec, &eq)?;
                counts.contracts += self.generate_contracts(store, &eq)?;
                counts.pm_schedules += self.generate_pm_schedules(store, spec, eq.id)?;
            }
        }

        log::info!(
            "generated fleet: {} assets, {} work orders, {} contracts, {} PM schedules",
            counts.equipment,
            counts.work_orders,
            counts.contracts,
            counts.pm_schedules
        );
        Ok(counts)
    }

    fn generate_asset(
        &mut self,
        store: &mut dyn EquipmentStore,
        spec: &ClassSpec,
        counter: u32,
    ) -> Result<EquipmentRegistry, AnalyticsError> {
        let age_years: f64 = self.rng.gen_range(0.0..15.0);
        let mut acquisition_date = self.today - Duration::days((age_years * 365.25) as i64);
        if acquisition_date < self.history_start {
            let offset = self.rng.gen_range(0..365);
            acquisition_date = self.history_start + Duration::days(offset);
        }

        let acquisition_cost = self.rng.gen_range(spec.cost_range.0..spec.cost_range.1);
        let manufacturer = *spec.manufacturers.choose(&mut self.rng).expect("non-empty");
        let model = *spec.models.choose(&mut self.rng).expect("non-empty");

        let installation_date = acquisition_date + Duration::days(self.rng.gen_range(7..=90));
        let warranty_years: i64 = *[1, 2, 3].choose(&mut self.rng).expect("non-empty");
        let warranty_expiration = acquisition_date + Duration::days(365 * warranty_years);

        let age_months = (age_years * 12.0) as u32;
        let status = if age_months > spec.useful_life_months + 36 {
            *[
                EquipmentStatus::Active,
                EquipmentStatus::Active,
                EquipmentStatus::Inactive,
                EquipmentStatus::PendingReplacement,
            ]
            .choose(&mut self.rng)
            .expect("non-empty")
        } else if age_months > spec.useful_life_months {
            *[
                EquipmentStatus::Active,
                EquipmentStatus::Active,
                EquipmentStatus::PendingReplacement,
            ]
            .choose(&mut self.rng)
            .expect("non-empty")
        } else {
            EquipmentStatus::Active
        };

        let serial = format!(
            "SN-{}{}",
            &manufacturer[..2].to_uppercase(),
            self.rng.gen_range(100_000..1_000_000)
        );

        let mut eq = EquipmentRegistry {
            id: 0,
            asset_tag: format!("EQ-{}-{:04}", acquisition_date.year(), counter),
            serial_number: Some(serial),
            equipment_class: spec.class.to_string(),
            manufacturer: Some(manufacturer.to_string()),
            model_name: Some(model.to_string()),
            facility_id: FACILITIES.choose(&mut self.rng).expect("non-empty").to_string(),
            department: Some(DEPARTMENTS.choose(&mut self.rng).expect("non-empty").to_string()),
            acquisition_date,
            acquisition_cost: (acquisition_cost * 100.0).round() / 100.0,
            installation_date: Some(installation_date),
            warranty_expiration: Some(warranty_expiration),
            useful_life_months: Some(spec.useful_life_months),
            status,
            disposition_date: None,
            disposition_method: None,
        };
        eq.id = store.insert_equipment(eq.clone())?;
        Ok(eq)
    }

    /// Annual corrective repair rate following a bathtub shape
    fn bathtub_repair_rate(&mut self, age_years: f64) -> f64 {
        if age_years < 1.0 {
            self.rng.gen_range(0.5..1.5)
        } else if age_years < 7.0 {
            self.rng.gen_range(0.3..0.8)
        } else {
            (1.0 + 0.3 * (age_years - 7.0)).min(4.0)
        }
    }

    /// Repair cost with age-based escalation
    fn escalated_cost(&mut self, base_min: f64, base_max: f64, age_years: f64) -> f64 {
        let base = self.rng.gen_range(base_min..base_max);
        let factor = (1.0 + 0.08 * age_years).powf(1.5);
        (base * factor * 100.0).round() / 100.0
    }

    /// Parts escalate faster than labor
    fn escalated_parts_cost(&mut self, base: f64, age_years: f64) -> f64 {
        let factor = (1.0 + 0.12 * age_years).powf(1.3);
        (base * factor * 100.0).round() / 100.0
    }

    fn next_wo_number(&mut self) -> String {
        self.wo_counter += 1;
        format!("WO-{:07}", self.wo_counter)
    }

    fn generate_work_orders(
        &mut self,
        store: &mut dyn EquipmentStore,
        spec: &ClassSpec,
        eq: &EquipmentRegistry,
    ) -> Result<usize, AnalyticsError> {
        let mut written = 0;
        let start = eq
            .installation_date
            .unwrap_or(eq.acquisition_date)
            .max(self.history_start);

        // Scheduled PM visits at the class cadence
        let mut pm_date = start + Duration::days(spec.pm_frequency_months as i64 * 30);
        while pm_date <= self.today {
            let service_fee = self.rng.gen_range(spec.pm_cost_range.0..spec.pm_cost_range.1);
            let service_fee = (service_fee * 100.0).round() / 100.0;
            let parts = (service_fee * self.rng.gen_range(0.1..0.4) * 100.0).round() / 100.0;
            let labor_hours = (self.rng.gen_range(1.0..8.0) * 100.0_f64).round() / 100.0;
            let labor_cost =
                (labor_hours * self.rng.gen_range(75.0..150.0) * 100.0).round() / 100.0;
            let total = labor_cost + parts + service_fee;

            let wo_type = *[
                WorkOrderType::PreventiveMaintenance,
                WorkOrderType::SafetyInspection,
                WorkOrderType::Calibration,
            ]
            .choose(&mut self.rng)
            .expect("non-empty");

            store.insert_work_order(WorkOrder {
                id: 0,
                equipment_id: eq.id,
                wo_number: self.next_wo_number(),
                wo_type,
                priority: WorkOrderPriority::Scheduled,
                opened_date: pm_date,
                completed_date: Some(pm_date + Duration::days(self.rng.gen_range(0..=2))),
                description: Some(format!("Scheduled {} maintenance", spec.class)),
                root_cause: None,
                labor_hours: Some(labor_hours),
                labor_cost: Some(labor_cost),
                parts_cost: Some(parts),
                vendor_service_cost: Some(service_fee),
                total_cost: Some(total),
                downtime_hours: Some((self.rng.gen_range(1.0..8.0) * 100.0_f64).round() / 100.0),
                technician_type: *TECHNICIANS.choose(&mut self.rng).expect("non-empty"),
            })?;
            written += 1;
            pm_date += Duration::days(spec.pm_frequency_months as i64 * 30);
        }

        // Corrective repairs following the bathtub failure rate
        let priority_dist =
            WeightedIndex::new(PRIORITY_WEIGHTS).expect("static weights are valid");
        let mut current = start;
        loop {
            let age_years = (current - eq.acquisition_date).num_days() as f64 / 365.25;
            let annual_rate = self.bathtub_repair_rate(age_years);
            let days_to_next = (365.25 / annual_rate.max(0.1)) as i64;
            let jitter = self.rng.gen_range(-60..=60);
            current += Duration::days((days_to_next + jitter).max(30));
            if current > self.today {
                break;
            }

            let age_at_repair = (current - eq.acquisition_date).num_days() as f64 / 365.25;
            let labor_cost = self.escalated_cost(
                spec.repair_cost_range.0 / 3.0,
                spec.repair_cost_range.1 / 3.0,
                age_at_repair,
            );
            let parts_base = self
                .rng
                .gen_range(spec.repair_cost_range.0 * 0.3..spec.repair_cost_range.1 * 0.5);
            let parts_cost = self.escalated_parts_cost(parts_base, age_at_repair);
            let vendor_cost = if self.rng.gen_bool(0.3) {
                (self.rng.gen_range(500.0..spec.repair_cost_range.1.max(501.0)) * 100.0).round()
                    / 100.0
            } else {
                0.0
            };
            let total = labor_cost + parts_cost + vendor_cost;

            let priority = PRIORITIES[priority_dist.sample(&mut self.rng)];
            let downtime = if priority == WorkOrderPriority::Emergency {
                self.rng.gen_range(4.0..168.0)
            } else {
                self.rng.gen_range(2.0..72.0)
            };

            let root_cause = if self.rng.gen_bool(0.9) {
                Some(ROOT_CAUSES.choose(&mut self.rng).expect("non-empty").to_string())
            } else {
                None
            };

            store.insert_work_order(WorkOrder {
                id: 0,
                equipment_id: eq.id,
                wo_number: self.next_wo_number(),
                wo_type: WorkOrderType::CorrectiveRepair,
                priority,
                opened_date: current,
                completed_date: Some(current + Duration::days(self.rng.gen_range(0..=14))),
                description: Some(format!("Corrective repair for {}", spec.class)),
                root_cause,
                labor_hours: Some((self.rng.gen_range(2.0..24.0) * 100.0_f64).round() / 100.0),
                labor_cost: Some(labor_cost),
                parts_cost: Some(parts_cost),
                vendor_service_cost: Some(vendor_cost),
                total_cost: Some(total),
                downtime_hours: Some((downtime * 100.0_f64).round() / 100.0),
                technician_type: *TECHNICIANS.choose(&mut self.rng).expect("non-empty"),
            })?;
            written += 1;
        }

        Ok(written)
    }

    fn generate_contracts(
        &mut self,
        store: &mut dyn EquipmentStore,
        eq: &EquipmentRegistry,
    ) -> Result<usize, AnalyticsError> {
        let age_years = (self.today - eq.acquisition_date).num_days() as f64 / 365.25;
        let oem = eq.manufacturer.clone().unwrap_or_else(|| "OEM".to_string());

        let plans: Vec<(ContractType, String)> = if age_years <= 3.0 {
            vec![(ContractType::FullService, oem)]
        } else if age_years <= 7.0 {
            if self.rng.gen_bool(0.6) {
                vec![
                    (ContractType::FullService, oem),
                    (
                        ContractType::PreventiveOnly,
                        ISO_PROVIDERS.choose(&mut self.rng).expect("non-empty").to_string(),
                    ),
                ]
            } else {
                vec![(
                    ContractType::PartsOnly,
                    ISO_PROVIDERS.choose(&mut self.rng).expect("non-empty").to_string(),
                )]
            }
        } else if self.rng.gen_bool(0.3) {
            // Oldest assets sometimes run on in-house effort alone
            return Ok(0);
        } else {
            let contract_type = *[ContractType::TimeAndMaterials, ContractType::PerCall]
                .choose(&mut self.rng)
                .expect("non-empty");
            vec![(
                contract_type,
                ISO_PROVIDERS.choose(&mut self.rng).expect("non-empty").to_string(),
            )]
        };

        let mut written = 0;
        for (contract_type, provider) in plans {
            let fraction_range = match contract_type {
                ContractType::FullService => (0.08, 0.12),
                ContractType::PreventiveOnly => (0.03, 0.05),
                ContractType::PartsOnly => (0.02, 0.04),
                ContractType::TimeAndMaterials => (0.01, 0.02),
                ContractType::PerCall => (0.005, 0.015),
            };
            let annual_cost = eq.acquisition_cost
                * self.rng.gen_range(fraction_range.0..fraction_range.1);

            let start = eq
                .warranty_expiration
                .unwrap_or(eq.acquisition_date + Duration::days(365));
            let term_years: i64 = *[1, 2, 3].choose(&mut self.rng).expect("non-empty");
            let end = start + Duration::days(365 * term_years);

            store.insert_contract(ServiceContract {
                id: 0,
                equipment_id: eq.id,
                contract_type,
                provider: Some(provider),
                annual_cost: Some((annual_cost * 100.0).round() / 100.0),
                start_date: Some(start),
                end_date: Some(end),
                includes_parts: matches!(
                    contract_type,
                    ContractType::FullService | ContractType::PartsOnly
                ),
                includes_labor: matches!(contract_type, ContractType::FullService),
                includes_pm: matches!(
                    contract_type,
                    ContractType::FullService | ContractType::PreventiveOnly
                ),
                response_time_hours: Some(*[2, 4, 8, 24].choose(&mut self.rng).expect("non-empty")),
                uptime_guarantee_pct: if contract_type == ContractType::FullService {
                    Some((self.rng.gen_range(95.0..99.5) * 100.0_f64).round() / 100.0)
                } else {
                    None
                },
            })?;
            written += 1;
        }

        Ok(written)
    }

    fn generate_pm_schedules(
        &mut self,
        store: &mut dyn EquipmentStore,
        spec: &ClassSpec,
        equipment_id: EquipmentId,
    ) -> Result<usize, AnalyticsError> {
        // Base cadence plus an annual PM where the base is more frequent
        let mut frequencies = vec![spec.pm_frequency_months];
        if spec.pm_frequency_months != 12 {
            frequencies.push(12);
        }

        let mut written = 0;
        for frequency in frequencies {
            let pm_type = match frequency {
                1 => "monthly_inspection".to_string(),
                3 => "quarterly_calibration".to_string(),
                6 => "semi_annual_pm".to_string(),
                12 => "annual_pm".to_string(),
                other => format!("every_{}_months", other),
            };

            let last_completed =
                self.today - Duration::days(self.rng.gen_range(1..=frequency as i64 * 30));
            let next_due = last_completed + Duration::days(frequency as i64 * 30);

            store.insert_pm_schedule(PmSchedule {
                id: 0,
                equipment_id,
                pm_type,
                frequency_months: frequency,
                estimated_duration_hours: Some(
                    (self.rng.gen_range(1.0..8.0) * 10.0_f64).round() / 10.0,
                ),
                estimated_cost: Some(
                    (self.rng.gen_range(spec.pm_cost_range.0..spec.pm_cost_range.1) * 100.0)
                        .round()
                        / 100.0,
                ),
                last_completed: Some(last_completed),
                next_due: Some(next_due),
            })?;
            written += 1;
        }

        Ok(written)
    }
}

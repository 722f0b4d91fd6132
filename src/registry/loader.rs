//! CSV ingestion and export for the fleet input entities
//!
//! Input files reference assets by `asset_tag`; store ids are assigned at
//! insert time, so loaders return records still tagged with the asset tag
//! they belong to.

use super::{
    ContractType, EquipmentRegistry, EquipmentStatus, PmSchedule, ServiceContract,
    TechnicianType, WorkOrder, WorkOrderPriority, WorkOrderType,
};
use chrono::NaiveDate;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading fleet CSV files
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid {record}: {reason}")]
    Invalid { record: String, reason: String },
}

/// A dependent record still keyed by its parent's asset tag
#[derive(Debug, Clone)]
pub struct Tagged<T> {
    pub asset_tag: String,
    pub record: T,
}

/// Raw CSV row for equipment.csv
#[derive(Debug, Serialize, Deserialize)]
struct EquipmentCsv {
    asset_tag: String,
    serial_number: Option<String>,
    equipment_class: String,
    manufacturer: Option<String>,
    model_name: Option<String>,
    facility_id: String,
    department: Option<String>,
    acquisition_date: NaiveDate,
    acquisition_cost: f64,
    installation_date: Option<NaiveDate>,
    warranty_expiration: Option<NaiveDate>,
    useful_life_months: Option<u32>,
    status: EquipmentStatus,
    disposition_date: Option<NaiveDate>,
    disposition_method: Option<String>,
}

impl EquipmentCsv {
    fn into_entity(self) -> EquipmentRegistry {
        EquipmentRegistry {
            id: 0,
            asset_tag: self.asset_tag,
            serial_number: self.serial_number,
            equipment_class: self.equipment_class,
            manufacturer: self.manufacturer,
            model_name: self.model_name,
            facility_id: self.facility_id,
            department: self.department,
            acquisition_date: self.acquisition_date,
            acquisition_cost: self.acquisition_cost,
            installation_date: self.installation_date,
            warranty_expiration: self.warranty_expiration,
            useful_life_months: self.useful_life_months,
            status: self.status,
            disposition_date: self.disposition_date,
            disposition_method: self.disposition_method,
        }
    }

    fn from_entity(eq: &EquipmentRegistry) -> Self {
        Self {
            asset_tag: eq.asset_tag.clone(),
            serial_number: eq.serial_number.clone(),
            equipment_class: eq.equipment_class.clone(),
            manufacturer: eq.manufacturer.clone(),
            model_name: eq.model_name.clone(),
            facility_id: eq.facility_id.clone(),
            department: eq.department.clone(),
            acquisition_date: eq.acquisition_date,
            acquisition_cost: eq.acquisition_cost,
            installation_date: eq.installation_date,
            warranty_expiration: eq.warranty_expiration,
            useful_life_months: eq.useful_life_months,
            status: eq.status,
            disposition_date: eq.disposition_date,
            disposition_method: eq.disposition_method.clone(),
        }
    }
}

/// Raw CSV row for work_orders.csv
#[derive(Debug, Serialize, Deserialize)]
struct WorkOrderCsv {
    wo_number: String,
    asset_tag: String,
    wo_type: WorkOrderType,
    priority: WorkOrderPriority,
    opened_date: NaiveDate,
    completed_date: Option<NaiveDate>,
    description: Option<String>,
    root_cause: Option<String>,
    labor_hours: Option<f64>,
    labor_cost: Option<f64>,
    parts_cost: Option<f64>,
    vendor_service_cost: Option<f64>,
    total_cost: Option<f64>,
    downtime_hours: Option<f64>,
    technician_type: TechnicianType,
}

impl WorkOrderCsv {
    fn into_tagged(self) -> Tagged<WorkOrder> {
        Tagged {
            asset_tag: self.asset_tag,
            record: WorkOrder {
                id: 0,
                equipment_id: 0,
                wo_number: self.wo_number,
                wo_type: self.wo_type,
                priority: self.priority,
                opened_date: self.opened_date,
                completed_date: self.completed_date,
                description: self.description,
                root_cause: self.root_cause,
                labor_hours: self.labor_hours,
                labor_cost: self.labor_cost,
                parts_cost: self.parts_cost,
                vendor_service_cost: self.vendor_service_cost,
                total_cost: self.total_cost,
                downtime_hours: self.downtime_hours,
                technician_type: self.technician_type,
            },
        }
    }

    fn from_tagged(asset_tag: &str, wo: &WorkOrder) -> Self {
        Self {
            wo_number: wo.wo_number.clone(),
            asset_tag: asset_tag.to_string(),
            wo_type: wo.wo_type,
            priority: wo.priority,
            opened_date: wo.opened_date,
            completed_date: wo.completed_date,
            description: wo.description.clone(),
            root_cause: wo.root_cause.clone(),
            labor_hours: wo.labor_hours,
            labor_cost: wo.labor_cost,
            parts_cost: wo.parts_cost,
            vendor_service_cost: wo.vendor_service_cost,
            total_cost: wo.total_cost,
            downtime_hours: wo.downtime_hours,
            technician_type: wo.technician_type,
        }
    }
}

/// Raw CSV row for contracts.csv
#[derive(Debug, Serialize, Deserialize)]
struct ContractCsv {
    asset_tag: String,
    contract_type: ContractType,
    provider: Option<String>,
    annual_cost: Option<f64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    includes_parts: bool,
    includes_labor: bool,
    includes_pm: bool,
    response_time_hours: Option<u32>,
    uptime_guarantee_pct: Option<f64>,
}

impl ContractCsv {
    fn into_tagged(self) -> Tagged<ServiceContract> {
        Tagged {
            asset_tag: self.asset_tag,
            record: ServiceContract {
                id: 0,
                equipment_id: 0,
                contract_type: self.contract_type,
                provider: self.provider,
                annual_cost: self.annual_cost,
                start_date: self.start_date,
                end_date: self.end_date,
                includes_parts: self.includes_parts,
                includes_labor: self.includes_labor,
                includes_pm: self.includes_pm,
                response_time_hours: self.response_time_hours,
                uptime_guarantee_pct: self.uptime_guarantee_pct,
            },
        }
    }

    fn from_tagged(asset_tag: &str, c: &ServiceContract) -> Self {
        Self {
            asset_tag: asset_tag.to_string(),
            contract_type: c.contract_type,
            provider: c.provider.clone(),
            annual_cost: c.annual_cost,
            start_date: c.start_date,
            end_date: c.end_date,
            includes_parts: c.includes_parts,
            includes_labor: c.includes_labor,
            includes_pm: c.includes_pm,
            response_time_hours: c.response_time_hours,
            uptime_guarantee_pct: c.uptime_guarantee_pct,
        }
    }
}

/// Raw CSV row for pm_schedules.csv
#[derive(Debug, Serialize, Deserialize)]
struct PmScheduleCsv {
    asset_tag: String,
    pm_type: String,
    frequency_months: u32,
    estimated_duration_hours: Option<f64>,
    estimated_cost: Option<f64>,
    last_completed: Option<NaiveDate>,
    next_due: Option<NaiveDate>,
}

impl PmScheduleCsv {
    fn into_tagged(self) -> Tagged<PmSchedule> {
        Tagged {
            asset_tag: self.asset_tag,
            record: PmSchedule {
                id: 0,
                equipment_id: 0,
                pm_type: self.pm_type,
                frequency_months: self.frequency_months,
                estimated_duration_hours: self.estimated_duration_hours,
                estimated_cost: self.estimated_cost,
                last_completed: self.last_completed,
                next_due: self.next_due,
            },
        }
    }

    fn from_tagged(asset_tag: &str, pm: &PmSchedule) -> Self {
        Self {
            asset_tag: asset_tag.to_string(),
            pm_type: pm.pm_type.clone(),
            frequency_months: pm.frequency_months,
            estimated_duration_hours: pm.estimated_duration_hours,
            estimated_cost: pm.estimated_cost,
            last_completed: pm.last_completed,
            next_due: pm.next_due,
        }
    }
}

/// Load and validate registry entries from any reader
pub fn load_equipment_from_reader<R: Read>(reader: R) -> Result<Vec<EquipmentRegistry>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut equipment = Vec::new();

    for result in csv_reader.deserialize() {
        let row: EquipmentCsv = result?;
        let entity = row.into_entity();
        entity.validate().map_err(|reason| LoadError::Invalid {
            record: format!("equipment {}", entity.asset_tag),
            reason,
        })?;
        equipment.push(entity);
    }

    Ok(equipment)
}

/// Load and validate work orders from any reader
pub fn load_work_orders_from_reader<R: Read>(reader: R) -> Result<Vec<Tagged<WorkOrder>>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut orders = Vec::new();

    for result in csv_reader.deserialize() {
        let row: WorkOrderCsv = result?;
        let tagged = row.into_tagged();
        tagged.record.validate().map_err(|reason| LoadError::Invalid {
            record: format!("work order {}", tagged.record.wo_number),
            reason,
        })?;
        orders.push(tagged);
    }

    Ok(orders)
}

/// Load and validate service contracts from any reader
pub fn load_contracts_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<Tagged<ServiceContract>>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut contracts = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ContractCsv = result?;
        let tagged = row.into_tagged();
        tagged.record.validate().map_err(|reason| LoadError::Invalid {
            record: format!("contract for {}", tagged.asset_tag),
            reason,
        })?;
        contracts.push(tagged);
    }

    Ok(contracts)
}

/// Load PM schedules from any reader
pub fn load_pm_schedules_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<Tagged<PmSchedule>>, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut schedules = Vec::new();

    for result in csv_reader.deserialize() {
        let row: PmScheduleCsv = result?;
        schedules.push(row.into_tagged());
    }

    Ok(schedules)
}

/// Load registry entries from a CSV file
pub fn load_equipment<P: AsRef<Path>>(path: P) -> Result<Vec<EquipmentRegistry>, LoadError> {
    load_equipment_from_reader(std::fs::File::open(path)?)
}

/// Load work orders from a CSV file
pub fn load_work_orders<P: AsRef<Path>>(path: P) -> Result<Vec<Tagged<WorkOrder>>, LoadError> {
    load_work_orders_from_reader(std::fs::File::open(path)?)
}

/// Load service contracts from a CSV file
pub fn load_contracts<P: AsRef<Path>>(path: P) -> Result<Vec<Tagged<ServiceContract>>, LoadError> {
    load_contracts_from_reader(std::fs::File::open(path)?)
}

/// Load PM schedules from a CSV file
pub fn load_pm_schedules<P: AsRef<Path>>(path: P) -> Result<Vec<Tagged<PmSchedule>>, LoadError> {
    load_pm_schedules_from_reader(std::fs::File::open(path)?)
}

/// Write registry entries as equipment.csv
pub fn write_equipment<W: Write>(writer: W, equipment: &[EquipmentRegistry]) -> Result<(), LoadError> {
    let mut csv_writer = Writer::from_writer(writer);
    for eq in equipment {
        csv_writer.serialize(EquipmentCsv::from_entity(eq))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write work orders as work_orders.csv
pub fn write_work_orders<'a, W, I>(writer: W, orders: I) -> Result<(), LoadError>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a WorkOrder)>,
{
    let mut csv_writer = Writer::from_writer(writer);
    for (tag, wo) in orders {
        csv_writer.serialize(WorkOrderCsv::from_tagged(tag, wo))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write service contracts as contracts.csv
pub fn write_contracts<'a, W, I>(writer: W, contracts: I) -> Result<(), LoadError>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a ServiceContract)>,
{
    let mut csv_writer = Writer::from_writer(writer);
    for (tag, c) in contracts {
        csv_writer.serialize(ContractCsv::from_tagged(tag, c))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write PM schedules as pm_schedules.csv
pub fn write_pm_schedules<'a, W, I>(writer: W, schedules: I) -> Result<(), LoadError>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a PmSchedule)>,
{
    let mut csv_writer = Writer::from_writer(writer);
    for (tag, pm) in schedules {
        csv_writer.serialize(PmScheduleCsv::from_tagged(tag, pm))?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EQUIPMENT_CSV: &str = "\
asset_tag,serial_number,equipment_class,manufacturer,model_name,facility_id,department,acquisition_date,acquisition_cost,installation_date,warranty_expiration,useful_life_months,status,disposition_date,disposition_method
EQ-2018-0001,SN-GE100001,ct_scanner,GE Healthcare,Revolution CT,FAC-001,Radiology,2018-03-15,1200000.00,2018-04-20,2020-03-15,120,active,,
EQ-2021-0002,,infusion_pump,Mindray,BeneFusion SP5,FAC-002,ICU,2021-06-01,5400.00,,,84,pending_replacement,,
";

    const WORK_ORDERS_CSV: &str = "\
wo_number,asset_tag,wo_type,priority,opened_date,completed_date,description,root_cause,labor_hours,labor_cost,parts_cost,vendor_service_cost,total_cost,downtime_hours,technician_type
WO-0000001,EQ-2018-0001,corrective_repair,emergency,2024-02-10,2024-02-13,Tube failure,Component fatigue,16.0,2400.00,11000.00,0.00,13400.00,52.0,oem
WO-0000002,EQ-2018-0001,preventive_maintenance,scheduled,2024-03-01,2024-03-01,Quarterly PM,,4.0,480.00,130.00,0.00,610.00,4.0,in_house
";

    #[test]
    fn test_load_equipment() {
        let equipment = load_equipment_from_reader(EQUIPMENT_CSV.as_bytes()).unwrap();
        assert_eq!(equipment.len(), 2);

        let ct = &equipment[0];
        assert_eq!(ct.asset_tag, "EQ-2018-0001");
        assert_eq!(ct.equipment_class, "ct_scanner");
        assert_eq!(ct.status, EquipmentStatus::Active);
        assert_eq!(ct.useful_life_months, Some(120));

        let pump = &equipment[1];
        assert_eq!(pump.serial_number, None);
        assert_eq!(pump.installation_date, None);
        assert_eq!(pump.status, EquipmentStatus::PendingReplacement);
    }

    #[test]
    fn test_load_work_orders() {
        let orders = load_work_orders_from_reader(WORK_ORDERS_CSV.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].asset_tag, "EQ-2018-0001");
        assert_eq!(orders[0].record.wo_type, WorkOrderType::CorrectiveRepair);
        assert_eq!(orders[0].record.total_cost, Some(13_400.0));
        assert_eq!(orders[1].record.priority, WorkOrderPriority::Scheduled);
    }

    #[test]
    fn test_invalid_cost_sum_rejected() {
        let bad = "\
wo_number,asset_tag,wo_type,priority,opened_date,completed_date,description,root_cause,labor_hours,labor_cost,parts_cost,vendor_service_cost,total_cost,downtime_hours,technician_type
WO-0000009,EQ-2018-0001,corrective_repair,urgent,2024-02-10,,,,1.0,100.00,100.00,0.00,999.00,1.0,in_house
";
        let err = load_work_orders_from_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
    }

    #[test]
    fn test_equipment_round_trip() {
        let equipment = load_equipment_from_reader(EQUIPMENT_CSV.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_equipment(&mut buf, &equipment).unwrap();
        let reloaded = load_equipment_from_reader(buf.as_slice()).unwrap();
        assert_eq!(reloaded.len(), equipment.len());
        assert_eq!(reloaded[0].asset_tag, equipment[0].asset_tag);
        assert_eq!(reloaded[1].acquisition_cost, equipment[1].acquisition_cost);
    }
}

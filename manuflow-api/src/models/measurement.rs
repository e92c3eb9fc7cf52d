use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{measurement_devices, measurement_entries};

text_enum! {
    pub enum DeviceKind {
        Water => "WATER",
        Energy => "ENERGY",
        Gas => "GAS",
    }
}

impl DeviceKind {
    pub fn default_unit(&self) -> &'static str {
        match self {
            DeviceKind::Water | DeviceKind::Gas => "m3",
            DeviceKind::Energy => "kWh",
        }
    }
}

/// A utility meter read periodically by technicians
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = measurement_devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct MeasurementDevice {
    pub id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub name: String,
    pub kind: DeviceKind,
    pub unit: String,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = measurement_devices)]
pub struct NewMeasurementDevice {
    pub company_id: i32,
    pub contract_id: i32,
    pub name: String,
    pub kind: DeviceKind,
    pub unit: String,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct MeasurementDeviceInput {
    pub contract_id: i32,
    pub name: String,
    pub kind: DeviceKind,
    pub unit: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
}

#[derive(AsChangeset, Debug, Default, Deserialize, Serialize, TS)]
#[diesel(table_name = measurement_devices)]
#[ts(export)]
pub struct MeasurementDeviceChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub serial_number: Option<String>,
    pub location: Option<String>,
    pub active: Option<bool>,
    #[serde(skip)]
    #[ts(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

/// A single cumulative meter reading
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(MeasurementDevice, foreign_key = device_id))]
#[diesel(table_name = measurement_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct MeasurementEntry {
    pub id: i32,
    pub device_id: i32,
    pub value: f64,
    #[ts(type = "string")]
    pub reading_at: NaiveDateTime,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub created_by: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = measurement_entries)]
pub struct NewMeasurementEntry {
    pub device_id: i32,
    pub value: f64,
    pub reading_at: NaiveDateTime,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct MeasurementEntryInput {
    pub value: f64,
    #[ts(type = "string | null")]
    pub reading_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

/// Reading plus the consumption since the previous reading of the same device
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MeasurementEntryWithConsumption {
    #[serde(flatten)]
    pub entry: MeasurementEntry,
    pub consumption: Option<f64>,
}

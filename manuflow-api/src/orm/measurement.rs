use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::{
    MeasurementDevice, MeasurementDeviceChanges, MeasurementDeviceInput, MeasurementEntry,
    MeasurementEntryInput, MeasurementEntryWithConsumption, NewMeasurementDevice,
    NewMeasurementEntry,
};
use crate::orm::db::{last_insert_id, now};
use crate::schema::{measurement_devices, measurement_entries};
use crate::tenancy::{ContractScope, apply_scope};

pub fn insert_device(
    conn: &mut SqliteConnection,
    company_id: i32,
    input: MeasurementDeviceInput,
) -> QueryResult<MeasurementDevice> {
    let timestamp = now();
    let unit = input
        .unit
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| input.kind.default_unit().to_string());
    diesel::insert_into(measurement_devices::table)
        .values(&NewMeasurementDevice {
            company_id,
            contract_id: input.contract_id,
            name: input.name.trim().to_string(),
            kind: input.kind,
            unit,
            serial_number: input.serial_number,
            location: input.location,
            active: true,
            created_at: timestamp,
            updated_at: timestamp,
        })
        .execute(conn)?;
    let device_id = last_insert_id(conn)?;
    measurement_devices::table
        .find(device_id)
        .select(MeasurementDevice::as_select())
        .first(conn)
}

pub fn get_device(conn: &mut SqliteConnection, device_id: i32) -> QueryResult<Option<MeasurementDevice>> {
    measurement_devices::table
        .filter(measurement_devices::id.eq(device_id))
        .filter(measurement_devices::deleted_at.is_null())
        .select(MeasurementDevice::as_select())
        .first(conn)
        .optional()
}

pub fn list_devices(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    contract_id: Option<i32>,
) -> QueryResult<Vec<MeasurementDevice>> {
    let mut query = measurement_devices::table
        .filter(measurement_devices::deleted_at.is_null())
        .select(MeasurementDevice::as_select())
        .into_boxed();
    query = apply_scope!(
        query,
        scope,
        measurement_devices::company_id,
        measurement_devices::contract_id
    );
    if let Some(contract_id) = contract_id {
        query = query.filter(measurement_devices::contract_id.eq(contract_id));
    }
    query
        .order((measurement_devices::name.asc(), measurement_devices::id.asc()))
        .load(conn)
}

pub fn update_device(
    conn: &mut SqliteConnection,
    device_id: i32,
    mut changes: MeasurementDeviceChanges,
) -> QueryResult<MeasurementDevice> {
    changes.updated_at = Some(now());
    diesel::update(measurement_devices::table.find(device_id))
        .set(&changes)
        .execute(conn)?;
    measurement_devices::table
        .find(device_id)
        .select(MeasurementDevice::as_select())
        .first(conn)
}

pub fn soft_delete_device(conn: &mut SqliteConnection, device_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        measurement_devices::table
            .filter(measurement_devices::id.eq(device_id))
            .filter(measurement_devices::deleted_at.is_null()),
    )
    .set((
        measurement_devices::deleted_at.eq(Some(timestamp)),
        measurement_devices::active.eq(false),
        measurement_devices::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}

/// Reading just before `at`, or at the same time. Readings taken at the
/// same time sort by id, so an equal time counts as earlier.
pub fn previous_entry(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: NaiveDateTime,
) -> QueryResult<Option<MeasurementEntry>> {
    measurement_entries::table
        .filter(measurement_entries::device_id.eq(device_id))
        .filter(measurement_entries::reading_at.le(at))
        .order((
            measurement_entries::reading_at.desc(),
            measurement_entries::id.desc(),
        ))
        .select(MeasurementEntry::as_select())
        .first(conn)
        .optional()
}

/// Reading just after `at`.
pub fn next_entry(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: NaiveDateTime,
) -> QueryResult<Option<MeasurementEntry>> {
    measurement_entries::table
        .filter(measurement_entries::device_id.eq(device_id))
        .filter(measurement_entries::reading_at.gt(at))
        .order((
            measurement_entries::reading_at.asc(),
            measurement_entries::id.asc(),
        ))
        .select(MeasurementEntry::as_select())
        .first(conn)
        .optional()
}

/// Readings in chronological order, each with the consumption since the
/// previous one. The first reading has no consumption.
pub fn list_entries(
    conn: &mut SqliteConnection,
    device_id: i32,
) -> QueryResult<Vec<MeasurementEntryWithConsumption>> {
    let entries: Vec<MeasurementEntry> = measurement_entries::table
        .filter(measurement_entries::device_id.eq(device_id))
        .order((
            measurement_entries::reading_at.asc(),
            measurement_entries::id.asc(),
        ))
        .select(MeasurementEntry::as_select())
        .load(conn)?;
    Ok(with_consumption(entries))
}

fn with_consumption(entries: Vec<MeasurementEntry>) -> Vec<MeasurementEntryWithConsumption> {
    let mut previous: Option<f64> = None;
    entries
        .into_iter()
        .map(|entry| {
            let consumption = previous.map(|p| entry.value - p);
            previous = Some(entry.value);
            MeasurementEntryWithConsumption { entry, consumption }
        })
        .collect()
}

/// A reading that would make the counter go backwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingOutOfOrder {
    /// Lower than the reading taken before it.
    BelowPrevious(f64),
    /// Higher than a reading taken after it.
    AboveNext(f64),
}

impl std::fmt::Display for ReadingOutOfOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingOutOfOrder::BelowPrevious(v) => {
                write!(f, "Reading is lower than the previous reading ({})", v)
            }
            ReadingOutOfOrder::AboveNext(v) => {
                write!(f, "Reading is higher than a later reading ({})", v)
            }
        }
    }
}

/// Stores a reading. Meters are cumulative, so the value must sit between
/// the readings taken just before and just after it.
pub fn insert_entry(
    conn: &mut SqliteConnection,
    device_id: i32,
    created_by: Option<i32>,
    input: MeasurementEntryInput,
) -> QueryResult<Result<MeasurementEntry, ReadingOutOfOrder>> {
    conn.transaction(|conn| {
        let timestamp = now();
        let reading_at = input.reading_at.unwrap_or(timestamp);
        if let Some(previous) = previous_entry(conn, device_id, reading_at)? {
            if input.value < previous.value {
                return Ok(Err(ReadingOutOfOrder::BelowPrevious(previous.value)));
            }
        }
        if let Some(next) = next_entry(conn, device_id, reading_at)? {
            if input.value > next.value {
                return Ok(Err(ReadingOutOfOrder::AboveNext(next.value)));
            }
        }
        diesel::insert_into(measurement_entries::table)
            .values(&NewMeasurementEntry {
                device_id,
                value: input.value,
                reading_at,
                notes: input.notes,
                created_by,
                created_at: timestamp,
            })
            .execute(conn)?;
        let entry_id = last_insert_id(conn)?;
        measurement_entries::table
            .find(entry_id)
            .select(MeasurementEntry::as_select())
            .first(conn)
            .map(Ok)
    })
}

pub fn get_entry(conn: &mut SqliteConnection, entry_id: i32) -> QueryResult<Option<MeasurementEntry>> {
    measurement_entries::table
        .find(entry_id)
        .select(MeasurementEntry::as_select())
        .first(conn)
        .optional()
}

pub fn set_entry_photo(
    conn: &mut SqliteConnection,
    entry_id: i32,
    photo_url: String,
) -> QueryResult<MeasurementEntry> {
    diesel::update(measurement_entries::table.find(entry_id))
        .set(measurement_entries::photo_url.eq(Some(photo_url)))
        .execute(conn)?;
    measurement_entries::table
        .find(entry_id)
        .select(MeasurementEntry::as_select())
        .first(conn)
}

/// Hard delete; later readings are then checked against the one before.
pub fn delete_entry(conn: &mut SqliteConnection, entry_id: i32) -> QueryResult<bool> {
    let rows = diesel::delete(measurement_entries::table.find(entry_id)).execute(conn)?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceKind;
    use crate::orm::testing::{insert_test_company, insert_test_contract, setup_test_db};
    use chrono::NaiveDate;

    fn at(day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn reading(value: f64, day: u32) -> MeasurementEntryInput {
        MeasurementEntryInput {
            value,
            reading_at: Some(at(day)),
            notes: None,
        }
    }

    fn device(conn: &mut SqliteConnection) -> MeasurementDevice {
        let acme = insert_test_company(conn, "Acme");
        let tower = insert_test_contract(conn, acme.id, "Tower");
        insert_device(
            conn,
            acme.id,
            MeasurementDeviceInput {
                contract_id: tower.id,
                name: "Main water".to_string(),
                kind: DeviceKind::Water,
                unit: None,
                serial_number: None,
                location: None,
            },
        )
        .expect("device")
    }

    #[test]
    fn test_default_unit_from_kind() {
        let mut conn = setup_test_db();
        let d = device(&mut conn);
        assert_eq!(d.unit, "m3");
        assert!(d.active);
    }

    #[test]
    fn test_entries_are_monotonic_with_consumption() {
        let mut conn = setup_test_db();
        let d = device(&mut conn);

        insert_entry(&mut conn, d.id, None, reading(100.0, 1)).expect("db").expect("accepted");
        insert_entry(&mut conn, d.id, None, reading(100.0, 2)).expect("db").expect("equal is fine");
        insert_entry(&mut conn, d.id, None, reading(130.5, 3)).expect("db").expect("accepted");

        let refused = insert_entry(&mut conn, d.id, None, reading(120.0, 4)).expect("db");
        assert_eq!(refused.unwrap_err(), ReadingOutOfOrder::BelowPrevious(130.5));

        let entries = list_entries(&mut conn, d.id).expect("list");
        let consumption: Vec<Option<f64>> = entries.iter().map(|e| e.consumption).collect();
        assert_eq!(consumption, vec![None, Some(0.0), Some(30.5)]);
    }

    #[test]
    fn test_backdated_reading_must_fit_between_neighbours() {
        let mut conn = setup_test_db();
        let d = device(&mut conn);
        insert_entry(&mut conn, d.id, None, reading(100.0, 1)).expect("db").expect("accepted");
        insert_entry(&mut conn, d.id, None, reading(130.0, 3)).expect("db").expect("accepted");

        let too_high = insert_entry(&mut conn, d.id, None, reading(200.0, 2)).expect("db");
        assert_eq!(too_high.unwrap_err(), ReadingOutOfOrder::AboveNext(130.0));
        let too_low = insert_entry(&mut conn, d.id, None, reading(90.0, 2)).expect("db");
        assert_eq!(too_low.unwrap_err(), ReadingOutOfOrder::BelowPrevious(100.0));

        insert_entry(&mut conn, d.id, None, reading(115.0, 2)).expect("db").expect("fits");
        let consumption: Vec<Option<f64>> = list_entries(&mut conn, d.id)
            .expect("list")
            .iter()
            .map(|e| e.consumption)
            .collect();
        assert_eq!(consumption, vec![None, Some(15.0), Some(15.0)]);
    }

    #[test]
    fn test_delete_entry_unblocks_lower_reading() {
        let mut conn = setup_test_db();
        let d = device(&mut conn);
        insert_entry(&mut conn, d.id, None, reading(10.0, 1)).expect("db").expect("accepted");
        let typo = insert_entry(&mut conn, d.id, None, reading(1000.0, 2))
            .expect("db")
            .expect("accepted");
        assert!(insert_entry(&mut conn, d.id, None, reading(12.0, 3)).expect("db").is_err());

        assert!(delete_entry(&mut conn, typo.id).expect("delete"));
        insert_entry(&mut conn, d.id, None, reading(12.0, 3)).expect("db").expect("accepted");
    }

    #[test]
    fn test_soft_deleted_device_is_hidden() {
        let mut conn = setup_test_db();
        let d = device(&mut conn);
        let scope = ContractScope::Company(d.company_id);
        assert_eq!(list_devices(&mut conn, &scope, None).expect("list").len(), 1);
        soft_delete_device(&mut conn, d.id).expect("delete");
        assert!(get_device(&mut conn, d.id).expect("get").is_none());
        assert!(list_devices(&mut conn, &scope, None).expect("list").is_empty());
    }
}

//! Meter endpoints: water, energy and gas measurement devices and their
//! readings.
//!
//! Readings are cumulative counter values. Consumption is derived on read
//! as the difference to the previous reading, so a value that would make
//! the counter go backwards is refused.
//!
//! # Authorization Rules
//! - Anyone authenticated reads devices and readings on visible contracts
//!   and records new readings there
//! - Managers and supervisors maintain the devices
//! - Only managers delete readings

use diesel::SqliteConnection;
use rocket::Route;
use rocket::State;
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::api::FileUpload;
use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{
    MeasurementDevice, MeasurementDeviceChanges, MeasurementDeviceInput, MeasurementEntry,
    MeasurementEntryInput, MeasurementEntryWithConsumption, User,
};
use crate::orm::DbConn;
use crate::orm::measurement::{
    delete_entry, get_device, get_entry, insert_device, insert_entry, list_devices, list_entries,
    set_entry_photo, soft_delete_device, update_device,
};
use crate::session_guards::{AuthenticatedUser, ManagerUser};
use crate::storage::BlobStorage;
use crate::tenancy::{ContractScope, ensure_row_access, load_editable_contract};

fn load_visible_device(
    conn: &mut SqliteConnection,
    user: &User,
    device_id: i32,
) -> ApiResult<MeasurementDevice> {
    let device =
        get_device(conn, device_id)?.ok_or_else(|| ApiError::not_found("Measurement device not found"))?;
    ensure_row_access(conn, user, device.company_id, device.contract_id, "Measurement device")?;
    Ok(device)
}

/// Loads a reading through its device, hiding readings of invisible ones.
fn load_visible_entry(
    conn: &mut SqliteConnection,
    user: &User,
    entry_id: i32,
) -> ApiResult<(MeasurementEntry, MeasurementDevice)> {
    let entry = get_entry(conn, entry_id)?.ok_or_else(|| ApiError::not_found("Reading not found"))?;
    let device = get_device(conn, entry.device_id)?.ok_or_else(|| ApiError::not_found("Reading not found"))?;
    ensure_row_access(conn, user, device.company_id, device.contract_id, "Reading")?;
    Ok((entry, device))
}

/// List Measurement Devices endpoint.
///
/// - **URL:** `/api/1/measurement-devices[?contract_id=<id>]`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/measurement-devices?<contract_id>")]
pub async fn list_devices_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: Option<i32>,
) -> ApiResult<Json<Vec<MeasurementDevice>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_devices(conn, &scope, contract_id)?))
    })
    .await
}

/// Create Measurement Device endpoint.
///
/// - **URL:** `/api/1/measurement-devices`
/// - **Method:** `POST`
/// - **Authorization:** Managers and supervisors on the target contract
///
/// # Request Format
///
/// ```json
/// { "contract_id": 1, "name": "Main water meter", "kind": "WATER", "serial_number": "WM-2231" }
/// ```
///
/// `unit` defaults to `m3` for WATER and GAS and `kWh` for ENERGY.
#[post("/1/measurement-devices", data = "<input>")]
pub async fn create_device(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<MeasurementDeviceInput>,
) -> ApiResult<status::Created<Json<MeasurementDevice>>> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Device name is required"));
    }
    let device = db
        .run(move |conn| -> ApiResult<MeasurementDevice> {
            let contract = load_editable_contract(conn, &auth_user.user, input.contract_id)?;
            let device = insert_device(conn, contract.company_id, input)?;
            info!(
                "[measurements] '{}' created {} device {} ('{}')",
                auth_user.user.email, device.kind, device.id, device.name
            );
            Ok(device)
        })
        .await?;
    let location = format!("/api/1/measurement-devices/{}", device.id);
    Ok(status::Created::new(location).body(Json(device)))
}

/// Get Measurement Device endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/measurement-devices/<device_id>")]
pub async fn get_device_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    device_id: i32,
) -> ApiResult<Json<MeasurementDevice>> {
    db.run(move |conn| load_visible_device(conn, &auth_user.user, device_id).map(Json))
        .await
}

/// Update Measurement Device endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Partial update; `active: false` retires the device while
///   keeping its history visible
/// - **Authorization:** Managers and supervisors on the device's contract
#[put("/1/measurement-devices/<device_id>", data = "<changes>")]
pub async fn update_device_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    device_id: i32,
    changes: LoggedJson<MeasurementDeviceChanges>,
) -> ApiResult<Json<MeasurementDevice>> {
    let mut changes = changes.into_inner();
    if changes.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Device name cannot be empty"));
    }
    changes.name = changes.name.map(|n| n.trim().to_string());
    db.run(move |conn| {
        let device = load_visible_device(conn, &auth_user.user, device_id)?;
        load_editable_contract(conn, &auth_user.user, device.contract_id)?;
        Ok(Json(update_device(conn, device.id, changes)?))
    })
    .await
}

/// Delete Measurement Device endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the device
/// - **Authorization:** Managers and supervisors on the device's contract
#[delete("/1/measurement-devices/<device_id>")]
pub async fn delete_device(db: DbConn, auth_user: AuthenticatedUser, device_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let device = load_visible_device(conn, &auth_user.user, device_id)?;
        load_editable_contract(conn, &auth_user.user, device.contract_id)?;
        soft_delete_device(conn, device.id)?;
        warn!("[measurements] '{}' deleted device {}", auth_user.user.email, device.id);
        Ok(Status::NoContent)
    })
    .await
}

/// List Readings endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>/entries`
/// - **Method:** `GET`
/// - **Purpose:** Readings in chronological order, each with the
///   `consumption` since the previous one (`null` for the first)
/// - **Authentication:** Required
#[get("/1/measurement-devices/<device_id>/entries")]
pub async fn list_entries_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    device_id: i32,
) -> ApiResult<Json<Vec<MeasurementEntryWithConsumption>>> {
    db.run(move |conn| {
        let device = load_visible_device(conn, &auth_user.user, device_id)?;
        Ok(Json(list_entries(conn, device.id)?))
    })
    .await
}

/// Record Reading endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>/entries`
/// - **Method:** `POST`
/// - **Authentication:** Required; the device must be on a visible contract
///
/// # Request Format
///
/// ```json
/// { "value": 10452.5, "reading_at": "2025-03-01T08:00:00", "notes": "Read by the gate" }
/// ```
///
/// `reading_at` defaults to now. A value below the reading taken before it,
/// or above one taken after it, answers HTTP 400, as does a reading for a
/// retired device.
#[post("/1/measurement-devices/<device_id>/entries", data = "<input>")]
pub async fn create_entry(
    db: DbConn,
    auth_user: AuthenticatedUser,
    device_id: i32,
    input: LoggedJson<MeasurementEntryInput>,
) -> ApiResult<status::Created<Json<MeasurementEntry>>> {
    let input = input.into_inner();
    if !input.value.is_finite() || input.value < 0.0 {
        return Err(ApiError::bad_request("Reading must be a non-negative number"));
    }
    let entry = db
        .run(move |conn| -> ApiResult<MeasurementEntry> {
            let device = load_visible_device(conn, &auth_user.user, device_id)?;
            if !device.active {
                return Err(ApiError::bad_request("Device is inactive"));
            }
            let entry = insert_entry(conn, device.id, Some(auth_user.user.id), input)?.map_err(|out_of_order| ApiError::bad_request(out_of_order.to_string()))?;
            info!(
                "[measurements] '{}' recorded {} {} on device {}",
                auth_user.user.email, entry.value, device.unit, device.id
            );
            Ok(entry)
        })
        .await?;
    let location = format!("/api/1/measurement-devices/{}/entries", device_id);
    Ok(status::Created::new(location).body(Json(entry)))
}

/// Upload Meter Photo endpoint.
///
/// - **URL:** `/api/1/measurement-devices/<device_id>/entries/<entry_id>/photo`
/// - **Method:** `POST`
/// - **Purpose:** Attaches a photo of the meter display to a reading
/// - **Authentication:** Required; the device must be on a visible contract
///
/// The body is `multipart/form-data` with a single `file` field.
#[post("/1/measurement-devices/<device_id>/entries/<entry_id>/photo", data = "<upload>")]
pub async fn upload_entry_photo(
    db: DbConn,
    auth_user: AuthenticatedUser,
    storage: &State<BlobStorage>,
    device_id: i32,
    entry_id: i32,
    mut upload: Form<FileUpload<'_>>,
) -> ApiResult<Json<MeasurementEntry>> {
    let user = auth_user.user.clone();
    db.run(move |conn| -> ApiResult<()> {
        let (entry, _) = load_visible_entry(conn, &user, entry_id)?;
        if entry.device_id != device_id {
            return Err(ApiError::not_found("Reading not found"));
        }
        Ok(())
    })
    .await?;

    let name = upload.original_name();
    let blob = storage.0.store(&mut upload.file, name.as_deref()).await?;

    db.run(move |conn| {
        let entry = set_entry_photo(conn, entry_id, blob.url)?;
        info!(
            "[measurements] '{}' attached photo {} to reading {}",
            auth_user.user.email, blob.key, entry.id
        );
        Ok(Json(entry))
    })
    .await
}

/// Delete Reading endpoint.
///
/// - **URL:** `/api/1/measurement-entries/<entry_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Removes a mistaken reading for good
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN
#[delete("/1/measurement-entries/<entry_id>")]
pub async fn delete_entry_endpoint(db: DbConn, manager: ManagerUser, entry_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let (entry, device) = load_visible_entry(conn, &manager.user, entry_id)?;
        delete_entry(conn, entry.id)?;
        warn!(
            "[measurements] '{}' deleted reading {} ({}) of device {}",
            manager.user.email, entry.id, entry.value, device.id
        );
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_devices_endpoint,
        create_device,
        get_device_endpoint,
        update_device_endpoint,
        delete_device,
        list_entries_endpoint,
        create_entry,
        upload_entry_photo,
        delete_entry_endpoint
    ]
}

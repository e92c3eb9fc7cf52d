//! Report (laudo) endpoints.
//!
//! Reports are technical compliance documents with an optional expiration
//! date. They move freely across the kanban columns; the expiration batch
//! in [`crate::api::cron`] flips overdue ones to EXPIRED.
//!
//! # Authorization Rules
//! - Anyone authenticated reads the reports of contracts they can see
//! - Managers and supervisors create, edit, move, attach files and delete

use chrono::{Duration, Utc};
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
    Report, ReportChanges, ReportColumn, ReportInput, ReportStatus, ReportStatusInput, User,
};
use crate::orm::DbConn;
use crate::orm::asset::get_asset;
use crate::orm::report::{
    ReportFilter, get_report, insert_report, list_reports, report_kanban, set_report_file,
    set_report_status, soft_delete_report, update_report,
};
use crate::session_guards::AuthenticatedUser;
use crate::storage::BlobStorage;
use crate::tenancy::{ContractScope, ensure_row_access, load_editable_contract};

fn load_visible_report(conn: &mut SqliteConnection, user: &User, report_id: i32) -> ApiResult<Report> {
    let report = get_report(conn, report_id)?.ok_or_else(|| ApiError::not_found("Report not found"))?;
    ensure_row_access(conn, user, report.company_id, report.contract_id, "Report")?;
    Ok(report)
}

fn load_editable_report(conn: &mut SqliteConnection, user: &User, report_id: i32) -> ApiResult<Report> {
    let report = load_visible_report(conn, user, report_id)?;
    load_editable_contract(conn, user, report.contract_id)?;
    Ok(report)
}

fn ensure_asset_on_contract(
    conn: &mut SqliteConnection,
    asset_id: Option<i32>,
    contract_id: i32,
) -> ApiResult<()> {
    if let Some(asset_id) = asset_id {
        if !get_asset(conn, asset_id)?.is_some_and(|a| a.contract_id == contract_id) {
            return Err(ApiError::bad_request("Asset is not on the report's contract"));
        }
    }
    Ok(())
}

/// List Reports endpoint.
///
/// - **URL:** `/api/1/reports[?contract_id=<id>&status=<status>&expiring_within_days=<n>]`
/// - **Method:** `GET`
/// - **Purpose:** Live reports on visible contracts, soonest expiration
///   first
/// - **Authentication:** Required
///
/// `expiring_within_days` keeps reports whose expiration date is on or
/// before today plus `n` days, already expired ones included.
#[get("/1/reports?<contract_id>&<status>&<expiring_within_days>")]
pub async fn list_reports_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: Option<i32>,
    status: Option<&str>,
    expiring_within_days: Option<i64>,
) -> ApiResult<Json<Vec<Report>>> {
    let status = status
        .map(|s| s.parse::<ReportStatus>())
        .transpose()
        .map_err(|_| ApiError::bad_request("Invalid status"))?;
    if expiring_within_days.is_some_and(|d| d < 0) {
        return Err(ApiError::bad_request("expiring_within_days cannot be negative"));
    }
    let filter = ReportFilter {
        contract_id,
        status,
        expires_by: expiring_within_days.map(|d| Utc::now().date_naive() + Duration::days(d)),
    };
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_reports(conn, &scope, &filter)?))
    })
    .await
}

/// Report Kanban endpoint.
///
/// - **URL:** `/api/1/reports/kanban`
/// - **Method:** `GET`
/// - **Purpose:** Visible reports grouped into one column per status, in
///   board order, empty columns included
/// - **Authentication:** Required
#[get("/1/reports/kanban")]
pub async fn report_kanban_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
) -> ApiResult<Json<Vec<ReportColumn>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(report_kanban(conn, &scope)?))
    })
    .await
}

/// Create Report endpoint.
///
/// - **URL:** `/api/1/reports`
/// - **Method:** `POST`
/// - **Authorization:** Managers and supervisors on the target contract
///
/// # Request Format
///
/// ```json
/// {
///   "contract_id": 1,
///   "title": "AVCB fire safety certificate",
///   "report_type": "AVCB",
///   "issuer": "Fire Department",
///   "issue_date": "2025-01-10",
///   "expiration_date": "2026-01-10"
/// }
/// ```
///
/// New reports start as DRAFT unless `status` is given.
#[post("/1/reports", data = "<input>")]
pub async fn create_report(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<ReportInput>,
) -> ApiResult<status::Created<Json<Report>>> {
    let input = input.into_inner();
    if input.title.trim().is_empty() {
        return Err(ApiError::bad_request("Report title is required"));
    }
    let report = db
        .run(move |conn| -> ApiResult<Report> {
            let contract = load_editable_contract(conn, &auth_user.user, input.contract_id)?;
            ensure_asset_on_contract(conn, input.asset_id, contract.id)?;
            let report = insert_report(conn, contract.company_id, Some(auth_user.user.id), input)?;
            info!(
                "[reports] '{}' created report {} ('{}')",
                auth_user.user.email, report.id, report.title
            );
            Ok(report)
        })
        .await?;
    let location = format!("/api/1/reports/{}", report.id);
    Ok(status::Created::new(location).body(Json(report)))
}

/// Get Report endpoint.
///
/// - **URL:** `/api/1/reports/<report_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/reports/<report_id>")]
pub async fn get_report_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    report_id: i32,
) -> ApiResult<Json<Report>> {
    db.run(move |conn| load_visible_report(conn, &auth_user.user, report_id).map(Json))
        .await
}

/// Update Report endpoint.
///
/// - **URL:** `/api/1/reports/<report_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Partial update of the report's fields
/// - **Authorization:** Managers and supervisors on the report's contract
#[put("/1/reports/<report_id>", data = "<changes>")]
pub async fn update_report_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    report_id: i32,
    changes: LoggedJson<ReportChanges>,
) -> ApiResult<Json<Report>> {
    let changes = changes.into_inner();
    if changes.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("Report title cannot be empty"));
    }
    db.run(move |conn| {
        let report = load_editable_report(conn, &auth_user.user, report_id)?;
        ensure_asset_on_contract(conn, changes.asset_id, report.contract_id)?;
        Ok(Json(update_report(conn, report.id, changes)?))
    })
    .await
}

/// Move Report endpoint.
///
/// - **URL:** `/api/1/reports/<report_id>/status`
/// - **Method:** `PATCH`
/// - **Purpose:** Kanban move; any column may follow any other
/// - **Authorization:** Managers and supervisors on the report's contract
///
/// # Request Format
///
/// ```json
/// { "status": "PENDING_APPROVAL" }
/// ```
#[patch("/1/reports/<report_id>/status", data = "<input>")]
pub async fn move_report(
    db: DbConn,
    auth_user: AuthenticatedUser,
    report_id: i32,
    input: LoggedJson<ReportStatusInput>,
) -> ApiResult<Json<Report>> {
    let status = input.into_inner().status;
    db.run(move |conn| {
        let report = load_editable_report(conn, &auth_user.user, report_id)?;
        let moved = set_report_status(conn, report.id, status)?;
        info!(
            "[reports] '{}' moved report {} from {} to {}",
            auth_user.user.email, report.id, report.status, moved.status
        );
        Ok(Json(moved))
    })
    .await
}

/// Upload Report File endpoint.
///
/// - **URL:** `/api/1/reports/<report_id>/file`
/// - **Method:** `POST`
/// - **Purpose:** Stores the signed document and points `file_url` at it,
///   replacing any earlier file
/// - **Authorization:** Managers and supervisors on the report's contract
///
/// The body is `multipart/form-data` with a single `file` field.
#[post("/1/reports/<report_id>/file", data = "<upload>")]
pub async fn upload_report_file(
    db: DbConn,
    auth_user: AuthenticatedUser,
    storage: &State<BlobStorage>,
    report_id: i32,
    mut upload: Form<FileUpload<'_>>,
) -> ApiResult<Json<Report>> {
    let user = auth_user.user.clone();
    db.run(move |conn| load_editable_report(conn, &user, report_id))
        .await?;

    let name = upload.original_name();
    let blob = storage.0.store(&mut upload.file, name.as_deref()).await?;

    db.run(move |conn| {
        let report = set_report_file(conn, report_id, blob.url)?;
        info!(
            "[reports] '{}' attached {} to report {}",
            auth_user.user.email, blob.key, report.id
        );
        Ok(Json(report))
    })
    .await
}

/// Delete Report endpoint.
///
/// - **URL:** `/api/1/reports/<report_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the report
/// - **Authorization:** Managers and supervisors on the report's contract
#[delete("/1/reports/<report_id>")]
pub async fn delete_report(db: DbConn, auth_user: AuthenticatedUser, report_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let report = load_editable_report(conn, &auth_user.user, report_id)?;
        soft_delete_report(conn, report.id)?;
        warn!("[reports] '{}' deleted report {}", auth_user.user.email, report.id);
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_reports_endpoint,
        report_kanban_endpoint,
        create_report,
        get_report_endpoint,
        update_report_endpoint,
        move_report,
        upload_report_file,
        delete_report
    ]
}

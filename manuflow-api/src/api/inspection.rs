//! Ad-hoc inspection endpoints.
//!
//! An inspection is a one-off walk through an asset's checklist. Steps run
//! through the same state machine as rondas: a step save starts a pending
//! inspection, completion requires every step done, and a completed
//! inspection is frozen.

use diesel::SqliteConnection;
use rocket::Route;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::api::asset::load_visible_asset;
use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{Inspection, InspectionInput, InspectionWithSteps, StepUpdateInput, User};
use crate::orm::DbConn;
use crate::orm::asset::{get_script, get_script_steps};
use crate::orm::inspection::{
    complete_inspection, create_inspection, get_inspection, get_inspection_with_steps,
    inspection_contract_id, list_inspections, update_inspection_step,
};
use crate::session_guards::AuthenticatedUser;
use crate::tenancy::{ContractScope, ensure_row_access};

fn load_visible_inspection(
    conn: &mut SqliteConnection,
    user: &User,
    inspection_id: i32,
) -> ApiResult<Inspection> {
    let inspection = get_inspection(conn, inspection_id)?
        .ok_or_else(|| ApiError::not_found("Inspection not found"))?;
    let contract_id = inspection_contract_id(conn, &inspection)?;
    ensure_row_access(conn, user, inspection.company_id, contract_id, "Inspection")?;
    Ok(inspection)
}

/// Start Inspection endpoint.
///
/// - **URL:** `/api/1/inspections`
/// - **Method:** `POST`
/// - **Purpose:** Opens an inspection of an asset, performed by the caller
/// - **Authentication:** Required; the asset must be on a visible contract
///
/// # Request Format
///
/// ```json
/// { "asset_id": 3, "script_id": 7, "notes": "Noise reported by tenant" }
/// ```
///
/// The script's steps are copied in order. Without `script_id` the
/// inspection gets a single generic step. A script of another asset answers
/// HTTP 400.
#[post("/1/inspections", data = "<input>")]
pub async fn start_inspection(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<InspectionInput>,
) -> ApiResult<status::Created<Json<InspectionWithSteps>>> {
    let input = input.into_inner();
    let inspection = db
        .run(move |conn| -> ApiResult<InspectionWithSteps> {
            let asset = load_visible_asset(conn, &auth_user.user, input.asset_id)?;
            let script = match input.script_id {
                Some(script_id) => {
                    let script = get_script(conn, script_id)?
                        .filter(|s| s.asset_id == asset.id)
                        .ok_or_else(|| ApiError::bad_request("Script does not belong to this asset"))?;
                    Some((script.id, get_script_steps(conn, script.id)?))
                }
                None => None,
            };
            let inspection = create_inspection(
                conn,
                asset.company_id,
                asset.id,
                script,
                auth_user.user.id,
                input.notes,
            )?;
            info!(
                "[inspections] '{}' opened inspection {} of asset {}",
                auth_user.user.email, inspection.inspection.id, asset.id
            );
            Ok(inspection)
        })
        .await?;
    let location = format!("/api/1/inspections/{}", inspection.inspection.id);
    Ok(status::Created::new(location).body(Json(inspection)))
}

/// List Inspections endpoint.
///
/// - **URL:** `/api/1/inspections[?asset_id=<id>]`
/// - **Method:** `GET`
/// - **Purpose:** Inspections on visible contracts, newest first
/// - **Authentication:** Required
#[get("/1/inspections?<asset_id>")]
pub async fn list_inspections_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    asset_id: Option<i32>,
) -> ApiResult<Json<Vec<Inspection>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_inspections(conn, &scope, asset_id)?))
    })
    .await
}

/// Get Inspection endpoint.
///
/// - **URL:** `/api/1/inspections/<inspection_id>`
/// - **Method:** `GET`
/// - **Purpose:** The inspection with its ordered steps and the index of the
///   first step not completed (`null` once all are done)
/// - **Authentication:** Required
#[get("/1/inspections/<inspection_id>")]
pub async fn get_inspection_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    inspection_id: i32,
) -> ApiResult<Json<InspectionWithSteps>> {
    db.run(move |conn| {
        let inspection = load_visible_inspection(conn, &auth_user.user, inspection_id)?;
        get_inspection_with_steps(conn, inspection.id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Inspection not found"))
    })
    .await
}

/// Update Inspection Step endpoint.
///
/// - **URL:** `/api/1/inspections/<inspection_id>/steps/<step_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Saves a step's status and notes
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// { "status": "COMPLETED", "notes": "Oil level ok" }
/// ```
///
/// HTTP 404 when the step is not part of the inspection, HTTP 409 once the
/// inspection is completed.
#[put("/1/inspections/<inspection_id>/steps/<step_id>", data = "<input>")]
pub async fn update_inspection_step_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    inspection_id: i32,
    step_id: i32,
    input: LoggedJson<StepUpdateInput>,
) -> ApiResult<Json<InspectionWithSteps>> {
    let input = input.into_inner();
    db.run(move |conn| {
        let inspection = load_visible_inspection(conn, &auth_user.user, inspection_id)?;
        Ok(Json(update_inspection_step(conn, &inspection, step_id, input)?))
    })
    .await
}

/// Complete Inspection endpoint.
///
/// - **URL:** `/api/1/inspections/<inspection_id>/complete`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// HTTP 409 while any step is not COMPLETED or when already completed.
#[post("/1/inspections/<inspection_id>/complete")]
pub async fn complete_inspection_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    inspection_id: i32,
) -> ApiResult<Json<InspectionWithSteps>> {
    db.run(move |conn| {
        let inspection = load_visible_inspection(conn, &auth_user.user, inspection_id)?;
        let done = complete_inspection(conn, &inspection)?;
        info!("[inspections] '{}' completed inspection {}", auth_user.user.email, inspection.id);
        Ok(Json(done))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        start_inspection,
        list_inspections_endpoint,
        get_inspection_endpoint,
        update_inspection_step_endpoint,
        complete_inspection_endpoint
    ]
}

//! Ronda endpoints: the day's rounds and their step-by-step execution.
//!
//! `GET /1/rondas/today` is where occurrences come from: the first caller
//! to look at a day materializes the occurrence of every schedule due that
//! day, copying its step templates. Later callers read the same rows.

use chrono::{NaiveDate, Utc};
use diesel::SqliteConnection;
use rocket::Route;
use rocket::serde::json::Json;

use crate::error::{ApiError, ApiResult, parse_date_param};
use crate::logged_json::LoggedJson;
use crate::models::{RondaDetail, ScheduledInspection, StepUpdateInput, User, WorkStatus};
use crate::orm::DbConn;
use crate::orm::ronda::{
    RondaFilter, RondaViewer, can_open_ronda, complete_ronda, get_ronda, list_rondas, materialize_for_date,
    ronda_detail, start_ronda, update_ronda_step,
};
use crate::session_guards::AuthenticatedUser;
use crate::tenancy::{ContractScope, ensure_row_access};

fn load_visible_ronda(
    conn: &mut SqliteConnection,
    user: &User,
    ronda_id: i32,
) -> ApiResult<ScheduledInspection> {
    let occurrence = get_ronda(conn, ronda_id)?.ok_or_else(|| ApiError::not_found("Ronda not found"))?;
    ensure_row_access(conn, user, occurrence.company_id, occurrence.contract_id, "Ronda")?;
    let viewer = RondaViewer::for_user(conn, user)?;
    if !can_open_ronda(conn, &viewer, &occurrence)? {
        return Err(ApiError::not_found("Ronda not found"));
    }
    Ok(occurrence)
}

fn optional_date(name: &str, value: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    value.map(|v| parse_date_param(name, v)).transpose()
}

/// Today's Rondas endpoint.
///
/// - **URL:** `/api/1/rondas/today[?date=YYYY-MM-DD]`
/// - **Method:** `GET`
/// - **Purpose:** Lists (creating when needed) the occurrences due on the
///   day for the caller
/// - **Authentication:** Required
///
/// Managers see every schedule of their company, supervisors the schedules
/// of their contracts. Technicians see the schedules of their contracts
/// whose category is empty or equals their own; an occurrence a technician
/// causes to be created is assigned to them.
///
/// Occurrences are ordered by shift (MORNING, AFTERNOON, NIGHT), then start
/// time, then schedule name. `date` defaults to the current UTC date.
#[get("/1/rondas/today?<date>")]
pub async fn rondas_today(
    db: DbConn,
    auth_user: AuthenticatedUser,
    date: Option<&str>,
) -> ApiResult<Json<Vec<RondaDetail>>> {
    let day = optional_date("date", date)?.unwrap_or_else(|| Utc::now().date_naive());
    db.run(move |conn| {
        let viewer = RondaViewer::for_user(conn, &auth_user.user)?;
        Ok(Json(materialize_for_date(conn, &viewer, day)?))
    })
    .await
}

/// Ronda History endpoint.
///
/// - **URL:** `/api/1/rondas[?from=YYYY-MM-DD&to=YYYY-MM-DD&status=<status>&contract_id=<id>]`
/// - **Method:** `GET`
/// - **Purpose:** Occurrences already materialized, newest day first
/// - **Authentication:** Required
///
/// Only reads; it never creates occurrences. Technicians only get the
/// rondas of their category or assigned to them.
#[get("/1/rondas?<from>&<to>&<status>&<contract_id>")]
pub async fn ronda_history(
    db: DbConn,
    auth_user: AuthenticatedUser,
    from: Option<&str>,
    to: Option<&str>,
    status: Option<&str>,
    contract_id: Option<i32>,
) -> ApiResult<Json<Vec<RondaDetail>>> {
    let filter = RondaFilter {
        from: optional_date("from", from)?,
        to: optional_date("to", to)?,
        status: status
            .map(|s| s.parse::<WorkStatus>())
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid status"))?,
        contract_id,
        seen_by: None,
    };
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        let filter = RondaFilter {
            seen_by: Some(RondaViewer::for_user(conn, &auth_user.user)?),
            ..filter
        };
        Ok(Json(list_rondas(conn, &scope, &filter)?))
    })
    .await
}

/// Get Ronda endpoint.
///
/// - **URL:** `/api/1/rondas/<ronda_id>`
/// - **Method:** `GET`
/// - **Purpose:** The occurrence with its ordered steps and
///   `current_step_index`, the first step not yet COMPLETED (`null` when
///   every step is done)
/// - **Authentication:** Required
#[get("/1/rondas/<ronda_id>", rank = 2)]
pub async fn get_ronda_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    ronda_id: i32,
) -> ApiResult<Json<RondaDetail>> {
    db.run(move |conn| {
        let occurrence = load_visible_ronda(conn, &auth_user.user, ronda_id)?;
        Ok(Json(ronda_detail(conn, occurrence)?))
    })
    .await
}

/// Start Ronda endpoint.
///
/// - **URL:** `/api/1/rondas/<ronda_id>/start`
/// - **Method:** `POST`
/// - **Purpose:** PENDING to IN_PROGRESS; stamps `started_at` and assigns the
///   caller when nobody is assigned
/// - **Authentication:** Required
///
/// Starting a ronda already IN_PROGRESS is a no-op; HTTP 409 once it is
/// COMPLETED.
#[post("/1/rondas/<ronda_id>/start")]
pub async fn start_ronda_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    ronda_id: i32,
) -> ApiResult<Json<RondaDetail>> {
    db.run(move |conn| {
        let occurrence = load_visible_ronda(conn, &auth_user.user, ronda_id)?;
        let detail = start_ronda(conn, &occurrence, auth_user.user.id)?;
        info!("[rondas] '{}' started ronda {}", auth_user.user.email, ronda_id);
        Ok(Json(detail))
    })
    .await
}

/// Update Ronda Step endpoint.
///
/// - **URL:** `/api/1/rondas/<ronda_id>/steps/<step_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Saves a step's status and notes
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// { "status": "COMPLETED", "notes": "Panel at 41 C" }
/// ```
///
/// The client calls this when moving to the next or previous step and on
/// explicit status changes. A save on a PENDING ronda starts it. Moving a
/// step to COMPLETED stamps its `completed_at`; moving it back clears it.
/// HTTP 404 for a step of another ronda, HTTP 409 once the ronda is
/// COMPLETED.
#[put("/1/rondas/<ronda_id>/steps/<step_id>", data = "<input>")]
pub async fn update_ronda_step_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    ronda_id: i32,
    step_id: i32,
    input: LoggedJson<StepUpdateInput>,
) -> ApiResult<Json<RondaDetail>> {
    let input = input.into_inner();
    db.run(move |conn| {
        let occurrence = load_visible_ronda(conn, &auth_user.user, ronda_id)?;
        Ok(Json(update_ronda_step(conn, &occurrence, step_id, input, auth_user.user.id)?))
    })
    .await
}

/// Complete Ronda endpoint.
///
/// - **URL:** `/api/1/rondas/<ronda_id>/complete`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// HTTP 409 while any step is not COMPLETED or when the ronda is already
/// completed.
#[post("/1/rondas/<ronda_id>/complete")]
pub async fn complete_ronda_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    ronda_id: i32,
) -> ApiResult<Json<RondaDetail>> {
    db.run(move |conn| {
        let occurrence = load_visible_ronda(conn, &auth_user.user, ronda_id)?;
        let detail = complete_ronda(conn, &occurrence)?;
        info!("[rondas] '{}' completed ronda {}", auth_user.user.email, ronda_id);
        Ok(Json(detail))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        rondas_today,
        ronda_history,
        get_ronda_endpoint,
        start_ronda_endpoint,
        update_ronda_step_endpoint,
        complete_ronda_endpoint
    ]
}

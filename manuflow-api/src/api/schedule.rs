//! Inspection schedule endpoints.
//!
//! A schedule describes a recurring ronda: the weekdays it runs on, its
//! shift and start time, an optional technician category and the step
//! templates copied into every occurrence.
//!
//! # Authorization Rules
//! - Anyone authenticated reads the schedules of contracts they can see
//! - Managers and supervisors create, update and delete them

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{
    Contract, InspectionSchedule, ScheduleChanges, ScheduleInput, ScheduleUpdateInput,
    ScheduleWithSteps, StepTemplateInput, User,
};
use crate::orm::DbConn;
use crate::orm::asset::get_asset;
use crate::orm::schedule::{
    get_schedule, get_schedule_with_steps, insert_schedule, list_schedules, soft_delete_schedule,
    update_schedule,
};
use crate::recurrence::{WeekdaySet, normalize_start_time};
use crate::session_guards::AuthenticatedUser;
use crate::tenancy::{ContractScope, ensure_row_access, load_editable_contract};

fn validate_steps(steps: &[StepTemplateInput]) -> ApiResult<()> {
    if steps.is_empty() {
        return Err(ApiError::bad_request("A schedule needs at least one step"));
    }
    if steps.iter().any(|s| s.title.trim().is_empty()) {
        return Err(ApiError::bad_request("Every step needs a title"));
    }
    Ok(())
}

/// Every referenced asset must be live and on the schedule's contract.
fn validate_assets(
    conn: &mut SqliteConnection,
    contract: &Contract,
    asset_id: Option<i32>,
    steps: &[StepTemplateInput],
) -> ApiResult<()> {
    let referenced = asset_id.into_iter().chain(steps.iter().filter_map(|s| s.asset_id));
    for id in referenced {
        let on_contract = get_asset(conn, id)?.is_some_and(|a| a.contract_id == contract.id);
        if !on_contract {
            return Err(ApiError::bad_request(format!(
                "Asset {} is not on contract '{}'",
                id, contract.name
            )));
        }
    }
    Ok(())
}

fn load_visible_schedule(
    conn: &mut SqliteConnection,
    user: &User,
    schedule_id: i32,
) -> ApiResult<InspectionSchedule> {
    let schedule =
        get_schedule(conn, schedule_id)?.ok_or_else(|| ApiError::not_found("Schedule not found"))?;
    ensure_row_access(conn, user, schedule.company_id, schedule.contract_id, "Schedule")?;
    Ok(schedule)
}

/// List Schedules endpoint.
///
/// - **URL:** `/api/1/schedules[?contract_id=<id>&active=<bool>]`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// `active=true` hides paused schedules.
#[get("/1/schedules?<contract_id>&<active>")]
pub async fn list_schedules_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: Option<i32>,
    active: Option<bool>,
) -> ApiResult<Json<Vec<InspectionSchedule>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_schedules(conn, &scope, contract_id, active.unwrap_or(false))?))
    })
    .await
}

/// Create Schedule endpoint.
///
/// - **URL:** `/api/1/schedules`
/// - **Method:** `POST`
/// - **Authorization:** Managers and supervisors on the target contract
///
/// # Request Format
///
/// ```json
/// {
///   "contract_id": 1,
///   "name": "Electrical room walk",
///   "category": "ELECTRICAL",
///   "days_of_week": [1, 3, 5],
///   "shift": "MORNING",
///   "start_time": "07:30",
///   "steps": [
///     { "title": "Read main panel meters" },
///     { "title": "Check transformer temperature", "asset_id": 4 }
///   ]
/// }
/// ```
///
/// Weekdays are ISO numbers (Monday = 1). HTTP 400 for an empty or
/// out-of-range weekday list, a time that is not `HH:MM`, no steps, or an
/// asset that is not on the contract.
#[post("/1/schedules", data = "<input>")]
pub async fn create_schedule(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<ScheduleInput>,
) -> ApiResult<status::Created<Json<ScheduleWithSteps>>> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Schedule name is required"));
    }
    let days = WeekdaySet::new(&input.days_of_week).map_err(ApiError::BadRequest)?;
    let start_time = normalize_start_time(&input.start_time).map_err(ApiError::BadRequest)?;
    validate_steps(&input.steps)?;

    let schedule = db
        .run(move |conn| -> ApiResult<ScheduleWithSteps> {
            let contract = load_editable_contract(conn, &auth_user.user, input.contract_id)?;
            validate_assets(conn, &contract, input.asset_id, &input.steps)?;
            let schedule = insert_schedule(conn, contract.company_id, &input, &days, &start_time)?;
            info!(
                "[schedules] '{}' created schedule {} ('{}') on days {}",
                auth_user.user.email, schedule.schedule.id, schedule.schedule.name, days
            );
            Ok(schedule)
        })
        .await?;
    let location = format!("/api/1/schedules/{}", schedule.schedule.id);
    Ok(status::Created::new(location).body(Json(schedule)))
}

/// Get Schedule endpoint.
///
/// - **URL:** `/api/1/schedules/<schedule_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/schedules/<schedule_id>")]
pub async fn get_schedule_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    schedule_id: i32,
) -> ApiResult<Json<ScheduleWithSteps>> {
    db.run(move |conn| {
        let schedule = load_visible_schedule(conn, &auth_user.user, schedule_id)?;
        get_schedule_with_steps(conn, schedule.id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Schedule not found"))
    })
    .await
}

/// Update Schedule endpoint.
///
/// - **URL:** `/api/1/schedules/<schedule_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Partial update; `active: false` pauses the schedule and
///   `steps` replaces every step template
/// - **Authorization:** Managers and supervisors on the schedule's contract
///
/// Occurrences already generated keep the steps they were created with.
#[put("/1/schedules/<schedule_id>", data = "<input>")]
pub async fn update_schedule_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    schedule_id: i32,
    input: LoggedJson<ScheduleUpdateInput>,
) -> ApiResult<Json<ScheduleWithSteps>> {
    let input = input.into_inner();
    if input.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Schedule name cannot be empty"));
    }
    let days = input
        .days_of_week
        .as_deref()
        .map(WeekdaySet::new)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let start_time = input
        .start_time
        .as_deref()
        .map(normalize_start_time)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    if let Some(steps) = &input.steps {
        validate_steps(steps)?;
    }

    db.run(move |conn| {
        let schedule = load_visible_schedule(conn, &auth_user.user, schedule_id)?;
        let contract = load_editable_contract(conn, &auth_user.user, schedule.contract_id)?;
        validate_assets(conn, &contract, input.asset_id, input.steps.as_deref().unwrap_or(&[]))?;
        let changes = ScheduleChanges {
            asset_id: input.asset_id,
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            category: input.category,
            days_of_week: days.map(|d| d.to_string()),
            shift: input.shift,
            start_time,
            active: input.active,
            updated_at: None,
        };
        let updated = update_schedule(conn, schedule.id, changes, input.steps.as_deref())?;
        info!("[schedules] '{}' updated schedule {}", auth_user.user.email, schedule.id);
        Ok(Json(updated))
    })
    .await
}

/// Delete Schedule endpoint.
///
/// - **URL:** `/api/1/schedules/<schedule_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the schedule; no further rondas are generated
///   and past occurrences stay in the history
/// - **Authorization:** Managers and supervisors on the schedule's contract
#[delete("/1/schedules/<schedule_id>")]
pub async fn delete_schedule(
    db: DbConn,
    auth_user: AuthenticatedUser,
    schedule_id: i32,
) -> ApiResult<Status> {
    db.run(move |conn| {
        let schedule = load_visible_schedule(conn, &auth_user.user, schedule_id)?;
        load_editable_contract(conn, &auth_user.user, schedule.contract_id)?;
        soft_delete_schedule(conn, schedule.id)?;
        info!("[schedules] '{}' deleted schedule {}", auth_user.user.email, schedule.id);
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_schedules_endpoint,
        create_schedule,
        get_schedule_endpoint,
        update_schedule_endpoint,
        delete_schedule
    ]
}

//! Asset and inspection script endpoints.
//!
//! # Authorization Rules
//! - Anyone authenticated reads the assets of contracts they can see
//! - Managers and supervisors create, update and delete assets and their
//!   scripts on those contracts

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{
    Asset, AssetChanges, AssetInput, AssetScript, AssetScriptInput, AssetScriptWithSteps, User,
};
use crate::orm::DbConn;
use crate::orm::asset::{
    AssetFilter, get_asset, get_script, get_script_with_steps, insert_asset, insert_script,
    list_assets, list_scripts, replace_script, soft_delete_asset, soft_delete_script,
    update_asset,
};
use crate::session_guards::AuthenticatedUser;
use crate::tenancy::{ContractScope, ensure_row_access, load_accessible_contract, load_editable_contract};

/// Loads a live asset on a contract the user can see.
pub(crate) fn load_visible_asset(
    conn: &mut SqliteConnection,
    user: &User,
    asset_id: i32,
) -> ApiResult<Asset> {
    let asset = get_asset(conn, asset_id)?.ok_or_else(|| ApiError::not_found("Asset not found"))?;
    ensure_row_access(conn, user, asset.company_id, asset.contract_id, "Asset")?;
    Ok(asset)
}

fn load_editable_asset(conn: &mut SqliteConnection, user: &User, asset_id: i32) -> ApiResult<Asset> {
    let asset = load_visible_asset(conn, user, asset_id)?;
    load_editable_contract(conn, user, asset.contract_id)?;
    Ok(asset)
}

/// Loads a live script together with the asset it belongs to.
fn load_visible_script(
    conn: &mut SqliteConnection,
    user: &User,
    script_id: i32,
) -> ApiResult<(AssetScript, Asset)> {
    let script = get_script(conn, script_id)?.ok_or_else(|| ApiError::not_found("Script not found"))?;
    let asset = get_asset(conn, script.asset_id)?.ok_or_else(|| ApiError::not_found("Script not found"))?;
    ensure_row_access(conn, user, asset.company_id, asset.contract_id, "Script")?;
    Ok((script, asset))
}

fn validate_script(input: &AssetScriptInput) -> ApiResult<()> {
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Script name is required"));
    }
    if input.steps.is_empty() {
        return Err(ApiError::bad_request("A script needs at least one step"));
    }
    if input.steps.iter().any(|s| s.title.trim().is_empty()) {
        return Err(ApiError::bad_request("Every step needs a title"));
    }
    Ok(())
}

/// List Assets endpoint.
///
/// - **URL:** `/api/1/assets[?contract_id=<id>&category=<category>]`
/// - **Method:** `GET`
/// - **Purpose:** Lists live assets on the contracts visible to the caller
/// - **Authentication:** Required
///
/// `category` matches case-insensitively.
#[get("/1/assets?<contract_id>&<category>")]
pub async fn list_assets_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: Option<i32>,
    category: Option<String>,
) -> ApiResult<Json<Vec<Asset>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        let filter = AssetFilter {
            contract_id,
            category,
        };
        Ok(Json(list_assets(conn, &scope, &filter)?))
    })
    .await
}

/// Contract Assets endpoint.
///
/// - **URL:** `/api/1/contracts/<contract_id>/assets`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Same rules as reading the contract itself: HTTP 404 across companies,
/// HTTP 403 on an unassigned contract.
#[get("/1/contracts/<contract_id>/assets")]
pub async fn contract_assets(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: i32,
) -> ApiResult<Json<Vec<Asset>>> {
    db.run(move |conn| {
        let contract = load_accessible_contract(conn, &auth_user.user, contract_id)?;
        let filter = AssetFilter {
            contract_id: Some(contract.id),
            category: None,
        };
        Ok(Json(list_assets(conn, &ContractScope::Company(contract.company_id), &filter)?))
    })
    .await
}

/// Create Asset endpoint.
///
/// - **URL:** `/api/1/assets`
/// - **Method:** `POST`
/// - **Authorization:** Managers and supervisors on the target contract
///
/// # Request Format
///
/// ```json
/// {
///   "contract_id": 1,
///   "name": "Chiller 02",
///   "code": "CH-02",
///   "category": "HVAC",
///   "location": "Roof",
///   "manufacturer": "Carrier",
///   "model": "30XA",
///   "serial_number": "SN-991"
/// }
/// ```
///
/// `status` defaults to OPERATIONAL. The asset inherits the contract's
/// company.
#[post("/1/assets", data = "<input>")]
pub async fn create_asset(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<AssetInput>,
) -> ApiResult<status::Created<Json<Asset>>> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Asset name is required"));
    }
    let asset = db
        .run(move |conn| -> ApiResult<Asset> {
            let contract = load_editable_contract(conn, &auth_user.user, input.contract_id)?;
            let asset = insert_asset(conn, contract.company_id, input)?;
            info!(
                "[assets] '{}' created asset {} ('{}') on contract {}",
                auth_user.user.email, asset.id, asset.name, asset.contract_id
            );
            Ok(asset)
        })
        .await?;
    let location = format!("/api/1/assets/{}", asset.id);
    Ok(status::Created::new(location).body(Json(asset)))
}

/// Get Asset endpoint.
///
/// - **URL:** `/api/1/assets/<asset_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/assets/<asset_id>")]
pub async fn get_asset_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    asset_id: i32,
) -> ApiResult<Json<Asset>> {
    db.run(move |conn| load_visible_asset(conn, &auth_user.user, asset_id).map(Json))
        .await
}

/// Update Asset endpoint.
///
/// - **URL:** `/api/1/assets/<asset_id>`
/// - **Method:** `PUT`
/// - **Authorization:** Managers and supervisors on the asset's contract
///
/// An asset cannot move to another contract.
#[put("/1/assets/<asset_id>", data = "<changes>")]
pub async fn update_asset_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    asset_id: i32,
    changes: LoggedJson<AssetChanges>,
) -> ApiResult<Json<Asset>> {
    let changes = changes.into_inner();
    if changes.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Asset name cannot be empty"));
    }
    db.run(move |conn| {
        let asset = load_editable_asset(conn, &auth_user.user, asset_id)?;
        Ok(Json(update_asset(conn, asset.id, changes)?))
    })
    .await
}

/// Delete Asset endpoint.
///
/// - **URL:** `/api/1/assets/<asset_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Managers and supervisors on the asset's contract
#[delete("/1/assets/<asset_id>")]
pub async fn delete_asset(db: DbConn, auth_user: AuthenticatedUser, asset_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let asset = load_editable_asset(conn, &auth_user.user, asset_id)?;
        soft_delete_asset(conn, asset.id)?;
        info!("[assets] '{}' deleted asset {}", auth_user.user.email, asset.id);
        Ok(Status::NoContent)
    })
    .await
}

/// List Scripts endpoint.
///
/// - **URL:** `/api/1/assets/<asset_id>/scripts`
/// - **Method:** `GET`
/// - **Purpose:** Inspection checklists of an asset, each with its ordered steps
/// - **Authentication:** Required
#[get("/1/assets/<asset_id>/scripts")]
pub async fn list_asset_scripts(
    db: DbConn,
    auth_user: AuthenticatedUser,
    asset_id: i32,
) -> ApiResult<Json<Vec<AssetScriptWithSteps>>> {
    db.run(move |conn| {
        let asset = load_visible_asset(conn, &auth_user.user, asset_id)?;
        Ok(Json(list_scripts(conn, asset.id)?))
    })
    .await
}

/// Create Script endpoint.
///
/// - **URL:** `/api/1/assets/<asset_id>/scripts`
/// - **Method:** `POST`
/// - **Authorization:** Managers and supervisors on the asset's contract
///
/// # Request Format
///
/// ```json
/// {
///   "name": "Monthly chiller check",
///   "steps": [
///     { "title": "Check oil level" },
///     { "title": "Measure discharge pressure", "description": "Write it in the notes" }
///   ]
/// }
/// ```
#[post("/1/assets/<asset_id>/scripts", data = "<input>")]
pub async fn create_script(
    db: DbConn,
    auth_user: AuthenticatedUser,
    asset_id: i32,
    input: LoggedJson<AssetScriptInput>,
) -> ApiResult<status::Created<Json<AssetScriptWithSteps>>> {
    let input = input.into_inner();
    validate_script(&input)?;
    let script = db
        .run(move |conn| -> ApiResult<AssetScriptWithSteps> {
            let asset = load_editable_asset(conn, &auth_user.user, asset_id)?;
            Ok(insert_script(conn, asset.id, input)?)
        })
        .await?;
    let location = format!("/api/1/scripts/{}", script.script.id);
    Ok(status::Created::new(location).body(Json(script)))
}

/// Get Script endpoint.
///
/// - **URL:** `/api/1/scripts/<script_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/scripts/<script_id>")]
pub async fn get_script_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    script_id: i32,
) -> ApiResult<Json<AssetScriptWithSteps>> {
    db.run(move |conn| {
        let (script, _) = load_visible_script(conn, &auth_user.user, script_id)?;
        get_script_with_steps(conn, script.id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Script not found"))
    })
    .await
}

/// Replace Script endpoint.
///
/// - **URL:** `/api/1/scripts/<script_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Replaces name, description and the whole step list
/// - **Authorization:** Managers and supervisors on the asset's contract
///
/// Inspections already started keep the steps they copied.
#[put("/1/scripts/<script_id>", data = "<input>")]
pub async fn replace_script_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    script_id: i32,
    input: LoggedJson<AssetScriptInput>,
) -> ApiResult<Json<AssetScriptWithSteps>> {
    let input = input.into_inner();
    validate_script(&input)?;
    db.run(move |conn| {
        let (script, asset) = load_visible_script(conn, &auth_user.user, script_id)?;
        load_editable_contract(conn, &auth_user.user, asset.contract_id)?;
        Ok(Json(replace_script(conn, script.id, input)?))
    })
    .await
}

/// Delete Script endpoint.
///
/// - **URL:** `/api/1/scripts/<script_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Managers and supervisors on the asset's contract
#[delete("/1/scripts/<script_id>")]
pub async fn delete_script(db: DbConn, auth_user: AuthenticatedUser, script_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let (script, asset) = load_visible_script(conn, &auth_user.user, script_id)?;
        load_editable_contract(conn, &auth_user.user, asset.contract_id)?;
        soft_delete_script(conn, script.id)?;
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_assets_endpoint,
        contract_assets,
        create_asset,
        get_asset_endpoint,
        update_asset_endpoint,
        delete_asset,
        list_asset_scripts,
        create_script,
        get_script_endpoint,
        replace_script_endpoint,
        delete_script
    ]
}

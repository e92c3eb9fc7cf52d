//! Contract endpoints.
//!
//! A contract is a client site serviced by a company. Every asset,
//! schedule, report, meter and relevant item hangs off one.
//!
//! # Authorization Rules
//! - Anyone authenticated lists and reads the contracts they can see
//! - OWNER, ADMIN and the super-admin create, update and delete

use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{Contract, ContractChanges, ContractInput, UserRole};
use crate::orm::DbConn;
use crate::orm::company::get_company_by_id;
use crate::orm::contract::{
    get_contract_by_name, insert_contract, list_contracts, soft_delete_contract, update_contract,
};
use crate::session_guards::{AuthenticatedUser, ManagerUser};
use crate::tenancy::{ContractScope, load_accessible_contract};

/// List Contracts endpoint.
///
/// - **URL:** `/api/1/contracts`
/// - **Method:** `GET`
/// - **Purpose:** Lists the live contracts visible to the caller
/// - **Authentication:** Required
///
/// Managers see their whole company, supervisors and technicians only the
/// contracts they are assigned to.
#[get("/1/contracts")]
pub async fn list_contracts_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Contract>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_contracts(conn, &scope)?))
    })
    .await
}

/// Create Contract endpoint.
///
/// - **URL:** `/api/1/contracts`
/// - **Method:** `POST`
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN
///
/// # Request Format
///
/// ```json
/// {
///   "name": "Acme Tower",
///   "code": "AT-01",
///   "client_name": "Acme Holdings",
///   "address": "Av. Paulista 1000"
/// }
/// ```
///
/// The super-admin may add `company_id`; everyone else creates in their
/// own company. A live contract with the same name (case-insensitive) in
/// the company answers HTTP 409.
#[post("/1/contracts", data = "<input>")]
pub async fn create_contract(
    db: DbConn,
    manager: ManagerUser,
    input: LoggedJson<ContractInput>,
) -> ApiResult<status::Created<Json<Contract>>> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Contract name is required"));
    }
    let company_id = match (manager.user.role, input.company_id) {
        (UserRole::SuperAdmin, Some(id)) => id,
        _ => manager.user.company_id,
    };

    let contract = db
        .run(move |conn| -> ApiResult<Contract> {
            if get_company_by_id(conn, company_id)?.is_none() {
                return Err(ApiError::bad_request("Company does not exist"));
            }
            if get_contract_by_name(conn, company_id, &input.name)?.is_some() {
                return Err(ApiError::conflict(format!(
                    "Contract '{}' already exists",
                    input.name.trim()
                )));
            }
            let contract = insert_contract(conn, company_id, input)?;
            info!(
                "[contracts] '{}' created contract {} ('{}')",
                manager.user.email, contract.id, contract.name
            );
            Ok(contract)
        })
        .await?;

    let location = format!("/api/1/contracts/{}", contract.id);
    Ok(status::Created::new(location).body(Json(contract)))
}

/// Get Contract endpoint.
///
/// - **URL:** `/api/1/contracts/<contract_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// HTTP 404 for contracts of other companies, HTTP 403 for contracts of the
/// caller's company they are not assigned to.
#[get("/1/contracts/<contract_id>")]
pub async fn get_contract_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: i32,
) -> ApiResult<Json<Contract>> {
    db.run(move |conn| load_accessible_contract(conn, &auth_user.user, contract_id).map(Json))
        .await
}

/// Update Contract endpoint.
///
/// - **URL:** `/api/1/contracts/<contract_id>`
/// - **Method:** `PUT`
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN
#[put("/1/contracts/<contract_id>", data = "<changes>")]
pub async fn update_contract_endpoint(
    db: DbConn,
    manager: ManagerUser,
    contract_id: i32,
    changes: LoggedJson<ContractChanges>,
) -> ApiResult<Json<Contract>> {
    let changes = changes.into_inner();
    if changes.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Contract name cannot be empty"));
    }
    db.run(move |conn| {
        let contract = load_accessible_contract(conn, &manager.user, contract_id)?;
        if let Some(name) = &changes.name {
            if let Some(other) = get_contract_by_name(conn, contract.company_id, name)? {
                if other.id != contract.id {
                    return Err(ApiError::conflict(format!(
                        "Contract '{}' already exists",
                        name.trim()
                    )));
                }
            }
        }
        Ok(Json(update_contract(conn, contract.id, changes)?))
    })
    .await
}

/// Delete Contract endpoint.
///
/// - **URL:** `/api/1/contracts/<contract_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the contract; its schedules stop producing rondas
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN
#[delete("/1/contracts/<contract_id>")]
pub async fn delete_contract(db: DbConn, manager: ManagerUser, contract_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let contract = load_accessible_contract(conn, &manager.user, contract_id)?;
        soft_delete_contract(conn, contract.id)?;
        warn!(
            "[contracts] '{}' deleted contract {} ('{}')",
            manager.user.email, contract.id, contract.name
        );
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_contracts_endpoint,
        create_contract,
        get_contract_endpoint,
        update_contract_endpoint,
        delete_contract
    ]
}

//! User management within a company.
//!
//! # Authorization Rules
//! - OWNER and ADMIN manage the users of their own company
//! - Only an OWNER (or the super-admin) may create, edit or delete an OWNER
//! - Only the super-admin may create another SUPER_ADMIN
//! - Any user may read their own record
//! - Users of other companies are reported as not found

use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{User, UserChanges, UserInput, UserRole};
use crate::orm::DbConn;
use crate::orm::company::get_company_by_id;
use crate::orm::contract::company_contract_ids;
use crate::orm::login::{hash_password, revoke_user_sessions};
use crate::orm::user::{
    count_company_users, email_taken, get_user, get_user_contract_ids, insert_user, list_users,
    normalize_email, set_user_contracts, soft_delete_user, update_user,
};
use crate::session_guards::{AuthenticatedUser, ManagerUser};
use crate::tenancy::can_manage_company;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub category: Option<String>,
    /// Only honoured for the super-admin; managers always create users in
    /// their own company.
    pub company_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UserContractsRequest {
    pub contract_ids: Vec<i32>,
}

pub(crate) fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Name, e-mail and password checks shared with company onboarding.
pub(crate) fn validate_new_credentials(name: &str, email: &str, password: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid e-mail is required"));
    }
    validate_password(password)
}

/// Whether `actor` may hand out `role`.
fn can_grant_role(actor: &User, role: UserRole) -> bool {
    match role {
        UserRole::SuperAdmin => actor.role == UserRole::SuperAdmin,
        UserRole::Owner => matches!(actor.role, UserRole::SuperAdmin | UserRole::Owner),
        _ => actor.role.is_manager(),
    }
}

/// Loads a user the manager may administer. Users of other companies are
/// reported as missing.
fn load_managed_user(conn: &mut SqliteConnection, actor: &User, user_id: i32) -> ApiResult<User> {
    let target = get_user(conn, user_id)?.ok_or_else(|| ApiError::not_found("User not found"))?;
    if !can_manage_company(actor, target.company_id) {
        return Err(ApiError::not_found("User not found"));
    }
    if !can_grant_role(actor, target.role) {
        return Err(ApiError::forbidden(format!("Only an owner may manage {} users", target.role)));
    }
    Ok(target)
}

/// List Users endpoint.
///
/// - **URL:** `/api/1/users[?company_id=<id>]`
/// - **Method:** `GET`
/// - **Purpose:** Lists the live users of the caller's company
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN
///
/// The super-admin may pass `company_id`; without it they get every user.
/// For everyone else the parameter is ignored.
#[get("/1/users?<company_id>")]
pub async fn list_company_users(
    db: DbConn,
    manager: ManagerUser,
    company_id: Option<i32>,
) -> ApiResult<Json<Vec<User>>> {
    let filter = if manager.user.role == UserRole::SuperAdmin {
        company_id
    } else {
        Some(manager.user.company_id)
    };
    db.run(move |conn| Ok(Json(list_users(conn, filter)?))).await
}

/// Create User endpoint.
///
/// - **URL:** `/api/1/users`
/// - **Method:** `POST`
/// - **Purpose:** Adds a user to a company
/// - **Authorization:** OWNER, ADMIN or SUPER_ADMIN, subject to the role rules
///
/// # Request Format
///
/// ```json
/// {
///   "name": "Carlos Lima",
///   "email": "carlos@acme.com",
///   "password": "s3cret!",
///   "role": "TECHNICIAN",
///   "category": "ELECTRICAL"
/// }
/// ```
///
/// # Response
///
/// - HTTP 201 Created with the new user
/// - HTTP 400 for invalid fields or an unknown company
/// - HTTP 403 when the caller may not grant the requested role
/// - HTTP 409 when the e-mail is taken or the company reached `max_users`
#[post("/1/users", data = "<request>")]
pub async fn create_user(
    db: DbConn,
    manager: ManagerUser,
    request: LoggedJson<CreateUserRequest>,
) -> ApiResult<status::Created<Json<User>>> {
    let request = request.into_inner();
    validate_new_credentials(&request.name, &request.email, &request.password)?;
    if !can_grant_role(&manager.user, request.role) {
        return Err(ApiError::forbidden(format!(
            "You may not create {} users",
            request.role
        )));
    }
    let company_id = match (manager.user.role, request.company_id) {
        (UserRole::SuperAdmin, Some(id)) => id,
        _ => manager.user.company_id,
    };

    let user = db
        .run(move |conn| -> ApiResult<User> {
            let company = get_company_by_id(conn, company_id)?
                .ok_or_else(|| ApiError::bad_request("Company does not exist"))?;
            if let Some(max_users) = company.max_users {
                if count_company_users(conn, company.id)? >= i64::from(max_users) {
                    return Err(ApiError::conflict(format!(
                        "Company '{}' reached its limit of {} users",
                        company.name, max_users
                    )));
                }
            }
            let email = normalize_email(&request.email);
            if email_taken(conn, &email)? {
                return Err(ApiError::conflict(format!("E-mail '{}' is already in use", email)));
            }
            let user = insert_user(
                conn,
                UserInput {
                    company_id: company.id,
                    name: request.name,
                    email,
                    password_hash: hash_password(&request.password),
                    role: request.role,
                    category: request.category,
                },
            )?;
            info!(
                "[users] '{}' created {} user '{}' in company {}",
                manager.user.email, user.role, user.email, user.company_id
            );
            Ok(user)
        })
        .await?;

    let location = format!("/api/1/users/{}", user.id);
    Ok(status::Created::new(location).body(Json(user)))
}

/// Get User endpoint.
///
/// - **URL:** `/api/1/users/<user_id>`
/// - **Method:** `GET`
/// - **Authorization:** the user themselves, a manager of their company or
///   the super-admin
#[get("/1/users/<user_id>")]
pub async fn get_user_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    user_id: i32,
) -> ApiResult<Json<User>> {
    db.run(move |conn| {
        let user = get_user(conn, user_id)?.ok_or_else(|| ApiError::not_found("User not found"))?;
        if user.id == auth_user.user.id || can_manage_company(&auth_user.user, user.company_id) {
            Ok(Json(user))
        } else if user.company_id == auth_user.user.company_id {
            Err(ApiError::forbidden("Only managers may view other users"))
        } else {
            Err(ApiError::not_found("User not found"))
        }
    })
    .await
}

/// Update User endpoint.
///
/// - **URL:** `/api/1/users/<user_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Partially updates a user; omitted fields stay unchanged
/// - **Authorization:** a manager of the user's company (subject to the role
///   rules); any user may change their own name and password
///
/// Changing someone's password, deactivating them or changing their role
/// revokes their sessions. Nobody may change their own role or deactivate
/// themselves.
#[put("/1/users/<user_id>", data = "<request>")]
pub async fn update_user_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    user_id: i32,
    request: LoggedJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let request = request.into_inner();
    if let Some(password) = &request.password {
        validate_password(password)?;
    }
    if request.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    let actor = auth_user.user;
    let is_self = actor.id == user_id;
    if is_self && (request.role.is_some() || request.active == Some(false)) {
        return Err(ApiError::bad_request("You cannot change your own role or deactivate yourself"));
    }
    if !is_self && !actor.role.is_manager() {
        return Err(ApiError::forbidden("Only managers may update other users"));
    }
    if is_self
        && !actor.role.is_manager()
        && (request.email.is_some() || request.category.is_some() || request.active.is_some())
    {
        return Err(ApiError::forbidden("You may only change your own name and password"));
    }
    if let Some(role) = request.role {
        if !can_grant_role(&actor, role) {
            return Err(ApiError::forbidden(format!("You may not grant the {} role", role)));
        }
    }

    db.run(move |conn| {
        let target = if is_self {
            get_user(conn, user_id)?.ok_or_else(|| ApiError::not_found("User not found"))?
        } else {
            load_managed_user(conn, &actor, user_id)?
        };

        let email = request.email.map(|e| normalize_email(&e));
        if let Some(email) = &email {
            if *email != target.email && email_taken(conn, email)? {
                return Err(ApiError::conflict(format!("E-mail '{}' is already in use", email)));
            }
        }
        let revoke = !is_self
            && (request.password.is_some()
                || request.active == Some(false)
                || request.role.is_some_and(|r| r != target.role));

        let user = update_user(
            conn,
            target.id,
            UserChanges {
                name: request.name.map(|n| n.trim().to_string()),
                email,
                password_hash: request.password.as_deref().map(hash_password),
                role: request.role,
                category: request.category,
                active: request.active,
                updated_at: None,
            },
        )?;
        if revoke {
            revoke_user_sessions(conn, user.id)?;
        }
        info!("[users] '{}' updated user '{}'", actor.email, user.email);
        Ok(Json(user))
    })
    .await
}

/// Delete User endpoint.
///
/// - **URL:** `/api/1/users/<user_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes a user, dropping assignments and sessions
/// - **Authorization:** a manager of the user's company (subject to the role rules)
///
/// Deleting yourself is refused with HTTP 400.
#[delete("/1/users/<user_id>")]
pub async fn delete_user(db: DbConn, manager: ManagerUser, user_id: i32) -> ApiResult<Status> {
    if manager.user.id == user_id {
        return Err(ApiError::bad_request("You cannot delete yourself"));
    }
    db.run(move |conn| {
        let target = load_managed_user(conn, &manager.user, user_id)?;
        soft_delete_user(conn, target.id)?;
        warn!("[users] '{}' deleted user '{}'", manager.user.email, target.email);
        Ok(Status::NoContent)
    })
    .await
}

/// Get User Contracts endpoint.
///
/// - **URL:** `/api/1/users/<user_id>/contracts`
/// - **Method:** `GET`
/// - **Purpose:** Ids of the contracts the user is assigned to
/// - **Authorization:** the user themselves or a manager of their company
#[get("/1/users/<user_id>/contracts")]
pub async fn get_user_contracts(
    db: DbConn,
    auth_user: AuthenticatedUser,
    user_id: i32,
) -> ApiResult<Json<Vec<i32>>> {
    db.run(move |conn| {
        let user = get_user(conn, user_id)?.ok_or_else(|| ApiError::not_found("User not found"))?;
        if user.id != auth_user.user.id && !can_manage_company(&auth_user.user, user.company_id) {
            return Err(ApiError::not_found("User not found"));
        }
        Ok(Json(get_user_contract_ids(conn, user.id)?))
    })
    .await
}

/// Set User Contracts endpoint.
///
/// - **URL:** `/api/1/users/<user_id>/contracts`
/// - **Method:** `PUT`
/// - **Purpose:** Replaces the user's contract assignments
/// - **Authorization:** a manager of the user's company
///
/// Every id must be a live contract of the user's company (HTTP 400
/// otherwise). Assignments only narrow what SUPERVISOR and TECHNICIAN
/// users see; managers always see the whole company.
#[put("/1/users/<user_id>/contracts", data = "<request>")]
pub async fn set_user_contracts_endpoint(
    db: DbConn,
    manager: ManagerUser,
    user_id: i32,
    request: LoggedJson<UserContractsRequest>,
) -> ApiResult<Json<Vec<i32>>> {
    let contract_ids = request.into_inner().contract_ids;
    db.run(move |conn| {
        let target = load_managed_user(conn, &manager.user, user_id)?;
        let allowed = company_contract_ids(conn, target.company_id)?;
        if let Some(bad) = contract_ids.iter().find(|id| !allowed.contains(id)) {
            return Err(ApiError::bad_request(format!(
                "Contract {} does not belong to the user's company",
                bad
            )));
        }
        set_user_contracts(conn, target.id, &contract_ids)?;
        info!(
            "[users] '{}' assigned '{}' to contracts {:?}",
            manager.user.email, target.email, contract_ids
        );
        Ok(Json(get_user_contract_ids(conn, target.id)?))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_company_users,
        create_user,
        get_user_endpoint,
        update_user_endpoint,
        delete_user,
        get_user_contracts,
        set_user_contracts_endpoint
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{insert_test_company, insert_test_user, setup_test_db};

    #[test]
    fn test_role_grants() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let root = insert_test_user(&mut conn, acme.id, "root@x.com", UserRole::SuperAdmin, None);
        let owner = insert_test_user(&mut conn, acme.id, "owner@x.com", UserRole::Owner, None);
        let admin = insert_test_user(&mut conn, acme.id, "admin@x.com", UserRole::Admin, None);
        let sup = insert_test_user(&mut conn, acme.id, "sup@x.com", UserRole::Supervisor, None);

        assert!(can_grant_role(&root, UserRole::SuperAdmin));
        assert!(!can_grant_role(&owner, UserRole::SuperAdmin));
        assert!(can_grant_role(&owner, UserRole::Owner));
        assert!(!can_grant_role(&admin, UserRole::Owner));
        assert!(can_grant_role(&admin, UserRole::Technician));
        assert!(!can_grant_role(&sup, UserRole::Technician));
    }

    #[test]
    fn test_credential_validation() {
        assert!(validate_new_credentials("Ana", "ana@acme.com", "secret").is_ok());
        assert!(validate_new_credentials(" ", "ana@acme.com", "secret").is_err());
        assert!(validate_new_credentials("Ana", "ana.acme.com", "secret").is_err());
        assert!(validate_new_credentials("Ana", "ana@acme.com", "12345").is_err());
    }
}

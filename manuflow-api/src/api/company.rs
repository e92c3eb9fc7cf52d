//! Company endpoints.
//!
//! The `/1/admin/...` routes form the super-admin tier: onboarding tenants,
//! changing their subscription and looking across every company. Other
//! users only see their own company through `/1/company`.

use chrono::NaiveDate;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::api::user::validate_new_credentials;
use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{
    Company, CompanySummary, SubscriptionChanges, SubscriptionPlan, SubscriptionStatus, User,
    UserInput, UserRole,
};
use crate::orm::DbConn;
use crate::orm::company::{
    create_company_with_owner, get_company_by_id, get_company_by_name, list_company_summaries,
    soft_delete_company, update_subscription,
};
use crate::orm::login::hash_password;
use crate::orm::user::{email_taken, list_users, normalize_email};
use crate::session_guards::{AuthenticatedUser, SuperAdminUser};

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub document: Option<String>,
    pub plan: Option<SubscriptionPlan>,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_password: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCompanyResponse {
    pub company: Company,
    pub owner: User,
}

#[derive(Debug, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SubscriptionRequest {
    pub plan: Option<SubscriptionPlan>,
    pub status: Option<SubscriptionStatus>,
    pub expires_at: Option<NaiveDate>,
    pub max_users: Option<i32>,
}

/// List Companies endpoint.
///
/// - **URL:** `/api/1/admin/companies`
/// - **Method:** `GET`
/// - **Purpose:** Lists every live company with its user and contract counts
/// - **Authentication:** Required
/// - **Authorization:** SUPER_ADMIN
#[get("/1/admin/companies")]
pub async fn list_companies(
    db: DbConn,
    _admin: SuperAdminUser,
) -> ApiResult<Json<Vec<CompanySummary>>> {
    db.run(|conn| Ok(Json(list_company_summaries(conn)?))).await
}

/// Create Company endpoint.
///
/// - **URL:** `/api/1/admin/companies`
/// - **Method:** `POST`
/// - **Purpose:** Onboards a tenant together with its first OWNER
/// - **Authentication:** Required
/// - **Authorization:** SUPER_ADMIN
///
/// # Request Format
///
/// ```json
/// {
///   "name": "Acme Facilities",
///   "document": "12.345.678/0001-90",
///   "plan": "PRO",
///   "owner_name": "Ana Souza",
///   "owner_email": "ana@acme.com",
///   "owner_password": "s3cret!"
/// }
/// ```
///
/// The company starts on a TRIAL subscription; `plan` defaults to FREE.
///
/// # Response
///
/// - HTTP 201 Created with the company and the owner
/// - HTTP 400 for an empty name or invalid owner credentials
/// - HTTP 409 when the name (case-insensitive) or the owner e-mail is taken
#[post("/1/admin/companies", data = "<request>")]
pub async fn create_company(
    db: DbConn,
    admin: SuperAdminUser,
    request: LoggedJson<CreateCompanyRequest>,
) -> ApiResult<status::Created<Json<CreateCompanyResponse>>> {
    let request = request.into_inner();
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Company name is required"));
    }
    validate_new_credentials(&request.owner_name, &request.owner_email, &request.owner_password)?;

    let created = db
        .run(move |conn| -> ApiResult<CreateCompanyResponse> {
            if get_company_by_name(conn, &name)?.is_some() {
                return Err(ApiError::conflict(format!("Company '{}' already exists", name)));
            }
            let owner_email = normalize_email(&request.owner_email);
            if email_taken(conn, &owner_email)? {
                return Err(ApiError::conflict(format!("E-mail '{}' is already in use", owner_email)));
            }
            let owner = UserInput {
                company_id: 0,
                name: request.owner_name,
                email: owner_email,
                password_hash: hash_password(&request.owner_password),
                role: UserRole::Owner,
                category: None,
            };
            let (company, owner) = create_company_with_owner(
                conn,
                name,
                request.document,
                request.plan.unwrap_or(SubscriptionPlan::Free),
                owner,
            )?;
            info!(
                "[companies] '{}' created company {} ('{}')",
                admin.user.email, company.id, company.name
            );
            Ok(CreateCompanyResponse { company, owner })
        })
        .await?;

    let location = format!("/api/1/admin/companies/{}", created.company.id);
    Ok(status::Created::new(location).body(Json(created)))
}

/// Get Company endpoint.
///
/// - **URL:** `/api/1/admin/companies/<company_id>`
/// - **Method:** `GET`
/// - **Authorization:** SUPER_ADMIN
#[get("/1/admin/companies/<company_id>")]
pub async fn get_company(
    db: DbConn,
    _admin: SuperAdminUser,
    company_id: i32,
) -> ApiResult<Json<Company>> {
    db.run(move |conn| {
        get_company_by_id(conn, company_id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Company not found"))
    })
    .await
}

/// Update Subscription endpoint.
///
/// - **URL:** `/api/1/admin/companies/<company_id>/subscription`
/// - **Method:** `PUT`
/// - **Purpose:** Changes plan, status, expiry date or user cap
/// - **Authorization:** SUPER_ADMIN
///
/// Moving a company to SUSPENDED or CANCELLED locks its users out on their
/// next request.
#[put("/1/admin/companies/<company_id>/subscription", data = "<request>")]
pub async fn update_company_subscription(
    db: DbConn,
    admin: SuperAdminUser,
    company_id: i32,
    request: LoggedJson<SubscriptionRequest>,
) -> ApiResult<Json<Company>> {
    let request = request.into_inner();
    if request.max_users.is_some_and(|max| max < 1) {
        return Err(ApiError::bad_request("max_users must be at least 1"));
    }

    db.run(move |conn| {
        if get_company_by_id(conn, company_id)?.is_none() {
            return Err(ApiError::not_found("Company not found"));
        }
        let company = update_subscription(
            conn,
            company_id,
            SubscriptionChanges {
                subscription_plan: request.plan,
                subscription_status: request.status,
                subscription_expires_at: request.expires_at,
                max_users: request.max_users,
                updated_at: None,
            },
        )?;
        info!(
            "[companies] '{}' set company {} to {} / {}",
            admin.user.email, company.id, company.subscription_plan, company.subscription_status
        );
        Ok(Json(company))
    })
    .await
}

/// Delete Company endpoint.
///
/// - **URL:** `/api/1/admin/companies/<company_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes a tenant; its users can no longer log in
/// - **Authorization:** SUPER_ADMIN
///
/// The super-admin's own company cannot be deleted (HTTP 400).
#[delete("/1/admin/companies/<company_id>")]
pub async fn delete_company(db: DbConn, admin: SuperAdminUser, company_id: i32) -> ApiResult<Status> {
    if company_id == admin.user.company_id {
        return Err(ApiError::bad_request("The platform company cannot be deleted"));
    }
    db.run(move |conn| {
        if soft_delete_company(conn, company_id)? {
            warn!("[companies] '{}' deleted company {}", admin.user.email, company_id);
            Ok(Status::NoContent)
        } else {
            Err(ApiError::not_found("Company not found"))
        }
    })
    .await
}

/// List All Users endpoint.
///
/// - **URL:** `/api/1/admin/users`
/// - **Method:** `GET`
/// - **Purpose:** Lists live users of every company
/// - **Authorization:** SUPER_ADMIN
#[get("/1/admin/users")]
pub async fn list_all_users(db: DbConn, _admin: SuperAdminUser) -> ApiResult<Json<Vec<User>>> {
    db.run(|conn| Ok(Json(list_users(conn, None)?))).await
}

/// Own Company endpoint.
///
/// - **URL:** `/api/1/company`
/// - **Method:** `GET`
/// - **Purpose:** Returns the caller's company with its subscription
/// - **Authentication:** Required
#[get("/1/company")]
pub async fn own_company(db: DbConn, auth_user: AuthenticatedUser) -> ApiResult<Json<Company>> {
    let company_id = auth_user.user.company_id;
    db.run(move |conn| {
        get_company_by_id(conn, company_id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Company not found"))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_companies,
        create_company,
        get_company,
        update_company_subscription,
        delete_company,
        list_all_users,
        own_company
    ]
}

//! Login, logout and the current-user endpoint.
//!
//! A successful login stores a session row and hands its id back in the
//! `session` cookie. Every authenticated endpoint resolves that cookie
//! through [`AuthenticatedUser`].

use diesel::SqliteConnection;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{Company, User};
use crate::orm::DbConn;
use crate::orm::company::get_company_by_id;
use crate::orm::login::{
    LoginError, SESSION_COOKIE, authenticate, create_session, remove_session_cookie,
    revoke_session, set_session_cookie,
};
use crate::orm::user::get_user_contract_ids;
use crate::session_guards::AuthenticatedUser;

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The caller, their company and the contracts they are assigned to.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionInfo {
    pub user: User,
    pub company: Option<Company>,
    pub contract_ids: Vec<i32>,
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".to_string()),
            LoginError::Inactive => ApiError::Unauthorized("User is inactive".to_string()),
            LoginError::CompanyUnavailable => ApiError::Unauthorized(
                "Company subscription is suspended or cancelled".to_string(),
            ),
            LoginError::Database(e) => ApiError::Database(e),
        }
    }
}

fn session_info(conn: &mut SqliteConnection, user: User) -> ApiResult<SessionInfo> {
    let company = get_company_by_id(conn, user.company_id)?;
    let contract_ids = get_user_contract_ids(conn, user.id)?;
    Ok(SessionInfo {
        user,
        company,
        contract_ids,
    })
}

/// Login endpoint.
///
/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Purpose:** Authenticates a user and starts a session
/// - **Authentication:** None required
///
/// # Request Format
///
/// ```json
/// { "email": "tech@acme.com", "password": "secret" }
/// ```
///
/// # Response
///
/// **Success (HTTP 200 OK):** a [`SessionInfo`] body and a `session` cookie.
///
/// **Failure:**
/// - HTTP 400 when either field is empty
/// - HTTP 401 for unknown e-mail, wrong password, an inactive user or a
///   company whose subscription is suspended or cancelled
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    login: LoggedJson<LoginRequest>,
) -> ApiResult<Json<SessionInfo>> {
    let LoginRequest { email, password } = login.into_inner();
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    let ttl_hours = config.session_ttl_hours;

    let (token, info) = db
        .run(move |conn| -> ApiResult<(String, SessionInfo)> {
            let user = match authenticate(conn, &email, &password) {
                Ok(user) => user,
                Err(e) => {
                    warn!("[auth] Login failed for '{}': {}", email, e);
                    return Err(e.into());
                }
            };
            let token = create_session(conn, user.id, ttl_hours)?;
            info!("[auth] '{}' logged in", user.email);
            Ok((token, session_info(conn, user)?))
        })
        .await?;

    set_session_cookie(cookies, &token);
    Ok(Json(info))
}

/// Logout endpoint.
///
/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
/// - **Purpose:** Revokes the current session and clears the cookie
/// - **Authentication:** None required; without a session this is a no-op
///
/// Always answers HTTP 204 No Content.
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> ApiResult<rocket::http::Status> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let session_id = cookie.value().to_string();
        db.run(move |conn| revoke_session(conn, &session_id)).await?;
    }
    remove_session_cookie(cookies);
    Ok(rocket::http::Status::NoContent)
}

/// Current user endpoint.
///
/// - **URL:** `/api/1/me`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/me")]
pub async fn me(db: DbConn, auth_user: AuthenticatedUser) -> ApiResult<Json<SessionInfo>> {
    db.run(move |conn| session_info(conn, auth_user.user).map(Json))
        .await
}

pub fn routes() -> Vec<Route> {
    routes![login, logout, me]
}

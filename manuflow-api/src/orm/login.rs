//! Database operations for user authentication and session management.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Duration;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewSession, User, UserRole};
use crate::orm::company::get_company_by_id;
use crate::orm::db::now;
use crate::orm::user::get_user_by_email;
use crate::schema::sessions;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user is inactive")]
    Inactive,
    #[error("company subscription does not allow access")]
    CompanyUnavailable,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Generates a new UUID-based session token.
fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Verifies a plain text password against a stored Argon2 hash. A stored
/// hash that cannot be parsed never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Checks credentials and account state.
///
/// Unknown e-mail and wrong password both report `InvalidCredentials`.
/// Users of a soft-deleted, suspended or cancelled company are refused
/// unless they are the super-admin.
pub fn authenticate(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    let user = get_user_by_email(conn, email)?.ok_or(LoginError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        return Err(LoginError::InvalidCredentials);
    }
    if !user.active {
        return Err(LoginError::Inactive);
    }
    if user.role != UserRole::SuperAdmin {
        let company = get_company_by_id(conn, user.company_id)?;
        if !company.is_some_and(|c| c.subscription_status.allows_login()) {
            return Err(LoginError::CompanyUnavailable);
        }
    }
    Ok(user)
}

/// Creates a new session row and returns its token.
pub fn create_session(
    conn: &mut SqliteConnection,
    user_id: i32,
    ttl_hours: i64,
) -> QueryResult<String> {
    let session_token = generate_session_token();
    let created_at = now();
    let expires_at = (ttl_hours > 0).then(|| created_at + Duration::hours(ttl_hours));

    diesel::insert_into(sessions::table)
        .values(&NewSession {
            id: session_token.clone(),
            user_id,
            created_at,
            expires_at,
            revoked: false,
        })
        .execute(conn)?;

    Ok(session_token)
}

/// Marks a session as revoked. Returns the number of rows touched.
pub fn revoke_session(conn: &mut SqliteConnection, session_id: &str) -> QueryResult<usize> {
    diesel::update(sessions::table.filter(sessions::id.eq(session_id)))
        .set(sessions::revoked.eq(true))
        .execute(conn)
}

/// Revokes every session of a user, e.g. after deletion or a password change.
pub fn revoke_user_sessions(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<usize> {
    diesel::update(sessions::table.filter(sessions::user_id.eq(user_id)))
        .set(sessions::revoked.eq(true))
        .execute(conn)
}

/// Sets the session cookie: HTTP-only, SameSite=Lax, secure outside tests.
pub fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    let secure_flag = !cfg!(test);
    let cookie = Cookie::build((SESSION_COOKIE, session_token.to_string()))
        .http_only(true)
        .secure(secure_flag)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);
}

pub fn remove_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/"));
}

/// Hashes a password using Argon2 with a random salt.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Hashing should succeed")
        .to_string()
}

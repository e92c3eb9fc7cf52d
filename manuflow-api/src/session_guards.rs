//! Session-based authentication and authorization guards for Rocket routes.
//!
//! `AuthenticatedUser` validates the `session` cookie against the sessions
//! table and loads the user behind it. The role guards built on top of it
//! reject authenticated users lacking the required role with 403.
//!
//! ```rust,ignore
//! #[get("/1/admin/companies")]
//! async fn list(db: DbConn, admin: SuperAdminUser) -> ApiResult<Json<Vec<CompanySummary>>> { ... }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::models::{Company, Session, User, UserRole};
use crate::orm::DbConn;
use crate::schema::{companies, sessions, users};

/// A request guard for routes that require an authenticated user.
///
/// The session must exist, be non-revoked and non-expired. The user behind
/// it must be active and not soft-deleted, and unless they are the
/// super-admin their company must exist with a subscription that still
/// allows access.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
}

fn load_session_user(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> QueryResult<Option<(User, Option<Company>)>> {
    let session = sessions::table
        .filter(sessions::id.eq(session_id))
        .filter(sessions::revoked.eq(false))
        .filter(
            sessions::expires_at
                .is_null()
                .or(sessions::expires_at.gt(Utc::now().naive_utc())),
        )
        .select(Session::as_select())
        .first(conn)
        .optional()?;
    let Some(session) = session else {
        return Ok(None);
    };

    let user = users::table
        .filter(users::id.eq(session.user_id))
        .filter(users::deleted_at.is_null())
        .filter(users::active.eq(true))
        .select(User::as_select())
        .first(conn)
        .optional()?;
    let Some(user) = user else {
        return Ok(None);
    };

    let company = companies::table
        .filter(companies::id.eq(user.company_id))
        .filter(companies::deleted_at.is_null())
        .select(Company::as_select())
        .first(conn)
        .optional()?;
    Ok(Some((user, company)))
}

/// Whether a user of `company` may use the application right now.
pub fn company_allows_access(user: &User, company: Option<&Company>) -> bool {
    if user.role == UserRole::SuperAdmin {
        return true;
    }
    company.is_some_and(|c| c.subscription_status.allows_login())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let Some(session_cookie) = request.cookies().get("session") else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        let session_id = session_cookie.value().to_string();

        match db.run(move |conn| load_session_user(conn, &session_id)).await {
            Ok(Some((user, company))) => {
                if company_allows_access(&user, company.as_ref()) {
                    Outcome::Success(AuthenticatedUser { user })
                } else {
                    warn!("[auth] Rejected session of '{}': company access suspended", user.email);
                    Outcome::Error((Status::Unauthorized, ()))
                }
            }
            Ok(None) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("[auth] Database error loading session: {:?}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

impl AuthenticatedUser {
    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_super_admin(&self) -> bool {
        self.user.role == UserRole::SuperAdmin
    }

    /// OWNER, ADMIN or SUPER_ADMIN.
    pub fn is_manager(&self) -> bool {
        self.user.role.is_manager()
    }

    /// Managers plus supervisors: the roles allowed to maintain assets and
    /// schedules on their contracts.
    pub fn can_edit_field_data(&self) -> bool {
        self.is_manager() || self.user.role == UserRole::Supervisor
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.user.role)
    }
}

/// Macro to create role-specific request guards
macro_rules! create_role_guard {
    ($(#[$meta:meta])* $name:ident, $check:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            pub user: User,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                let auth_user = match AuthenticatedUser::from_request(request).await {
                    Outcome::Success(user) => user,
                    Outcome::Error(e) => return Outcome::Error(e),
                    Outcome::Forward(f) => return Outcome::Forward(f),
                };

                let check: fn(&AuthenticatedUser) -> bool = $check;
                if check(&auth_user) {
                    Outcome::Success($name { user: auth_user.user })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
        }

        impl From<$name> for AuthenticatedUser {
            fn from(guard: $name) -> Self {
                AuthenticatedUser { user: guard.user }
            }
        }
    };
}

create_role_guard!(
    /// Platform operator managing every tenant.
    SuperAdminUser,
    |u| u.is_super_admin()
);

create_role_guard!(
    /// OWNER, ADMIN or SUPER_ADMIN.
    ManagerUser,
    |u| u.is_manager()
);

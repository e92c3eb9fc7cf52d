use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{user_contracts, users};

text_enum! {
    /// Access tier of a user, from platform operator down to field technician
    pub enum UserRole {
        SuperAdmin => "SUPER_ADMIN",
        Owner => "OWNER",
        Admin => "ADMIN",
        Supervisor => "SUPERVISOR",
        Technician => "TECHNICIAN",
    }
}

impl UserRole {
    /// Owners and admins manage everything inside their company; the
    /// super-admin manages everything everywhere.
    pub fn is_manager(&self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Owner | UserRole::Admin)
    }

    /// Roles whose data access is limited to assigned contracts.
    pub fn is_assignment_scoped(&self) -> bool {
        matches!(self, UserRole::Supervisor | UserRole::Technician)
    }
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::company::Company))]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub email: String, // Will be unique
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    /// Technician specialty (ELECTRICAL, HVAC, ...). Stored upper-case.
    pub category: Option<String>,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub company_id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub category: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// For ORM inputs; the caller provides an already hashed password
#[derive(Debug, Clone)]
pub struct UserInput {
    pub company_id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub category: Option<String>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub category: Option<String>,
    pub active: Option<bool>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Associations, Debug, Clone)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = user_contracts)]
#[diesel(primary_key(user_id, contract_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserContract {
    pub user_id: i32,
    pub contract_id: i32,
}

/// Normalizes a technician category for storage and comparison.
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
}

use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::contracts;

/// A serviced client site
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::company::Company))]
#[diesel(table_name = contracts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Contract {
    pub id: i32,
    pub company_id: i32, // Foreign key to Company
    pub name: String,
    pub code: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = contracts)]
pub struct NewContract {
    pub company_id: i32,
    pub name: String,
    pub code: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// For API inputs and validation
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ContractInput {
    pub name: String,
    pub code: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    /// Only honored for the super-admin; everybody else creates in their own company
    pub company_id: Option<i32>,
}

#[derive(AsChangeset, Debug, Default, Deserialize, Serialize, TS)]
#[diesel(table_name = contracts)]
#[ts(export)]
pub struct ContractChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub client_name: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
    #[serde(skip)]
    #[ts(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

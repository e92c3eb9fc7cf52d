use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::companies;

text_enum! {
    /// Commercial plan a tenant is subscribed to
    pub enum SubscriptionPlan {
        Free => "FREE",
        Basic => "BASIC",
        Pro => "PRO",
        Enterprise => "ENTERPRISE",
    }
}

text_enum! {
    pub enum SubscriptionStatus {
        Active => "ACTIVE",
        Trial => "TRIAL",
        Suspended => "SUSPENDED",
        Cancelled => "CANCELLED",
    }
}

impl SubscriptionStatus {
    /// Suspended and cancelled tenants cannot log in.
    pub fn allows_login(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }
}

/// A tenant. Every business record belongs to exactly one company.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub document: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<NaiveDate>,
    pub max_users: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = companies)]
pub struct NewCompany {
    pub name: String,
    pub document: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<NaiveDate>,
    pub max_users: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = companies)]
pub struct SubscriptionChanges {
    pub subscription_plan: Option<SubscriptionPlan>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_expires_at: Option<NaiveDate>,
    pub max_users: Option<i32>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Company row enriched with usage counters for the super-admin listing
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanySummary {
    #[serde(flatten)]
    pub company: Company,
    pub user_count: i64,
    pub contract_count: i64,
}

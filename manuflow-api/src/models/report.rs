use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::reports;

text_enum! {
    /// Kanban column of a laudo
    pub enum ReportStatus {
        Draft => "DRAFT",
        InProgress => "IN_PROGRESS",
        PendingApproval => "PENDING_APPROVAL",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Expired => "EXPIRED",
        Renewed => "RENEWED",
    }
}

impl ReportStatus {
    /// Statuses the expiration batch leaves untouched.
    pub fn is_terminal_for_expiration(&self) -> bool {
        matches!(self, ReportStatus::Expired | ReportStatus::Renewed)
    }
}

/// Technical compliance report with an expiration date
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Report {
    pub id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub title: String,
    pub report_type: Option<String>,
    pub issuer: Option<String>,
    #[ts(type = "string | null")]
    pub issue_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub expiration_date: Option<NaiveDate>,
    pub status: ReportStatus,
    pub file_url: Option<String>,
    pub notes: Option<String>,
    #[ts(type = "string | null")]
    pub last_alert_at: Option<NaiveDateTime>,
    pub created_by: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub company_id: i32,
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub title: String,
    pub report_type: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub status: ReportStatus,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ReportInput {
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub title: String,
    pub report_type: Option<String>,
    pub issuer: Option<String>,
    #[ts(type = "string | null")]
    pub issue_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub expiration_date: Option<NaiveDate>,
    pub status: Option<ReportStatus>,
    pub notes: Option<String>,
}

#[derive(AsChangeset, Debug, Default, Deserialize, Serialize, TS)]
#[diesel(table_name = reports)]
#[ts(export)]
pub struct ReportChanges {
    pub asset_id: Option<i32>,
    pub title: Option<String>,
    pub report_type: Option<String>,
    pub issuer: Option<String>,
    #[ts(type = "string | null")]
    pub issue_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub expiration_date: Option<NaiveDate>,
    pub status: Option<ReportStatus>,
    pub notes: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub file_url: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ReportStatusInput {
    pub status: ReportStatus,
}

/// One kanban column
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportColumn {
    pub status: ReportStatus,
    pub reports: Vec<Report>,
}

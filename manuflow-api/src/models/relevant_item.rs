use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{relevant_item_attachments, relevant_items};

text_enum! {
    /// Kanban column of a relevant item
    pub enum RelevantItemStatus {
        Identified => "IDENTIFIED",
        Budgeting => "BUDGETING",
        PendingApproval => "PENDING_APPROVAL",
        Approved => "APPROVED",
        InProgress => "IN_PROGRESS",
        Done => "DONE",
        Rejected => "REJECTED",
    }
}

impl RelevantItemStatus {
    /// Items still requiring attention on the dashboard.
    pub fn is_open(&self) -> bool {
        !matches!(self, RelevantItemStatus::Done | RelevantItemStatus::Rejected)
    }
}

text_enum! {
    pub enum Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

/// Budget / approval tracking item raised at a contract
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = relevant_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct RelevantItem {
    pub id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: RelevantItemStatus,
    pub priority: Priority,
    pub budget_value: Option<f64>,
    pub approved_by: Option<i32>,
    #[ts(type = "string | null")]
    pub approved_at: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = relevant_items)]
pub struct NewRelevantItem {
    pub company_id: i32,
    pub contract_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: RelevantItemStatus,
    pub priority: Priority,
    pub budget_value: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct RelevantItemInput {
    pub contract_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub budget_value: Option<f64>,
    #[ts(type = "string | null")]
    pub due_date: Option<NaiveDate>,
}

#[derive(AsChangeset, Debug, Default, Deserialize, Serialize, TS)]
#[diesel(table_name = relevant_items)]
#[ts(export)]
pub struct RelevantItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub budget_value: Option<f64>,
    #[ts(type = "string | null")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip)]
    #[ts(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct RelevantItemStatusInput {
    pub status: RelevantItemStatus,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RelevantItemColumn {
    pub status: RelevantItemStatus,
    pub items: Vec<RelevantItem>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(RelevantItem, foreign_key = item_id))]
#[diesel(table_name = relevant_item_attachments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct RelevantItemAttachment {
    pub id: i32,
    pub item_id: i32,
    pub file_name: String,
    pub file_url: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = relevant_item_attachments)]
pub struct NewRelevantItemAttachment {
    pub item_id: i32,
    pub file_name: String,
    pub file_url: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: Option<i32>,
    pub created_at: NaiveDateTime,
}

use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{inspection_steps, inspections};

text_enum! {
    /// Progress of a round, an ad-hoc inspection, or one of their steps
    pub enum WorkStatus {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
}

/// Ad-hoc run of an asset checklist
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::asset::Asset))]
#[diesel(table_name = inspections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Inspection {
    pub id: i32,
    pub company_id: i32,
    pub asset_id: i32,
    pub script_id: Option<i32>,
    pub performed_by: i32,
    pub status: WorkStatus,
    pub notes: Option<String>,
    #[ts(type = "string | null")]
    pub started_at: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub completed_at: Option<NaiveDateTime>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = inspections)]
pub struct NewInspection {
    pub company_id: i32,
    pub asset_id: i32,
    pub script_id: Option<i32>,
    pub performed_by: i32,
    pub status: WorkStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(Inspection))]
#[diesel(table_name = inspection_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct InspectionStep {
    pub id: i32,
    pub inspection_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkStatus,
    pub notes: Option<String>,
    #[ts(type = "string | null")]
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = inspection_steps)]
pub struct NewInspectionStep {
    pub inspection_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct InspectionInput {
    pub asset_id: i32,
    pub script_id: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InspectionWithSteps {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub steps: Vec<InspectionStep>,
    /// Index of the first step that is not completed yet
    pub current_step_index: Option<usize>,
}

/// Body of a step save: status button click or next/previous navigation
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct StepUpdateInput {
    pub status: WorkStatus,
    pub notes: Option<String>,
}

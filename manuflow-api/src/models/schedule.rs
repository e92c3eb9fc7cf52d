use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::asset::StepTemplateInput;
use crate::models::inspection::WorkStatus;
use crate::schema::{
    inspection_schedules, schedule_steps, scheduled_inspection_steps, scheduled_inspections,
};

text_enum! {
    /// Work shift a round belongs to; also the primary sort key of the day's rounds
    pub enum Shift {
        Morning => "MORNING",
        Afternoon => "AFTERNOON",
        Night => "NIGHT",
    }
}

impl Shift {
    pub fn rank(&self) -> u8 {
        match self {
            Shift::Morning => 0,
            Shift::Afternoon => 1,
            Shift::Night => 2,
        }
    }
}

/// Recurring inspection rule: which days, which shift, which steps
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = inspection_schedules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct InspectionSchedule {
    pub id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    /// Technician category allowed to run this round; `None` means everybody
    pub category: Option<String>,
    /// ISO weekday numbers, Monday = 1, e.g. "1,3,5"
    pub days_of_week: String,
    pub shift: Shift,
    /// Local start time, `HH:MM`
    pub start_time: String,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = inspection_schedules)]
pub struct NewInspectionSchedule {
    pub company_id: i32,
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub days_of_week: String,
    pub shift: Shift,
    pub start_time: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = inspection_schedules)]
pub struct ScheduleChanges {
    pub asset_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub days_of_week: Option<String>,
    pub shift: Option<Shift>,
    pub start_time: Option<String>,
    pub active: Option<bool>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(InspectionSchedule, foreign_key = schedule_id))]
#[diesel(table_name = schedule_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct ScheduleStep {
    pub id: i32,
    pub schedule_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub asset_id: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = schedule_steps)]
pub struct NewScheduleStep {
    pub schedule_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub asset_id: Option<i32>,
}

/// For API inputs and validation
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ScheduleInput {
    pub contract_id: i32,
    pub asset_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// ISO weekday numbers, Monday = 1
    pub days_of_week: Vec<u32>,
    pub shift: Shift,
    pub start_time: String,
    pub steps: Vec<StepTemplateInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ScheduleUpdateInput {
    pub asset_id: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub days_of_week: Option<Vec<u32>>,
    pub shift: Option<Shift>,
    pub start_time: Option<String>,
    pub active: Option<bool>,
    /// When present, replaces all step templates
    pub steps: Option<Vec<StepTemplateInput>>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScheduleWithSteps {
    #[serde(flatten)]
    pub schedule: InspectionSchedule,
    pub steps: Vec<ScheduleStep>,
}

/// Materialized occurrence of a schedule on one calendar day
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(InspectionSchedule, foreign_key = schedule_id))]
#[diesel(table_name = scheduled_inspections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct ScheduledInspection {
    pub id: i32,
    pub schedule_id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    #[ts(type = "string")]
    pub scheduled_date: NaiveDate,
    pub status: WorkStatus,
    pub assigned_to: Option<i32>,
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
#[diesel(table_name = scheduled_inspections)]
pub struct NewScheduledInspection {
    pub schedule_id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub scheduled_date: NaiveDate,
    pub status: WorkStatus,
    pub assigned_to: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(ScheduledInspection))]
#[diesel(table_name = scheduled_inspection_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct ScheduledInspectionStep {
    pub id: i32,
    pub scheduled_inspection_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub asset_id: Option<i32>,
    pub status: WorkStatus,
    pub notes: Option<String>,
    #[ts(type = "string | null")]
    pub completed_at: Option<NaiveDateTime>,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = scheduled_inspection_steps)]
pub struct NewScheduledInspectionStep {
    pub scheduled_inspection_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub asset_id: Option<i32>,
    pub status: WorkStatus,
    pub updated_at: NaiveDateTime,
}

/// A round as shown to the technician running it
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RondaDetail {
    #[serde(flatten)]
    pub occurrence: ScheduledInspection,
    pub schedule_name: String,
    pub shift: Shift,
    pub start_time: String,
    pub steps: Vec<ScheduledInspectionStep>,
    pub current_step_index: Option<usize>,
}

use chrono::NaiveDateTime;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{asset_script_steps, asset_scripts, assets};

text_enum! {
    pub enum AssetStatus {
        Operational => "OPERATIONAL",
        Maintenance => "MAINTENANCE",
        Inactive => "INACTIVE",
    }
}

/// A piece of equipment installed at a contract
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(crate::models::contract::Contract))]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Asset {
    pub id: i32,
    pub company_id: i32,
    pub contract_id: i32,
    pub name: String,
    pub code: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: AssetStatus,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = assets)]
pub struct NewAsset {
    pub company_id: i32,
    pub contract_id: i32,
    pub name: String,
    pub code: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: AssetStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AssetInput {
    pub contract_id: i32,
    pub name: String,
    pub code: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<AssetStatus>,
}

#[derive(AsChangeset, Debug, Default, Deserialize, Serialize, TS)]
#[diesel(table_name = assets)]
#[ts(export)]
pub struct AssetChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<AssetStatus>,
    #[serde(skip)]
    #[ts(skip)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Checklist template attached to an asset
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(Asset))]
#[diesel(table_name = asset_scripts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct AssetScript {
    pub id: i32,
    pub asset_id: i32,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = asset_scripts)]
pub struct NewAssetScript {
    pub asset_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(AssetScript, foreign_key = script_id))]
#[diesel(table_name = asset_script_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct AssetScriptStep {
    pub id: i32,
    pub script_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = asset_script_steps)]
pub struct NewAssetScriptStep {
    pub script_id: i32,
    pub step_order: i32,
    pub title: String,
    pub description: Option<String>,
}

/// A step as supplied by clients when building a checklist or schedule
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct StepTemplateInput {
    pub title: String,
    pub description: Option<String>,
    pub asset_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AssetScriptInput {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<StepTemplateInput>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AssetScriptWithSteps {
    #[serde(flatten)]
    pub script: AssetScript,
    pub steps: Vec<AssetScriptStep>,
}

use diesel::prelude::*;

use crate::models::{
    AssetScriptStep, Inspection, InspectionStep, InspectionWithSteps, NewInspection,
    NewInspectionStep, StepUpdateInput, WorkStatus,
};
use crate::orm::db::{last_insert_id, now};
use crate::schema::{assets, inspection_steps, inspections};
use crate::tenancy::{ContractScope, apply_scope};
use crate::workflow::{self, RunError, current_step_index};

pub const GENERIC_STEP_TITLE: &str = "General inspection";

/// Starts an inspection of an asset, copying the checklist steps. Without a
/// checklist the inspection gets one generic step.
pub fn create_inspection(
    conn: &mut SqliteConnection,
    company_id: i32,
    asset_id: i32,
    script: Option<(i32, Vec<AssetScriptStep>)>,
    performed_by: i32,
    notes: Option<String>,
) -> QueryResult<InspectionWithSteps> {
    conn.transaction(|conn| {
        let timestamp = now();
        let script_id = script.as_ref().map(|(id, _)| *id);
        diesel::insert_into(inspections::table)
            .values(&NewInspection {
                company_id,
                asset_id,
                script_id,
                performed_by,
                status: WorkStatus::Pending,
                notes,
                created_at: timestamp,
                updated_at: timestamp,
            })
            .execute(conn)?;
        let inspection_id = last_insert_id(conn)?;

        let steps: Vec<NewInspectionStep> = match script {
            Some((_, steps)) if !steps.is_empty() => steps
                .into_iter()
                .map(|s| NewInspectionStep {
                    inspection_id,
                    step_order: s.step_order,
                    title: s.title,
                    description: s.description,
                    status: WorkStatus::Pending,
                })
                .collect(),
            _ => vec![NewInspectionStep {
                inspection_id,
                step_order: 1,
                title: GENERIC_STEP_TITLE.to_string(),
                description: None,
                status: WorkStatus::Pending,
            }],
        };
        diesel::insert_into(inspection_steps::table)
            .values(&steps)
            .execute(conn)?;

        get_inspection_with_steps(conn, inspection_id)?.ok_or(diesel::result::Error::NotFound)
    })
}

pub fn get_inspection(conn: &mut SqliteConnection, inspection_id: i32) -> QueryResult<Option<Inspection>> {
    inspections::table
        .find(inspection_id)
        .select(Inspection::as_select())
        .first(conn)
        .optional()
}

fn load_steps(conn: &mut SqliteConnection, inspection_id: i32) -> QueryResult<Vec<InspectionStep>> {
    inspection_steps::table
        .filter(inspection_steps::inspection_id.eq(inspection_id))
        .order((inspection_steps::step_order.asc(), inspection_steps::id.asc()))
        .select(InspectionStep::as_select())
        .load(conn)
}

pub fn get_inspection_with_steps(
    conn: &mut SqliteConnection,
    inspection_id: i32,
) -> QueryResult<Option<InspectionWithSteps>> {
    let Some(inspection) = get_inspection(conn, inspection_id)? else {
        return Ok(None);
    };
    let steps = load_steps(conn, inspection_id)?;
    let current_step_index = current_step_index(&steps);
    Ok(Some(InspectionWithSteps {
        inspection,
        steps,
        current_step_index,
    }))
}

/// Contract the inspected asset belongs to.
pub fn inspection_contract_id(conn: &mut SqliteConnection, inspection: &Inspection) -> QueryResult<i32> {
    assets::table
        .find(inspection.asset_id)
        .select(assets::contract_id)
        .first(conn)
}

/// Inspections visible through `scope`, newest first.
pub fn list_inspections(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    asset_id: Option<i32>,
) -> QueryResult<Vec<Inspection>> {
    let mut query = inspections::table
        .inner_join(assets::table)
        .filter(assets::deleted_at.is_null())
        .select(Inspection::as_select())
        .into_boxed();
    query = apply_scope!(query, scope, inspections::company_id, assets::contract_id);
    if let Some(asset_id) = asset_id {
        query = query.filter(inspections::asset_id.eq(asset_id));
    }
    query
        .order((inspections::created_at.desc(), inspections::id.desc()))
        .load(conn)
}

/// Saves a step and moves a pending inspection to IN_PROGRESS.
pub fn update_inspection_step(
    conn: &mut SqliteConnection,
    inspection: &Inspection,
    step_id: i32,
    input: StepUpdateInput,
) -> Result<InspectionWithSteps, RunError> {
    let run_status = workflow::after_step_update(inspection.status)?;
    conn.transaction(|conn| {
        let step: InspectionStep = inspection_steps::table
            .filter(inspection_steps::id.eq(step_id))
            .filter(inspection_steps::inspection_id.eq(inspection.id))
            .select(InspectionStep::as_select())
            .first(conn)
            .optional()?
            .ok_or(RunError::StepNotFound)?;

        let timestamp = now();
        let completed_at =
            workflow::step_completed_at(step.status, step.completed_at, input.status, timestamp);
        diesel::update(inspection_steps::table.find(step.id))
            .set((
                inspection_steps::status.eq(input.status),
                inspection_steps::notes.eq(input.notes.or(step.notes)),
                inspection_steps::completed_at.eq(completed_at),
            ))
            .execute(conn)?;

        if inspection.status != run_status {
            diesel::update(inspections::table.find(inspection.id))
                .set((
                    inspections::status.eq(run_status),
                    inspections::started_at.eq(inspection.started_at.or(Some(timestamp))),
                    inspections::updated_at.eq(timestamp),
                ))
                .execute(conn)?;
        }

        get_inspection_with_steps(conn, inspection.id)?
            .ok_or(RunError::Database(diesel::result::Error::NotFound))
    })
}

/// Completes an inspection once every step is completed.
pub fn complete_inspection(
    conn: &mut SqliteConnection,
    inspection: &Inspection,
) -> Result<InspectionWithSteps, RunError> {
    let steps = load_steps(conn, inspection.id)?;
    let status = workflow::complete(inspection.status, &steps)?;
    let timestamp = now();
    diesel::update(inspections::table.find(inspection.id))
        .set((
            inspections::status.eq(status),
            inspections::started_at.eq(inspection.started_at.or(Some(timestamp))),
            inspections::completed_at.eq(Some(timestamp)),
            inspections::updated_at.eq(timestamp),
        ))
        .execute(conn)?;
    Ok(get_inspection_with_steps(conn, inspection.id)?
        .ok_or(RunError::Database(diesel::result::Error::NotFound))?)
}

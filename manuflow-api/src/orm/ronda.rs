//! Daily rounds: materialization of schedule occurrences and their
//! step-by-step execution.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::models::{
    InspectionSchedule, NewScheduledInspection, NewScheduledInspectionStep, RondaDetail,
    ScheduledInspection, ScheduledInspectionStep, StepUpdateInput, User, UserRole, WorkStatus,
};
use crate::orm::db::{last_insert_id, now};
use crate::orm::schedule::get_schedule_steps;
use crate::orm::user::get_user_contract_ids;
use crate::recurrence::WeekdaySet;
use crate::schema::{contracts, inspection_schedules, scheduled_inspection_steps, scheduled_inspections};
use crate::tenancy::{ContractScope, apply_scope};
use crate::workflow::{self, RunError, current_step_index};

/// Who asks for the rounds of a day. Decides which schedules are visible
/// and who a newly created occurrence is assigned to.
#[derive(Debug, Clone)]
pub struct RondaViewer {
    pub company_id: i32,
    /// `None` means every contract of the company.
    pub contract_ids: Option<Vec<i32>>,
    /// Set for technicians: their id and category.
    pub technician: Option<(i32, Option<String>)>,
}

impl RondaViewer {
    pub fn for_user(conn: &mut SqliteConnection, user: &User) -> QueryResult<RondaViewer> {
        let contract_ids = if user.role.is_assignment_scoped() {
            Some(get_user_contract_ids(conn, user.id)?)
        } else {
            None
        };
        let technician = (user.role == UserRole::Technician).then(|| (user.id, user.category.clone()));
        Ok(RondaViewer {
            company_id: user.company_id,
            contract_ids,
            technician,
        })
    }

    /// Sees every schedule of the company and assigns nobody.
    pub fn company_manager(company_id: i32) -> RondaViewer {
        RondaViewer {
            company_id,
            contract_ids: None,
            technician: None,
        }
    }

    fn can_see(&self, schedule: &InspectionSchedule) -> bool {
        if let Some(ids) = &self.contract_ids {
            if !ids.contains(&schedule.contract_id) {
                return false;
            }
        }
        match (&self.technician, &schedule.category) {
            (Some(_), None) | (None, _) => true,
            (Some((_, Some(mine))), Some(required)) => mine.eq_ignore_ascii_case(required),
            (Some((_, None)), Some(_)) => false,
        }
    }

    fn assignee(&self) -> Option<i32> {
        self.technician.as_ref().map(|(id, _)| *id)
    }

    /// Whether the viewer may open an occurrence of `schedule`. A technician
    /// keeps the rounds assigned to them even after a category change.
    pub fn can_open(&self, schedule: &InspectionSchedule, occurrence: &ScheduledInspection) -> bool {
        let assigned_to_me = occurrence.assigned_to.is_some() && occurrence.assigned_to == self.assignee();
        assigned_to_me || self.can_see(schedule)
    }
}

fn find_occurrence(
    conn: &mut SqliteConnection,
    schedule_id: i32,
    date: NaiveDate,
) -> QueryResult<Option<ScheduledInspection>> {
    scheduled_inspections::table
        .filter(scheduled_inspections::schedule_id.eq(schedule_id))
        .filter(scheduled_inspections::scheduled_date.eq(date))
        .select(ScheduledInspection::as_select())
        .first(conn)
        .optional()
}

fn create_occurrence(
    conn: &mut SqliteConnection,
    schedule: &InspectionSchedule,
    date: NaiveDate,
    assigned_to: Option<i32>,
) -> QueryResult<ScheduledInspection> {
    conn.transaction(|conn| {
        let timestamp = now();
        diesel::insert_into(scheduled_inspections::table)
            .values(&NewScheduledInspection {
                schedule_id: schedule.id,
                company_id: schedule.company_id,
                contract_id: schedule.contract_id,
                scheduled_date: date,
                status: WorkStatus::Pending,
                assigned_to,
                created_at: timestamp,
                updated_at: timestamp,
            })
            .execute(conn)?;
        let occurrence_id = last_insert_id(conn)?;

        let steps: Vec<NewScheduledInspectionStep> = get_schedule_steps(conn, schedule.id)?
            .into_iter()
            .map(|s| NewScheduledInspectionStep {
                scheduled_inspection_id: occurrence_id,
                step_order: s.step_order,
                title: s.title,
                description: s.description,
                asset_id: s.asset_id.or(schedule.asset_id),
                status: WorkStatus::Pending,
                updated_at: timestamp,
            })
            .collect();
        if !steps.is_empty() {
            diesel::insert_into(scheduled_inspection_steps::table)
                .values(&steps)
                .execute(conn)?;
        }

        scheduled_inspections::table
            .find(occurrence_id)
            .select(ScheduledInspection::as_select())
            .first(conn)
    })
}

/// Returns the occurrence of `schedule` on `date`, creating it with a copy
/// of the step templates when missing.
pub fn find_or_create_occurrence(
    conn: &mut SqliteConnection,
    schedule: &InspectionSchedule,
    date: NaiveDate,
    assigned_to: Option<i32>,
) -> QueryResult<ScheduledInspection> {
    if let Some(existing) = find_occurrence(conn, schedule.id, date)? {
        return Ok(existing);
    }
    create_or_reread_occurrence(conn, schedule, date, assigned_to)
}

/// A concurrent insert of the same occurrence trips the unique index on
/// (schedule, day) and is answered with a re-read of the winner's row.
fn create_or_reread_occurrence(
    conn: &mut SqliteConnection,
    schedule: &InspectionSchedule,
    date: NaiveDate,
    assigned_to: Option<i32>,
) -> QueryResult<ScheduledInspection> {
    match create_occurrence(conn, schedule, date, assigned_to) {
        Ok(created) => {
            info!(
                "[rondas] Materialized schedule {} for {} as occurrence {}",
                schedule.id, date, created.id
            );
            Ok(created)
        }
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            find_occurrence(conn, schedule.id, date)?.ok_or(DieselError::NotFound)
        }
        Err(e) => Err(e),
    }
}

/// Active schedules of the viewer's company that run on `date`.
fn schedules_due_on(
    conn: &mut SqliteConnection,
    viewer: &RondaViewer,
    date: NaiveDate,
) -> QueryResult<Vec<InspectionSchedule>> {
    let schedules: Vec<InspectionSchedule> = inspection_schedules::table
        .inner_join(contracts::table)
        .filter(inspection_schedules::company_id.eq(viewer.company_id))
        .filter(inspection_schedules::active.eq(true))
        .filter(inspection_schedules::deleted_at.is_null())
        .filter(contracts::deleted_at.is_null())
        .select(InspectionSchedule::as_select())
        .load(conn)?;

    Ok(schedules
        .into_iter()
        .filter(|schedule| match schedule.days_of_week.parse::<WeekdaySet>() {
            Ok(days) => days.matches(date),
            Err(e) => {
                warn!("[rondas] Skipping schedule {}: {}", schedule.id, e);
                false
            }
        })
        .filter(|schedule| viewer.can_see(schedule))
        .collect())
}

/// Materializes and returns the rounds the viewer has on `date`, ordered by
/// shift, start time and schedule name.
pub fn materialize_for_date(
    conn: &mut SqliteConnection,
    viewer: &RondaViewer,
    date: NaiveDate,
) -> QueryResult<Vec<RondaDetail>> {
    let mut schedules = schedules_due_on(conn, viewer, date)?;
    schedules.sort_by(|a, b| {
        (a.shift.rank(), &a.start_time, a.name.to_lowercase())
            .cmp(&(b.shift.rank(), &b.start_time, b.name.to_lowercase()))
    });

    schedules
        .iter()
        .map(|schedule| {
            let occurrence = find_or_create_occurrence(conn, schedule, date, viewer.assignee())?;
            let steps = get_ronda_steps(conn, occurrence.id)?;
            Ok(build_detail(occurrence, schedule, steps))
        })
        .collect()
}

fn build_detail(
    occurrence: ScheduledInspection,
    schedule: &InspectionSchedule,
    steps: Vec<ScheduledInspectionStep>,
) -> RondaDetail {
    let current_step_index = current_step_index(&steps);
    RondaDetail {
        occurrence,
        schedule_name: schedule.name.clone(),
        shift: schedule.shift,
        start_time: schedule.start_time.clone(),
        steps,
        current_step_index,
    }
}

pub fn get_ronda(conn: &mut SqliteConnection, ronda_id: i32) -> QueryResult<Option<ScheduledInspection>> {
    scheduled_inspections::table
        .find(ronda_id)
        .select(ScheduledInspection::as_select())
        .first(conn)
        .optional()
}

pub fn get_ronda_steps(
    conn: &mut SqliteConnection,
    ronda_id: i32,
) -> QueryResult<Vec<ScheduledInspectionStep>> {
    scheduled_inspection_steps::table
        .filter(scheduled_inspection_steps::scheduled_inspection_id.eq(ronda_id))
        .order((
            scheduled_inspection_steps::step_order.asc(),
            scheduled_inspection_steps::id.asc(),
        ))
        .select(ScheduledInspectionStep::as_select())
        .load(conn)
}

/// The schedule is read even when it was deleted afterwards so history
/// keeps its name.
fn schedule_of(conn: &mut SqliteConnection, occurrence: &ScheduledInspection) -> QueryResult<InspectionSchedule> {
    inspection_schedules::table
        .find(occurrence.schedule_id)
        .select(InspectionSchedule::as_select())
        .first(conn)
}

pub fn can_open_ronda(
    conn: &mut SqliteConnection,
    viewer: &RondaViewer,
    occurrence: &ScheduledInspection,
) -> QueryResult<bool> {
    let schedule = schedule_of(conn, occurrence)?;
    Ok(viewer.can_open(&schedule, occurrence))
}

/// Occurrence with its ordered steps.
pub fn ronda_detail(conn: &mut SqliteConnection, occurrence: ScheduledInspection) -> QueryResult<RondaDetail> {
    let schedule = schedule_of(conn, &occurrence)?;
    let steps = get_ronda_steps(conn, occurrence.id)?;
    Ok(build_detail(occurrence, &schedule, steps))
}

pub fn get_ronda_detail(conn: &mut SqliteConnection, ronda_id: i32) -> QueryResult<Option<RondaDetail>> {
    match get_ronda(conn, ronda_id)? {
        Some(occurrence) => ronda_detail(conn, occurrence).map(Some),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Clone)]
pub struct RondaFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<WorkStatus>,
    pub contract_id: Option<i32>,
    /// Keeps only the rondas this viewer may open.
    pub seen_by: Option<RondaViewer>,
}

/// Past and present occurrences visible through `scope`, newest day first.
pub fn list_rondas(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    filter: &RondaFilter,
) -> QueryResult<Vec<RondaDetail>> {
    let mut query = scheduled_inspections::table
        .select(ScheduledInspection::as_select())
        .into_boxed();
    query = apply_scope!(
        query,
        scope,
        scheduled_inspections::company_id,
        scheduled_inspections::contract_id
    );
    if let Some(from) = filter.from {
        query = query.filter(scheduled_inspections::scheduled_date.ge(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(scheduled_inspections::scheduled_date.le(to));
    }
    if let Some(status) = filter.status {
        query = query.filter(scheduled_inspections::status.eq(status));
    }
    if let Some(contract_id) = filter.contract_id {
        query = query.filter(scheduled_inspections::contract_id.eq(contract_id));
    }
    let occurrences = query
        .order((
            scheduled_inspections::scheduled_date.desc(),
            scheduled_inspections::id.desc(),
        ))
        .load(conn)?;

    let mut details = Vec::with_capacity(occurrences.len());
    for occurrence in occurrences {
        let schedule = schedule_of(conn, &occurrence)?;
        if filter.seen_by.as_ref().is_some_and(|viewer| !viewer.can_open(&schedule, &occurrence)) {
            continue;
        }
        let steps = get_ronda_steps(conn, occurrence.id)?;
        details.push(build_detail(occurrence, &schedule, steps));
    }
    Ok(details)
}

/// Moves the run to IN_PROGRESS, keeping the first `started_at`, and hands
/// an unassigned run to `user_id`.
fn mark_started(
    conn: &mut SqliteConnection,
    occurrence: &ScheduledInspection,
    status: WorkStatus,
    user_id: i32,
) -> QueryResult<()> {
    let timestamp = now();
    diesel::update(scheduled_inspections::table.find(occurrence.id))
        .set((
            scheduled_inspections::status.eq(status),
            scheduled_inspections::started_at.eq(occurrence.started_at.or(Some(timestamp))),
            scheduled_inspections::assigned_to.eq(occurrence.assigned_to.or(Some(user_id))),
            scheduled_inspections::updated_at.eq(timestamp),
        ))
        .execute(conn)?;
    Ok(())
}

fn reload_detail(conn: &mut SqliteConnection, ronda_id: i32) -> Result<RondaDetail, RunError> {
    get_ronda_detail(conn, ronda_id)?.ok_or(RunError::Database(DieselError::NotFound))
}

pub fn start_ronda(
    conn: &mut SqliteConnection,
    occurrence: &ScheduledInspection,
    user_id: i32,
) -> Result<RondaDetail, RunError> {
    let status = workflow::start(occurrence.status)?;
    mark_started(conn, occurrence, status, user_id)?;
    reload_detail(conn, occurrence.id)
}

/// Saves one step. Saving a step of a pending run starts it.
pub fn update_ronda_step(
    conn: &mut SqliteConnection,
    occurrence: &ScheduledInspection,
    step_id: i32,
    input: StepUpdateInput,
    user_id: i32,
) -> Result<RondaDetail, RunError> {
    let run_status = workflow::after_step_update(occurrence.status)?;
    conn.transaction(|conn| {
        let step: ScheduledInspectionStep = scheduled_inspection_steps::table
            .filter(scheduled_inspection_steps::id.eq(step_id))
            .filter(scheduled_inspection_steps::scheduled_inspection_id.eq(occurrence.id))
            .select(ScheduledInspectionStep::as_select())
            .first(conn)
            .optional()?
            .ok_or(RunError::StepNotFound)?;

        let timestamp = now();
        let completed_at =
            workflow::step_completed_at(step.status, step.completed_at, input.status, timestamp);
        diesel::update(scheduled_inspection_steps::table.find(step.id))
            .set((
                scheduled_inspection_steps::status.eq(input.status),
                scheduled_inspection_steps::notes.eq(input.notes.or(step.notes)),
                scheduled_inspection_steps::completed_at.eq(completed_at),
                scheduled_inspection_steps::updated_at.eq(timestamp),
            ))
            .execute(conn)?;

        if occurrence.status != run_status || occurrence.assigned_to.is_none() {
            mark_started(conn, occurrence, run_status, user_id)?;
        }
        reload_detail(conn, occurrence.id)
    })
}

/// Completes the run once every step is COMPLETED.
pub fn complete_ronda(
    conn: &mut SqliteConnection,
    occurrence: &ScheduledInspection,
) -> Result<RondaDetail, RunError> {
    let steps = get_ronda_steps(conn, occurrence.id)?;
    let status = workflow::complete(occurrence.status, &steps)?;
    let timestamp = now();
    diesel::update(scheduled_inspections::table.find(occurrence.id))
        .set((
            scheduled_inspections::status.eq(status),
            scheduled_inspections::started_at.eq(occurrence.started_at.or(Some(timestamp))),
            scheduled_inspections::completed_at.eq(Some(timestamp)),
            scheduled_inspections::updated_at.eq(timestamp),
        ))
        .execute(conn)?;
    reload_detail(conn, occurrence.id)
}

use diesel::prelude::*;

use crate::models::{
    NewRelevantItem, NewRelevantItemAttachment, Priority, RelevantItem, RelevantItemAttachment,
    RelevantItemChanges, RelevantItemColumn, RelevantItemInput, RelevantItemStatus,
};
use crate::orm::db::{last_insert_id, now};
use crate::schema::{relevant_item_attachments, relevant_items};
use crate::tenancy::{ContractScope, apply_scope};

pub fn insert_item(
    conn: &mut SqliteConnection,
    company_id: i32,
    created_by: Option<i32>,
    input: RelevantItemInput,
) -> QueryResult<RelevantItem> {
    let timestamp = now();
    diesel::insert_into(relevant_items::table)
        .values(&NewRelevantItem {
            company_id,
            contract_id: input.contract_id,
            title: input.title.trim().to_string(),
            description: input.description,
            status: RelevantItemStatus::Identified,
            priority: input.priority.unwrap_or(Priority::Medium),
            budget_value: input.budget_value,
            due_date: input.due_date,
            created_by,
            created_at: timestamp,
            updated_at: timestamp,
        })
        .execute(conn)?;
    let item_id = last_insert_id(conn)?;
    relevant_items::table
        .find(item_id)
        .select(RelevantItem::as_select())
        .first(conn)
}

pub fn get_item(conn: &mut SqliteConnection, item_id: i32) -> QueryResult<Option<RelevantItem>> {
    relevant_items::table
        .filter(relevant_items::id.eq(item_id))
        .filter(relevant_items::deleted_at.is_null())
        .select(RelevantItem::as_select())
        .first(conn)
        .optional()
}

#[derive(Debug, Default, Clone)]
pub struct RelevantItemFilter {
    pub contract_id: Option<i32>,
    pub status: Option<RelevantItemStatus>,
    pub priority: Option<Priority>,
}

/// Live items visible through `scope`, newest first.
pub fn list_items(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    filter: &RelevantItemFilter,
) -> QueryResult<Vec<RelevantItem>> {
    let mut query = relevant_items::table
        .filter(relevant_items::deleted_at.is_null())
        .select(RelevantItem::as_select())
        .into_boxed();
    query = apply_scope!(query, scope, relevant_items::company_id, relevant_items::contract_id);
    if let Some(contract_id) = filter.contract_id {
        query = query.filter(relevant_items::contract_id.eq(contract_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(relevant_items::status.eq(status));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(relevant_items::priority.eq(priority));
    }
    query
        .order((relevant_items::created_at.desc(), relevant_items::id.desc()))
        .load(conn)
}

pub fn item_kanban(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
) -> QueryResult<Vec<RelevantItemColumn>> {
    let items = list_items(conn, scope, &RelevantItemFilter::default())?;
    Ok(RelevantItemStatus::ALL
        .iter()
        .map(|status| RelevantItemColumn {
            status: *status,
            items: items.iter().filter(|i| i.status == *status).cloned().collect(),
        })
        .collect())
}

pub fn update_item(
    conn: &mut SqliteConnection,
    item_id: i32,
    mut changes: RelevantItemChanges,
) -> QueryResult<RelevantItem> {
    changes.title = changes.title.map(|t| t.trim().to_string());
    changes.updated_at = Some(now());
    diesel::update(relevant_items::table.find(item_id))
        .set(&changes)
        .execute(conn)?;
    relevant_items::table
        .find(item_id)
        .select(RelevantItem::as_select())
        .first(conn)
}

/// Kanban move. Moving to APPROVED records who approved and when; the
/// stamp stays when the item later moves on.
pub fn set_item_status(
    conn: &mut SqliteConnection,
    item_id: i32,
    status: RelevantItemStatus,
    user_id: i32,
) -> QueryResult<RelevantItem> {
    let timestamp = now();
    let target = relevant_items::table.find(item_id);
    if status == RelevantItemStatus::Approved {
        diesel::update(target)
            .set((
                relevant_items::status.eq(status),
                relevant_items::approved_by.eq(Some(user_id)),
                relevant_items::approved_at.eq(Some(timestamp)),
                relevant_items::updated_at.eq(timestamp),
            ))
            .execute(conn)?;
    } else {
        diesel::update(target)
            .set((
                relevant_items::status.eq(status),
                relevant_items::updated_at.eq(timestamp),
            ))
            .execute(conn)?;
    }
    relevant_items::table
        .find(item_id)
        .select(RelevantItem::as_select())
        .first(conn)
}

pub fn soft_delete_item(conn: &mut SqliteConnection, item_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        relevant_items::table
            .filter(relevant_items::id.eq(item_id))
            .filter(relevant_items::deleted_at.is_null()),
    )
    .set((
        relevant_items::deleted_at.eq(Some(timestamp)),
        relevant_items::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}

pub fn insert_attachment(
    conn: &mut SqliteConnection,
    attachment: NewRelevantItemAttachment,
) -> QueryResult<RelevantItemAttachment> {
    diesel::insert_into(relevant_item_attachments::table)
        .values(&attachment)
        .execute(conn)?;
    let id = last_insert_id(conn)?;
    relevant_item_attachments::table
        .find(id)
        .select(RelevantItemAttachment::as_select())
        .first(conn)
}

pub fn list_attachments(
    conn: &mut SqliteConnection,
    item_id: i32,
) -> QueryResult<Vec<RelevantItemAttachment>> {
    relevant_item_attachments::table
        .filter(relevant_item_attachments::item_id.eq(item_id))
        .filter(relevant_item_attachments::deleted_at.is_null())
        .order(relevant_item_attachments::id.asc())
        .select(RelevantItemAttachment::as_select())
        .load(conn)
}

/// Soft deletes an attachment of `item_id`; `false` when it does not
/// belong to the item or is already gone.
pub fn soft_delete_attachment(
    conn: &mut SqliteConnection,
    item_id: i32,
    attachment_id: i32,
) -> QueryResult<bool> {
    let rows = diesel::update(
        relevant_item_attachments::table
            .filter(relevant_item_attachments::id.eq(attachment_id))
            .filter(relevant_item_attachments::item_id.eq(item_id))
            .filter(relevant_item_attachments::deleted_at.is_null()),
    )
    .set(relevant_item_attachments::deleted_at.eq(Some(now())))
    .execute(conn)?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::orm::testing::{
        insert_test_company, insert_test_contract, insert_test_user, setup_test_db,
    };

    fn input(contract_id: i32, title: &str) -> RelevantItemInput {
        RelevantItemInput {
            contract_id,
            title: title.to_string(),
            description: None,
            priority: None,
            budget_value: Some(1500.0),
            due_date: None,
        }
    }

    #[test]
    fn test_new_item_defaults() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let item = insert_item(&mut conn, acme.id, None, input(tower.id, " Roof leak ")).expect("insert");
        assert_eq!(item.title, "Roof leak");
        assert_eq!(item.status, RelevantItemStatus::Identified);
        assert_eq!(item.priority, Priority::Medium);
        assert!(item.approved_by.is_none());
    }

    #[test]
    fn test_approval_stamps_approver() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let admin = insert_test_user(&mut conn, acme.id, "admin@acme.com", UserRole::Admin, None);
        let item = insert_item(&mut conn, acme.id, None, input(tower.id, "Pump")).expect("insert");

        let budgeting = set_item_status(&mut conn, item.id, RelevantItemStatus::Budgeting, admin.id)
            .expect("move");
        assert!(budgeting.approved_at.is_none());

        let approved = set_item_status(&mut conn, item.id, RelevantItemStatus::Approved, admin.id)
            .expect("move");
        assert_eq!(approved.approved_by, Some(admin.id));
        assert!(approved.approved_at.is_some());

        let done = set_item_status(&mut conn, item.id, RelevantItemStatus::Done, admin.id).expect("move");
        assert_eq!(done.approved_by, Some(admin.id));

        let board = item_kanban(&mut conn, &ContractScope::Company(acme.id)).expect("kanban");
        assert_eq!(board.len(), RelevantItemStatus::ALL.len());
        let done_col = board.iter().find(|c| c.status == RelevantItemStatus::Done).expect("column");
        assert_eq!(done_col.items.len(), 1);
    }

    #[test]
    fn test_attachments_soft_delete_per_item() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let a = insert_item(&mut conn, acme.id, None, input(tower.id, "A")).expect("insert");
        let b = insert_item(&mut conn, acme.id, None, input(tower.id, "B")).expect("insert");
        let att = insert_attachment(
            &mut conn,
            NewRelevantItemAttachment {
                item_id: a.id,
                file_name: "quote.pdf".to_string(),
                file_url: "/uploads/x-quote.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                size_bytes: 42,
                uploaded_by: None,
                created_at: now(),
            },
        )
        .expect("attach");

        assert!(!soft_delete_attachment(&mut conn, b.id, att.id).expect("delete"));
        assert_eq!(list_attachments(&mut conn, a.id).expect("list").len(), 1);
        assert!(soft_delete_attachment(&mut conn, a.id, att.id).expect("delete"));
        assert!(list_attachments(&mut conn, a.id).expect("list").is_empty());
    }
}

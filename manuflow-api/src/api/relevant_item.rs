//! Relevant item endpoints: the board of issues found in the field that
//! need a budget, an approval and follow-up work.
//!
//! # Authorization Rules
//! - Anyone authenticated reads and reports items on visible contracts and
//!   attaches files to them
//! - Managers and supervisors edit, move and delete items
//! - Only managers move an item to APPROVED

use diesel::SqliteConnection;
use rocket::Route;
use rocket::State;
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::api::FileUpload;
use crate::error::{ApiError, ApiResult};
use crate::logged_json::LoggedJson;
use crate::models::{
    NewRelevantItemAttachment, Priority, RelevantItem, RelevantItemAttachment, RelevantItemChanges,
    RelevantItemColumn, RelevantItemInput, RelevantItemStatus, RelevantItemStatusInput, User,
};
use crate::orm::relevant_item::{
    RelevantItemFilter, get_item, insert_attachment, insert_item, item_kanban, list_attachments,
    list_items, set_item_status, soft_delete_attachment, soft_delete_item, update_item,
};
use crate::orm::{DbConn, now};
use crate::session_guards::AuthenticatedUser;
use crate::storage::BlobStorage;
use crate::tenancy::{ContractScope, ensure_row_access, is_manager, load_accessible_contract, load_editable_contract};

fn load_visible_item(conn: &mut SqliteConnection, user: &User, item_id: i32) -> ApiResult<RelevantItem> {
    let item = get_item(conn, item_id)?.ok_or_else(|| ApiError::not_found("Relevant item not found"))?;
    ensure_row_access(conn, user, item.company_id, item.contract_id, "Relevant item")?;
    Ok(item)
}

fn load_editable_item(conn: &mut SqliteConnection, user: &User, item_id: i32) -> ApiResult<RelevantItem> {
    let item = load_visible_item(conn, user, item_id)?;
    load_editable_contract(conn, user, item.contract_id)?;
    Ok(item)
}

fn validate_budget(budget: Option<f64>) -> ApiResult<()> {
    if budget.is_some_and(|b| !b.is_finite() || b < 0.0) {
        return Err(ApiError::bad_request("Budget must be a non-negative number"));
    }
    Ok(())
}

/// List Relevant Items endpoint.
///
/// - **URL:** `/api/1/relevant-items[?contract_id=<id>&status=<status>&priority=<priority>]`
/// - **Method:** `GET`
/// - **Purpose:** Live items on visible contracts, newest first
/// - **Authentication:** Required
#[get("/1/relevant-items?<contract_id>&<status>&<priority>")]
pub async fn list_items_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    contract_id: Option<i32>,
    status: Option<&str>,
    priority: Option<&str>,
) -> ApiResult<Json<Vec<RelevantItem>>> {
    let filter = RelevantItemFilter {
        contract_id,
        status: status
            .map(|s| s.parse::<RelevantItemStatus>())
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid status"))?,
        priority: priority
            .map(|p| p.parse::<Priority>())
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid priority"))?,
    };
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(list_items(conn, &scope, &filter)?))
    })
    .await
}

/// Relevant Item Kanban endpoint.
///
/// - **URL:** `/api/1/relevant-items/kanban`
/// - **Method:** `GET`
/// - **Purpose:** Visible items grouped into one column per status
/// - **Authentication:** Required
#[get("/1/relevant-items/kanban")]
pub async fn item_kanban_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
) -> ApiResult<Json<Vec<RelevantItemColumn>>> {
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(item_kanban(conn, &scope)?))
    })
    .await
}

/// Create Relevant Item endpoint.
///
/// - **URL:** `/api/1/relevant-items`
/// - **Method:** `POST`
/// - **Authentication:** Required; the contract must be visible
///
/// # Request Format
///
/// ```json
/// {
///   "contract_id": 1,
///   "title": "Replace cooling tower fan belt",
///   "priority": "HIGH",
///   "budget_value": 1800.0,
///   "due_date": "2025-08-01"
/// }
/// ```
///
/// Items start as IDENTIFIED; `priority` defaults to MEDIUM.
#[post("/1/relevant-items", data = "<input>")]
pub async fn create_item(
    db: DbConn,
    auth_user: AuthenticatedUser,
    input: LoggedJson<RelevantItemInput>,
) -> ApiResult<status::Created<Json<RelevantItem>>> {
    let input = input.into_inner();
    if input.title.trim().is_empty() {
        return Err(ApiError::bad_request("Item title is required"));
    }
    validate_budget(input.budget_value)?;
    let item = db
        .run(move |conn| -> ApiResult<RelevantItem> {
            let contract = load_accessible_contract(conn, &auth_user.user, input.contract_id)?;
            let item = insert_item(conn, contract.company_id, Some(auth_user.user.id), input)?;
            info!(
                "[relevant-items] '{}' reported item {} ('{}')",
                auth_user.user.email, item.id, item.title
            );
            Ok(item)
        })
        .await?;
    let location = format!("/api/1/relevant-items/{}", item.id);
    Ok(status::Created::new(location).body(Json(item)))
}

/// Get Relevant Item endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/relevant-items/<item_id>")]
pub async fn get_item_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    item_id: i32,
) -> ApiResult<Json<RelevantItem>> {
    db.run(move |conn| load_visible_item(conn, &auth_user.user, item_id).map(Json))
        .await
}

/// Update Relevant Item endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>`
/// - **Method:** `PUT`
/// - **Purpose:** Partial update of title, description, priority, budget
///   and due date
/// - **Authorization:** Managers and supervisors on the item's contract
#[put("/1/relevant-items/<item_id>", data = "<changes>")]
pub async fn update_item_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    item_id: i32,
    changes: LoggedJson<RelevantItemChanges>,
) -> ApiResult<Json<RelevantItem>> {
    let changes = changes.into_inner();
    if changes.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("Item title cannot be empty"));
    }
    validate_budget(changes.budget_value)?;
    db.run(move |conn| {
        let item = load_editable_item(conn, &auth_user.user, item_id)?;
        Ok(Json(update_item(conn, item.id, changes)?))
    })
    .await
}

/// Move Relevant Item endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>/status`
/// - **Method:** `PATCH`
/// - **Purpose:** Kanban move
/// - **Authorization:** Managers and supervisors on the item's contract;
///   APPROVED is reserved to managers
///
/// # Request Format
///
/// ```json
/// { "status": "APPROVED" }
/// ```
///
/// Moving to APPROVED records the approver and the time.
#[patch("/1/relevant-items/<item_id>/status", data = "<input>")]
pub async fn move_item(
    db: DbConn,
    auth_user: AuthenticatedUser,
    item_id: i32,
    input: LoggedJson<RelevantItemStatusInput>,
) -> ApiResult<Json<RelevantItem>> {
    let status = input.into_inner().status;
    if status == RelevantItemStatus::Approved && !is_manager(&auth_user.user) {
        return Err(ApiError::forbidden("Only managers may approve items"));
    }
    db.run(move |conn| {
        let item = load_editable_item(conn, &auth_user.user, item_id)?;
        let moved = set_item_status(conn, item.id, status, auth_user.user.id)?;
        info!(
            "[relevant-items] '{}' moved item {} from {} to {}",
            auth_user.user.email, item.id, item.status, moved.status
        );
        Ok(Json(moved))
    })
    .await
}

/// Delete Relevant Item endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the item
/// - **Authorization:** Managers and supervisors on the item's contract
#[delete("/1/relevant-items/<item_id>")]
pub async fn delete_item(db: DbConn, auth_user: AuthenticatedUser, item_id: i32) -> ApiResult<Status> {
    db.run(move |conn| {
        let item = load_editable_item(conn, &auth_user.user, item_id)?;
        soft_delete_item(conn, item.id)?;
        warn!("[relevant-items] '{}' deleted item {}", auth_user.user.email, item.id);
        Ok(Status::NoContent)
    })
    .await
}

/// List Attachments endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>/attachments`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/relevant-items/<item_id>/attachments")]
pub async fn list_attachments_endpoint(
    db: DbConn,
    auth_user: AuthenticatedUser,
    item_id: i32,
) -> ApiResult<Json<Vec<RelevantItemAttachment>>> {
    db.run(move |conn| {
        let item = load_visible_item(conn, &auth_user.user, item_id)?;
        Ok(Json(list_attachments(conn, item.id)?))
    })
    .await
}

/// Upload Attachment endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>/attachments`
/// - **Method:** `POST`
/// - **Purpose:** Adds a photo, quote or other document to the item
/// - **Authentication:** Required; the item must be visible
///
/// The body is `multipart/form-data` with a single `file` field.
#[post("/1/relevant-items/<item_id>/attachments", data = "<upload>")]
pub async fn upload_attachment(
    db: DbConn,
    auth_user: AuthenticatedUser,
    storage: &State<BlobStorage>,
    item_id: i32,
    mut upload: Form<FileUpload<'_>>,
) -> ApiResult<status::Created<Json<RelevantItemAttachment>>> {
    let user = auth_user.user.clone();
    db.run(move |conn| load_visible_item(conn, &user, item_id))
        .await?;

    let name = upload.original_name();
    let blob = storage.0.store(&mut upload.file, name.as_deref()).await?;

    let attachment = db
        .run(move |conn| -> ApiResult<RelevantItemAttachment> {
            let attachment = insert_attachment(
                conn,
                NewRelevantItemAttachment {
                    item_id,
                    file_name: blob.file_name,
                    file_url: blob.url,
                    content_type: blob.content_type,
                    size_bytes: blob.size_bytes,
                    uploaded_by: Some(auth_user.user.id),
                    created_at: now(),
                },
            )?;
            info!(
                "[relevant-items] '{}' attached {} to item {}",
                auth_user.user.email, blob.key, item_id
            );
            Ok(attachment)
        })
        .await?;
    let location = format!("/api/1/relevant-items/{}/attachments/{}", item_id, attachment.id);
    Ok(status::Created::new(location).body(Json(attachment)))
}

/// Delete Attachment endpoint.
///
/// - **URL:** `/api/1/relevant-items/<item_id>/attachments/<attachment_id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Soft deletes the attachment; the stored file is kept
/// - **Authorization:** Managers and supervisors on the item's contract
#[delete("/1/relevant-items/<item_id>/attachments/<attachment_id>")]
pub async fn delete_attachment(
    db: DbConn,
    auth_user: AuthenticatedUser,
    item_id: i32,
    attachment_id: i32,
) -> ApiResult<Status> {
    db.run(move |conn| {
        let item = load_editable_item(conn, &auth_user.user, item_id)?;
        if !soft_delete_attachment(conn, item.id, attachment_id)? {
            return Err(ApiError::not_found("Attachment not found"));
        }
        info!(
            "[relevant-items] '{}' removed attachment {} from item {}",
            auth_user.user.email, attachment_id, item.id
        );
        Ok(Status::NoContent)
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_items_endpoint,
        item_kanban_endpoint,
        create_item,
        get_item_endpoint,
        update_item_endpoint,
        move_item,
        delete_item,
        list_attachments_endpoint,
        upload_attachment,
        delete_attachment
    ]
}

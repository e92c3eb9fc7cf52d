mod common;

use common::{client, contract_id, delete, get_json, id_of, login, patch_json, post_json, put_json, upload};
use rocket::http::Status;
use serde_json::{Value, json};

fn column_len(board: &Value, status: &str) -> usize {
    board
        .as_array()
        .expect("array")
        .iter()
        .find(|c| c["status"] == status)
        .and_then(|c| c["items"].as_array())
        .map(Vec::len)
        .unwrap_or_else(|| panic!("column {} missing", status))
}

#[rocket::async_test]
async fn test_technician_reports_an_item() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let mall = contract_id(&client, "Acme Mall").await;
    let tech = login(&client, "tech@acme.com").await;

    let (status, item) = post_json(
        &client,
        &tech,
        "/api/1/relevant-items",
        json!({ "contract_id": tower, "title": "Cracked pipe in garage" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(item["status"], "IDENTIFIED");
    assert_eq!(item["priority"], "MEDIUM");
    assert_eq!(item["approved_by"], Value::Null);

    let (_, me) = get_json(&client, &tech, "/api/1/me").await;
    assert_eq!(item["created_by"], me["user"]["id"]);

    let (status, _) = post_json(
        &client,
        &tech,
        "/api/1/relevant-items",
        json!({ "contract_id": mall, "title": "Not my contract" }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = post_json(
        &client,
        &tech,
        "/api/1/relevant-items",
        json!({ "contract_id": tower, "title": "Negative budget", "budget_value": -10.0 }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    // Technicians report but do not edit
    let uri = format!("/api/1/relevant-items/{}", id_of(&item));
    let (status, _) = put_json(&client, &tech, &uri, json!({ "priority": "HIGH" })).await;
    assert_eq!(status, Status::Forbidden);
    assert_eq!(delete(&client, &tech, &uri).await, Status::Forbidden);
}

#[rocket::async_test]
async fn test_item_workflow_and_approval() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let tech = login(&client, "tech@acme.com").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let owner = login(&client, "owner@acme.com").await;

    let (_, item) = post_json(
        &client,
        &supervisor,
        "/api/1/relevant-items",
        json!({
            "contract_id": tower,
            "title": "Replace roof fan",
            "priority": "HIGH",
            "budget_value": 4500.0,
            "due_date": "2025-09-30"
        }),
    )
    .await;
    assert_eq!(item["priority"], "HIGH");
    assert_eq!(item["budget_value"], 4500.0);
    let uri = format!("/api/1/relevant-items/{}", id_of(&item));
    let status_uri = format!("{}/status", uri);

    let (status, moved) = patch_json(&client, &supervisor, &status_uri, json!({ "status": "BUDGETING" })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(moved["status"], "BUDGETING");

    let (status, updated) = put_json(&client, &supervisor, &uri, json!({ "budget_value": 5200.0 })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(updated["budget_value"], 5200.0);
    assert_eq!(updated["status"], "BUDGETING");

    let (status, _) = patch_json(&client, &tech, &status_uri, json!({ "status": "APPROVED" })).await;
    assert_eq!(status, Status::Forbidden);
    let (status, _) = patch_json(&client, &supervisor, &status_uri, json!({ "status": "APPROVED" })).await;
    assert_eq!(status, Status::Forbidden);

    let (status, approved) = patch_json(&client, &owner, &status_uri, json!({ "status": "APPROVED" })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(approved["status"], "APPROVED");
    let (_, me) = get_json(&client, &owner, "/api/1/me").await;
    assert_eq!(approved["approved_by"], me["user"]["id"]);
    assert!(approved["approved_at"].is_string());

    let (status, board) = get_json(&client, &tech, "/api/1/relevant-items/kanban").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(board.as_array().map(Vec::len), Some(7));
    assert_eq!(column_len(&board, "APPROVED"), 1);
    assert_eq!(column_len(&board, "IDENTIFIED"), 0);

    let (_, high) = get_json(&client, &owner, "/api/1/relevant-items?priority=HIGH").await;
    assert_eq!(high.as_array().map(Vec::len), Some(1));
    let (_, low) = get_json(&client, &owner, "/api/1/relevant-items?priority=LOW").await;
    assert_eq!(low, json!([]));
    let (status, _) = get_json(&client, &owner, "/api/1/relevant-items?status=MAYBE").await;
    assert_eq!(status, Status::BadRequest);

    assert_eq!(delete(&client, &supervisor, &uri).await, Status::NoContent);
    let (status, _) = get_json(&client, &owner, &uri).await;
    assert_eq!(status, Status::NotFound);
}

#[rocket::async_test]
async fn test_item_attachments() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let tech = login(&client, "tech@acme.com").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let globex = login(&client, "owner@globex.com").await;

    let (_, item) = post_json(
        &client,
        &tech,
        "/api/1/relevant-items",
        json!({ "contract_id": tower, "title": "Water stain on ceiling" }),
    )
    .await;
    let attachments_uri = format!("/api/1/relevant-items/{}/attachments", id_of(&item));

    let (status, attachment) = upload(&client, &tech, &attachments_uri, "stain.png", b"\x89PNG fake").await;
    assert_eq!(status, Status::Created);
    assert_eq!(attachment["file_name"], "stain.png");
    assert_eq!(attachment["size_bytes"], 9);
    assert!(attachment["file_url"].as_str().is_some_and(|u| u.starts_with("/uploads/")));

    let (status, list) = get_json(&client, &tech, &attachments_uri).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = get_json(&client, &globex, &attachments_uri).await;
    assert_eq!(status, Status::NotFound);
    let (status, _) = upload(&client, &globex, &attachments_uri, "x.png", b"x").await;
    assert_eq!(status, Status::NotFound);

    let one = format!("{}/{}", attachments_uri, id_of(&attachment));
    assert_eq!(delete(&client, &tech, &one).await, Status::Forbidden);
    assert_eq!(delete(&client, &supervisor, &one).await, Status::NoContent);
    assert_eq!(delete(&client, &supervisor, &one).await, Status::NotFound);

    let (_, list) = get_json(&client, &tech, &attachments_uri).await;
    assert_eq!(list, json!([]));
}

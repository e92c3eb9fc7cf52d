mod common;

use common::{client, contract_id, delete, get_json, id_of, login, post_json, put_json, upload};
use rocket::http::Status;
use serde_json::{Value, json};

#[rocket::async_test]
async fn test_device_management() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;
    let globex = login(&client, "owner@globex.com").await;

    let (status, _) = post_json(
        &client,
        &tech,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Main water meter", "kind": "WATER" }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    let (status, water) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Main water meter", "kind": "WATER", "location": "Basement" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(water["unit"], "m3");
    assert_eq!(water["active"], true);

    let (status, energy) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Grid meter", "kind": "ENERGY" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(energy["unit"], "kWh");

    let (status, _) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Steam", "kind": "STEAM" }),
    )
    .await;
    assert!(status.code >= 400 && status.code < 500);

    let (status, list) = get_json(&client, &tech, "/api/1/measurement-devices").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(list.as_array().map(Vec::len), Some(2));
    let (_, list) = get_json(&client, &globex, "/api/1/measurement-devices").await;
    assert_eq!(list, json!([]));

    let uri = format!("/api/1/measurement-devices/{}", id_of(&energy));
    let (status, updated) =
        put_json(&client, &supervisor, &uri, json!({ "unit": "MWh", "serial_number": "EM-9" })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(updated["unit"], "MWh");
    assert_eq!(updated["serial_number"], "EM-9");

    let (status, _) = get_json(&client, &globex, &uri).await;
    assert_eq!(status, Status::NotFound);

    assert_eq!(delete(&client, &tech, &uri).await, Status::Forbidden);
    assert_eq!(delete(&client, &supervisor, &uri).await, Status::NoContent);
    let (_, list) = get_json(&client, &tech, "/api/1/measurement-devices").await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[rocket::async_test]
async fn test_readings_and_consumption() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;

    let (_, device) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Gas meter", "kind": "GAS" }),
    )
    .await;
    let entries_uri = format!("/api/1/measurement-devices/{}/entries", id_of(&device));

    // Technicians record readings
    for (value, at) in [(100.0, "2025-06-01T08:00:00"), (130.5, "2025-06-02T08:00:00")] {
        let (status, entry) =
            post_json(&client, &tech, &entries_uri, json!({ "value": value, "reading_at": at })).await;
        assert_eq!(status, Status::Created);
        assert_eq!(entry["value"], value);
    }

    let (status, body) = post_json(
        &client,
        &tech,
        &entries_uri,
        json!({ "value": 120.0, "reading_at": "2025-06-03T08:00:00" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("130.5")));

    // A backdated reading cannot overtake a later one
    let (status, body) = post_json(
        &client,
        &tech,
        &entries_uri,
        json!({ "value": 150.0, "reading_at": "2025-06-01T20:00:00" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("later reading")));

    let (status, _) = post_json(&client, &tech, &entries_uri, json!({ "value": -1.0 })).await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) = post_json(
        &client,
        &tech,
        &entries_uri,
        json!({ "value": 130.5, "reading_at": "2025-06-03T08:00:00", "notes": "No usage" }),
    )
    .await;
    assert_eq!(status, Status::Created);

    let (status, entries) = get_json(&client, &tech, &entries_uri).await;
    assert_eq!(status, Status::Ok);
    let consumption: Vec<Value> = entries
        .as_array()
        .expect("array")
        .iter()
        .map(|e| e["consumption"].clone())
        .collect();
    assert_eq!(consumption, vec![Value::Null, json!(30.5), json!(0.0)]);
    assert_eq!(entries[2]["notes"], "No usage");

    // Inactive devices take no readings
    let device_uri = format!("/api/1/measurement-devices/{}", id_of(&device));
    put_json(&client, &supervisor, &device_uri, json!({ "active": false })).await;
    let (status, _) = post_json(&client, &tech, &entries_uri, json!({ "value": 200.0 })).await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_reading_photo_and_deletion() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let owner = login(&client, "owner@acme.com").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;

    let (_, device) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Energy meter", "kind": "ENERGY" }),
    )
    .await;
    let (_, other_device) = post_json(
        &client,
        &supervisor,
        "/api/1/measurement-devices",
        json!({ "contract_id": tower, "name": "Water meter", "kind": "WATER" }),
    )
    .await;
    let device_id = id_of(&device);
    let (_, entry) = post_json(
        &client,
        &tech,
        &format!("/api/1/measurement-devices/{}/entries", device_id),
        json!({ "value": 5021.0 }),
    )
    .await;
    let entry_id = id_of(&entry);
    assert_eq!(entry["photo_url"], Value::Null);

    let photo_uri = format!("/api/1/measurement-devices/{}/entries/{}/photo", device_id, entry_id);
    let (status, with_photo) = upload(&client, &tech, &photo_uri, "meter.jpg", b"\xFF\xD8\xFFjpeg").await;
    assert_eq!(status, Status::Ok);
    assert!(with_photo["photo_url"].as_str().is_some_and(|u| u.ends_with("meter.jpg")));

    let wrong_device = format!(
        "/api/1/measurement-devices/{}/entries/{}/photo",
        id_of(&other_device),
        entry_id
    );
    let (status, _) = upload(&client, &tech, &wrong_device, "meter.jpg", b"jpeg").await;
    assert_eq!(status, Status::NotFound);

    let entry_uri = format!("/api/1/measurement-entries/{}", entry_id);
    assert_eq!(delete(&client, &tech, &entry_uri).await, Status::Forbidden);
    assert_eq!(delete(&client, &supervisor, &entry_uri).await, Status::Forbidden);
    assert_eq!(delete(&client, &owner, &entry_uri).await, Status::NoContent);
    assert_eq!(delete(&client, &owner, &entry_uri).await, Status::NotFound);

    let (_, entries) =
        get_json(&client, &owner, &format!("/api/1/measurement-devices/{}/entries", device_id)).await;
    assert_eq!(entries, json!([]));
}

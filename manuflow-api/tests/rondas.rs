mod common;

use common::{client, contract_id, delete, get_json, id_of, login, post_json, put_json};
use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

// A Monday
const DAY: &str = "2025-06-02";

async fn create_schedule(client: &Client, cookie: &Cookie<'static>, body: Value) -> (Status, Value) {
    post_json(client, cookie, "/api/1/schedules", body).await
}

fn electrical_round(contract_id: i32) -> Value {
    json!({
        "contract_id": contract_id,
        "name": "Electrical panels",
        "category": "ELECTRICAL",
        "days_of_week": [1, 2, 3, 4, 5, 6, 7],
        "shift": "MORNING",
        "start_time": "07:30",
        "steps": [
            { "title": "Read main breaker" },
            { "title": "Thermal scan", "description": "Panels A to D" }
        ]
    })
}

#[rocket::async_test]
async fn test_schedule_validation() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;

    let mut bad_days = electrical_round(tower);
    bad_days["days_of_week"] = json!([0, 8]);
    let (status, _) = create_schedule(&client, &supervisor, bad_days).await;
    assert_eq!(status, Status::BadRequest);

    let mut no_days = electrical_round(tower);
    no_days["days_of_week"] = json!([]);
    let (status, _) = create_schedule(&client, &supervisor, no_days).await;
    assert_eq!(status, Status::BadRequest);

    let mut bad_time = electrical_round(tower);
    bad_time["start_time"] = json!("25:61");
    let (status, _) = create_schedule(&client, &supervisor, bad_time).await;
    assert_eq!(status, Status::BadRequest);

    let mut no_steps = electrical_round(tower);
    no_steps["steps"] = json!([]);
    let (status, _) = create_schedule(&client, &supervisor, no_steps).await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) = create_schedule(&client, &tech, electrical_round(tower)).await;
    assert_eq!(status, Status::Forbidden);

    let (status, schedule) = create_schedule(&client, &supervisor, electrical_round(tower)).await;
    assert_eq!(status, Status::Created);
    assert_eq!(schedule["name"], "Electrical panels");
    assert_eq!(schedule["shift"], "MORNING");
    assert_eq!(schedule["start_time"], "07:30");
    assert_eq!(schedule["active"], true);
    assert_eq!(schedule["steps"].as_array().map(Vec::len), Some(2));

    let (status, list) = get_json(&client, &tech, "/api/1/schedules").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[rocket::async_test]
async fn test_rondas_today_materializes_once() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;
    let hvac = login(&client, "hvac@acme.com").await;

    let (status, _) = create_schedule(&client, &supervisor, electrical_round(tower)).await;
    assert_eq!(status, Status::Created);

    let today_uri = format!("/api/1/rondas/today?date={}", DAY);

    // The HVAC technician is not in the schedule's category
    let (status, rondas) = get_json(&client, &hvac, &today_uri).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(rondas, json!([]));

    let (_, me) = get_json(&client, &tech, "/api/1/me").await;
    let tech_id = id_of(&me["user"]);

    let (status, rondas) = get_json(&client, &tech, &today_uri).await;
    assert_eq!(status, Status::Ok);
    let rondas = rondas.as_array().expect("array").clone();
    assert_eq!(rondas.len(), 1);
    let ronda = &rondas[0];
    assert_eq!(ronda["schedule_name"], "Electrical panels");
    assert_eq!(ronda["scheduled_date"], DAY);
    assert_eq!(ronda["status"], "PENDING");
    assert_eq!(ronda["assigned_to"], tech_id);
    assert_eq!(ronda["current_step_index"], 0);
    assert_eq!(ronda["steps"].as_array().map(Vec::len), Some(2));
    assert_eq!(ronda["steps"][0]["title"], "Read main breaker");

    // Looking again, as anyone, returns the same occurrence
    let (_, again) = get_json(&client, &tech, &today_uri).await;
    assert_eq!(again[0]["id"], ronda["id"]);
    let (_, seen_by_supervisor) = get_json(&client, &supervisor, &today_uri).await;
    assert_eq!(seen_by_supervisor.as_array().map(Vec::len), Some(1));
    assert_eq!(seen_by_supervisor[0]["id"], ronda["id"]);

    let (status, _) = get_json(&client, &tech, "/api/1/rondas/today?date=not-a-date").await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_schedule_outside_its_weekdays_produces_nothing() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;

    let mut weekend = electrical_round(tower);
    weekend["days_of_week"] = json!([6, 7]);
    weekend["category"] = Value::Null;
    let (status, _) = create_schedule(&client, &supervisor, weekend).await;
    assert_eq!(status, Status::Created);

    let (status, rondas) =
        get_json(&client, &supervisor, &format!("/api/1/rondas/today?date={}", DAY)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(rondas, json!([]));

    // 2025-06-07 is a Saturday
    let (_, rondas) = get_json(&client, &supervisor, "/api/1/rondas/today?date=2025-06-07").await;
    assert_eq!(rondas.as_array().map(Vec::len), Some(1));
    assert_eq!(rondas[0]["assigned_to"], Value::Null);
}

#[rocket::async_test]
async fn test_ronda_execution() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;
    let tech = login(&client, "tech@acme.com").await;

    create_schedule(&client, &supervisor, electrical_round(tower)).await;
    let (_, rondas) = get_json(&client, &tech, &format!("/api/1/rondas/today?date={}", DAY)).await;
    let ronda_uri = format!("/api/1/rondas/{}", id_of(&rondas[0]));
    let step_ids: Vec<i64> = rondas[0]["steps"].as_array().expect("steps").iter().map(id_of).collect();

    let (status, started) = post_json(&client, &tech, &format!("{}/start", ronda_uri), json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(started["status"], "IN_PROGRESS");
    assert!(started["started_at"].is_string());

    // Starting again while in progress changes nothing
    let (status, again) = post_json(&client, &tech, &format!("{}/start", ronda_uri), json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(again["status"], "IN_PROGRESS");
    assert_eq!(again["started_at"], started["started_at"]);

    let (status, detail) = put_json(
        &client,
        &tech,
        &format!("{}/steps/{}", ronda_uri, step_ids[0]),
        json!({ "status": "COMPLETED", "notes": "220V ok" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(detail["steps"][0]["status"], "COMPLETED");
    assert_eq!(detail["steps"][0]["notes"], "220V ok");
    assert_eq!(detail["current_step_index"], 1);

    let (status, body) = post_json(&client, &tech, &format!("{}/complete", ronda_uri), json!({})).await;
    assert_eq!(status, Status::Conflict);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("1 step")));

    let (status, _) = put_json(
        &client,
        &tech,
        &format!("{}/steps/{}", ronda_uri, 999_999),
        json!({ "status": "COMPLETED" }),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    put_json(
        &client,
        &tech,
        &format!("{}/steps/{}", ronda_uri, step_ids[1]),
        json!({ "status": "COMPLETED" }),
    )
    .await;
    let (status, done) = post_json(&client, &tech, &format!("{}/complete", ronda_uri), json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["current_step_index"], Value::Null);
    assert!(done["completed_at"].is_string());

    let (status, _) = put_json(
        &client,
        &tech,
        &format!("{}/steps/{}", ronda_uri, step_ids[0]),
        json!({ "status": "PENDING" }),
    )
    .await;
    assert_eq!(status, Status::Conflict);
    let (status, _) = post_json(&client, &tech, &format!("{}/start", ronda_uri), json!({})).await;
    assert_eq!(status, Status::Conflict);

    // History
    let (status, history) = get_json(&client, &supervisor, "/api/1/rondas?status=COMPLETED").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    let (_, history) = get_json(&client, &supervisor, "/api/1/rondas?from=2025-06-03").await;
    assert_eq!(history, json!([]));
    let (status, _) = get_json(&client, &supervisor, "/api/1/rondas?status=DONE").await;
    assert_eq!(status, Status::BadRequest);

    let (status, detail) = get_json(&client, &supervisor, &ronda_uri).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(detail["schedule_name"], "Electrical panels");

    let globex = login(&client, "owner@globex.com").await;
    let (status, _) = get_json(&client, &globex, &ronda_uri).await;
    assert_eq!(status, Status::NotFound);

    // A technician of another category neither opens it nor sees it in history
    let hvac = login(&client, "hvac@acme.com").await;
    let (status, _) = get_json(&client, &hvac, &ronda_uri).await;
    assert_eq!(status, Status::NotFound);
    let (status, history) = get_json(&client, &hvac, "/api/1/rondas").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(history, json!([]));
    let (_, history) = get_json(&client, &tech, "/api/1/rondas").await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
}

#[rocket::async_test]
async fn test_deleted_schedule_stops_producing_rondas() {
    let client = client().await;
    let tower = contract_id(&client, "Acme Tower").await;
    let supervisor = login(&client, "supervisor@acme.com").await;

    let (_, schedule) = create_schedule(&client, &supervisor, electrical_round(tower)).await;
    let uri = format!("/api/1/schedules/{}", id_of(&schedule));

    let (status, updated) = put_json(&client, &supervisor, &uri, json!({ "active": false })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(updated["active"], false);
    let (_, rondas) = get_json(&client, &supervisor, &format!("/api/1/rondas/today?date={}", DAY)).await;
    assert_eq!(rondas, json!([]));

    assert_eq!(delete(&client, &supervisor, &uri).await, Status::NoContent);
    let (status, _) = get_json(&client, &supervisor, &uri).await;
    assert_eq!(status, Status::NotFound);
}

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::app(engine)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    organizer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(organizer) = organizer {
        builder = builder.header("organizer-id", organizer);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn new_organizer(app: &Router, name: &str) -> String {
    let (status, body) = send(app, "POST", "/organizers", None, Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn new_player(app: &Router, organizer: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/players",
        Some(organizer),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn evening_costs() -> Value {
    json!({
        "court_hours": "2",
        "court_rate_minor": 2000,
        "shuttlecock_count": 4,
        "shuttlecock_rate_minor": 850
    })
}

#[tokio::test]
async fn scoped_routes_require_a_known_organizer() {
    let app = test_app().await;

    let (status, _) = send(&app, "GET", "/players", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/players", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let organizer = new_organizer(&app, "Club").await;
    let (status, body) = send(&app, "GET", "/organizer", Some(&organizer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Club");
}

#[tokio::test]
async fn session_payment_and_balance_flow() {
    let app = test_app().await;
    let organizer = new_organizer(&app, "Club").await;
    let ann = new_player(&app, &organizer, "Ann").await;
    let bo = new_player(&app, &organizer, "Bo").await;
    let cy = new_player(&app, &organizer, "Cy").await;

    let (status, recorded) = send(
        &app,
        "POST",
        "/sessions",
        Some(&organizer),
        Some(json!({
            "date": "2024-06-03",
            "costs": evening_costs(),
            "participant_ids": [ann, bo, cy],
            "drop_ins": ["Di"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(recorded["total_minor"], 7400);
    assert_eq!(recorded["cost_per_player_minor"], 1850);
    assert_eq!(recorded["participants"], 4);
    assert_eq!(recorded["drop_in_player_ids"].as_array().unwrap().len(), 1);

    let session_id = recorded["session_id"].as_str().unwrap();
    let (status, detail) = send(
        &app,
        "GET",
        &format!("/sessions/{session_id}"),
        Some(&organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["session"]["status"], "completed");
    assert_eq!(detail["participants"].as_array().unwrap().len(), 4);

    let (status, _) = send(
        &app,
        "POST",
        "/payments",
        Some(&organizer),
        Some(json!({
            "player_id": ann,
            "amount_minor": 4000,
            "method": "paynow",
            "payment_date": "2024-06-04"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, balance) = send(
        &app,
        "GET",
        &format!("/balances/{ann}"),
        Some(&organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["current_balance_minor"], -2150);

    let (status, transfer) = send(
        &app,
        "POST",
        "/transfers",
        Some(&organizer),
        Some(json!({
            "from_player_id": ann,
            "to_player_id": bo,
            "amount_minor": 1000,
            "payment_date": "2024-06-05"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(transfer["reference_number"].as_str().unwrap().starts_with("CT-"));

    let (status, debtors) = send(
        &app,
        "GET",
        "/balances?kind=debtors",
        Some(&organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let debtors = debtors["balances"].as_array().unwrap();
    assert_eq!(debtors.len(), 3);
    assert_eq!(debtors[0]["current_balance_minor"], 1850);

    let (status, summary) = send(&app, "GET", "/balances/summary", Some(&organizer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_outstanding_minor"], 1850 + 850 + 1850);
    assert_eq!(summary["total_credit_minor"], 1150);
    assert_eq!(summary["creditors"], 1);

    let (status, check) = send(&app, "GET", "/transfers/check", Some(&organizer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["broken"], json!([]));
}

#[tokio::test]
async fn engine_errors_map_to_statuses() {
    let app = test_app().await;
    let organizer = new_organizer(&app, "Club").await;
    let other = new_organizer(&app, "Other").await;
    let ann = new_player(&app, &organizer, "Ann").await;

    let (status, _) = send(
        &app,
        "POST",
        "/players",
        Some(&organizer),
        Some(json!({ "name": "ann" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", &format!("/players/{ann}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/payments",
        Some(&organizer),
        Some(json!({
            "player_id": ann,
            "amount_minor": 0,
            "payment_date": "2024-06-04"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(&organizer),
        Some(json!({
            "date": "2024-06-03",
            "costs": {
                "court_hours": "two",
                "court_rate_minor": 2000,
                "shuttlecock_count": 0,
                "shuttlecock_rate_minor": 0
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "GET",
        "/players/00000000-0000-0000-0000-000000000000",
        Some(&organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_then_import_into_another_organizer() {
    let app = test_app().await;
    let source = new_organizer(&app, "Club").await;
    let ann = new_player(&app, &source, "Ann").await;
    let bo = new_player(&app, &source, "Bo").await;

    let (status, _) = send(
        &app,
        "POST",
        "/sessions",
        Some(&source),
        Some(json!({
            "date": "2024-06-03",
            "costs": evening_costs(),
            "participant_ids": [ann, bo]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, archive) = send(&app, "GET", "/backup/export", Some(&source), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archive["metadata"]["export_type"], "full_backup");
    assert_eq!(archive["data"]["players"].as_array().unwrap().len(), 2);

    let target = new_organizer(&app, "Copy").await;
    let (status, report) = send(
        &app,
        "POST",
        "/backup/import",
        Some(&target),
        Some(json!({ "archive": archive.clone(), "validate_only": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(report["validate_only"], true);

    let (_, players) = send(&app, "GET", "/players", Some(&target), None).await;
    assert_eq!(players.as_array().unwrap().len(), 0);

    let (status, report) = send(
        &app,
        "POST",
        "/backup/import",
        Some(&target),
        Some(json!({ "archive": archive })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(report["counts"]["players"]["created"], 2);
    assert_eq!(report["counts"]["session_participants"]["created"], 2);

    let (_, summary) = send(&app, "GET", "/balances/summary", Some(&target), None).await;
    assert_eq!(summary["total_outstanding_minor"], 7400);

    let (status, report) = send(
        &app,
        "POST",
        "/backup/import",
        Some(&target),
        Some(json!({ "archive": { "metadata": {} } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], false);
    assert!(!report["errors"].as_array().unwrap().is_empty());
}

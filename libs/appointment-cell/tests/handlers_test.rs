use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use shared_database::EngineState;
use shared_models::schedule::{day_of_week, Weekday};
use shared_models::slot::TimeSlot;

fn slot(h: u32, m: u32) -> TimeSlot {
    TimeSlot::from_start(chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

fn next_monday() -> NaiveDate {
    let mut date = Local::now().date_naive();
    loop {
        date = date.succ_opt().unwrap();
        if day_of_week(date) == Weekday::Mon {
            return date;
        }
    }
}

async fn test_app() -> (Router, Arc<EngineState>) {
    let state = Arc::new(EngineState::new(AppConfig::default()));
    (appointment_routes(state.clone()), state)
}

async fn seed_monday(state: &EngineState, doctor_id: Uuid) {
    state
        .availability()
        .union_slots(
            doctor_id,
            Weekday::Mon,
            vec![slot(9, 0), slot(9, 30), slot(10, 0)],
        )
        .await
        .unwrap();
}

fn booking_body(doctor_id: Uuid, date: NaiveDate, hour: &str) -> Body {
    Body::from(
        json!({
            "doctor_id": doctor_id,
            "patient_id": Uuid::new_v4(),
            "date": date,
            "hour": hour,
            "reason": "shortness of breath"
        })
        .to_string(),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn booking_conflict_surfaces_the_literal_sentinel() {
    let (app, state) = test_app().await;
    let doctor = Uuid::new_v4();
    seed_monday(&state, doctor).await;
    let monday = next_monday();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, monday, "09:30"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["hour"], json!("09:30"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, monday, "09:30"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    // Existing callers match on this exact string.
    assert_eq!(body, json!({ "error": "TIME_SLOT_UNAVAILABLE" }));
}

#[tokio::test]
async fn misaligned_hour_is_a_bad_request() {
    let (app, state) = test_app().await;
    let doctor = Uuid::new_v4();
    seed_monday(&state, doctor).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, next_monday(), "09:15"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_round_trip_restores_the_projected_slot() {
    let (app, state) = test_app().await;
    let doctor = Uuid::new_v4();
    seed_monday(&state, doctor).await;
    let monday = next_monday();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, monday, "09:30"))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let schedule_uri = format!("/doctors/{doctor}/schedule?from={monday}&to={monday}");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&schedule_uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let statuses: Vec<(String, String)> = body["days"][0]["cells"]
        .as_array()
        .unwrap()
        .iter()
        .map(|cell| {
            (
                cell["slot"]["start_time"].as_str().unwrap().to_string(),
                cell["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(statuses.contains(&("09:00".into(), "available".into())));
    assert!(statuses.contains(&("09:30".into(), "booked_upcoming".into())));
    assert!(statuses.contains(&("10:00".into(), "available".into())));
    assert!(statuses.contains(&("12:00".into(), "unavailable".into())));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{appointment_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/doctors/{doctor}/slots?date={monday}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let open: Vec<&str> = body["available_slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(open, vec!["09:00", "09:30", "10:00"]);
}

#[tokio::test]
async fn cancelling_twice_reports_not_found() {
    let (app, state) = test_app().await;
    let doctor = Uuid::new_v4();
    seed_monday(&state, doctor).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, next_monday(), "10:00"))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    for expected in [StatusCode::OK, StatusCode::NOT_FOUND] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{appointment_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn clinical_annotation_keeps_the_slot() {
    let (app, state) = test_app().await;
    let doctor = Uuid::new_v4();
    seed_monday(&state, doctor).await;
    let monday = next_monday();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(booking_body(doctor, monday, "09:00"))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/{appointment_id}/clinical"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "clinical": { "diagnosis": "mild asthma" },
                        "flags": { "is_vaccine": false, "report_pending": true }
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["appointment"]["clinical"]["diagnosis"],
        json!("mild asthma")
    );
    assert_eq!(body["appointment"]["flags"]["report_pending"], json!(true));
    assert_eq!(body["appointment"]["hour"], json!("09:00"));
    assert_eq!(body["appointment"]["date"], json!(monday.to_string()));
}

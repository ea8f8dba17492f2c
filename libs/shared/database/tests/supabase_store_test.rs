// libs/shared/database/tests/supabase_store_test.rs

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::{SchedulingStore, SupabaseClient, SupabaseStore};
use shared_models::scheduling::{AppointmentStatus, WeeklyScheduleEntry};

fn store_for(server: &MockServer) -> SupabaseStore {
    SupabaseStore::from_client(SupabaseClient::with_base_url(&server.uri(), "test-anon-key"))
}

fn appointment_row(id: Uuid, professional_id: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "professional_id": professional_id,
        "date": "2025-06-02",
        "start_time": "10:00:00",
        "end_time": "10:30:00",
        "status": "confirmed",
        "client_identity": "client-42",
        "client_email": null,
        "service_duration_minutes": 30,
        "notes": null,
        "created_at": "2025-05-20T08:00:00Z",
        "updated_at": "2025-05-20T08:00:00Z"
    })
}

#[tokio::test]
async fn appointments_for_day_parses_sql_time_columns() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("date", "eq.2025-06-02"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, professional_id)
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let appointments = store
        .appointments_for_day(professional_id, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id, appointment_id);
    assert_eq!(appointments[0].start_time.to_string(), "10:00");
    assert_eq!(appointments[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn weekly_upsert_requests_merge_on_conflict() {
    let server = MockServer::start().await;
    let entry = WeeklyScheduleEntry {
        id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: "09:00".parse().unwrap(),
        end_time: "17:00".parse().unwrap(),
        active: true,
    };

    Mock::given(method("POST"))
        .and(path("/rest/v1/weekly_schedules"))
        .and(query_param("on_conflict", "professional_id,day_of_week"))
        .and(header("Prefer", "resolution=merge-duplicates,return=representation"))
        .and(body_partial_json(json!({ "day_of_week": 1, "start_time": "09:00" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([entry])))
        .expect(1)
        .mount(&server)
        .await;

    let stored = store_for(&server).upsert_weekly_entry(entry.clone()).await.unwrap();
    assert_eq!(stored, entry);
}

#[tokio::test]
async fn due_reminders_filters_unsent_and_unattempted() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reminder_tasks"))
        .and(query_param("sent", "eq.false"))
        .and(query_param("error", "is.null"))
        .and(query_param("scheduled_for", "lte.2025-06-01T10:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let due = store_for(&server).due_reminders(now).await.unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn api_errors_surface_as_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = store_for(&server).get_appointment(Uuid::new_v4()).await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("500"), "{message}");
}

#[tokio::test]
async fn delete_appointment_targets_row_and_requires_a_match() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let missing_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(appointment_id, professional_id)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", missing_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.delete_appointment(appointment_id).await.unwrap();

    let err = store.delete_appointment(missing_id).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

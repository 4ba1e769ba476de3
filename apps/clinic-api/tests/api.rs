//! Router tests against an in-memory database

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use clinic_api::{app, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> Router {
    let pool = tokio_test::assert_ok!(clinic_db::memory_pool().await);
    let config = AppConfig::default();
    app(AppState::new(pool, &config), &config)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, first: &str, last: &str) -> String {
    let (status, patient) = call(
        app,
        Method::POST,
        "/api/patients",
        Some(json!({
            "firstName": first,
            "lastName": last,
            "email": format!("{}@example.com", first.to_lowercase()),
            "phone": "+1-555-0101",
            "dateOfBirth": "1985-03-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    patient["id"].as_str().unwrap().to_string()
}

async fn create_bill(app: &Router, patient_id: &str) -> Value {
    let (status, bill) = call(
        app,
        Method::POST,
        "/api/bills",
        Some(json!({
            "patientId": patient_id,
            "items": [
                { "description": "Cleaning", "category": "cleaning", "quantity": 2, "unitPrice": 50.0 },
                { "description": "X-ray", "category": "consultation", "quantity": 1, "unitPrice": 30.0 }
            ],
            "discount": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    bill
}

#[tokio::test]
async fn health_reports_database() {
    let app = test_app().await;
    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn patient_crud_and_search() {
    let app = test_app().await;
    let john = register(&app, "John", "Doe").await;
    register(&app, "Jane", "Smith").await;

    let (_, found) = call(&app, Method::GET, "/api/patients/search?q=smith", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["firstName"], "Jane");

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/api/patients/{}", john),
        Some(json!({ "phone": "+1-555-0199" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "+1-555-0199");
    assert_eq!(updated["lastName"], "Doe");

    let (status, _) = call(&app, Method::DELETE, &format!("/api/patients/{}", john), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &format!("/api/patients/{}", john), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn invalid_patient_is_rejected() {
    let app = test_app().await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/patients",
        Some(json!({
            "firstName": " ",
            "lastName": "Doe",
            "email": "not-an-email",
            "phone": "+1-555-0101",
            "dateOfBirth": "1985-03-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_failed");
}

#[tokio::test]
async fn bill_totals_and_partial_payment() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;

    assert_eq!(bill["subtotal"], 130.0);
    assert_eq!(bill["tax"], 10.4);
    assert_eq!(bill["total"], 130.4);
    assert_eq!(bill["status"], "draft");
    let id = bill["id"].as_str().unwrap();

    let (status, sent) = call(&app, Method::POST, &format!("/api/bills/{}/send", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "sent");

    let (status, paid) = call(
        &app,
        Method::POST,
        &format!("/api/bills/{}/mark-paid", id),
        Some(json!({ "method": "cash", "amount": 100.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["bill"]["status"], "partial");
    assert!(paid["payment"]["reference"].as_str().unwrap().starts_with("PAY-"));

    let (_, paid) = call(
        &app,
        Method::POST,
        &format!("/api/bills/{}/mark-paid", id),
        Some(json!({ "method": "credit_card" })),
    )
    .await;
    assert_eq!(paid["bill"]["status"], "paid");
    assert_eq!(paid["payment"]["amount"], 30.4);

    let (_, payments) = call(&app, Method::GET, &format!("/api/payments/bill/{}", id), None).await;
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::POST, &format!("/api/bills/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn simultaneous_payments_settle_the_bill() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;
    let id = bill["id"].as_str().unwrap();
    call(&app, Method::POST, &format!("/api/bills/{}/send", id), None).await;

    let uri = format!("/api/bills/{}/mark-paid", id);
    let half = json!({ "method": "cash", "amount": 65.2 });
    let ((first, _), (second, _)) = tokio::join!(
        call(&app, Method::POST, &uri, Some(half.clone())),
        call(&app, Method::POST, &uri, Some(half)),
    );
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let (_, stored) = call(&app, Method::GET, &format!("/api/bills/{}", id), None).await;
    assert_eq!(stored["status"], "paid");
    let (_, payments) = call(&app, Method::GET, &format!("/api/payments/bill/{}", id), None).await;
    assert_eq!(payments.as_array().unwrap().len(), 2);

    // Nothing is left for a third payment
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/payments",
        Some(json!({ "billId": id, "amount": 1.0, "method": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn patient_bills_show_overdue_status() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;
    let id = bill["id"].as_str().unwrap();
    call(&app, Method::POST, &format!("/api/bills/{}/send", id), None).await;

    let past_due = (Utc::now() - Duration::days(3)).date_naive();
    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/bills/{}", id),
        Some(json!({ "dueDate": past_due.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, bills) = call(&app, Method::GET, &format!("/api/bills/patient/{}", patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bills[0]["status"], "overdue");
}

#[tokio::test]
async fn bill_numbers_are_sequential() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let first = create_bill(&app, &patient).await;
    let second = create_bill(&app, &patient).await;

    let first = first["billNumber"].as_str().unwrap().to_string();
    let second = second["billNumber"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(first.ends_with("001"));
    assert!(second.ends_with("002"));
}

#[tokio::test]
async fn payment_endpoint_updates_bill_and_balances() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;
    let bill_id = bill["id"].as_str().unwrap();

    let (status, payment) = call(
        &app,
        Method::POST,
        "/api/payments",
        Some(json!({ "billId": bill_id, "amount": 30.4, "method": "insurance", "reference": "INS-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["reference"], "INS-1");

    let (_, bill) = call(&app, Method::GET, &format!("/api/bills/{}", bill_id), None).await;
    assert_eq!(bill["status"], "partial");

    let (_, balances) = call(&app, Method::GET, "/api/balances", None).await;
    assert_eq!(balances[0]["totalBilled"], 130.4);
    assert_eq!(balances[0]["totalPaid"], 30.4);
    assert_eq!(balances[0]["remainingBalance"], 100.0);

    let (_, outstanding) = call(&app, Method::GET, "/api/balances/outstanding", None).await;
    assert_eq!(outstanding[0]["totalOutstanding"], 100.0);
}

#[tokio::test]
async fn invoice_pdf_download() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;

    let request = Request::builder()
        .uri(format!("/api/bills/{}/pdf", bill["id"].as_str().unwrap()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");

    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"Invoice_"));
    assert!(disposition.ends_with("_John_Doe.pdf\""));

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn booking_conflicts_and_lifecycle() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let date = (Utc::now() + Duration::days(2)).date_naive().to_string();

    let booking = json!({
        "patientId": patient,
        "appointmentDate": date,
        "startTime": "10:00",
        "type": "cleaning",
        "duration": 60,
        "doctorName": "Dr. Wilson"
    });
    let (status, appointment) = call(&app, Method::POST, "/api/appointments", Some(booking)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appointment["endTime"], "11:00");
    assert_eq!(appointment["patientName"], "John Doe");
    let id = appointment["id"].as_str().unwrap().to_string();

    let (_, check) = call(
        &app,
        Method::POST,
        "/api/appointments/check-conflict",
        Some(json!({ "appointmentDate": date, "startTime": "10:30", "duration": 30 })),
    )
    .await;
    assert_eq!(check["conflict"], true);
    assert_eq!(check["appointmentId"], id.as_str());

    let overlapping = json!({
        "patientId": patient,
        "appointmentDate": date,
        "startTime": "10:30",
        "type": "filling",
        "duration": 30,
        "doctorName": "Dr. Wilson"
    });
    let (status, _) = call(&app, Method::POST, "/api/appointments", Some(overlapping)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, day) = call(&app, Method::GET, &format!("/api/schedule/day/{}", date), None).await;
    let slots = day["timeSlots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots.iter().filter(|slot| slot["available"] == false).count(), 1);

    let (status, confirmed) =
        call(&app, Method::POST, &format!("/api/appointments/{}/confirm", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (_, completed) =
        call(&app, Method::POST, &format!("/api/appointments/{}/complete", id), None).await;
    assert_eq!(completed["status"], "completed");

    let (_, visited) = call(&app, Method::GET, &format!("/api/patients/{}", patient), None).await;
    assert_eq!(visited["totalVisits"], 1);
    assert_eq!(visited["lastVisit"], date.as_str());

    let (status, _) =
        call(&app, Method::POST, &format!("/api/appointments/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reschedule_moves_appointment() {
    let app = test_app().await;
    let patient = register(&app, "Jane", "Smith").await;
    let today = Utc::now().date_naive();
    let date = today.to_string();

    let (_, appointment) = call(
        &app,
        Method::POST,
        "/api/appointments",
        Some(json!({
            "patientId": patient,
            "appointmentDate": date,
            "startTime": "09:00",
            "type": "consultation",
            "duration": 30,
            "doctorName": "Dr. Wilson"
        })),
    )
    .await;
    let id = appointment["id"].as_str().unwrap();
    let new_date = (today + Duration::days(1)).to_string();

    let (status, moved) = call(
        &app,
        Method::POST,
        &format!("/api/appointments/{}/reschedule", id),
        Some(json!({ "appointmentDate": new_date, "startTime": "14:30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "rescheduled");
    assert_eq!(moved["endTime"], "15:00");

    let (_, week) = call(&app, Method::GET, &format!("/api/schedule/week/{}", date), None).await;
    assert_eq!(week["days"].as_array().unwrap().len(), 7);

    let (status, _) = call(&app, Method::GET, "/api/appointments/upcoming?days=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn service_templates_by_category() {
    let app = test_app().await;
    for (name, category, price) in [
        ("Routine cleaning", "cleaning", 80.0),
        ("Deep cleaning", "cleaning", 150.0),
        ("Crown", "crown", 900.0),
    ] {
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/serviceTemplates",
            Some(json!({ "name": name, "category": category, "defaultPrice": price })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, cleaning) = call(&app, Method::GET, "/api/serviceTemplates?category=cleaning", None).await;
    assert_eq!(cleaning.as_array().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/serviceTemplates",
        Some(json!({ "name": "Free", "category": "other", "defaultPrice": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn dashboard_counts() {
    let app = test_app().await;
    let patient = register(&app, "John", "Doe").await;
    let bill = create_bill(&app, &patient).await;
    create_bill(&app, &patient).await;
    call(&app, Method::POST, &format!("/api/bills/{}/send", bill["id"].as_str().unwrap()), None).await;

    let (status, stats) = call(&app, Method::GET, "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalPatients"], 1);
    assert_eq!(stats["pendingBills"], 1);
    assert_eq!(stats["overdueBills"], 0);
    assert_eq!(stats["topDebtors"][0]["remainingBalance"], 260.8);
}

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Timelike, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clinic_server::{create_app, ClinicConfig, ClinicServer};

/// In-memory app plus the clinic every request acts for
struct TestApp {
    app: Router,
    clinic_id: Uuid,
}

impl TestApp {
    fn new() -> Self {
        let server = ClinicServer::in_memory(&ClinicConfig::default());
        Self {
            app: create_app(server),
            clinic_id: Uuid::new_v4(),
        }
    }

    async fn send(&self, method: &str, uri: &str, clinic: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = self.raw(method, uri, clinic, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, value)
    }

    async fn raw(
        &self,
        method: &str,
        uri: &str,
        clinic: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, String, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(clinic) = clinic {
            builder = builder.header("x-clinic-id", clinic.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, bytes.to_vec())
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(self.clinic_id), body).await
    }

    async fn ward_with_bed(&self) -> (String, String) {
        let (status, ward) = self
            .call(
                "POST",
                "/api/clinic/ipd/wards",
                Some(json!({"name": "General", "type": "GENERAL", "capacity": 4})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{ward}");
        let ward_id = ward["data"]["id"].as_str().unwrap().to_string();

        let (status, bed) = self
            .call(
                "POST",
                "/api/clinic/ipd/beds",
                Some(json!({"ward_id": ward_id, "bed_number": "G-1", "daily_rate": "1500"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{bed}");
        (ward_id, bed["data"]["id"].as_str().unwrap().to_string())
    }
}

fn admission_body(bed_id: &str) -> Value {
    json!({
        "patient_id": Uuid::new_v4(),
        "bed_id": bed_id,
        "admitting_doctor_id": Uuid::new_v4(),
        "admission_diagnosis": "Dengue fever",
    })
}

#[tokio::test]
async fn health_check_needs_no_clinic() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn clinic_endpoints_without_clinic_are_no_clinic() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/clinic/ipd/wards", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_CLINIC");

    let request = Request::builder()
        .uri("/api/clinic/pharmacy/credit-accounts")
        .header("x-clinic-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_admission_to_a_bed_is_slot_unavailable() {
    let app = TestApp::new();
    let (_, bed_id) = app.ward_with_bed().await;

    let (status, body) = app.call("POST", "/api/clinic/ipd/admissions", Some(admission_body(&bed_id))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let admission_id = body["data"]["admission"]["id"].as_str().unwrap().to_string();
    assert!(body["data"]["admission"]["closed_at"].is_null());

    let (status, body) = app.call("POST", "/api/clinic/ipd/admissions", Some(admission_body(&bed_id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SLOT_UNAVAILABLE");

    let (_, beds) = app.call("GET", "/api/clinic/ipd/beds", None).await;
    assert_eq!(beds["data"][0]["status"], "OCCUPIED");

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/clinic/ipd/admissions/{admission_id}/discharge"),
            Some(json!({"discharge_notes": "Recovered"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["bed"]["status"], "AVAILABLE");

    let (status, _) = app.call("POST", "/api/clinic/ipd/admissions", Some(admission_body(&bed_id))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn bed_listing_is_stable_and_clinic_scoped() {
    let app = TestApp::new();
    let (ward_id, _) = app.ward_with_bed().await;
    let uri = format!("/api/clinic/ipd/beds?ward_id={ward_id}");

    let (_, first) = app.call("GET", &uri, None).await;
    let (_, second) = app.call("GET", &uri, None).await;
    assert_eq!(first["data"], second["data"]);
    assert_eq!(first["metadata"]["total_count"], 1);

    let (status, other) = app.send("GET", &uri, Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn ward_patch_and_delete_use_id_query() {
    let app = TestApp::new();
    let (ward_id, bed_id) = app.ward_with_bed().await;

    let (status, body) = app
        .call("PATCH", &format!("/api/clinic/ipd/wards?id={ward_id}"), Some(json!({"capacity": 0})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .call(
            "PATCH",
            &format!("/api/clinic/ipd/beds/status?id={bed_id}"),
            Some(json!({"status": "OCCUPIED"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["code"], "INVALID_BED_TRANSITION");

    let (status, _) = app.call("DELETE", &format!("/api/clinic/ipd/wards?id={ward_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, wards) = app.call("GET", "/api/clinic/ipd/wards", None).await;
    assert!(wards["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn payments_cannot_exceed_the_balance() {
    let app = TestApp::new();
    let (status, account) = app
        .call(
            "POST",
            "/api/clinic/pharmacy/credit-accounts",
            Some(json!({"customer_name": "Hari Bahadur", "phone": "9841234567", "credit_limit": "5000"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{account}");
    let id = account["data"]["id"].as_str().unwrap().to_string();
    let base = format!("/api/clinic/pharmacy/credit-accounts/{id}");

    let sale_id = Uuid::new_v4();
    let (status, _) = app
        .call("POST", &format!("{base}/sale"), Some(json!({"amount": "500", "sale_id": sale_id})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call("POST", &format!("{base}/payment"), Some(json!({"amount": "600"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "OVERPAYMENT");

    let (status, body) = app
        .call("POST", &format!("{base}/payment"), Some(json!({"amount": "200", "notes": "cash"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["account"]["current_balance"], "300.00");
    assert_eq!(body["data"]["transaction"]["balance"], "300.00");

    let (status, detail) = app.call("GET", &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["account"]["current_balance"], "300.00");
    assert_eq!(detail["data"]["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(detail["data"]["sales"][0]["sale_id"], sale_id.to_string());

    let (_, report) = app.call("GET", &format!("{base}/verify"), None).await;
    assert_eq!(report["data"]["is_consistent"], true);
}

#[tokio::test]
async fn ledger_exports_as_csv() {
    let app = TestApp::new();
    let (_, account) = app
        .call(
            "POST",
            "/api/clinic/pharmacy/credit-accounts",
            Some(json!({"customer_name": "Sita Rai", "phone": "9801112233"})),
        )
        .await;
    let id = account["data"]["id"].as_str().unwrap().to_string();
    app.call(
        "POST",
        &format!("/api/clinic/pharmacy/credit-accounts/{id}/adjustment"),
        Some(json!({"amount": "120.5", "description": "Opening balance"})),
    )
    .await;

    let (status, content_type, bytes) = app
        .raw(
            "GET",
            &format!("/api/clinic/pharmacy/credit-accounts/{id}/export.csv"),
            Some(app.clinic_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/csv"));
    let csv = String::from_utf8(bytes).unwrap();
    assert!(csv.starts_with("date,type,description,debit,credit,balance\r\n"));
    assert!(csv.contains("120.50"));
}

#[tokio::test]
async fn overlapping_booking_is_rejected_and_ics_is_served() {
    let app = TestApp::new();
    let doctor_id = Uuid::new_v4();
    let starts_at = (Utc::now() + Duration::days(2))
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap();
    let booking = json!({
        "doctor_id": doctor_id,
        "patient_name": "Anita Gurung",
        "patient_phone": "+977 9812345678",
        "starts_at": starts_at,
        "duration_minutes": 30,
        "reason": "Checkup, fasting",
    });

    let (status, body) = app.call("POST", "/api/appointments", Some(booking.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let ics_url = body["data"]["ics_url"].as_str().unwrap().to_string();

    let mut clash = booking;
    clash["starts_at"] = json!(starts_at + Duration::minutes(15));
    let (status, body) = app.call("POST", "/api/appointments", Some(clash)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SLOT_UNAVAILABLE");

    let (status, content_type, bytes) = app.raw("GET", &ics_url, Some(app.clinic_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/calendar"));
    let ics = String::from_utf8(bytes).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("Checkup\\, fasting"));
}

#[tokio::test]
async fn lab_lookup_is_public_and_requires_matching_phone() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            "POST",
            "/api/clinic/lab-results",
            Some(json!({
                "order_number": "LAB-20240612-0007",
                "patient_name": "Bikash Thapa",
                "patient_phone": "9861234567",
                "test_name": "Blood sugar (fasting)",
                "status": "COMPLETED",
                "results": [{"parameter": "Glucose", "value": "96", "unit": "mg/dL"}],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .send(
            "GET",
            "/api/lab-results/lookup?phone=%2B9779861234567&order_number=LAB-20240612-0007",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["results"][0]["value"], "96");

    let (status, _) = app
        .send("GET", "/api/lab-results/lookup?phone=9800000000&order_number=LAB-20240612-0007", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("GET", "/api/lab-results/lookup?phone=9861234567&order_number=LAB-7", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new();
    let (status, doc) = app.send("GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/clinic/ipd/admissions"].is_object());
}

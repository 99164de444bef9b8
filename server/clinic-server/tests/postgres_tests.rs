//! Races against a real PostgreSQL database.
//!
//! Ignored by default; run with a scratch database:
//! `DATABASE_URL=postgres://localhost/clinic_test cargo test -p clinic-server --test postgres_tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::{Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use appointment_service::BookAppointmentRequest;
use clinic_server::{ClinicConfig, ClinicServer};
use ipd_service::{AdmitPatientRequest, BedStatus, CreateBedRequest, CreateWardRequest, IpdError};
use khata_service::{CreateAccountRequest, KhataError, RecordPaymentRequest, RecordSaleRequest};

async fn server() -> ClinicServer {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new().max_connections(16).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    ClinicServer::postgres(&ClinicConfig::default(), pool)
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_admissions_claim_a_bed_once() {
    let server = server().await;
    let clinic = Uuid::new_v4();

    let ward: CreateWardRequest = from_json(json!({"name": "General", "type": "GENERAL", "capacity": 4}));
    let ward = server.ipd.create_ward(clinic, ward).await.unwrap();
    let bed: CreateBedRequest = from_json(json!({"ward_id": ward.id, "bed_number": "G-1", "daily_rate": "1500.00"}));
    let bed = server.ipd.create_bed(clinic, bed).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let ipd = server.ipd.clone();
        let req: AdmitPatientRequest = from_json(json!({
            "patient_id": Uuid::new_v4(),
            "bed_id": bed.id,
            "admitting_doctor_id": Uuid::new_v4(),
        }));
        handles.push(tokio::spawn(async move { ipd.admit_patient(clinic, req).await }));
    }

    let mut admitted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => assert!(matches!(err, IpdError::Conflict { .. }), "unexpected error: {err}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(server.ipd.get_bed(clinic, bed.id).await.unwrap().status, BedStatus::Occupied);
    assert_eq!(server.ipd.list_admissions(clinic, true).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_payments_keep_the_ledger_derivable() {
    let server = server().await;
    let clinic = Uuid::new_v4();

    let account: CreateAccountRequest = from_json(json!({"customer_name": "Hari Prasad", "phone": "9841000001"}));
    let account = server.khata.create_account(clinic, account).await.unwrap();
    let sale: RecordSaleRequest = from_json(json!({"amount": "1000.00"}));
    server.khata.record_sale(clinic, account.id, sale).await.unwrap();

    // 20 × 100 against a balance of 1000: exactly ten fit
    let mut handles = Vec::new();
    for _ in 0..20 {
        let khata = server.khata.clone();
        let req: RecordPaymentRequest = from_json(json!({"amount": "100.00"}));
        handles.push(tokio::spawn(async move { khata.record_payment(clinic, account.id, req).await }));
    }
    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => paid += 1,
            Err(err) => assert!(matches!(err, KhataError::Overpayment { .. }), "unexpected error: {err}"),
        }
    }
    assert_eq!(paid, 10);

    let check = server.khata.verify_account(clinic, account.id).await.unwrap();
    assert!(check.is_consistent);
    assert_eq!(check.computed_balance, Decimal::ZERO);
    assert_eq!(check.entries, 11);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_bookings_take_one_slot() {
    let server = server().await;
    let clinic = Uuid::new_v4();
    let doctor = Uuid::new_v4();
    let starts_at = (Utc::now() + Duration::days(1)).duration_trunc(Duration::hours(1)).unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let appointments = server.appointments.clone();
        let req: BookAppointmentRequest = from_json(json!({
            "doctor_id": doctor,
            "patient_name": format!("Patient {i}"),
            "patient_phone": "+977 9841234567",
            "starts_at": starts_at,
        }));
        handles.push(tokio::spawn(async move { appointments.book(clinic, req).await }));
    }
    let mut booked = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            booked += 1;
        }
    }
    assert_eq!(booked, 1);
}

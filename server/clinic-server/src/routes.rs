use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::{
    handlers::{appointments, health, ipd, khata, lab},
    openapi,
    server::ClinicServer,
};

/// Create health check routes
pub fn health_routes() -> Router<ClinicServer> {
    Router::new().route("/health", get(health::health_check))
}

/// Wards, beds and admissions
pub fn ipd_routes() -> Router<ClinicServer> {
    Router::new()
        .route(
            "/wards",
            get(ipd::list_wards)
                .post(ipd::create_ward)
                .patch(ipd::update_ward)
                .delete(ipd::delete_ward),
        )
        .route(
            "/beds",
            get(ipd::list_beds)
                .post(ipd::create_bed)
                .patch(ipd::update_bed)
                .delete(ipd::delete_bed),
        )
        .route("/beds/status", patch(ipd::set_bed_status))
        .route("/admissions", get(ipd::list_admissions).post(ipd::admit_patient))
        .route("/admissions/:id", get(ipd::get_admission))
        .route("/admissions/:id/discharge", post(ipd::discharge_patient))
}

/// Pharmacy credit accounts
pub fn khata_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/", get(khata::list_accounts).post(khata::create_account))
        .route("/summary", get(khata::summary))
        .route("/:id", get(khata::get_account).patch(khata::update_account))
        .route("/:id/sale", post(khata::record_sale))
        .route("/:id/payment", post(khata::record_payment))
        .route("/:id/refund", post(khata::record_refund))
        .route("/:id/adjustment", post(khata::record_adjustment))
        .route("/:id/verify", get(khata::verify_account))
        .route("/:id/export.csv", get(khata::export_csv))
        .route("/:id/statement", get(khata::statement))
}

/// Appointment booking and calendar downloads
pub fn appointment_routes() -> Router<ClinicServer> {
    Router::new()
        .route("/", get(appointments::list_schedule).post(appointments::book_appointment))
        .route("/:id", get(appointments::get_appointment))
        .route("/:id/cancel", post(appointments::cancel_appointment))
        .route("/:id/ics", get(appointments::appointment_ics))
}

/// Create all routes for the application
pub fn create_routes() -> Router<ClinicServer> {
    Router::new()
        .merge(health_routes())
        .nest("/api/clinic/ipd", ipd_routes())
        .nest("/api/clinic/pharmacy/credit-accounts", khata_routes())
        .route("/api/clinic/lab-results", post(lab::record_result))
        .nest("/api/appointments", appointment_routes())
        .route("/api/lab-results/lookup", get(lab::lookup))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
}

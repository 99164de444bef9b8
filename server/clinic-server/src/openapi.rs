use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{appointments, health, ipd, khata, lab};

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        ipd::list_wards,
        ipd::create_ward,
        ipd::update_ward,
        ipd::delete_ward,
        ipd::list_beds,
        ipd::create_bed,
        ipd::update_bed,
        ipd::set_bed_status,
        ipd::delete_bed,
        ipd::admit_patient,
        ipd::list_admissions,
        ipd::get_admission,
        ipd::discharge_patient,
        khata::list_accounts,
        khata::create_account,
        khata::summary,
        khata::get_account,
        khata::update_account,
        khata::record_sale,
        khata::record_payment,
        khata::record_refund,
        khata::record_adjustment,
        khata::verify_account,
        khata::export_csv,
        khata::statement,
        appointments::book_appointment,
        appointments::list_schedule,
        appointments::get_appointment,
        appointments::cancel_appointment,
        appointments::appointment_ics,
        lab::lookup,
        lab::record_result,
    ),
    components(
        schemas(
            crate::error::ApiErrorResponse,
            health::HealthResponse,
            ipd::Deleted,
            ipd::SetBedStatusRequest,
            ipd::AdmissionResponse,
            ipd::DischargeResponse,
            ipd_service::Ward,
            ipd_service::WardSummary,
            ipd_service::WardType,
            ipd_service::Bed,
            ipd_service::BedStatus,
            ipd_service::Admission,
            ipd_service::CreateWardRequest,
            ipd_service::UpdateWardRequest,
            ipd_service::CreateBedRequest,
            ipd_service::UpdateBedRequest,
            ipd_service::AdmitPatientRequest,
            ipd_service::DischargeRequest,
            khata_service::CreditAccount,
            khata_service::Transaction,
            khata_service::TransactionType,
            khata_service::Direction,
            khata_service::SaleReference,
            khata_service::AccountDetail,
            khata_service::LedgerPosting,
            khata_service::KhataSummary,
            khata_service::LedgerVerification,
            khata_service::CreateAccountRequest,
            khata_service::UpdateAccountRequest,
            khata_service::RecordSaleRequest,
            khata_service::RecordPaymentRequest,
            khata_service::RecordRefundRequest,
            khata_service::RecordAdjustmentRequest,
            appointment_service::Appointment,
            appointment_service::AppointmentStatus,
            appointment_service::BookAppointmentRequest,
            appointment_service::BookingConfirmation,
            lab_service::LabOrder,
            lab_service::LabOrderStatus,
            lab_service::LabResultValue,
            lab_service::LabLookupResult,
            lab_service::RecordLabResultRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "ipd", description = "Wards, beds and admissions"),
        (name = "khata", description = "Pharmacy credit accounts"),
        (name = "appointments", description = "Doctor appointment booking"),
        (name = "lab", description = "Lab orders and the public result lookup"),
    ),
    info(
        title = "Sewa Clinic Engine API",
        description = "Clinic operations API. Clinic endpoints act for the clinic named in the x-clinic-id header.",
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

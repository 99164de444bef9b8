//! Ward, bed and admission endpoints under `/api/clinic/ipd`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ipd_service::{
    Admission, AdmitPatientRequest, Bed, BedStatus, CreateBedRequest, CreateWardRequest, DischargeRequest,
    UpdateBedRequest, UpdateWardRequest, Ward, WardSummary,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiResponse, ApiResult};
use crate::middleware::ClinicContext;
use crate::server::ClinicServer;

/// `?id=` selector for PATCH/DELETE
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BedListQuery {
    pub ward_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdmissionListQuery {
    /// Only admissions that have not been discharged
    #[serde(default)]
    pub open_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBedStatusRequest {
    pub status: BedStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdmissionResponse {
    pub admission: Admission,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DischargeResponse {
    pub admission: Admission,
    pub bed: Bed,
}

// ----------------------------------------------------------------------
// Wards
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/clinic/ipd/wards",
    responses(
        (status = 200, description = "Wards with bed counts", body = Vec<WardSummary>),
        (status = 404, description = "No verified clinic")
    ),
    tag = "ipd"
)]
pub async fn list_wards(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
) -> ApiResult<Json<ApiResponse<Vec<WardSummary>>>> {
    let wards = server.ipd.list_wards(ctx.clinic_id).await?;
    Ok(Json(api_list(wards)))
}

#[utoipa::path(
    post,
    path = "/api/clinic/ipd/wards",
    request_body = CreateWardRequest,
    responses(
        (status = 201, description = "Ward created", body = Ward),
        (status = 400, description = "Invalid request")
    ),
    tag = "ipd"
)]
pub async fn create_ward(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<CreateWardRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Ward>>)> {
    let ward = server.ipd.create_ward(ctx.clinic_id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(ward))))
}

#[utoipa::path(
    patch,
    path = "/api/clinic/ipd/wards",
    params(IdQuery),
    request_body = UpdateWardRequest,
    responses(
        (status = 200, description = "Ward updated", body = Ward),
        (status = 404, description = "Ward not found")
    ),
    tag = "ipd"
)]
pub async fn update_ward(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<IdQuery>,
    Json(req): Json<UpdateWardRequest>,
) -> ApiResult<Json<ApiResponse<Ward>>> {
    let ward = server.ipd.update_ward(ctx.clinic_id, q.id, req).await?;
    Ok(Json(api_success(ward)))
}

#[utoipa::path(
    delete,
    path = "/api/clinic/ipd/wards",
    params(IdQuery),
    responses(
        (status = 200, description = "Ward and its beds deleted", body = Deleted),
        (status = 409, description = "Ward has occupied beds")
    ),
    tag = "ipd"
)]
pub async fn delete_ward(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    server.ipd.delete_ward(ctx.clinic_id, q.id).await?;
    Ok(Json(api_success(Deleted { id: q.id, deleted: true })))
}

// ----------------------------------------------------------------------
// Beds
// ----------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/clinic/ipd/beds",
    params(BedListQuery),
    responses((status = 200, description = "Beds ordered by ward and number", body = Vec<Bed>)),
    tag = "ipd"
)]
pub async fn list_beds(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<BedListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Bed>>>> {
    let beds = server.ipd.list_beds(ctx.clinic_id, q.ward_id).await?;
    Ok(Json(api_list(beds)))
}

#[utoipa::path(
    post,
    path = "/api/clinic/ipd/beds",
    request_body = CreateBedRequest,
    responses(
        (status = 201, description = "Bed created", body = Bed),
        (status = 409, description = "Duplicate bed number or ward at capacity")
    ),
    tag = "ipd"
)]
pub async fn create_bed(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<CreateBedRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Bed>>)> {
    let bed = server.ipd.create_bed(ctx.clinic_id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(bed))))
}

#[utoipa::path(
    patch,
    path = "/api/clinic/ipd/beds",
    params(IdQuery),
    request_body = UpdateBedRequest,
    responses(
        (status = 200, description = "Bed updated", body = Bed),
        (status = 409, description = "Conflicting bed number, full ward or illegal status change")
    ),
    tag = "ipd"
)]
pub async fn update_bed(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<IdQuery>,
    Json(req): Json<UpdateBedRequest>,
) -> ApiResult<Json<ApiResponse<Bed>>> {
    let bed = server.ipd.update_bed(ctx.clinic_id, q.id, req).await?;
    Ok(Json(api_success(bed)))
}

#[utoipa::path(
    patch,
    path = "/api/clinic/ipd/beds/status",
    params(IdQuery),
    request_body = SetBedStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Bed),
        (status = 409, description = "Illegal status change")
    ),
    tag = "ipd"
)]
pub async fn set_bed_status(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<IdQuery>,
    Json(req): Json<SetBedStatusRequest>,
) -> ApiResult<Json<ApiResponse<Bed>>> {
    let bed = server.ipd.set_bed_status(ctx.clinic_id, q.id, req.status).await?;
    Ok(Json(api_success(bed)))
}

#[utoipa::path(
    delete,
    path = "/api/clinic/ipd/beds",
    params(IdQuery),
    responses(
        (status = 200, description = "Bed deleted", body = Deleted),
        (status = 409, description = "Bed is occupied")
    ),
    tag = "ipd"
)]
pub async fn delete_bed(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<ApiResponse<Deleted>>> {
    server.ipd.delete_bed(ctx.clinic_id, q.id).await?;
    Ok(Json(api_success(Deleted { id: q.id, deleted: true })))
}

// ----------------------------------------------------------------------
// Admissions
// ----------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/clinic/ipd/admissions",
    request_body = AdmitPatientRequest,
    responses(
        (status = 201, description = "Patient admitted", body = AdmissionResponse),
        (status = 409, description = "SLOT_UNAVAILABLE or PATIENT_ALREADY_ADMITTED")
    ),
    tag = "ipd"
)]
pub async fn admit_patient(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<AdmitPatientRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AdmissionResponse>>)> {
    let admission = server.ipd.admit_patient(ctx.clinic_id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(AdmissionResponse { admission }))))
}

#[utoipa::path(
    get,
    path = "/api/clinic/ipd/admissions",
    params(AdmissionListQuery),
    responses((status = 200, description = "Admissions, newest first", body = Vec<Admission>)),
    tag = "ipd"
)]
pub async fn list_admissions(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Query(q): Query<AdmissionListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Admission>>>> {
    let admissions = server.ipd.list_admissions(ctx.clinic_id, q.open_only).await?;
    Ok(Json(api_list(admissions)))
}

#[utoipa::path(
    get,
    path = "/api/clinic/ipd/admissions/{id}",
    params(("id" = Uuid, Path, description = "Admission ID")),
    responses(
        (status = 200, description = "Admission", body = AdmissionResponse),
        (status = 404, description = "Admission not found")
    ),
    tag = "ipd"
)]
pub async fn get_admission(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<AdmissionResponse>>> {
    let admission = server.ipd.get_admission(ctx.clinic_id, id).await?;
    Ok(Json(api_success(AdmissionResponse { admission })))
}

#[utoipa::path(
    post,
    path = "/api/clinic/ipd/admissions/{id}/discharge",
    params(("id" = Uuid, Path, description = "Admission ID")),
    request_body = DischargeRequest,
    responses(
        (status = 200, description = "Admission closed and bed released", body = DischargeResponse),
        (status = 409, description = "Admission already closed")
    ),
    tag = "ipd"
)]
pub async fn discharge_patient(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Path(id): Path<Uuid>,
    Json(req): Json<DischargeRequest>,
) -> ApiResult<Json<ApiResponse<DischargeResponse>>> {
    let (admission, bed) = server.ipd.discharge_patient(ctx.clinic_id, id, req).await?;
    Ok(Json(api_success(DischargeResponse { admission, bed })))
}

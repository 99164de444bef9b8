use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use lab_service::{LabLookupQuery, LabLookupResult, LabOrder, RecordLabResultRequest};

use crate::error::{api_success, ApiResponse, ApiResult};
use crate::middleware::ClinicContext;
use crate::server::ClinicServer;

/// Public lookup; needs no clinic, only the order number and the phone it
/// was registered with
#[utoipa::path(
    get,
    path = "/api/lab-results/lookup",
    params(
        ("phone" = String, Query, description = "Patient phone number"),
        ("order_number" = String, Query, description = "LAB-YYYYMMDD-NNNN")
    ),
    responses(
        (status = 200, description = "Order status, with values once completed", body = LabLookupResult),
        (status = 400, description = "Malformed order number"),
        (status = 404, description = "No matching result")
    ),
    tag = "lab"
)]
pub async fn lookup(
    State(server): State<ClinicServer>,
    Query(q): Query<LabLookupQuery>,
) -> ApiResult<Json<ApiResponse<LabLookupResult>>> {
    let result = server.lab.lookup(&q.phone, &q.order_number).await?;
    Ok(Json(api_success(result)))
}

#[utoipa::path(
    post,
    path = "/api/clinic/lab-results",
    request_body = RecordLabResultRequest,
    responses(
        (status = 201, description = "Order stored", body = LabOrder),
        (status = 409, description = "Order number already used")
    ),
    tag = "lab"
)]
pub async fn record_result(
    State(server): State<ClinicServer>,
    ctx: ClinicContext,
    Json(req): Json<RecordLabResultRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<LabOrder>>)> {
    let order = server.lab.record_result(ctx.clinic_id, req).await?;
    Ok((StatusCode::CREATED, Json(api_success(order))))
}
